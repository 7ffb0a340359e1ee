//! `std::basic_string` decoder.
//!
//! Modern ABIs store the data pointer in `_M_dataplus._M_p` and an explicit
//! `_M_string_length`; small strings point into the object's own buffer, so
//! no SSO special case is needed. The pre-C++11 copy-on-write ABI kept the
//! length in a hidden header two words before the character data; when the
//! explicit field is absent, the length word is read from there instead.

use super::{unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{TypeDescriptor, Value};

const TAG: &str = "std::string";
const WORD: u64 = 8;

pub(super) fn decode<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    let data = value
        .member("_M_dataplus")
        .and_then(|d| d.member("_M_p"))
        .and_then(|p| p.read_pointer())
        .map_err(|e| unsupported(TAG, e))?;

    if data == 0 {
        return Ok(ContainerView {
            tag: TAG,
            meta: Vec::new(),
            elements: Elements::Text(None),
        });
    }

    let mem = value.memory();
    let len = match value.member("_M_string_length").and_then(|l| l.as_u64()) {
        Ok(len) => len,
        // copy-on-write ABI: length lives in the rep header before the data
        Err(_) => {
            let raw = mem
                .read_word(data.wrapping_sub(2 * WORD))
                .map_err(|e| unsupported(TAG, e))? as i64;
            if raw < 0 {
                return Err(unsupported_msg(TAG, "negative length in legacy header"));
            }
            raw as u64
        }
    };

    let text = match mem.read_string_exact(data, len as usize) {
        Ok(text) => text,
        // data pointer into unreadable memory: report absence, not failure
        Err(_) => {
            return Ok(ContainerView {
                tag: TAG,
                meta: Vec::new(),
                elements: Elements::Text(None),
            })
        }
    };

    let char_array = TypeDescriptor::array(TypeDescriptor::character(), len);
    let leaf = Value::new(mem, data, char_array);

    Ok(ContainerView {
        tag: TAG,
        meta: Vec::new(),
        elements: Elements::Text(Some((leaf, text))),
    })
}
