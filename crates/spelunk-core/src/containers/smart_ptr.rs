//! `std::unique_ptr` / `std::shared_ptr` decoders.
//!
//! A unique pointer is one stored raw pointer, but *where* it is stored
//! moved across library releases: newer ABIs nest a second tuple
//! (`_M_t._M_t._M_head_impl`), older ones keep it one level up. Both
//! nestings are tried. A shared pointer pairs the stored pointer with a
//! control block holding the use count; a null control block means a
//! default-constructed pointer with count zero.

use super::{unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{Scalar, TypeCategory, TypeRef, Value};

pub(super) fn decode_unique<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    const TAG: &str = "std::unique_ptr";

    // the two known storage nestings, newest first
    let stored = value
        .member("_M_t")
        .and_then(|t| t.member("_M_t"))
        .and_then(|t| t.member("_M_head_impl"))
        .or_else(|_| value.member("_M_t").and_then(|t| t.member("_M_head_impl")))
        .map_err(|e| unsupported(TAG, e))?;
    if stored.ty().resolved().category() != TypeCategory::Pointer {
        return Err(unsupported_msg(TAG, "stored head is not a pointer"));
    }
    let raw = stored.read_pointer().map_err(|e| unsupported(TAG, e))?;
    let valid = raw != 0 && value.memory().is_readable(raw);

    let pointee = pointee_type(value, &stored);
    let elem = match (valid, pointee) {
        (true, Some(ty)) => Some(Value::new(value.memory(), raw, ty)),
        _ => None,
    };

    Ok(ContainerView {
        tag: TAG,
        meta: vec![(".valid", Scalar::Bool(valid))],
        elements: Elements::Pointee(elem),
    })
}

pub(super) fn decode_shared<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    const TAG: &str = "std::shared_ptr";

    let stored = value.member("_M_ptr").map_err(|e| unsupported(TAG, e))?;
    if stored.ty().resolved().category() != TypeCategory::Pointer {
        return Err(unsupported_msg(TAG, "stored pointer is not a pointer"));
    }
    let raw = stored.read_pointer().map_err(|e| unsupported(TAG, e))?;

    let control = value
        .member("_M_refcount")
        .and_then(|rc| rc.member("_M_pi"))
        .map_err(|e| unsupported(TAG, e))?;
    let use_count = match control.read_pointer().map_err(|e| unsupported(TAG, e))? {
        0 => 0,
        _ => control
            .deref()
            .and_then(|block| block.member("_M_use_count"))
            .and_then(|c| c.as_i64())
            .map_err(|e| unsupported(TAG, e))?,
    };

    let valid = raw != 0 && value.memory().is_readable(raw);
    let pointee = pointee_type(value, &stored);
    let elem = match (valid, pointee) {
        (true, Some(ty)) => Some(Value::new(value.memory(), raw, ty)),
        _ => None,
    };

    Ok(ContainerView {
        tag: TAG,
        meta: vec![(".ref_count", Scalar::Int(use_count))],
        elements: Elements::Pointee(elem),
    })
}

/// Element type: declared template argument, else the stored pointer's
/// target.
fn pointee_type(value: &Value<'_>, stored: &Value<'_>) -> Option<TypeRef>
{
    value
        .ty()
        .resolved()
        .template_args()
        .first()
        .cloned()
        .or_else(|| stored.ty().resolved().target().cloned())
}
