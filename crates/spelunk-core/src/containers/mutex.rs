//! `std::mutex` decoder.
//!
//! The native lock word and owner thread id sit at fixed members inside the
//! platform lock structure (`_M_mutex.__data.__lock` / `__owner` on glibc).
//! No iteration; the view is purely the lock state.

use super::{unsupported, ContainerView, Elements};
use crate::error::Result;
use crate::value::{Scalar, Value};

const TAG: &str = "std::mutex";

pub(super) fn decode<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    let data = value
        .member("_M_mutex")
        .and_then(|m| m.member("__data"))
        .map_err(|e| unsupported(TAG, e))?;
    let locked = data
        .member("__lock")
        .and_then(|l| l.as_i64())
        .map_err(|e| unsupported(TAG, e))?
        != 0;

    let mut meta = vec![(".locked", Scalar::Bool(locked))];
    if locked {
        let owner = data
            .member("__owner")
            .and_then(|o| o.as_i64())
            .map_err(|e| unsupported(TAG, e))?;
        meta.push((".owner", Scalar::Int(owner)));
    }

    Ok(ContainerView {
        tag: TAG,
        meta,
        elements: Elements::None,
    })
}
