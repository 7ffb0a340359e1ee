//! `std::function` decoder.
//!
//! The callable is type-erased into a small inline buffer (`_M_functor`);
//! the identity of what was stored cannot be recovered in general. The view
//! exposes emptiness and, when non-empty, the stored function/object
//! address as an opaque integer.

use super::{unsupported, ContainerView, Elements};
use crate::error::Result;
use crate::value::{Scalar, Value};

const TAG: &str = "std::function";

pub(super) fn decode<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    let target = value
        .member("_M_functor")
        .and_then(|f| f.member("_M_unused"))
        .and_then(|u| u.member("_M_object"))
        .and_then(|o| o.read_pointer())
        .map_err(|e| unsupported(TAG, e))?;

    let empty = target == 0;
    Ok(ContainerView {
        tag: TAG,
        meta: vec![(".empty", Scalar::Bool(empty))],
        elements: Elements::Address(if empty { None } else { Some(target) }),
    })
}
