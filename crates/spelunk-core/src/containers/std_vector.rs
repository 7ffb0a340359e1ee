//! `std::vector` decoder: three raw pointers in `_M_impl`.
//!
//! Layout (libstdc++): `_M_start` and `_M_finish` delimit the live elements,
//! `_M_end_of_storage` the allocation. Size and capacity are pointer
//! differences; element `i` lives at `start + i * sizeof(T)`.
//! `std::vector<bool>` packs bits and is reported as unsupported.

use super::{template_arg, unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{Scalar, TypeCategory, Value};

const TAG: &str = "std::vector";

pub(super) fn decode<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    let impl_ = value.member("_M_impl").map_err(|e| unsupported(TAG, e))?;
    let start_field = impl_.member("_M_start").map_err(|e| unsupported(TAG, e))?;
    if start_field.ty().resolved().category() != TypeCategory::Pointer {
        // vector<bool> stores a bit iterator here, not a raw pointer
        return Err(unsupported_msg(TAG, "bit-packed storage"));
    }

    let start = start_field.read_pointer().map_err(|e| unsupported(TAG, e))?;
    let finish = impl_
        .member("_M_finish")
        .and_then(|m| m.read_pointer())
        .map_err(|e| unsupported(TAG, e))?;
    let end_of_storage = impl_
        .member("_M_end_of_storage")
        .and_then(|m| m.read_pointer())
        .map_err(|e| unsupported(TAG, e))?;

    let elem = template_arg(value, 0, TAG).or_else(|_| {
        start_field
            .ty()
            .resolved()
            .target()
            .cloned()
            .ok_or_else(|| unsupported_msg(TAG, "element type unknown"))
    })?;
    let elem_size = elem.byte_size();
    if elem_size == 0 {
        return Err(unsupported_msg(TAG, "zero-sized element type"));
    }

    let size = finish.saturating_sub(start) / elem_size;
    let capacity = end_of_storage.saturating_sub(start) / elem_size;

    let mem = value.memory();
    let iter = (0..size).map(move |i| Ok(Value::new(mem, start + i * elem_size, elem.clone())));

    Ok(ContainerView {
        tag: TAG,
        meta: vec![(".size", Scalar::UInt(size)), (".capacity", Scalar::UInt(capacity))],
        elements: Elements::Seq(Box::new(iter)),
    })
}
