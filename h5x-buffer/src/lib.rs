#![deny(missing_docs)]

//! Owned buffers for native transfers.
//!
//! Every transfer hands the engine a raw pointer into memory owned by h5x. The buffers in this
//! crate guarantee that pointer stays valid and unmoved for the duration of the native call.
//!
//! # Alignment
//!
//! A [`BufferMut<T>`] is always aligned to at least `align_of::<T>()`, so the engine can treat
//! it as an array of `T` even when `T` is a record or a `hvl_t`-style pair.

pub use alignment::*;
pub use buffer::*;
pub use cstring::*;

mod alignment;
mod buffer;
mod cstring;
mod debug;
mod macros;
