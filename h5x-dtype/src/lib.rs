#![deny(missing_docs)]

//! The semantic type system of h5x.
//!
//! A [`TypeDescriptor`] describes how a value is laid out in a transfer buffer: primitive
//! integers and floats of a given width and byte order, bitfields, strings, records of named
//! fields at fixed offsets, and variable-length sequences. Concrete Rust types map onto a
//! descriptor through the [`H5Type`] trait, which is implemented for the primitives here and
//! derived for records.

pub use bitfield::*;
pub use byte_order::*;
pub use compound::*;
pub use descriptor::*;
pub use h5type::*;

mod bitfield;
mod byte_order;
mod compound;
mod descriptor;
mod h5type;
