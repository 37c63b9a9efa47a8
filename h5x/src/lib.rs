#![deny(missing_docs)]

//! Typed array marshaling over a hierarchical container engine.
//!
//! h5x moves n-dimensional arrays of Rust values in and out of datasets and attributes held by
//! a [`NativeEngine`](h5x_sys::NativeEngine). It maps each element type onto a native type
//! descriptor, describes array regions and hyperslab selections as dataspaces, and owns the
//! buffers handed across the boundary, including the memory the engine allocates for
//! variable-length reads.
//!
//! ```
//! use std::sync::Arc;
//!
//! use h5x::{Dataset, File, Library};
//! use h5x_mem::MemoryEngine;
//! use ndarray::arr2;
//!
//! let lib = Library::new(Arc::new(MemoryEngine::new()))?;
//! let file = File::create(&lib, "example.h5")?;
//! let dataset = Dataset::create_with_data(&file, "grid", &arr2(&[[1i32, 2], [3, 4]]))?;
//! assert_eq!(dataset.get(&[1, 0])?, 3);
//! # Ok::<(), h5x::error::H5xError>(())
//! ```
//!
//! # Element kinds
//!
//! Every element type implements [`H5Element`], which picks one of four transfer strategies:
//! fixed-size values (primitives, [`Bits8`](dtype::Bits8) and friends, `#[derive(H5Type)]`
//! records), fixed-length strings, variable-length strings, and variable-length sequences
//! (`Vec<T>`). Whether a `String` is fixed or variable is decided by the stored type.

extern crate self as h5x;

pub use attribute::*;
pub use dataset::*;
pub use dataspace::*;
pub use datatype::*;
pub use element::{ElementKind, H5Element};
pub use h5x_dtype as dtype;
pub use h5x_dtype::H5Type;
#[cfg(feature = "derive")]
pub use h5x_derive::H5Type;
pub use h5x_error as error;
pub use h5x_sys as sys;
pub use handle::{Handle, HandleKind, Ownership};
pub use library::*;
pub use location::*;
pub use transfer::Transfer;

mod attribute;
mod dataset;
mod dataspace;
mod datatype;
mod element;
mod handle;
mod library;
mod location;
pub mod logging;
mod transfer;
mod vlen;

#[doc(hidden)]
pub mod __private {
    pub use crate::element::{read_values, value_accepts, write_values};
}

/// Implement [`H5Element`] as a fixed-size value for types that implement [`H5Type`].
///
/// `#[derive(H5Type)]` invokes this for every record, so it is only needed for hand-written
/// [`H5Type`] implementations.
#[macro_export]
macro_rules! impl_value_element {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ::h5x::H5Element for $ty {
                const KIND: ::h5x::ElementKind = ::h5x::ElementKind::Value;

                fn descriptor() -> ::h5x::error::H5xResult<::h5x::dtype::TypeDescriptor> {
                    <$ty as ::h5x::dtype::H5Type>::type_descriptor()
                }

                fn accepts(class: ::h5x::dtype::TypeClass) -> bool {
                    ::h5x::__private::value_accepts::<$ty>(class)
                }

                fn read_elements(
                    transfer: &::h5x::Transfer<'_>,
                ) -> ::h5x::error::H5xResult<::std::vec::Vec<Self>> {
                    ::h5x::__private::read_values::<$ty>(transfer)
                }

                fn write_elements(
                    transfer: &::h5x::Transfer<'_>,
                    values: &[Self],
                ) -> ::h5x::error::H5xResult<()> {
                    ::h5x::__private::write_values::<$ty>(transfer, values)
                }
            }
        )+
    };
}
