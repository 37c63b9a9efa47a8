use h5x_error::H5xResult;

use crate::{ByteOrder, TypeDescriptor};

/// A Rust type with a fixed binary layout that can be transferred as-is.
///
/// Implemented for the primitive integers and floats, the bitfield newtypes, and (through
/// `#[derive(H5Type)]`) `#[repr(C)]` records built from those.
///
/// # Safety
///
/// The descriptor must describe the exact in-memory layout of `Self`, every bit pattern the
/// engine may produce for that descriptor must be a valid `Self`, and the all-zero bit pattern
/// must be a valid `Self`.
pub unsafe trait H5Type: Copy + 'static {
    /// The descriptor of this type in native byte order.
    fn type_descriptor() -> H5xResult<TypeDescriptor>;

    /// The descriptor of this type with every atomic member in the given byte order.
    fn type_descriptor_ordered(order: ByteOrder) -> H5xResult<TypeDescriptor> {
        Self::type_descriptor().map(|d| d.with_byte_order(order))
    }
}

macro_rules! integer_h5type {
    ($T:ty, $signed:literal) => {
        unsafe impl H5Type for $T {
            #[inline]
            fn type_descriptor() -> H5xResult<TypeDescriptor> {
                Ok(TypeDescriptor::Integer {
                    signed: $signed,
                    size: size_of::<$T>(),
                    order: ByteOrder::Native,
                })
            }
        }
    };
}

macro_rules! float_h5type {
    ($T:ty) => {
        unsafe impl H5Type for $T {
            #[inline]
            fn type_descriptor() -> H5xResult<TypeDescriptor> {
                Ok(TypeDescriptor::Float {
                    size: size_of::<$T>(),
                    order: ByteOrder::Native,
                })
            }
        }
    };
}

integer_h5type!(i8, true);
integer_h5type!(i16, true);
integer_h5type!(i32, true);
integer_h5type!(i64, true);
integer_h5type!(u8, false);
integer_h5type!(u16, false);
integer_h5type!(u32, false);
integer_h5type!(u64, false);
float_h5type!(f32);
float_h5type!(f64);

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(i16::type_descriptor(), TypeDescriptor::Integer { signed: true, size: 2, order: ByteOrder::Native })]
    #[case(u32::type_descriptor(), TypeDescriptor::Integer { signed: false, size: 4, order: ByteOrder::Native })]
    #[case(f64::type_descriptor(), TypeDescriptor::Float { size: 8, order: ByteOrder::Native })]
    #[case(
        f32::type_descriptor_ordered(ByteOrder::BigEndian),
        TypeDescriptor::Float { size: 4, order: ByteOrder::BigEndian }
    )]
    fn primitives(#[case] actual: H5xResult<TypeDescriptor>, #[case] expected: TypeDescriptor) {
        assert_eq!(actual.unwrap(), expected);
    }
}
