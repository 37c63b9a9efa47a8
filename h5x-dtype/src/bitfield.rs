use std::fmt::{Binary, Debug, Formatter};

use h5x_error::H5xResult;
use paste::paste;
use static_assertions::assert_eq_size;

use crate::{ByteOrder, H5Type, TypeDescriptor};

macro_rules! bitfield {
    ($bits:literal, $T:ty) => {
        paste! {
            #[doc = concat!("A ", stringify!($bits), "-bit vector, stored with the native bitfield class.")]
            #[repr(transparent)]
            #[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct [<Bits $bits>](pub $T);

            impl [<Bits $bits>] {
                /// Whether bit `index` is set. Bit zero is the least significant bit.
                #[inline]
                pub fn get(&self, index: u32) -> bool {
                    index < $bits && (self.0 >> index) & 1 == 1
                }

                /// Set or clear bit `index`. Out of range indices are ignored.
                #[inline]
                pub fn set(&mut self, index: u32, value: bool) {
                    if index < $bits {
                        if value {
                            self.0 |= 1 << index;
                        } else {
                            self.0 &= !(1 << index);
                        }
                    }
                }
            }

            impl From<$T> for [<Bits $bits>] {
                fn from(value: $T) -> Self {
                    Self(value)
                }
            }

            impl From<[<Bits $bits>]> for $T {
                fn from(value: [<Bits $bits>]) -> Self {
                    value.0
                }
            }

            impl Debug for [<Bits $bits>] {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    write!(f, "Bits{}({:#0width$b})", $bits, self.0, width = $bits + 2)
                }
            }

            impl Binary for [<Bits $bits>] {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    Binary::fmt(&self.0, f)
                }
            }

            assert_eq_size!([<Bits $bits>], $T);

            unsafe impl H5Type for [<Bits $bits>] {
                #[inline]
                fn type_descriptor() -> H5xResult<TypeDescriptor> {
                    Ok(TypeDescriptor::Bitfield {
                        size: size_of::<$T>(),
                        order: ByteOrder::Native,
                    })
                }
            }
        }
    };
}

bitfield!(8, u8);
bitfield!(16, u16);
bitfield!(32, u32);
bitfield!(64, u64);
