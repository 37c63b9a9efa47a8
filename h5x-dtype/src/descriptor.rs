use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::{ByteOrder, CompoundType};

/// The class of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Signed or unsigned integers.
    Integer,
    /// IEEE floating point.
    Float,
    /// Fixed or variable-length strings.
    String,
    /// Bit vectors.
    Bitfield,
    /// Records of named fields.
    Compound,
    /// Variable-length sequences.
    VarLen,
}

impl Display for TypeClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeClass::Integer => "integer",
            TypeClass::Float => "float",
            TypeClass::String => "string",
            TypeClass::Bitfield => "bitfield",
            TypeClass::Compound => "compound",
            TypeClass::VarLen => "vlen",
        };
        write!(f, "{name}")
    }
}

/// How a value of some type is laid out in a transfer buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// A two's complement or unsigned integer of 1, 2, 4 or 8 bytes.
    Integer {
        /// Whether the integer is signed.
        signed: bool,
        /// Width in bytes.
        size: usize,
        /// Byte order.
        order: ByteOrder,
    },
    /// An IEEE float of 4 or 8 bytes.
    Float {
        /// Width in bytes.
        size: usize,
        /// Byte order.
        order: ByteOrder,
    },
    /// A bit vector of 1, 2, 4 or 8 bytes.
    Bitfield {
        /// Width in bytes.
        size: usize,
        /// Byte order.
        order: ByteOrder,
    },
    /// A NUL-padded string of exactly `size` bytes.
    FixedString {
        /// Width in bytes.
        size: usize,
    },
    /// A NUL-terminated string of any length, transferred as a pointer.
    VarLenString,
    /// A record of named fields at fixed offsets.
    Compound(CompoundType),
    /// A sequence of any length, transferred as a `(len, ptr)` pair.
    VarLenArray(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// The class of this descriptor.
    pub fn class(&self) -> TypeClass {
        match self {
            TypeDescriptor::Integer { .. } => TypeClass::Integer,
            TypeDescriptor::Float { .. } => TypeClass::Float,
            TypeDescriptor::Bitfield { .. } => TypeClass::Bitfield,
            TypeDescriptor::FixedString { .. } | TypeDescriptor::VarLenString => {
                TypeClass::String
            }
            TypeDescriptor::Compound(_) => TypeClass::Compound,
            TypeDescriptor::VarLenArray(_) => TypeClass::VarLen,
        }
    }

    /// Size in bytes of one element in a transfer buffer.
    pub fn size(&self) -> usize {
        match self {
            TypeDescriptor::Integer { size, .. }
            | TypeDescriptor::Float { size, .. }
            | TypeDescriptor::Bitfield { size, .. }
            | TypeDescriptor::FixedString { size } => *size,
            TypeDescriptor::VarLenString => size_of::<*const u8>(),
            TypeDescriptor::Compound(compound) => compound.size(),
            TypeDescriptor::VarLenArray(_) => size_of::<usize>() + size_of::<*const u8>(),
        }
    }

    /// Byte order of an atomic descriptor, `None` for strings, records and sequences.
    pub fn byte_order(&self) -> Option<ByteOrder> {
        match self {
            TypeDescriptor::Integer { order, .. }
            | TypeDescriptor::Float { order, .. }
            | TypeDescriptor::Bitfield { order, .. } => Some(*order),
            _ => None,
        }
    }

    /// Whether elements of this type hold pointers to separately allocated memory.
    pub fn is_variable_length(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::VarLenString | TypeDescriptor::VarLenArray(_)
        )
    }

    /// Whether this is a primitive or bitfield.
    pub fn is_atomic(&self) -> bool {
        self.byte_order().is_some()
    }

    /// The same descriptor with every atomic member rewritten to `order`.
    pub fn with_byte_order(&self, order: ByteOrder) -> Self {
        match self {
            TypeDescriptor::Integer { signed, size, .. } => TypeDescriptor::Integer {
                signed: *signed,
                size: *size,
                order,
            },
            TypeDescriptor::Float { size, .. } => TypeDescriptor::Float { size: *size, order },
            TypeDescriptor::Bitfield { size, .. } => TypeDescriptor::Bitfield { size: *size, order },
            TypeDescriptor::Compound(compound) => {
                TypeDescriptor::Compound(compound.with_byte_order(order))
            }
            TypeDescriptor::VarLenArray(base) => {
                TypeDescriptor::VarLenArray(Box::new(base.with_byte_order(order)))
            }
            TypeDescriptor::FixedString { .. } | TypeDescriptor::VarLenString => self.clone(),
        }
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeDescriptor::Integer {
                signed,
                size,
                order,
            } => {
                let prefix = if *signed { "i" } else { "u" };
                write!(f, "{prefix}{}{order}", size * 8)
            }
            TypeDescriptor::Float { size, order } => write!(f, "f{}{order}", size * 8),
            TypeDescriptor::Bitfield { size, order } => write!(f, "b{}{order}", size * 8),
            TypeDescriptor::FixedString { size } => write!(f, "str[{size}]"),
            TypeDescriptor::VarLenString => write!(f, "str[*]"),
            TypeDescriptor::Compound(compound) => write!(
                f,
                "{{{}}}",
                compound
                    .fields()
                    .iter()
                    .map(|field| format!("{}@{}: {}", field.name(), field.offset(), field.ty()))
                    .join(", ")
            ),
            TypeDescriptor::VarLenArray(base) => write!(f, "vlen<{base}>"),
        }
    }
}
