use std::ffi::c_char;

use h5x_error::{H5xResult, h5x_bail};
use h5x_sys::{H5T_VARIABLE, H5T_builtin, H5T_class_t, H5T_order_t, H5T_sign_t, hvl_t};

/// Concrete byte order of a stored atomic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Order {
    Le,
    Be,
}

impl Order {
    pub(crate) const NATIVE: Order = if cfg!(target_endian = "little") {
        Order::Le
    } else {
        Order::Be
    };

    pub(crate) fn from_native(order: H5T_order_t) -> H5xResult<Self> {
        match order {
            H5T_order_t::H5T_ORDER_LE => Ok(Order::Le),
            H5T_order_t::H5T_ORDER_BE => Ok(Order::Be),
            other => h5x_bail!("unsupported byte order {:?}", other),
        }
    }

    pub(crate) fn to_native(self) -> H5T_order_t {
        match self {
            Order::Le => H5T_order_t::H5T_ORDER_LE,
            Order::Be => H5T_order_t::H5T_ORDER_BE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum StrSize {
    Fixed(usize),
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Member {
    pub(crate) name: String,
    pub(crate) offset: usize,
    pub(crate) ty: TypeDef,
}

/// The engine-side definition behind a type handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeDef {
    Integer {
        size: usize,
        order: Order,
        signed: bool,
    },
    Float {
        size: usize,
        order: Order,
    },
    Bitfield {
        size: usize,
        order: Order,
    },
    String(StrSize),
    Compound {
        size: usize,
        members: Vec<Member>,
    },
    Vlen(Box<TypeDef>),
}

impl TypeDef {
    pub(crate) fn builtin(which: H5T_builtin) -> Self {
        use H5T_builtin::*;

        let int = |size, order, signed| TypeDef::Integer {
            size,
            order,
            signed,
        };
        match which {
            STD_I8LE => int(1, Order::Le, true),
            STD_I8BE => int(1, Order::Be, true),
            NATIVE_INT8 => int(1, Order::NATIVE, true),
            STD_I16LE => int(2, Order::Le, true),
            STD_I16BE => int(2, Order::Be, true),
            NATIVE_INT16 => int(2, Order::NATIVE, true),
            STD_I32LE => int(4, Order::Le, true),
            STD_I32BE => int(4, Order::Be, true),
            NATIVE_INT32 => int(4, Order::NATIVE, true),
            STD_I64LE => int(8, Order::Le, true),
            STD_I64BE => int(8, Order::Be, true),
            NATIVE_INT64 => int(8, Order::NATIVE, true),
            STD_U8LE => int(1, Order::Le, false),
            STD_U8BE => int(1, Order::Be, false),
            NATIVE_UINT8 => int(1, Order::NATIVE, false),
            STD_U16LE => int(2, Order::Le, false),
            STD_U16BE => int(2, Order::Be, false),
            NATIVE_UINT16 => int(2, Order::NATIVE, false),
            STD_U32LE => int(4, Order::Le, false),
            STD_U32BE => int(4, Order::Be, false),
            NATIVE_UINT32 => int(4, Order::NATIVE, false),
            STD_U64LE => int(8, Order::Le, false),
            STD_U64BE => int(8, Order::Be, false),
            NATIVE_UINT64 => int(8, Order::NATIVE, false),
            STD_B8LE => TypeDef::Bitfield { size: 1, order: Order::Le },
            STD_B8BE => TypeDef::Bitfield { size: 1, order: Order::Be },
            NATIVE_B8 => TypeDef::Bitfield { size: 1, order: Order::NATIVE },
            STD_B16LE => TypeDef::Bitfield { size: 2, order: Order::Le },
            STD_B16BE => TypeDef::Bitfield { size: 2, order: Order::Be },
            NATIVE_B16 => TypeDef::Bitfield { size: 2, order: Order::NATIVE },
            STD_B32LE => TypeDef::Bitfield { size: 4, order: Order::Le },
            STD_B32BE => TypeDef::Bitfield { size: 4, order: Order::Be },
            NATIVE_B32 => TypeDef::Bitfield { size: 4, order: Order::NATIVE },
            STD_B64LE => TypeDef::Bitfield { size: 8, order: Order::Le },
            STD_B64BE => TypeDef::Bitfield { size: 8, order: Order::Be },
            NATIVE_B64 => TypeDef::Bitfield { size: 8, order: Order::NATIVE },
            IEEE_F32LE => TypeDef::Float { size: 4, order: Order::Le },
            IEEE_F32BE => TypeDef::Float { size: 4, order: Order::Be },
            NATIVE_FLOAT => TypeDef::Float { size: 4, order: Order::NATIVE },
            IEEE_F64LE => TypeDef::Float { size: 8, order: Order::Le },
            IEEE_F64BE => TypeDef::Float { size: 8, order: Order::Be },
            NATIVE_DOUBLE => TypeDef::Float { size: 8, order: Order::NATIVE },
            C_S1 => TypeDef::String(StrSize::Fixed(1)),
        }
    }

    pub(crate) fn create(class: H5T_class_t, size: usize) -> H5xResult<Self> {
        match class {
            H5T_class_t::H5T_COMPOUND if size > 0 && size != H5T_VARIABLE => {
                Ok(TypeDef::Compound {
                    size,
                    members: Vec::new(),
                })
            }
            H5T_class_t::H5T_STRING if size == H5T_VARIABLE => {
                Ok(TypeDef::String(StrSize::Variable))
            }
            H5T_class_t::H5T_STRING if size > 0 => Ok(TypeDef::String(StrSize::Fixed(size))),
            other => h5x_bail!("cannot create a {:?} type of size {}", other, size),
        }
    }

    /// Size of one element in a transfer buffer.
    pub(crate) fn size(&self) -> usize {
        match self {
            TypeDef::Integer { size, .. }
            | TypeDef::Float { size, .. }
            | TypeDef::Bitfield { size, .. }
            | TypeDef::String(StrSize::Fixed(size))
            | TypeDef::Compound { size, .. } => *size,
            TypeDef::String(StrSize::Variable) => size_of::<*const c_char>(),
            TypeDef::Vlen(_) => size_of::<hvl_t>(),
        }
    }

    pub(crate) fn class(&self) -> H5T_class_t {
        match self {
            TypeDef::Integer { .. } => H5T_class_t::H5T_INTEGER,
            TypeDef::Float { .. } => H5T_class_t::H5T_FLOAT,
            TypeDef::Bitfield { .. } => H5T_class_t::H5T_BITFIELD,
            TypeDef::String(_) => H5T_class_t::H5T_STRING,
            TypeDef::Compound { .. } => H5T_class_t::H5T_COMPOUND,
            TypeDef::Vlen(_) => H5T_class_t::H5T_VLEN,
        }
    }

    pub(crate) fn order(&self) -> H5T_order_t {
        match self {
            TypeDef::Integer { order, .. }
            | TypeDef::Float { order, .. }
            | TypeDef::Bitfield { order, .. } => order.to_native(),
            TypeDef::Compound { .. } | TypeDef::String(_) | TypeDef::Vlen(_) => {
                H5T_order_t::H5T_ORDER_NONE
            }
        }
    }

    pub(crate) fn sign(&self) -> H5T_sign_t {
        match self {
            TypeDef::Integer { signed: true, .. } => H5T_sign_t::H5T_SGN_2,
            TypeDef::Integer { signed: false, .. } => H5T_sign_t::H5T_SGN_NONE,
            _ => H5T_sign_t::H5T_SGN_ERROR,
        }
    }

    /// Whether elements hold pointers to engine allocations.
    pub(crate) fn is_variable(&self) -> bool {
        match self {
            TypeDef::String(StrSize::Variable) | TypeDef::Vlen(_) => true,
            TypeDef::Compound { members, .. } => members.iter().any(|m| m.ty.is_variable()),
            _ => false,
        }
    }

    pub(crate) fn set_size(&mut self, new_size: usize) -> H5xResult<()> {
        match self {
            TypeDef::String(size) => {
                *size = if new_size == H5T_VARIABLE {
                    StrSize::Variable
                } else if new_size > 0 {
                    StrSize::Fixed(new_size)
                } else {
                    h5x_bail!("string size must be positive")
                };
            }
            TypeDef::Integer { size, .. } | TypeDef::Bitfield { size, .. }
                if matches!(new_size, 1 | 2 | 4 | 8) =>
            {
                *size = new_size;
            }
            TypeDef::Float { size, .. } if matches!(new_size, 4 | 8) => *size = new_size,
            TypeDef::Compound { size, members } => {
                let extent = members
                    .iter()
                    .map(|m| m.offset + m.ty.size())
                    .max()
                    .unwrap_or(0);
                if new_size < extent || new_size == H5T_VARIABLE {
                    h5x_bail!("compound size {} does not fit its members", new_size);
                }
                *size = new_size;
            }
            other => h5x_bail!("cannot set size {} on {:?}", new_size, other),
        }
        Ok(())
    }

    pub(crate) fn set_order(&mut self, new_order: Order) -> H5xResult<()> {
        match self {
            TypeDef::Integer { order, .. }
            | TypeDef::Float { order, .. }
            | TypeDef::Bitfield { order, .. } => {
                *order = new_order;
                Ok(())
            }
            TypeDef::Compound { members, .. } => members
                .iter_mut()
                .filter(|m| !matches!(m.ty, TypeDef::String(_) | TypeDef::Vlen(_)))
                .try_for_each(|m| m.ty.set_order(new_order)),
            other => h5x_bail!("cannot set a byte order on {:?}", other),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, offset: usize, field: TypeDef) -> H5xResult<()> {
        let class = self.class();
        let TypeDef::Compound { size, members } = self else {
            h5x_bail!("cannot insert a member into a {:?} type", class);
        };
        if field.is_variable() {
            h5x_bail!("variable-length member `{}` is not supported", name);
        }
        let end = offset + field.size();
        if end > *size {
            h5x_bail!("member `{}` ends at {} past the compound size {}", name, end, size);
        }
        if members.iter().any(|m| m.name == name) {
            h5x_bail!("duplicate member `{}`", name);
        }
        if members
            .iter()
            .any(|m| offset < m.offset + m.ty.size() && m.offset < end)
        {
            h5x_bail!("member `{}` overlaps an existing member", name);
        }
        members.push(Member {
            name: name.to_string(),
            offset,
            ty: field,
        });
        Ok(())
    }
}
