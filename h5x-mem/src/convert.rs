use h5x_error::{H5xResult, h5x_bail};

use crate::typedef::{Order, StrSize, TypeDef};

/// One stored element, independent of any transfer buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    /// Raw bytes of a fixed-size element laid out as its type.
    Fixed(Vec<u8>),
    /// Elements of a variable-length sequence.
    Seq(Vec<Value>),
    /// A variable-length string, without its terminator. `None` is a null pointer.
    Str(Option<Vec<u8>>),
}

impl Value {
    /// The value of a freshly created dataset element.
    pub(crate) fn fill(ty: &TypeDef) -> Self {
        match ty {
            TypeDef::Vlen(_) => Value::Seq(Vec::new()),
            TypeDef::String(StrSize::Variable) => Value::Str(None),
            fixed => Value::Fixed(vec![0; fixed.size()]),
        }
    }

    fn bytes(&self) -> H5xResult<&[u8]> {
        match self {
            Value::Fixed(bytes) => Ok(bytes),
            other => h5x_bail!("expected a fixed-size value, found {:?}", other),
        }
    }
}

enum Number {
    Int(i128),
    Float(f64),
}

fn to_le(bytes: &[u8], order: Order) -> Vec<u8> {
    let mut bytes = bytes.to_vec();
    if order == Order::Be {
        bytes.reverse();
    }
    bytes
}

fn from_le(mut bytes: Vec<u8>, order: Order) -> Vec<u8> {
    if order == Order::Be {
        bytes.reverse();
    }
    bytes
}

fn read_number(bytes: &[u8], ty: &TypeDef) -> H5xResult<Number> {
    match ty {
        TypeDef::Integer {
            size,
            order,
            signed,
        } => {
            let le = to_le(&bytes[..*size], *order);
            let negative = *signed && le[size - 1] & 0x80 != 0;
            let mut wide = if negative { [0xffu8; 16] } else { [0u8; 16] };
            wide[..*size].copy_from_slice(&le);
            Ok(Number::Int(i128::from_le_bytes(wide)))
        }
        TypeDef::Float { size: 4, order } => {
            let le = to_le(&bytes[..4], *order);
            Ok(Number::Float(f64::from(f32::from_le_bytes([
                le[0], le[1], le[2], le[3],
            ]))))
        }
        TypeDef::Float { size: 8, order } => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&to_le(&bytes[..8], *order));
            Ok(Number::Float(f64::from_le_bytes(raw)))
        }
        other => h5x_bail!("{:?} is not numeric", other),
    }
}

fn write_number(number: Number, ty: &TypeDef) -> H5xResult<Vec<u8>> {
    match ty {
        TypeDef::Integer {
            size,
            order,
            signed,
        } => {
            let bits = (*size * 8) as u32;
            let (min, max) = if *signed {
                (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
            } else {
                (0, (1i128 << bits) - 1)
            };
            let value = match number {
                Number::Int(i) => i,
                // Truncates toward zero and saturates at the i128 bounds.
                Number::Float(f) => f as i128,
            }
            .clamp(min, max);
            Ok(from_le(value.to_le_bytes()[..*size].to_vec(), *order))
        }
        TypeDef::Float { size, order } => {
            let value = match number {
                Number::Int(i) => i as f64,
                Number::Float(f) => f,
            };
            let le = match size {
                4 => (value as f32).to_le_bytes().to_vec(),
                8 => value.to_le_bytes().to_vec(),
                other => h5x_bail!("unsupported float width {}", other),
            };
            Ok(from_le(le, *order))
        }
        other => h5x_bail!("{:?} is not numeric", other),
    }
}

/// Convert a value stored as `from` into the representation of `to`.
pub(crate) fn convert(value: &Value, from: &TypeDef, to: &TypeDef) -> H5xResult<Value> {
    if from == to {
        return Ok(value.clone());
    }

    match (from, to) {
        (
            TypeDef::Integer { .. } | TypeDef::Float { .. },
            TypeDef::Integer { .. } | TypeDef::Float { .. },
        ) => Ok(Value::Fixed(write_number(
            read_number(value.bytes()?, from)?,
            to,
        )?)),
        (
            TypeDef::Bitfield {
                size: from_size,
                order: from_order,
            },
            TypeDef::Bitfield {
                size: to_size,
                order: to_order,
            },
        ) => {
            let mut le = to_le(&value.bytes()?[..*from_size], *from_order);
            le.resize(*to_size, 0);
            Ok(Value::Fixed(from_le(le, *to_order)))
        }
        (TypeDef::String(StrSize::Fixed(_)), TypeDef::String(StrSize::Fixed(to_size))) => {
            let mut bytes = value.bytes()?.to_vec();
            bytes.resize(*to_size, 0);
            Ok(Value::Fixed(bytes))
        }
        (TypeDef::String(StrSize::Variable), TypeDef::String(StrSize::Variable)) => {
            Ok(value.clone())
        }
        (
            TypeDef::Compound {
                members: from_members,
                ..
            },
            TypeDef::Compound {
                size: to_size,
                members: to_members,
            },
        ) => {
            let bytes = value.bytes()?;
            let mut out = vec![0u8; *to_size];
            for member in to_members {
                let Some(source) = from_members.iter().find(|m| m.name == member.name) else {
                    continue;
                };
                let raw = Value::Fixed(
                    bytes[source.offset..source.offset + source.ty.size()].to_vec(),
                );
                let converted = convert(&raw, &source.ty, &member.ty)?;
                let converted = converted.bytes()?;
                out[member.offset..member.offset + converted.len()].copy_from_slice(converted);
            }
            Ok(Value::Fixed(out))
        }
        (TypeDef::Vlen(from_base), TypeDef::Vlen(to_base)) => match value {
            Value::Seq(items) => Ok(Value::Seq(
                items
                    .iter()
                    .map(|item| convert(item, from_base, to_base))
                    .collect::<H5xResult<_>>()?,
            )),
            other => h5x_bail!("expected a sequence, found {:?}", other),
        },
        _ => h5x_bail!("no conversion path from {:?} to {:?}", from, to),
    }
}

#[cfg(test)]
mod test {
    use h5x_sys::H5T_builtin::*;
    use rstest::rstest;

    use super::*;

    fn fixed(bytes: &[u8]) -> Value {
        Value::Fixed(bytes.to_vec())
    }

    #[rstest]
    #[case(TypeDef::builtin(STD_I32LE), TypeDef::builtin(STD_I32BE), fixed(&(-2i32).to_le_bytes()), fixed(&(-2i32).to_be_bytes()))]
    #[case(TypeDef::builtin(STD_I16LE), TypeDef::builtin(STD_I64LE), fixed(&(-7i16).to_le_bytes()), fixed(&(-7i64).to_le_bytes()))]
    #[case(TypeDef::builtin(STD_I32LE), TypeDef::builtin(STD_U8LE), fixed(&300i32.to_le_bytes()), fixed(&[255]))]
    #[case(TypeDef::builtin(STD_I32LE), TypeDef::builtin(STD_U16LE), fixed(&(-5i32).to_le_bytes()), fixed(&0u16.to_le_bytes()))]
    #[case(TypeDef::builtin(IEEE_F64LE), TypeDef::builtin(IEEE_F32BE), fixed(&1.5f64.to_le_bytes()), fixed(&1.5f32.to_be_bytes()))]
    #[case(TypeDef::builtin(IEEE_F64LE), TypeDef::builtin(STD_I32LE), fixed(&(-2.75f64).to_le_bytes()), fixed(&(-2i32).to_le_bytes()))]
    #[case(TypeDef::builtin(STD_B8LE), TypeDef::builtin(STD_B16BE), fixed(&[0xa5]), fixed(&[0x00, 0xa5]))]
    fn numeric(
        #[case] from: TypeDef,
        #[case] to: TypeDef,
        #[case] input: Value,
        #[case] expected: Value,
    ) {
        assert_eq!(convert(&input, &from, &to).unwrap(), expected);
    }

    #[test]
    fn fixed_strings_pad_and_truncate() {
        let mut short = TypeDef::builtin(C_S1);
        short.set_size(3).unwrap();
        let mut long = TypeDef::builtin(C_S1);
        long.set_size(5).unwrap();

        assert_eq!(
            convert(&fixed(b"abc"), &short, &long).unwrap(),
            fixed(b"abc\0\0")
        );
        assert_eq!(
            convert(&fixed(b"hello"), &long, &short).unwrap(),
            fixed(b"hel")
        );
    }

    #[test]
    fn compounds_match_members_by_name() {
        let mut from = TypeDef::Compound {
            size: 12,
            members: Vec::new(),
        };
        from.insert("a", 0, TypeDef::builtin(STD_I32LE)).unwrap();
        from.insert("b", 4, TypeDef::builtin(IEEE_F64LE)).unwrap();
        let mut to = TypeDef::Compound {
            size: 12,
            members: Vec::new(),
        };
        to.insert("b", 0, TypeDef::builtin(IEEE_F64BE)).unwrap();
        to.insert("a", 8, TypeDef::builtin(STD_I32BE)).unwrap();

        let mut input = 7i32.to_le_bytes().to_vec();
        input.extend_from_slice(&0.5f64.to_le_bytes());
        let mut expected = 0.5f64.to_be_bytes().to_vec();
        expected.extend_from_slice(&7i32.to_be_bytes());

        assert_eq!(
            convert(&Value::Fixed(input), &from, &to).unwrap(),
            Value::Fixed(expected)
        );
    }

    #[test]
    fn sequences_convert_element_wise() {
        let from = TypeDef::Vlen(Box::new(TypeDef::builtin(STD_I16LE)));
        let to = TypeDef::Vlen(Box::new(TypeDef::builtin(STD_I64BE)));
        let input = Value::Seq(vec![fixed(&1i16.to_le_bytes()), fixed(&(-1i16).to_le_bytes())]);
        assert_eq!(
            convert(&input, &from, &to).unwrap(),
            Value::Seq(vec![fixed(&1i64.to_be_bytes()), fixed(&(-1i64).to_be_bytes())])
        );
    }

    #[test]
    fn no_path_between_strings_and_numbers() {
        let mut s = TypeDef::builtin(C_S1);
        s.set_size(4).unwrap();
        assert!(convert(&fixed(&[0; 4]), &s, &TypeDef::builtin(STD_I32LE)).is_err());
    }
}
