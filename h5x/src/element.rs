//! Element kinds and the strategy each one uses to move through a transfer.

use std::ffi::{CStr, c_char};
use std::fmt::{Display, Formatter};

use h5x_buffer::{BufferMut, CStringArena, buffer_mut};
use h5x_dtype::{Bits8, Bits16, Bits32, Bits64, H5Type, TypeClass, TypeDescriptor};
use h5x_error::{H5xResult, h5x_bail};
use h5x_sys::hvl_t;

use crate::datatype::Datatype;
use crate::transfer::Transfer;
use crate::vlen::VlenBuffer;

/// How elements of a type are laid out in a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Fixed-size values, copied as they are.
    Value,
    /// Text, stored either as fixed-width NUL-padded bytes or as one pointer per element.
    String,
    /// Sequences of fixed-size values, one `(len, ptr)` record per element.
    VarLenArray,
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Value => write!(f, "value"),
            ElementKind::String => write!(f, "string"),
            ElementKind::VarLenArray => write!(f, "vlen"),
        }
    }
}

/// A Rust type that can be an element of a dataset or attribute.
///
/// Implemented for every [`H5Type`] (primitives, bitfields and derived records), for [`String`],
/// and for `Vec<T>` of any [`H5Type`]. The element kind is fixed per type, so dispatch happens
/// once per transfer and never per element.
pub trait H5Element: Clone + 'static {
    /// The layout of this element type.
    const KIND: ElementKind;

    /// The descriptor a new dataset of this element type is created with.
    fn descriptor() -> H5xResult<TypeDescriptor>;

    /// Whether data stored with a type of `class` can be read into this element type.
    fn accepts(class: TypeClass) -> bool;

    /// Read [`Transfer::len`] elements.
    fn read_elements(transfer: &Transfer<'_>) -> H5xResult<Vec<Self>>;

    /// Write exactly [`Transfer::len`] elements.
    fn write_elements(transfer: &Transfer<'_>, values: &[Self]) -> H5xResult<()>;
}

/// Whether a fixed-size value type can read data stored with a type of `class`. Integers and
/// floats convert into each other.
pub fn value_accepts<T: H5Type>(class: TypeClass) -> bool {
    let Ok(own) = T::type_descriptor() else {
        return false;
    };
    let numeric = |c: TypeClass| matches!(c, TypeClass::Integer | TypeClass::Float);
    own.class() == class || (numeric(own.class()) && numeric(class))
}

/// Fail with [`H5xError::UnsupportedType`](h5x_error::H5xError::UnsupportedType) if `T` cannot
/// transfer data stored as `stored`.
pub(crate) fn ensure_accepts<T: H5Element>(
    stored: &Datatype,
    what: &str,
    name: &str,
) -> H5xResult<()> {
    let class = stored.class()?;
    if !T::accepts(class) {
        h5x_bail!(
            UnsupportedType: "{} elements cannot transfer {} data of {} {}",
            T::KIND,
            class,
            what,
            name
        );
    }
    Ok(())
}

/// Read fixed-size values straight into an aligned buffer.
pub fn read_values<T: H5Type>(transfer: &Transfer<'_>) -> H5xResult<Vec<T>> {
    let mem_type = transfer.library().resolve(&T::type_descriptor()?)?;
    // SAFETY: the all-zero bit pattern is a valid value of every H5Type.
    let mut buffer = unsafe { BufferMut::<T>::zeroed(transfer.len()) };
    // SAFETY: the buffer holds `len` elements whose layout is the memory type.
    unsafe { transfer.read_raw(&mem_type, buffer.as_mut_ptr().cast())? };
    Ok(buffer.to_vec())
}

/// Write fixed-size values from an aligned copy that stays put for the call.
pub fn write_values<T: H5Type>(transfer: &Transfer<'_>, values: &[T]) -> H5xResult<()> {
    let mem_type = transfer.library().resolve(&T::type_descriptor()?)?;
    let buffer = BufferMut::copy_from(values);
    // SAFETY: the buffer holds `len` elements whose layout is the memory type.
    unsafe { transfer.write_raw(&mem_type, buffer.as_ptr().cast()) }
}

crate::impl_value_element!(
    i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, Bits8, Bits16, Bits32, Bits64
);

impl H5Element for String {
    const KIND: ElementKind = ElementKind::String;

    fn descriptor() -> H5xResult<TypeDescriptor> {
        Ok(TypeDescriptor::VarLenString)
    }

    fn accepts(class: TypeClass) -> bool {
        class == TypeClass::String
    }

    fn read_elements(transfer: &Transfer<'_>) -> H5xResult<Vec<Self>> {
        let stored = transfer.stored_type();
        if stored.is_variable_string()? {
            read_variable_strings(transfer)
        } else {
            read_fixed_strings(transfer, stored.size()?)
        }
    }

    fn write_elements(transfer: &Transfer<'_>, values: &[Self]) -> H5xResult<()> {
        let stored = transfer.stored_type();
        if stored.is_variable_string()? {
            write_variable_strings(transfer, values)
        } else {
            write_fixed_strings(transfer, values, stored.size()?)
        }
    }
}

fn read_fixed_strings(transfer: &Transfer<'_>, size: usize) -> H5xResult<Vec<String>> {
    let mem_type = transfer
        .library()
        .resolve(&TypeDescriptor::FixedString { size })?;
    let mut buffer = buffer_mut![0u8; transfer.len() * size];
    // SAFETY: the buffer holds `len` strings of `size` bytes.
    unsafe { transfer.read_raw(&mem_type, buffer.as_mut_ptr().cast())? };
    buffer.chunks(size).map(decode_fixed).collect()
}

/// Text of a NUL-padded field. A field without any NUL is used in full.
fn decode_fixed(bytes: &[u8]) -> H5xResult<String> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    Ok(std::str::from_utf8(&bytes[..end])?.to_owned())
}

fn write_fixed_strings(transfer: &Transfer<'_>, values: &[String], size: usize) -> H5xResult<()> {
    let mem_type = transfer
        .library()
        .resolve(&TypeDescriptor::FixedString { size })?;
    let mut buffer = buffer_mut![0u8; values.len() * size];
    for (field, value) in buffer.chunks_mut(size).zip(values) {
        let bytes = value.as_bytes();
        if bytes.len() > size {
            h5x_bail!(
                "string of {} bytes does not fit a fixed-length field of {} bytes",
                bytes.len(),
                size
            );
        }
        if bytes.contains(&0) {
            h5x_bail!("fixed-length strings cannot contain NUL bytes");
        }
        field[..bytes.len()].copy_from_slice(bytes);
    }
    // SAFETY: the buffer holds `len` strings of `size` bytes.
    unsafe { transfer.write_raw(&mem_type, buffer.as_ptr().cast()) }
}

fn read_variable_strings(transfer: &Transfer<'_>) -> H5xResult<Vec<String>> {
    let mem_type = transfer.library().resolve(&TypeDescriptor::VarLenString)?;
    let raw = VlenBuffer::<*mut c_char>::read(transfer, &mem_type)?;
    let values = raw
        .slots()
        .iter()
        .map(|s| {
            if s.is_null() {
                // Never written.
                return Ok(String::new());
            }
            // SAFETY: non-null slots point to NUL-terminated strings owned by the engine
            // until the buffer is reclaimed.
            Ok(unsafe { CStr::from_ptr(*s) }.to_str()?.to_owned())
        })
        .collect::<H5xResult<Vec<_>>>()?;
    raw.reclaim()?;
    Ok(values)
}

fn write_variable_strings(transfer: &Transfer<'_>, values: &[String]) -> H5xResult<()> {
    let mem_type = transfer.library().resolve(&TypeDescriptor::VarLenString)?;
    let arena = CStringArena::try_from_iter(values)?;
    // SAFETY: the arena holds `len` pointers to NUL-terminated strings, alive until it drops.
    unsafe { transfer.write_raw(&mem_type, arena.as_ptr().cast()) }
}

impl<T: H5Type> H5Element for Vec<T> {
    const KIND: ElementKind = ElementKind::VarLenArray;

    fn descriptor() -> H5xResult<TypeDescriptor> {
        Ok(TypeDescriptor::VarLenArray(Box::new(T::type_descriptor()?)))
    }

    fn accepts(class: TypeClass) -> bool {
        class == TypeClass::VarLen
    }

    fn read_elements(transfer: &Transfer<'_>) -> H5xResult<Vec<Self>> {
        let mem_type = transfer.library().resolve(&Self::descriptor()?)?;
        let raw = VlenBuffer::<hvl_t>::read(transfer, &mem_type)?;
        let values = raw
            .slots()
            .iter()
            .map(|vl| {
                if vl.len == 0 {
                    return Ok(Vec::new());
                }
                if vl.p.is_null() {
                    h5x_bail!("sequence of {} elements has no payload", vl.len);
                }
                let base = vl.p.cast::<T>().cast_const();
                // SAFETY: the engine allocated `len` elements of `T` at `p`, which stay alive
                // until the buffer is reclaimed.
                Ok((0..vl.len)
                    .map(|i| unsafe { base.add(i).read_unaligned() })
                    .collect())
            })
            .collect::<H5xResult<Vec<_>>>()?;
        raw.reclaim()?;
        Ok(values)
    }

    fn write_elements(transfer: &Transfer<'_>, values: &[Self]) -> H5xResult<()> {
        let mem_type = transfer.library().resolve(&Self::descriptor()?)?;
        let records = values
            .iter()
            .map(|v| hvl_t {
                len: v.len(),
                p: if v.is_empty() {
                    std::ptr::null_mut()
                } else {
                    v.as_ptr().cast_mut().cast()
                },
            })
            .collect::<BufferMut<_>>();
        // SAFETY: every record points into `values`, which outlives the call.
        unsafe { transfer.write_raw(&mem_type, records.as_ptr().cast()) }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"abc\0\0", "abc")]
    #[case(b"abcde", "abcde")]
    #[case(b"\0\0\0", "")]
    fn fixed_fields_stop_at_the_first_nul(#[case] bytes: &[u8], #[case] text: &str) {
        assert_eq!(decode_fixed(bytes).unwrap(), text);
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        assert!(decode_fixed(&[0xff, 0xfe]).is_err());
    }

    #[rstest]
    #[case(TypeClass::Integer, true)]
    #[case(TypeClass::Float, true)]
    #[case(TypeClass::String, false)]
    #[case(TypeClass::VarLen, false)]
    fn numbers_read_numbers(#[case] class: TypeClass, #[case] accepted: bool) {
        assert_eq!(i32::accepts(class), accepted);
    }

    #[test]
    fn kinds() {
        assert_eq!(<u8 as H5Element>::KIND, ElementKind::Value);
        assert_eq!(String::KIND, ElementKind::String);
        assert_eq!(<Vec<f64>>::KIND, ElementKind::VarLenArray);
        assert!(Bits8::accepts(TypeClass::Bitfield));
        assert_eq!(<Vec<f64>>::descriptor().unwrap().to_string(), "vlen<f64native>");
    }
}
