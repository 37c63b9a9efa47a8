//! Moving values in and out of caller-owned transfer buffers.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_void};
use std::ptr;

use h5x_error::{H5xResult, h5x_bail, h5x_err};
use h5x_sys::hvl_t;

use crate::convert::Value;
use crate::typedef::{StrSize, TypeDef};

const ALLOC_ALIGN: usize = 16;

/// Every allocation the engine has handed out and not yet had reclaimed.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    live: HashMap<usize, Layout>,
}

impl Ledger {
    pub(crate) fn alloc(&mut self, size: usize) -> H5xResult<*mut u8> {
        let layout = Layout::from_size_align(size.max(1), ALLOC_ALIGN)
            .map_err(|e| h5x_err!("invalid allocation of {} bytes: {}", size, e))?;
        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            h5x_bail!("allocation of {} bytes failed", size);
        }
        self.live.insert(ptr as usize, layout);
        Ok(ptr)
    }

    pub(crate) fn free(&mut self, ptr: *mut u8) -> H5xResult<()> {
        let Some(layout) = self.live.remove(&(ptr as usize)) else {
            h5x_bail!("pointer {:p} was not allocated by this engine", ptr);
        };
        // SAFETY: the pointer was returned by `alloc` with this layout and is freed only once.
        unsafe { dealloc(ptr, layout) };
        Ok(())
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.live.len()
    }
}

impl Drop for Ledger {
    fn drop(&mut self) {
        for (ptr, layout) in self.live.drain() {
            // SAFETY: every live entry is an allocation of ours that nobody reclaimed.
            unsafe { dealloc(ptr as *mut u8, layout) };
        }
    }
}

/// Read one element of type `ty` from `src`.
///
/// # Safety
///
/// `src` must point to `ty.size()` readable bytes, and every pointer embedded in a
/// variable-length element must be null or valid for what its length says.
pub(crate) unsafe fn decode(src: *const u8, ty: &TypeDef) -> H5xResult<Value> {
    match ty {
        TypeDef::Vlen(base) => {
            // SAFETY: `src` holds an hvl_t, possibly unaligned.
            let vl = unsafe { src.cast::<hvl_t>().read_unaligned() };
            if vl.len > 0 && vl.p.is_null() {
                h5x_bail!("sequence of length {} has a null pointer", vl.len);
            }
            let step = base.size();
            (0..vl.len)
                // SAFETY: the sequence holds `len` elements of `base`.
                .map(|i| unsafe { decode(vl.p.cast::<u8>().add(i * step), base) })
                .collect::<H5xResult<Vec<_>>>()
                .map(Value::Seq)
        }
        TypeDef::String(StrSize::Variable) => {
            // SAFETY: `src` holds a string pointer, possibly unaligned.
            let s = unsafe { src.cast::<*const c_char>().read_unaligned() };
            if s.is_null() {
                return Ok(Value::Str(None));
            }
            // SAFETY: non-null string pointers are NUL-terminated.
            let bytes = unsafe { CStr::from_ptr(s) }.to_bytes().to_vec();
            Ok(Value::Str(Some(bytes)))
        }
        fixed => {
            // SAFETY: `src` holds `size` readable bytes.
            let bytes = unsafe { std::slice::from_raw_parts(src, fixed.size()) };
            Ok(Value::Fixed(bytes.to_vec()))
        }
    }
}

/// Write one element of type `ty` to `dst`, allocating variable-length payloads.
///
/// # Safety
///
/// `dst` must point to `ty.size()` writable bytes.
pub(crate) unsafe fn encode(
    value: &Value,
    ty: &TypeDef,
    dst: *mut u8,
    ledger: &mut Ledger,
) -> H5xResult<()> {
    match (ty, value) {
        (TypeDef::Vlen(base), Value::Seq(items)) => {
            let vl = if items.is_empty() {
                hvl_t::default()
            } else {
                let step = base.size();
                let p = ledger.alloc(items.len() * step)?;
                let vl = hvl_t {
                    len: items.len(),
                    p: p.cast::<c_void>(),
                };
                for (i, item) in items.iter().enumerate() {
                    // SAFETY: `p` has room for `items.len()` elements of `base`.
                    if let Err(e) = unsafe { encode(item, base, p.add(i * step), ledger) } {
                        // Slots past the failure are still zeroed, so reclaiming skips them.
                        // SAFETY: `vl` is a readable hvl_t over our own allocation.
                        unsafe { reclaim((&raw const vl).cast(), ty, ledger)? };
                        return Err(e);
                    }
                }
                vl
            };
            // SAFETY: `dst` has room for an hvl_t.
            unsafe { dst.cast::<hvl_t>().write_unaligned(vl) };
        }
        (TypeDef::String(StrSize::Variable), Value::Str(s)) => {
            let s = match s {
                None => ptr::null_mut(),
                Some(bytes) => {
                    // The allocation is zeroed, so the terminator is already in place.
                    let p = ledger.alloc(bytes.len() + 1)?;
                    // SAFETY: `p` has room for the bytes plus the terminator.
                    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), p, bytes.len()) };
                    p.cast::<c_char>()
                }
            };
            // SAFETY: `dst` has room for a pointer.
            unsafe { dst.cast::<*mut c_char>().write_unaligned(s) };
        }
        (fixed, Value::Fixed(bytes)) if bytes.len() == fixed.size() => {
            // SAFETY: `dst` has room for `size` bytes.
            unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len()) };
        }
        (ty, value) => h5x_bail!("cannot store {:?} as {:?}", value, ty),
    }
    Ok(())
}

/// Free the payloads of one element previously written by [`encode`].
///
/// # Safety
///
/// `src` must point to `ty.size()` readable bytes.
pub(crate) unsafe fn reclaim(src: *const u8, ty: &TypeDef, ledger: &mut Ledger) -> H5xResult<()> {
    match ty {
        TypeDef::Vlen(base) => {
            // SAFETY: `src` holds an hvl_t.
            let vl = unsafe { src.cast::<hvl_t>().read_unaligned() };
            if vl.p.is_null() {
                return Ok(());
            }
            if base.is_variable() {
                let step = base.size();
                for i in 0..vl.len {
                    // SAFETY: the sequence holds `len` elements of `base`.
                    unsafe { reclaim(vl.p.cast::<u8>().add(i * step), base, ledger)? };
                }
            }
            ledger.free(vl.p.cast())
        }
        TypeDef::String(StrSize::Variable) => {
            // SAFETY: `src` holds a string pointer.
            let s = unsafe { src.cast::<*mut c_char>().read_unaligned() };
            if s.is_null() {
                return Ok(());
            }
            ledger.free(s.cast())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use h5x_sys::H5T_builtin;

    use super::*;

    #[test]
    fn sequences_round_trip_through_the_ledger() {
        let ty = TypeDef::Vlen(Box::new(TypeDef::builtin(H5T_builtin::NATIVE_INT16)));
        let value = Value::Seq(vec![
            Value::Fixed(3i16.to_ne_bytes().to_vec()),
            Value::Fixed(4i16.to_ne_bytes().to_vec()),
        ]);
        let mut ledger = Ledger::default();
        let mut slot = hvl_t::default();
        let dst = (&raw mut slot).cast::<u8>();

        unsafe { encode(&value, &ty, dst, &mut ledger) }.unwrap();
        assert_eq!(slot.len, 2);
        assert_eq!(ledger.outstanding(), 1);
        assert_eq!(unsafe { decode(dst, &ty) }.unwrap(), value);

        unsafe { reclaim(dst, &ty, &mut ledger) }.unwrap();
        assert_eq!(ledger.outstanding(), 0);
        // A second reclaim sees a pointer the ledger no longer knows.
        assert!(unsafe { reclaim(dst, &ty, &mut ledger) }.is_err());
    }

    #[test]
    fn failed_nested_encodes_release_their_payloads() {
        let ty = TypeDef::Vlen(Box::new(TypeDef::String(StrSize::Variable)));
        let value = Value::Seq(vec![
            Value::Str(Some(b"kept".to_vec())),
            Value::Str(None),
            Value::Fixed(vec![1, 2]),
        ]);
        let mut ledger = Ledger::default();
        let mut slot = hvl_t::default();

        assert!(unsafe { encode(&value, &ty, (&raw mut slot).cast(), &mut ledger) }.is_err());
        assert!(slot.p.is_null());
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn empty_sequences_and_null_strings_allocate_nothing() {
        let mut ledger = Ledger::default();
        let mut slot = hvl_t::default();
        let vlen = TypeDef::Vlen(Box::new(TypeDef::builtin(H5T_builtin::NATIVE_DOUBLE)));
        unsafe { encode(&Value::Seq(vec![]), &vlen, (&raw mut slot).cast(), &mut ledger) }
            .unwrap();
        assert!(slot.p.is_null());

        let mut s: *mut c_char = ptr::null_mut();
        let string = TypeDef::String(StrSize::Variable);
        unsafe { encode(&Value::Str(None), &string, (&raw mut s).cast(), &mut ledger) }.unwrap();
        assert!(s.is_null());
        assert_eq!(ledger.outstanding(), 0);
    }
}
