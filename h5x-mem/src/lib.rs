#![deny(missing_docs)]

//! An in-memory storage engine implementing [`NativeEngine`].
//!
//! Files live in memory for the lifetime of the engine and are found again by name, so a file
//! can be closed and reopened. Predefined types are immutable and refuse to be closed.
//! Variable-length reads allocate through a ledger so tests can check that every payload the
//! engine handed out was reclaimed exactly once.

mod convert;
mod raw;
mod space;
mod state;
mod storage;
mod typedef;

use std::ffi::{CStr, c_void};

use h5x_error::{H5xResult, h5x_err};
use h5x_sys::*;
use log::debug;
use parking_lot::Mutex;

use crate::state::{Object, State};
use crate::typedef::{Order, TypeDef};

/// The reference engine.
#[derive(Debug)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Create an engine with no files.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    /// Number of variable-length payloads handed out by reads and not reclaimed yet.
    pub fn outstanding_allocations(&self) -> usize {
        self.state.lock().ledger.outstanding()
    }

    /// Number of open handles, not counting predefined types.
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles()
    }

    /// Number of close calls that were refused, e.g. on a predefined type.
    pub fn failed_closes(&self) -> usize {
        self.state.lock().failed_closes
    }

    fn call<T>(&self, op: &str, failure: T, f: impl FnOnce(&mut State) -> H5xResult<T>) -> T {
        let mut state = self.state.lock();
        f(&mut state).unwrap_or_else(|err| {
            debug!("{op} failed: {err}");
            failure
        })
    }

    fn status(&self, op: &str, f: impl FnOnce(&mut State) -> H5xResult<()>) -> herr_t {
        self.call(op, -1, |state| f(state).map(|()| 0))
    }
}

fn utf8(name: &CStr) -> H5xResult<&str> {
    name.to_str()
        .map_err(|e| h5x_err!("name is not valid UTF-8: {}", e))
}

impl NativeEngine for MemoryEngine {
    fn builtin_type(&self, which: H5T_builtin) -> hid_t {
        self.state.lock().builtin(which)
    }

    fn file_create(&self, name: &CStr, flags: u32) -> hid_t {
        self.call("H5Fcreate", -1, |s| s.file_create(utf8(name)?, flags))
    }

    fn file_open(&self, name: &CStr, flags: u32) -> hid_t {
        self.call("H5Fopen", -1, |s| s.file_open(utf8(name)?, flags))
    }

    fn file_close(&self, file: hid_t) -> herr_t {
        self.status("H5Fclose", |s| {
            s.close(file, |o| matches!(o, Object::File(_)))
        })
    }

    fn group_create(&self, loc: hid_t, name: &CStr) -> hid_t {
        self.call("H5Gcreate", -1, |s| s.group_create(loc, utf8(name)?))
    }

    fn group_open(&self, loc: hid_t, name: &CStr) -> hid_t {
        self.call("H5Gopen", -1, |s| s.group_open(loc, utf8(name)?))
    }

    fn group_close(&self, group: hid_t) -> herr_t {
        self.status("H5Gclose", |s| {
            s.close(group, |o| matches!(o, Object::Group(_)))
        })
    }

    fn link_exists(&self, loc: hid_t, name: &CStr) -> htri_t {
        self.call("H5Lexists", -1, |s| {
            s.link_exists(loc, utf8(name)?).map(htri_t::from)
        })
    }

    fn type_create(&self, class: H5T_class_t, size: usize) -> hid_t {
        self.call("H5Tcreate", -1, |s| {
            let def = TypeDef::create(class, size)?;
            Ok(s.register(Object::Type {
                def,
                builtin: false,
            }))
        })
    }

    fn type_copy(&self, ty: hid_t) -> hid_t {
        self.call("H5Tcopy", -1, |s| {
            let def = s.type_def(ty)?.clone();
            Ok(s.register(Object::Type {
                def,
                builtin: false,
            }))
        })
    }

    fn type_close(&self, ty: hid_t) -> herr_t {
        self.status("H5Tclose", |s| {
            s.close(ty, |o| matches!(o, Object::Type { .. }))
        })
    }

    fn type_get_class(&self, ty: hid_t) -> H5T_class_t {
        self.call("H5Tget_class", H5T_class_t::H5T_NO_CLASS, |s| {
            Ok(s.type_def(ty)?.class())
        })
    }

    fn type_get_size(&self, ty: hid_t) -> usize {
        self.call("H5Tget_size", 0, |s| Ok(s.type_def(ty)?.size()))
    }

    fn type_get_order(&self, ty: hid_t) -> H5T_order_t {
        self.call("H5Tget_order", H5T_order_t::H5T_ORDER_ERROR, |s| {
            Ok(s.type_def(ty)?.order())
        })
    }

    fn type_get_sign(&self, ty: hid_t) -> H5T_sign_t {
        self.call("H5Tget_sign", H5T_sign_t::H5T_SGN_ERROR, |s| {
            Ok(s.type_def(ty)?.sign())
        })
    }

    fn type_set_size(&self, ty: hid_t, size: usize) -> herr_t {
        self.status("H5Tset_size", |s| s.type_def_mut(ty)?.set_size(size))
    }

    fn type_set_order(&self, ty: hid_t, order: H5T_order_t) -> herr_t {
        self.status("H5Tset_order", |s| {
            let order = Order::from_native(order)?;
            s.type_def_mut(ty)?.set_order(order)
        })
    }

    fn type_insert(&self, compound: hid_t, name: &CStr, offset: usize, field: hid_t) -> herr_t {
        self.status("H5Tinsert", |s| {
            let field = s.type_def(field)?.clone();
            s.type_def_mut(compound)?
                .insert(utf8(name)?, offset, field)
        })
    }

    fn type_get_nmembers(&self, compound: hid_t) -> i32 {
        self.call("H5Tget_nmembers", -1, |s| match s.type_def(compound)? {
            TypeDef::Compound { members, .. } => Ok(members.len() as i32),
            other => Err(h5x_err!("{:?} has no members", other)),
        })
    }

    fn type_get_member_offset(&self, compound: hid_t, index: u32) -> usize {
        self.call("H5Tget_member_offset", 0, |s| match s.type_def(compound)? {
            TypeDef::Compound { members, .. } => members
                .get(index as usize)
                .map(|m| m.offset)
                .ok_or_else(|| h5x_err!("member index {} out of range", index)),
            other => Err(h5x_err!("{:?} has no members", other)),
        })
    }

    fn type_vlen_create(&self, base: hid_t) -> hid_t {
        self.call("H5Tvlen_create", -1, |s| {
            let base = s.type_def(base)?.clone();
            Ok(s.register(Object::Type {
                def: TypeDef::Vlen(Box::new(base)),
                builtin: false,
            }))
        })
    }

    fn type_is_variable_str(&self, ty: hid_t) -> htri_t {
        self.call("H5Tis_variable_str", -1, |s| {
            Ok(htri_t::from(matches!(
                s.type_def(ty)?,
                TypeDef::String(typedef::StrSize::Variable)
            )))
        })
    }

    fn space_create_simple(&self, dims: &[hsize_t], maxdims: Option<&[hsize_t]>) -> hid_t {
        self.call("H5Screate_simple", -1, |s| {
            let space = space::Space::new(dims, maxdims)?;
            Ok(s.register(Object::Space(space)))
        })
    }

    fn space_close(&self, space: hid_t) -> herr_t {
        self.status("H5Sclose", |s| {
            s.close(space, |o| matches!(o, Object::Space(_)))
        })
    }

    fn space_get_ndims(&self, space: hid_t) -> i32 {
        self.call("H5Sget_simple_extent_ndims", -1, |s| {
            Ok(s.space(space)?.rank() as i32)
        })
    }

    fn space_get_dims(
        &self,
        space: hid_t,
        dims: &mut [hsize_t],
        maxdims: Option<&mut [hsize_t]>,
    ) -> i32 {
        self.call("H5Sget_simple_extent_dims", -1, |s| {
            let space = s.space(space)?;
            let rank = space.rank();
            if dims.len() < rank || maxdims.as_ref().is_some_and(|m| m.len() < rank) {
                return Err(h5x_err!("output buffers are shorter than rank {}", rank));
            }
            dims[..rank].copy_from_slice(&space.dims);
            if let Some(maxdims) = maxdims {
                maxdims[..rank].copy_from_slice(&space.maxdims);
            }
            Ok(rank as i32)
        })
    }

    fn space_select_hyperslab(
        &self,
        space: hid_t,
        op: H5S_seloper_t,
        start: &[hsize_t],
        stride: Option<&[hsize_t]>,
        count: &[hsize_t],
        block: Option<&[hsize_t]>,
    ) -> herr_t {
        self.status("H5Sselect_hyperslab", |s| {
            s.space_mut(space)?
                .select_hyperslab(op, start, stride, count, block)
        })
    }

    fn space_select_all(&self, space: hid_t) -> herr_t {
        self.status("H5Sselect_all", |s| {
            s.space_mut(space)?.select_all();
            Ok(())
        })
    }

    fn space_select_none(&self, space: hid_t) -> herr_t {
        self.status("H5Sselect_none", |s| {
            s.space_mut(space)?.select_none();
            Ok(())
        })
    }

    fn space_select_valid(&self, space: hid_t) -> htri_t {
        self.call("H5Sselect_valid", -1, |s| {
            Ok(htri_t::from(s.space(space)?.is_valid()))
        })
    }

    fn space_get_select_npoints(&self, space: hid_t) -> hssize_t {
        self.call("H5Sget_select_npoints", -1, |s| {
            Ok(s.space(space)?.npoints() as hssize_t)
        })
    }

    fn dataset_create(&self, loc: hid_t, name: &CStr, ty: hid_t, space: hid_t) -> hid_t {
        self.call("H5Dcreate", -1, |s| {
            s.dataset_create(loc, utf8(name)?, ty, space)
        })
    }

    fn dataset_open(&self, loc: hid_t, name: &CStr) -> hid_t {
        self.call("H5Dopen", -1, |s| s.dataset_open(loc, utf8(name)?))
    }

    fn dataset_close(&self, dataset: hid_t) -> herr_t {
        self.status("H5Dclose", |s| {
            s.close(dataset, |o| matches!(o, Object::Dataset(_)))
        })
    }

    fn dataset_get_type(&self, dataset: hid_t) -> hid_t {
        self.call("H5Dget_type", -1, |s| s.get_type(dataset))
    }

    fn dataset_get_space(&self, dataset: hid_t) -> hid_t {
        self.call("H5Dget_space", -1, |s| s.get_space(dataset))
    }

    unsafe fn dataset_read(
        &self,
        dataset: hid_t,
        mem_type: hid_t,
        mem_space: hid_t,
        file_space: hid_t,
        buf: *mut c_void,
    ) -> herr_t {
        self.status("H5Dread", |s| {
            // SAFETY: forwarded to the caller.
            unsafe { s.read(dataset, mem_type, mem_space, file_space, buf.cast()) }
        })
    }

    unsafe fn dataset_write(
        &self,
        dataset: hid_t,
        mem_type: hid_t,
        mem_space: hid_t,
        file_space: hid_t,
        buf: *const c_void,
    ) -> herr_t {
        self.status("H5Dwrite", |s| {
            // SAFETY: forwarded to the caller.
            unsafe { s.write(dataset, mem_type, mem_space, file_space, buf.cast()) }
        })
    }

    unsafe fn dataset_vlen_reclaim(&self, ty: hid_t, space: hid_t, buf: *mut c_void) -> herr_t {
        self.status("H5Dvlen_reclaim", |s| {
            // SAFETY: forwarded to the caller.
            unsafe { s.vlen_reclaim(ty, space, buf.cast()) }
        })
    }

    fn attr_create(&self, obj: hid_t, name: &CStr, ty: hid_t, space: hid_t) -> hid_t {
        self.call("H5Acreate", -1, |s| s.attr_create(obj, utf8(name)?, ty, space))
    }

    fn attr_open(&self, obj: hid_t, name: &CStr) -> hid_t {
        self.call("H5Aopen", -1, |s| s.attr_open(obj, utf8(name)?))
    }

    fn attr_close(&self, attr: hid_t) -> herr_t {
        self.status("H5Aclose", |s| {
            s.close(attr, |o| matches!(o, Object::Attr { .. }))
        })
    }

    fn attr_get_type(&self, attr: hid_t) -> hid_t {
        self.call("H5Aget_type", -1, |s| s.get_type(attr))
    }

    fn attr_get_space(&self, attr: hid_t) -> hid_t {
        self.call("H5Aget_space", -1, |s| s.get_space(attr))
    }

    unsafe fn attr_read(&self, attr: hid_t, mem_type: hid_t, buf: *mut c_void) -> herr_t {
        self.status("H5Aread", |s| {
            // SAFETY: forwarded to the caller.
            unsafe { s.read(attr, mem_type, H5S_ALL, H5S_ALL, buf.cast()) }
        })
    }

    unsafe fn attr_write(&self, attr: hid_t, mem_type: hid_t, buf: *const c_void) -> herr_t {
        self.status("H5Awrite", |s| {
            // SAFETY: forwarded to the caller.
            unsafe { s.write(attr, mem_type, H5S_ALL, H5S_ALL, buf.cast()) }
        })
    }
}

#[cfg(test)]
mod tests;
