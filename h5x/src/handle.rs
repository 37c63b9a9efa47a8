//! Ownership of engine handles.

use std::ffi::CString;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use h5x_error::{H5xResult, h5x_err};
use h5x_sys::{NativeEngine, herr_t, hid_t, htri_t};
use log::{debug, warn};

/// The kind of engine object behind a handle, which decides how it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A file.
    File,
    /// A group inside a file.
    Group,
    /// A type descriptor.
    Datatype,
    /// A dataspace.
    Dataspace,
    /// A dataset.
    Dataset,
    /// An attribute.
    Attribute,
}

impl HandleKind {
    fn close_op(self) -> &'static str {
        match self {
            HandleKind::File => "H5Fclose",
            HandleKind::Group => "H5Gclose",
            HandleKind::Datatype => "H5Tclose",
            HandleKind::Dataspace => "H5Sclose",
            HandleKind::Dataset => "H5Dclose",
            HandleKind::Attribute => "H5Aclose",
        }
    }
}

/// Whether dropping a handle releases the engine object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created or opened by us, closed exactly once.
    Owned,
    /// Predefined by the engine and shared. Never closed.
    Borrowed,
}

/// One engine handle.
///
/// An owned handle is closed by [`Handle::close`] or, failing that, when it is dropped. Closing
/// is idempotent: only the first call reaches the engine.
pub struct Handle {
    engine: Arc<dyn NativeEngine>,
    id: hid_t,
    kind: HandleKind,
    ownership: Ownership,
    closed: bool,
}

impl Handle {
    /// Take ownership of a freshly returned id. Negative ids are reported as the failure of `op`.
    pub(crate) fn owned(
        engine: &Arc<dyn NativeEngine>,
        kind: HandleKind,
        op: &'static str,
        id: hid_t,
    ) -> H5xResult<Self> {
        let id = check_id(op, id)?;
        debug!("{op} returned {kind:?} handle {id}");
        Ok(Self {
            engine: engine.clone(),
            id,
            kind,
            ownership: Ownership::Owned,
            closed: false,
        })
    }

    pub(crate) fn borrowed(engine: &Arc<dyn NativeEngine>, kind: HandleKind, id: hid_t) -> Self {
        Self {
            engine: engine.clone(),
            id,
            kind,
            ownership: Ownership::Borrowed,
            closed: false,
        }
    }

    /// The raw engine id.
    pub fn id(&self) -> hid_t {
        self.id
    }

    /// What kind of object the handle refers to.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Whether this handle releases its object.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether [`Handle::close`] already ran.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.engine
    }

    /// Release the engine object. Borrowed handles and handles that were already closed are
    /// left alone.
    pub fn close(&mut self) -> H5xResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.ownership == Ownership::Borrowed {
            return Ok(());
        }

        let op = self.kind.close_op();
        let status = match self.kind {
            HandleKind::File => self.engine.file_close(self.id),
            HandleKind::Group => self.engine.group_close(self.id),
            HandleKind::Datatype => self.engine.type_close(self.id),
            HandleKind::Dataspace => self.engine.space_close(self.id),
            HandleKind::Dataset => self.engine.dataset_close(self.id),
            HandleKind::Attribute => self.engine.attr_close(self.id),
        };
        debug!("{op} on {:?} handle {}", self.kind, self.id);
        check_status(op, status)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("implicit close of {:?} handle {} failed: {err}", self.kind, self.id);
        }
    }
}

impl Debug for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("ownership", &self.ownership)
            .field("closed", &self.closed)
            .finish()
    }
}

pub(crate) fn check_id(op: &'static str, id: hid_t) -> H5xResult<hid_t> {
    if id < 0 {
        return Err(h5x_err!(Native: op, id));
    }
    Ok(id)
}

pub(crate) fn check_status(op: &'static str, status: herr_t) -> H5xResult<()> {
    if status < 0 {
        return Err(h5x_err!(Native: op, status));
    }
    Ok(())
}

pub(crate) fn check_tri(op: &'static str, value: htri_t) -> H5xResult<bool> {
    if value < 0 {
        return Err(h5x_err!(Native: op, value));
    }
    Ok(value > 0)
}

/// An object or link name as the engine expects it.
pub(crate) fn c_name(name: &str) -> H5xResult<CString> {
    CString::new(name).map_err(|e| {
        h5x_err!(
            "name `{}` contains a NUL byte at {}",
            name.escape_debug(),
            e.nul_position()
        )
    })
}

#[cfg(test)]
mod tests {
    use h5x_mem::MemoryEngine;
    use h5x_sys::H5T_builtin;

    use super::*;

    fn engine() -> (Arc<MemoryEngine>, Arc<dyn NativeEngine>) {
        let mem = Arc::new(MemoryEngine::new());
        let engine: Arc<dyn NativeEngine> = mem.clone();
        (mem, engine)
    }

    #[test]
    fn close_is_idempotent() {
        let (mem, engine) = engine();
        let id = engine.space_create_simple(&[4], None);
        let mut handle = Handle::owned(&engine, HandleKind::Dataspace, "H5Screate_simple", id)
            .unwrap();
        assert_eq!(mem.open_handles(), 1);

        handle.close().unwrap();
        handle.close().unwrap();
        assert!(handle.is_closed());
        drop(handle);
        assert_eq!(mem.open_handles(), 0);
        assert_eq!(mem.failed_closes(), 0);
    }

    #[test]
    fn borrowed_handles_are_never_closed() {
        let (mem, engine) = engine();
        let id = engine.builtin_type(H5T_builtin::NATIVE_INT32);
        let mut handle = Handle::borrowed(&engine, HandleKind::Datatype, id);
        handle.close().unwrap();
        drop(handle);
        assert_eq!(mem.failed_closes(), 0);
    }

    #[test]
    fn negative_ids_are_native_errors() {
        let (_, engine) = engine();
        let err = Handle::owned(&engine, HandleKind::Dataset, "H5Dopen", -1).unwrap_err();
        assert_eq!(err.native_status(), Some(-1));
        assert!(err.to_string().contains("H5Dopen"));
    }

    #[test]
    fn names_with_nul_are_rejected() {
        assert!(c_name("a\0b").is_err());
        assert_eq!(c_name("a/b").unwrap().as_bytes(), b"a/b");
    }
}
