use std::ffi::c_void;

use h5x_error::{Direction, H5xError, H5xResult};
use h5x_sys::{herr_t, hid_t};
use log::trace;

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::library::Library;

/// The engine object on the file side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Dataset(hid_t),
    Attribute(hid_t),
}

/// One read or write call against a dataset or attribute.
///
/// Element strategies receive a transfer, pick the memory-side type for their element kind,
/// and move a buffer of [`Transfer::len`] elements through it.
#[derive(Debug)]
pub struct Transfer<'a> {
    lib: &'a Library,
    target: Target,
    stored: &'a Datatype,
    mem_space: &'a Dataspace,
    file_space: &'a Dataspace,
    extent: &'a Dataspace,
    len: usize,
}

impl<'a> Transfer<'a> {
    pub(crate) fn new(
        lib: &'a Library,
        target: Target,
        stored: &'a Datatype,
        mem_space: &'a Dataspace,
        file_space: &'a Dataspace,
        extent: &'a Dataspace,
        len: usize,
    ) -> Self {
        Self {
            lib,
            target,
            stored,
            mem_space,
            file_space,
            extent,
            len,
        }
    }

    /// The library the target belongs to.
    pub fn library(&self) -> &Library {
        self.lib
    }

    /// The type the target was created with.
    pub fn stored_type(&self) -> &Datatype {
        self.stored
    }

    /// Number of elements in the memory buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the memory buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The dataspace that describes where variable-length payloads landed in a read buffer:
    /// the memory space if explicit, else the file space if explicit, else the whole extent.
    pub(crate) fn reclaim_space(&self) -> &Dataspace {
        if !self.mem_space.is_all() {
            self.mem_space
        } else if !self.file_space.is_all() {
            self.file_space
        } else {
            self.extent
        }
    }

    /// Fill `buf` from the target.
    ///
    /// # Safety
    ///
    /// `buf` must point to [`Transfer::len`] writable elements of `mem_type`.
    pub(crate) unsafe fn read_raw(&self, mem_type: &Datatype, buf: *mut c_void) -> H5xResult<()> {
        self.trace(Direction::Read, mem_type);
        let engine = self.lib.engine();
        // SAFETY: forwarded to the caller.
        let status = unsafe {
            match self.target {
                Target::Dataset(id) => engine.dataset_read(
                    id,
                    mem_type.id(),
                    self.mem_space.id(),
                    self.file_space.id(),
                    buf,
                ),
                Target::Attribute(id) => engine.attr_read(id, mem_type.id(), buf),
            }
        };
        check_transfer(Direction::Read, status)
    }

    /// Send `buf` to the target.
    ///
    /// # Safety
    ///
    /// `buf` must point to [`Transfer::len`] readable elements of `mem_type`.
    pub(crate) unsafe fn write_raw(&self, mem_type: &Datatype, buf: *const c_void) -> H5xResult<()> {
        self.trace(Direction::Write, mem_type);
        let engine = self.lib.engine();
        // SAFETY: forwarded to the caller.
        let status = unsafe {
            match self.target {
                Target::Dataset(id) => engine.dataset_write(
                    id,
                    mem_type.id(),
                    self.mem_space.id(),
                    self.file_space.id(),
                    buf,
                ),
                Target::Attribute(id) => engine.attr_write(id, mem_type.id(), buf),
            }
        };
        check_transfer(Direction::Write, status)
    }

    fn trace(&self, direction: Direction, mem_type: &Datatype) {
        trace!(
            "{direction} of {} elements of type {} on {:?} (memory space {}, file space {})",
            self.len,
            mem_type.id(),
            self.target,
            self.mem_space.id(),
            self.file_space.id()
        );
    }
}

fn check_transfer(direction: Direction, status: herr_t) -> H5xResult<()> {
    if status < 0 {
        return Err(H5xError::TransferFailed {
            direction,
            status: i64::from(status),
        });
    }
    Ok(())
}
