//! Raw buffers of variable-length reads and the reclaim that releases their payloads.

use std::ffi::c_char;

use h5x_buffer::BufferMut;
use h5x_error::{H5xError, H5xResult};
use h5x_sys::hvl_t;
use log::{debug, warn};

use crate::datatype::Datatype;
use crate::transfer::Transfer;

mod private {
    pub trait Sealed {}

    impl Sealed for h5x_sys::hvl_t {}
    impl Sealed for *mut std::ffi::c_char {}
}

/// One slot of a variable-length read buffer. The all-zero slot is a valid empty element.
pub(crate) trait VlenSlot: Copy + private::Sealed {}

impl VlenSlot for hvl_t {}
impl VlenSlot for *mut c_char {}

/// The raw result of a variable-length read.
///
/// Decoding borrows the slots through [`VlenBuffer::slots`]. [`VlenBuffer::reclaim`] consumes
/// the buffer, so nothing can read a slot after its payload was released. A buffer that is
/// dropped without being reclaimed, e.g. because decoding failed, is reclaimed on drop.
pub(crate) struct VlenBuffer<'a, P: VlenSlot> {
    transfer: &'a Transfer<'a>,
    mem_type: &'a Datatype,
    buffer: BufferMut<P>,
    reclaimed: bool,
}

impl<'a, P: VlenSlot> VlenBuffer<'a, P> {
    /// Read the transfer into a fresh buffer of empty slots.
    pub(crate) fn read(transfer: &'a Transfer<'a>, mem_type: &'a Datatype) -> H5xResult<Self> {
        // SAFETY: every `VlenSlot` is valid when zeroed.
        let buffer = unsafe { BufferMut::<P>::zeroed(transfer.len()) };
        let mut raw = Self {
            transfer,
            mem_type,
            buffer,
            reclaimed: false,
        };
        // SAFETY: the buffer holds `len` slots of the memory type.
        unsafe {
            transfer.read_raw(mem_type, raw.buffer.as_mut_ptr().cast())?;
        }
        Ok(raw)
    }

    pub(crate) fn slots(&self) -> &[P] {
        self.buffer.as_slice()
    }

    /// Release every payload the engine allocated for this read.
    pub(crate) fn reclaim(mut self) -> H5xResult<()> {
        self.reclaimed = true;
        self.release()
    }

    fn release(&mut self) -> H5xResult<()> {
        let space = self.transfer.reclaim_space();
        debug!(
            "reclaiming {} variable-length elements against dataspace {}",
            self.buffer.len(),
            space.id()
        );
        let engine = self.transfer.library().engine();
        // SAFETY: the buffer is the one the engine filled for this memory type and space.
        let status = unsafe {
            engine.dataset_vlen_reclaim(
                self.mem_type.id(),
                space.id(),
                self.buffer.as_mut_ptr().cast(),
            )
        };
        if status < 0 {
            return Err(H5xError::ReclaimFailed {
                status: i64::from(status),
            });
        }
        Ok(())
    }
}

impl<P: VlenSlot> Drop for VlenBuffer<'_, P> {
    fn drop(&mut self) {
        if self.reclaimed {
            return;
        }
        self.reclaimed = true;
        if let Err(err) = self.release() {
            warn!("reclaim of an abandoned variable-length buffer failed: {err}");
        }
    }
}
