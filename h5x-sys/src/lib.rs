#![allow(non_camel_case_types)]

//! The raw contract between h5x and a native storage engine.
//!
//! The engine is a black box that hands out opaque integer handles for types, dataspaces,
//! datasets, attributes, files and groups. Negative handles and negative status codes signal
//! failure. Data moves across the boundary as raw pointers: the caller guarantees that every
//! buffer passed to a transfer primitive stays valid and unmoved for the duration of the call.

mod types;

use std::ffi::{CStr, c_void};
use std::fmt::Debug;

pub use types::*;

/// The narrow set of primitives h5x consumes from a storage engine.
///
/// Every method is a direct synchronous call. Implementations are not required to support
/// concurrent use of the same handle from several threads.
pub trait NativeEngine: Debug + Send + Sync {
    /// Handle of a predefined, immutable type. Predefined types must never be closed.
    fn builtin_type(&self, which: H5T_builtin) -> hid_t;

    // Files and groups.

    /// Create a file, truncating an existing one when `flags` contains [`H5F_ACC_TRUNC`].
    fn file_create(&self, name: &CStr, flags: u32) -> hid_t;
    /// Open an existing file with [`H5F_ACC_RDONLY`] or [`H5F_ACC_RDWR`].
    fn file_open(&self, name: &CStr, flags: u32) -> hid_t;
    /// Close a file handle.
    fn file_close(&self, file: hid_t) -> herr_t;
    /// Create a group below `loc`.
    fn group_create(&self, loc: hid_t, name: &CStr) -> hid_t;
    /// Open a group below `loc`.
    fn group_open(&self, loc: hid_t, name: &CStr) -> hid_t;
    /// Close a group handle.
    fn group_close(&self, group: hid_t) -> herr_t;
    /// Whether a link with the given (slash separated) name exists below `loc`.
    fn link_exists(&self, loc: hid_t, name: &CStr) -> htri_t;

    // Datatypes.

    /// Create a new compound or string type of `size` bytes.
    fn type_create(&self, class: H5T_class_t, size: usize) -> hid_t;
    /// Copy any type, including predefined ones, into a new mutable type.
    fn type_copy(&self, ty: hid_t) -> hid_t;
    /// Close a type. Fails for predefined types.
    fn type_close(&self, ty: hid_t) -> herr_t;
    /// Class of a type, [`H5T_class_t::H5T_NO_CLASS`] on failure.
    fn type_get_class(&self, ty: hid_t) -> H5T_class_t;
    /// Size of a type in bytes, zero on failure.
    fn type_get_size(&self, ty: hid_t) -> usize;
    /// Byte order of an atomic type.
    fn type_get_order(&self, ty: hid_t) -> H5T_order_t;
    /// Sign convention of an integer type.
    fn type_get_sign(&self, ty: hid_t) -> H5T_sign_t;
    /// Set the size of a mutable type. [`H5T_VARIABLE`] turns a string into a variable string.
    fn type_set_size(&self, ty: hid_t, size: usize) -> herr_t;
    /// Set the byte order of a mutable atomic type.
    fn type_set_order(&self, ty: hid_t, order: H5T_order_t) -> herr_t;
    /// Add a member to a compound type. The member type is copied.
    fn type_insert(&self, compound: hid_t, name: &CStr, offset: usize, field: hid_t) -> herr_t;
    /// Number of members of a compound type, negative on failure.
    fn type_get_nmembers(&self, compound: hid_t) -> i32;
    /// Byte offset of the member at `index`, zero on failure.
    fn type_get_member_offset(&self, compound: hid_t, index: u32) -> usize;
    /// Create a variable-length sequence type of `base`.
    fn type_vlen_create(&self, base: hid_t) -> hid_t;
    /// Whether a type is a variable-length string.
    fn type_is_variable_str(&self, ty: hid_t) -> htri_t;

    // Dataspaces.

    /// Create a simple dataspace. `maxdims` may contain [`H5S_UNLIMITED`].
    fn space_create_simple(&self, dims: &[hsize_t], maxdims: Option<&[hsize_t]>) -> hid_t;
    /// Close a dataspace. [`H5S_ALL`] is not a dataspace and must not be passed here.
    fn space_close(&self, space: hid_t) -> herr_t;
    /// Rank of a dataspace, negative on failure.
    fn space_get_ndims(&self, space: hid_t) -> i32;
    /// Write the current and (optionally) maximum extent into the given slices. Returns the
    /// rank, negative on failure.
    fn space_get_dims(
        &self,
        space: hid_t,
        dims: &mut [hsize_t],
        maxdims: Option<&mut [hsize_t]>,
    ) -> i32;
    /// Combine a hyperslab with the current selection. Missing stride or block mean all ones.
    fn space_select_hyperslab(
        &self,
        space: hid_t,
        op: H5S_seloper_t,
        start: &[hsize_t],
        stride: Option<&[hsize_t]>,
        count: &[hsize_t],
        block: Option<&[hsize_t]>,
    ) -> herr_t;
    /// Select the whole extent.
    fn space_select_all(&self, space: hid_t) -> herr_t;
    /// Clear the selection.
    fn space_select_none(&self, space: hid_t) -> herr_t;
    /// Whether every selected point lies inside the extent.
    fn space_select_valid(&self, space: hid_t) -> htri_t;
    /// Number of selected points, negative on failure.
    fn space_get_select_npoints(&self, space: hid_t) -> hssize_t;

    // Datasets.

    /// Create a dataset named `name` below `loc` with the given file type and extent.
    fn dataset_create(&self, loc: hid_t, name: &CStr, ty: hid_t, space: hid_t) -> hid_t;
    /// Open an existing dataset.
    fn dataset_open(&self, loc: hid_t, name: &CStr) -> hid_t;
    /// Close a dataset handle.
    fn dataset_close(&self, dataset: hid_t) -> herr_t;
    /// A new handle to a copy of the dataset's stored type.
    fn dataset_get_type(&self, dataset: hid_t) -> hid_t;
    /// A new handle to a copy of the dataset's extent, with everything selected.
    fn dataset_get_space(&self, dataset: hid_t) -> hid_t;

    /// Read the selected elements of `file_space` into the selected elements of `mem_space`.
    ///
    /// # Safety
    ///
    /// `buf` must point to writable memory laid out as `mem_type` elements covering the whole
    /// extent of the memory space, and must stay valid for the duration of the call.
    unsafe fn dataset_read(
        &self,
        dataset: hid_t,
        mem_type: hid_t,
        mem_space: hid_t,
        file_space: hid_t,
        buf: *mut c_void,
    ) -> herr_t;

    /// Write the selected elements of `mem_space` into the selected elements of `file_space`.
    ///
    /// # Safety
    ///
    /// `buf` must point to readable memory laid out as `mem_type` elements covering the whole
    /// extent of the memory space. Pointers embedded in variable-length elements must be
    /// valid for the duration of the call.
    unsafe fn dataset_write(
        &self,
        dataset: hid_t,
        mem_type: hid_t,
        mem_space: hid_t,
        file_space: hid_t,
        buf: *const c_void,
    ) -> herr_t;

    /// Free the memory the engine allocated for the variable-length elements selected in
    /// `space`.
    ///
    /// # Safety
    ///
    /// `buf` must be the buffer of a previous read with the same `ty`, laid out over the extent
    /// of `space`, and its variable-length pointers must not have been reclaimed before.
    unsafe fn dataset_vlen_reclaim(&self, ty: hid_t, space: hid_t, buf: *mut c_void) -> herr_t;

    // Attributes.

    /// Create an attribute on a file, group or dataset.
    fn attr_create(&self, obj: hid_t, name: &CStr, ty: hid_t, space: hid_t) -> hid_t;
    /// Open an attribute by name.
    fn attr_open(&self, obj: hid_t, name: &CStr) -> hid_t;
    /// Close an attribute handle.
    fn attr_close(&self, attr: hid_t) -> herr_t;
    /// A new handle to a copy of the attribute's stored type.
    fn attr_get_type(&self, attr: hid_t) -> hid_t;
    /// A new handle to a copy of the attribute's extent.
    fn attr_get_space(&self, attr: hid_t) -> hid_t;

    /// Read the whole attribute.
    ///
    /// # Safety
    ///
    /// Same requirements as [`NativeEngine::dataset_read`] over the attribute's extent.
    unsafe fn attr_read(&self, attr: hid_t, mem_type: hid_t, buf: *mut c_void) -> herr_t;

    /// Write the whole attribute.
    ///
    /// # Safety
    ///
    /// Same requirements as [`NativeEngine::dataset_write`] over the attribute's extent.
    unsafe fn attr_write(&self, attr: hid_t, mem_type: hid_t, buf: *const c_void) -> herr_t;
}
