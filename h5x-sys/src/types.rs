use std::ffi::c_void;

use enum_iterator::Sequence;

/// Opaque handle to an engine object.
pub type hid_t = i64;
/// Status of a native call. Negative means failure.
pub type herr_t = i32;
/// Tri-state boolean. Negative means failure, zero false, positive true.
pub type htri_t = i32;
/// Unsigned extent or coordinate.
pub type hsize_t = u64;
/// Signed size, used where a count may carry an error.
pub type hssize_t = i64;

/// The "whole extent, no explicit selection" dataspace id.
pub const H5S_ALL: hid_t = 0;
/// Unbounded maximum dimension.
pub const H5S_UNLIMITED: hsize_t = hsize_t::MAX;
/// Size marker of a variable-length string type.
pub const H5T_VARIABLE: usize = usize::MAX;

/// Open a file read-only.
pub const H5F_ACC_RDONLY: u32 = 0x0000;
/// Open a file for reading and writing.
pub const H5F_ACC_RDWR: u32 = 0x0001;
/// Truncate an existing file on create.
pub const H5F_ACC_TRUNC: u32 = 0x0002;
/// Fail on create if the file already exists.
pub const H5F_ACC_EXCL: u32 = 0x0004;

/// Native type classes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum H5T_class_t {
    /// Error marker.
    H5T_NO_CLASS = -1,
    /// Fixed-point integers.
    H5T_INTEGER = 0,
    /// Floating-point numbers.
    H5T_FLOAT = 1,
    /// Date and time.
    H5T_TIME = 2,
    /// Character strings.
    H5T_STRING = 3,
    /// Bit fields.
    H5T_BITFIELD = 4,
    /// Opaque blobs.
    H5T_OPAQUE = 5,
    /// Records.
    H5T_COMPOUND = 6,
    /// References.
    H5T_REFERENCE = 7,
    /// Enumerations.
    H5T_ENUM = 8,
    /// Variable-length sequences.
    H5T_VLEN = 9,
    /// Fixed-size arrays.
    H5T_ARRAY = 10,
}

/// Byte order of atomic types.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum H5T_order_t {
    /// Error marker.
    H5T_ORDER_ERROR = -1,
    /// Little endian.
    H5T_ORDER_LE = 0,
    /// Big endian.
    H5T_ORDER_BE = 1,
    /// VAX mixed endian.
    H5T_ORDER_VAX = 2,
    /// Compound type with mixed member orders.
    H5T_ORDER_MIXED = 3,
    /// No particular order (strings, opaque).
    H5T_ORDER_NONE = 4,
}

/// Sign convention of integer types.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum H5T_sign_t {
    /// Error marker.
    H5T_SGN_ERROR = -1,
    /// Unsigned.
    H5T_SGN_NONE = 0,
    /// Two's complement.
    H5T_SGN_2 = 1,
}

/// How a new hyperslab combines with the existing selection.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum H5S_seloper_t {
    /// Error marker.
    H5S_SELECT_NOOP = -1,
    /// Replace the existing selection.
    H5S_SELECT_SET = 0,
    /// Union.
    H5S_SELECT_OR = 1,
    /// Intersection.
    H5S_SELECT_AND = 2,
    /// Symmetric difference.
    H5S_SELECT_XOR = 3,
    /// Existing selection minus the new region.
    H5S_SELECT_NOTB = 4,
    /// New region minus the existing selection.
    H5S_SELECT_NOTA = 5,
}

/// One variable-length element as laid out in a transfer buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct hvl_t {
    /// Number of base elements.
    pub len: usize,
    /// Engine-allocated storage, null when `len` is zero.
    pub p: *mut c_void,
}

impl Default for hvl_t {
    fn default() -> Self {
        Self {
            len: 0,
            p: std::ptr::null_mut(),
        }
    }
}

/// Predefined types every engine must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum H5T_builtin {
    STD_I8LE,
    STD_I8BE,
    NATIVE_INT8,
    STD_I16LE,
    STD_I16BE,
    NATIVE_INT16,
    STD_I32LE,
    STD_I32BE,
    NATIVE_INT32,
    STD_I64LE,
    STD_I64BE,
    NATIVE_INT64,
    STD_U8LE,
    STD_U8BE,
    NATIVE_UINT8,
    STD_U16LE,
    STD_U16BE,
    NATIVE_UINT16,
    STD_U32LE,
    STD_U32BE,
    NATIVE_UINT32,
    STD_U64LE,
    STD_U64BE,
    NATIVE_UINT64,
    STD_B8LE,
    STD_B8BE,
    NATIVE_B8,
    STD_B16LE,
    STD_B16BE,
    NATIVE_B16,
    STD_B32LE,
    STD_B32BE,
    NATIVE_B32,
    STD_B64LE,
    STD_B64BE,
    NATIVE_B64,
    IEEE_F32LE,
    IEEE_F32BE,
    NATIVE_FLOAT,
    IEEE_F64LE,
    IEEE_F64BE,
    NATIVE_DOUBLE,
    /// One-byte, NUL-terminated C string.
    C_S1,
}
