use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use bytes::{Buf, BytesMut};
use h5x_error::h5x_panic;

use crate::Alignment;
use crate::debug::TruncatedDebug;

/// An owned, aligned buffer of `T` whose address never changes.
///
/// The length is fixed at construction and the buffer never reallocates, so a raw pointer taken
/// from [`BufferMut::as_mut_ptr`] stays valid for as long as the buffer is neither moved out of
/// its owner nor dropped. This is the buffer that is handed to the engine for a transfer.
pub struct BufferMut<T> {
    bytes: BytesMut,
    length: usize,
    alignment: Alignment,
    _marker: PhantomData<T>,
}

impl<T> BufferMut<T> {
    /// Allocate `len` elements with every byte set to zero, aligned to `T`.
    ///
    /// # Safety
    ///
    /// The all-zero bit pattern must be a valid `T`.
    pub unsafe fn zeroed(len: usize) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe { Self::zeroed_aligned(len, Alignment::of::<T>()) }
    }

    /// Allocate `len` zeroed elements with the requested alignment.
    ///
    /// # Safety
    ///
    /// The all-zero bit pattern must be a valid `T`.
    pub unsafe fn zeroed_aligned(len: usize, alignment: Alignment) -> Self {
        let mut buffer = Self::allocate(len, alignment);
        let byte_len = len * size_of::<T>();
        buffer.bytes.resize(byte_len, 0);
        buffer.length = len;
        buffer
    }

    /// Copy the given values into a new buffer aligned to `T`.
    pub fn copy_from(values: impl AsRef<[T]>) -> Self
    where
        T: Copy,
    {
        Self::copy_from_aligned(values, Alignment::of::<T>())
    }

    /// Copy the given values into a new buffer with the requested alignment.
    pub fn copy_from_aligned(values: impl AsRef<[T]>, alignment: Alignment) -> Self
    where
        T: Copy,
    {
        let values = values.as_ref();
        let mut buffer = Self::allocate(values.len(), alignment);
        // SAFETY: `T: Copy`, so viewing the values as bytes and duplicating them is sound.
        let raw = unsafe {
            std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), size_of_val(values))
        };
        buffer.bytes.extend_from_slice(raw);
        buffer.length = values.len();
        buffer
    }

    /// Create a buffer of `len` copies of `item`.
    pub fn full(item: T, len: usize) -> Self
    where
        T: Copy,
    {
        Self::copy_from(vec![item; len])
    }

    fn allocate(len: usize, alignment: Alignment) -> Self {
        if !alignment.is_aligned_to(Alignment::of::<T>()) {
            h5x_panic!(
                "Alignment {} must be compatible with the element alignment {}",
                alignment,
                Alignment::of::<T>()
            );
        }
        let byte_len = len * size_of::<T>();
        // Over-allocate so that the start can be moved up to the first aligned address.
        let mut bytes = BytesMut::with_capacity(byte_len + *alignment);
        let padding = bytes.as_ptr().align_offset(*alignment);
        bytes.resize(padding, 0);
        bytes.advance(padding);
        Self {
            bytes,
            length: 0,
            alignment,
            _marker: PhantomData,
        }
    }

    /// Number of elements.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the buffer holds no elements.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Size of the buffer in bytes.
    #[inline(always)]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the alignment of the buffer.
    #[inline(always)]
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Returns a slice over the elements.
    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the start is aligned to `T` and `length` elements were initialized.
        unsafe { std::slice::from_raw_parts(self.bytes.as_ptr().cast(), self.length) }
    }

    /// Returns a mutable slice over the elements.
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: see `as_slice`.
        unsafe { std::slice::from_raw_parts_mut(self.bytes.as_mut_ptr().cast(), self.length) }
    }

    /// A raw pointer to the first element, stable for the lifetime of the buffer.
    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.bytes.as_ptr().cast()
    }

    /// A mutable raw pointer to the first element, stable for the lifetime of the buffer.
    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.bytes.as_mut_ptr().cast()
    }

    /// Copy the elements out into a `Vec`.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Copy,
    {
        self.as_slice().to_vec()
    }
}

impl<T: Debug> Debug for BufferMut<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferMut")
            .field("length", &self.length)
            .field("alignment", &self.alignment)
            .field("as_slice", &TruncatedDebug(self.as_slice()))
            .finish()
    }
}

impl<T> Deref for BufferMut<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> DerefMut for BufferMut<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T> AsRef<[T]> for BufferMut<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy> FromIterator<T> for BufferMut<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::copy_from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T: PartialEq> PartialEq for BufferMut<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
