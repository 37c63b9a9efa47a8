use std::ffi::{CString, c_char};

use h5x_error::{H5xResult, h5x_err};

/// Owns the NUL-terminated copies of strings handed to the engine for one call.
///
/// The engine reads a variable-length string buffer as an array of `char *`. The arena keeps
/// every copy and the pointer array alive until it is dropped, which releases them on every
/// exit path of the call.
#[derive(Debug, Default)]
pub struct CStringArena {
    strings: Vec<CString>,
    pointers: Vec<*const c_char>,
}

impl CStringArena {
    /// Create an arena with room for `capacity` strings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            strings: Vec::with_capacity(capacity),
            pointers: Vec::with_capacity(capacity),
        }
    }

    /// Copy a string into the arena. Interior NUL bytes are rejected.
    pub fn push(&mut self, value: &str) -> H5xResult<()> {
        let owned = CString::new(value)
            .map_err(|e| h5x_err!("string contains a NUL byte at {}", e.nul_position()))?;
        // The heap allocation of a CString does not move when the CString itself is moved.
        self.pointers.push(owned.as_ptr());
        self.strings.push(owned);
        Ok(())
    }

    /// Copy every string of `iter` into a new arena.
    pub fn try_from_iter<S, I>(iter: I) -> H5xResult<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let iter = iter.into_iter();
        let mut arena = Self::with_capacity(iter.size_hint().0);
        for value in iter {
            arena.push(value.as_ref())?;
        }
        Ok(arena)
    }

    /// Number of pointers in the arena.
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// The pointer array, valid until the arena is dropped or pushed to.
    pub fn as_ptr(&self) -> *const *const c_char {
        self.pointers.as_ptr()
    }
}
