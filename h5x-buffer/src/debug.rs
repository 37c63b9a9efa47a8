use std::fmt::{Debug, Formatter};

const TRUNC_SIZE: usize = 16;

/// Debug-formats at most the first few elements of a slice.
pub(crate) struct TruncatedDebug<'a, T>(pub(crate) &'a [T]);

impl<T: Debug> Debug for TruncatedDebug<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        list.entries(self.0.iter().take(TRUNC_SIZE));
        if self.0.len() > TRUNC_SIZE {
            list.entry(&format_args!("... {} more", self.0.len() - TRUNC_SIZE));
        }
        list.finish()
    }
}
