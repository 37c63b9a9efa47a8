use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// The alignment of a buffer, always a power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Alignment(usize);

impl Alignment {
    /// Create a new alignment.
    ///
    /// ## Panics
    ///
    /// Panics if `align` is not a power of two.
    #[inline]
    pub const fn new(align: usize) -> Self {
        if !align.is_power_of_two() {
            panic!("Alignment must be a power of two")
        }
        Self(align)
    }

    /// An alignment of one byte, i.e. no alignment requirement.
    #[inline]
    pub const fn none() -> Self {
        Self::new(1)
    }

    /// The natural alignment of `T`.
    #[inline]
    pub const fn of<T>() -> Self {
        Self::new(align_of::<T>())
    }

    /// Whether this alignment satisfies `other`, i.e. is a multiple of it.
    #[inline]
    pub fn is_aligned_to(&self, other: Alignment) -> bool {
        self.0 % other.0 == 0
    }
}

impl Deref for Alignment {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Alignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Alignment {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Alignment::of::<u64>(), Alignment::of::<u8>(), true)]
    #[case(Alignment::of::<u8>(), Alignment::of::<u64>(), false)]
    #[case(Alignment::new(16), Alignment::of::<f64>(), true)]
    #[case(Alignment::new(8), Alignment::of::<u64>(), true)]
    #[case(Alignment::new(4), Alignment::new(8), false)]
    fn aligned_to(#[case] align: Alignment, #[case] other: Alignment, #[case] expected: bool) {
        assert_eq!(align.is_aligned_to(other), expected);
    }

    #[test]
    #[should_panic]
    fn not_power_of_two() {
        Alignment::new(12);
    }
}
