use std::fmt::{Display, Formatter};

/// Byte order of an atomic value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least significant byte first.
    LittleEndian,
    /// Most significant byte first.
    BigEndian,
    /// Whatever the host uses.
    #[default]
    Native,
}

impl ByteOrder {
    /// Resolve [`ByteOrder::Native`] to the concrete order of the host.
    pub const fn resolved(self) -> Self {
        match self {
            Self::Native => {
                if cfg!(target_endian = "little") {
                    Self::LittleEndian
                } else {
                    Self::BigEndian
                }
            }
            order => order,
        }
    }
}

impl Display for ByteOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LittleEndian => write!(f, "le"),
            Self::BigEndian => write!(f, "be"),
            Self::Native => write!(f, "native"),
        }
    }
}
