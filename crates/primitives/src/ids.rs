//! Provides identifiers such as `TableId`.
use core::fmt;

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct TableId(pub u32);

/// The position of a column within a table.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct ColId(pub u16);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct IndexId(pub u32);

/// Identifies a correlation parameter shared between physical operators at runtime.
///
/// Two operators holding the same [`ParamId`] read and write the same runtime slot,
/// e.g. the row id an index search should resume from.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct ParamId(pub u32);

/// The data server connection a scan reads through.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct ConnectionId(pub u32);

macro_rules! system_id {
    ($name:ident, $repr:ty) => {
        impl $name {
            pub fn idx(self) -> usize {
                self.0 as usize
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value as $repr)
            }
        }
        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value as $repr)
            }
        }
        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value as $repr)
            }
        }
        impl From<u8> for $name {
            fn from(value: u8) -> Self {
                Self(value as $repr)
            }
        }
        impl From<$name> for usize {
            fn from(value: $name) -> Self {
                value.0 as usize
            }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
system_id!(TableId, u32);
system_id!(ColId, u16);
system_id!(IndexId, u32);
system_id!(ParamId, u32);
system_id!(ConnectionId, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_round_trip_through_usize() {
        assert_eq!(ColId::from(3usize).idx(), 3);
        assert_eq!(usize::from(IndexId(7)), 7);
        assert_eq!(ParamId::from(2u8), ParamId(2));
    }

    #[test]
    fn display_is_the_raw_value() {
        assert_eq!(TableId(42).to_string(), "42");
        assert_eq!(ParamId(5).to_string(), "5");
    }
}
