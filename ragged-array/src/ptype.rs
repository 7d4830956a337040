//! Physical type definitions for the dense leaf buffers.

use std::fmt::{Debug, Display, Formatter};

use num_traits::{AsPrimitive, FromPrimitive, Num, NumCast, PrimInt, ToPrimitive};

/// Physical type enum, describing the in-memory layout of one leaf element.
///
/// Booleans are stored one byte per element with `u8` as the storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PType {
    /// A boolean, stored as one byte
    Bool,
    /// An 8-bit signed integer
    I8,
    /// A 16-bit signed integer
    I16,
    /// A 32-bit signed integer
    I32,
    /// A 64-bit signed integer
    I64,
    /// An 8-bit unsigned integer
    U8,
    /// A 16-bit unsigned integer
    U16,
    /// A 32-bit unsigned integer
    U32,
    /// A 64-bit unsigned integer
    U64,
    /// A 32-bit floating point number
    F32,
    /// A 64-bit floating point number
    F64,
}

/// A trait for native Rust scalar types that correspond 1:1 to a PType.
pub trait NativePType:
    Send
    + Sync
    + Clone
    + Copy
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Default
    + Num
    + NumCast
    + FromPrimitive
    + ToPrimitive
    + 'static
{
    /// The PType that corresponds to this native type
    const PTYPE: PType;
}

macro_rules! native_ptype {
    ($T:ty, $ptype:tt) => {
        impl NativePType for $T {
            const PTYPE: PType = PType::$ptype;
        }
    };
}

native_ptype!(i8, I8);
native_ptype!(i16, I16);
native_ptype!(i32, I32);
native_ptype!(i64, I64);
native_ptype!(u8, U8);
native_ptype!(u16, U16);
native_ptype!(u32, U32);
native_ptype!(u64, U64);
native_ptype!(f32, F32);
native_ptype!(f64, F64);

/// A trait for the integer widths usable as offsets, gather indices and
/// union tags. Conversions to and from `i64` are the lingua franca of the
/// kernels.
pub trait IndexPType:
    NativePType + PrimInt + AsPrimitive<i64> + AsPrimitive<usize> + FromPrimitive
{
}

impl<T> IndexPType for T where
    T: NativePType + PrimInt + AsPrimitive<i64> + AsPrimitive<usize> + FromPrimitive
{
}

impl PType {
    /// Whether this is any of the integer types.
    pub fn is_int(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
        )
    }

    /// Whether this is one of the signed integer types.
    pub fn is_signed_int(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// Whether this is one of the unsigned integer types.
    pub fn is_unsigned_int(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Whether this is a floating point type.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Whether this is the boolean type.
    pub fn is_bool(self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Integer or floating point, but not boolean.
    pub fn is_numeric(self) -> bool {
        self.is_int() || self.is_float()
    }

    /// The size of one element in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// The number of bits used for the numeric payload, ignoring signedness.
    pub fn bit_width(self) -> usize {
        self.byte_width() * 8
    }
}

impl Display for PType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::I8 => write!(f, "i8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::U64 => write!(f, "u64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

/// Macro to match over each PType, binding the corresponding native storage
/// type (from `NativePType`). Booleans bind `u8`; callers that distinguish
/// boolean semantics branch on [`PType::is_bool`] first.
#[macro_export]
macro_rules! match_each_native_ptype {
    ($self:expr, | $_:tt $enc:ident | $($body:tt)*) => ({
        macro_rules! __with__ {( $_ $enc:ident ) => ( $($body)* )}
        use $crate::PType;
        match $self {
            PType::Bool => __with__! { u8 },
            PType::I8 => __with__! { i8 },
            PType::I16 => __with__! { i16 },
            PType::I32 => __with__! { i32 },
            PType::I64 => __with__! { i64 },
            PType::U8 => __with__! { u8 },
            PType::U16 => __with__! { u16 },
            PType::U32 => __with__! { u32 },
            PType::U64 => __with__! { u64 },
            PType::F32 => __with__! { f32 },
            PType::F64 => __with__! { f64 },
        }
    })
}

/// Macro to match over each integer PType, binding the corresponding native
/// type (from `NativePType`).
#[macro_export]
macro_rules! match_each_integer_ptype {
    ($self:expr, | $_:tt $enc:ident | $($body:tt)*) => ({
        macro_rules! __with__ {( $_ $enc:ident ) => ( $($body)* )}
        use $crate::PType;
        match $self {
            PType::I8 => __with__! { i8 },
            PType::I16 => __with__! { i16 },
            PType::I32 => __with__! { i32 },
            PType::I64 => __with__! { i64 },
            PType::U8 => __with__! { u8 },
            PType::U16 => __with__! { u16 },
            PType::U32 => __with__! { u32 },
            PType::U64 => __with__! { u64 },
            other => panic!("unsupported ptype {}", other),
        }
    })
}

#[cfg(test)]
mod test {
    use crate::{PType, match_each_native_ptype};

    #[test]
    fn widths() {
        assert_eq!(PType::Bool.byte_width(), 1);
        assert_eq!(PType::I64.byte_width(), 8);
        assert_eq!(PType::F32.bit_width(), 32);
    }

    #[test]
    fn match_binds_storage_type() {
        let width = match_each_native_ptype!(PType::I32, |$T| size_of::<$T>());
        assert_eq!(width, 4);
        let bool_width = match_each_native_ptype!(PType::Bool, |$T| size_of::<$T>());
        assert_eq!(bool_width, 1);
    }
}
