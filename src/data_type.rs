//! Source element types and target types.
//!
//! [`ElementType::nc_type`] maps a source element type onto the target type used to store it, which depends on the [`DataModel`].

use derive_more::Display;

use crate::{format::DataModel, target::NcTypeId};

/// The element type of a source variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ElementType {
    /// `u8`
    #[display("byte")]
    Byte,
    /// `i8`
    #[display("int8")]
    Int8,
    /// `i16`
    #[display("int16")]
    Int16,
    /// `u16`
    #[display("uint16")]
    UInt16,
    /// `i32`
    #[display("int32")]
    Int32,
    /// `u32`
    #[display("uint32")]
    UInt32,
    /// `i64`
    #[display("int64")]
    Int64,
    /// `u64`
    #[display("uint64")]
    UInt64,
    /// `f32`
    #[display("float32")]
    Float32,
    /// `f64`
    #[display("float64")]
    Float64,
    /// Variable length UTF-8 text.
    #[display("string")]
    String,
    /// A URL, stored like [`ElementType::String`].
    #[display("url")]
    Url,
    /// Uninterpreted bytes.
    #[display("opaque")]
    Opaque,
}

impl ElementType {
    /// Returns true if values of this type are stored as fixed-width text.
    #[must_use]
    pub fn is_text(self) -> bool {
        matches!(self, Self::String | Self::Url)
    }

    /// Returns true if this is an integer type.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Int8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    /// The target type used to store values of this type in `model`.
    ///
    /// Returns [`None`] if the data model cannot represent the type.
    /// In the classic model unsigned bytes are widened to `short` and `uint16` to `int`.
    #[must_use]
    pub fn nc_type(self, model: DataModel) -> Option<NcType> {
        let nc_type = match (self, model) {
            (Self::Byte, DataModel::Classic) | (Self::Int16, _) => NcType::Short,
            (Self::Byte, DataModel::Enhanced) => NcType::UByte,
            (Self::Int8, _) => NcType::Byte,
            (Self::UInt16, DataModel::Classic) | (Self::Int32, _) => NcType::Int,
            (Self::UInt16, DataModel::Enhanced) => NcType::UShort,
            (Self::UInt32, DataModel::Enhanced) => NcType::UInt,
            (Self::Int64, DataModel::Enhanced) => NcType::Int64,
            (Self::UInt64, DataModel::Enhanced) => NcType::UInt64,
            (Self::Float32, _) => NcType::Float,
            (Self::Float64, _) => NcType::Double,
            (Self::String | Self::Url, _) => NcType::Char,
            (Self::UInt32 | Self::Int64 | Self::UInt64, DataModel::Classic) | (Self::Opaque, _) => {
                return None
            }
        };
        Some(nc_type)
    }
}

/// A target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NcType {
    /// Signed 8-bit integer.
    #[display("byte")]
    Byte,
    /// Text character.
    #[display("char")]
    Char,
    /// Signed 16-bit integer.
    #[display("short")]
    Short,
    /// Signed 32-bit integer.
    #[display("int")]
    Int,
    /// 32-bit float.
    #[display("float")]
    Float,
    /// 64-bit float.
    #[display("double")]
    Double,
    /// Unsigned 8-bit integer.
    #[display("ubyte")]
    UByte,
    /// Unsigned 16-bit integer.
    #[display("ushort")]
    UShort,
    /// Unsigned 32-bit integer.
    #[display("uint")]
    UInt,
    /// Signed 64-bit integer.
    #[display("int64")]
    Int64,
    /// Unsigned 64-bit integer.
    #[display("uint64")]
    UInt64,
    /// A user defined enumeration type.
    #[display("enum {_0}")]
    Enum(NcTypeId),
}

impl NcType {
    /// The size in bytes of one element, or [`None`] for enumerations (whose size is that of their base type).
    #[must_use]
    pub fn size(self) -> Option<u64> {
        match self {
            Self::Byte | Self::Char | Self::UByte => Some(1),
            Self::Short | Self::UShort => Some(2),
            Self::Int | Self::UInt | Self::Float => Some(4),
            Self::Double | Self::Int64 | Self::UInt64 => Some(8),
            Self::Enum(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_promotions() {
        let model = DataModel::Classic;
        assert_eq!(ElementType::Byte.nc_type(model), Some(NcType::Short));
        assert_eq!(ElementType::UInt16.nc_type(model), Some(NcType::Int));
        assert_eq!(ElementType::Int8.nc_type(model), Some(NcType::Byte));
        assert_eq!(ElementType::Url.nc_type(model), Some(NcType::Char));
        assert_eq!(ElementType::UInt32.nc_type(model), None);
        assert_eq!(ElementType::Int64.nc_type(model), None);
    }

    #[test]
    fn enhanced_native_types() {
        let model = DataModel::Enhanced;
        assert_eq!(ElementType::Byte.nc_type(model), Some(NcType::UByte));
        assert_eq!(ElementType::UInt16.nc_type(model), Some(NcType::UShort));
        assert_eq!(ElementType::UInt32.nc_type(model), Some(NcType::UInt));
        assert_eq!(ElementType::UInt64.nc_type(model), Some(NcType::UInt64));
        assert_eq!(ElementType::Opaque.nc_type(model), None);
    }

    #[test]
    fn sizes() {
        assert_eq!(NcType::Char.size(), Some(1));
        assert_eq!(NcType::UShort.size(), Some(2));
        assert_eq!(NcType::Float.size(), Some(4));
        assert_eq!(NcType::UInt64.size(), Some(8));
        assert_eq!(NcType::Enum(NcTypeId(0)).size(), None);
        assert!(ElementType::Byte.is_integer());
        assert!(!ElementType::Float32.is_integer());
        assert!(ElementType::Url.is_text());
    }
}
