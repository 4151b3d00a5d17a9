//! Source values.

use crate::{data_type::ElementType, data_type::NcType, target::TargetValues};

/// A typed buffer of source values in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValues {
    /// `u8` values.
    Byte(Vec<u8>),
    /// `i8` values.
    Int8(Vec<i8>),
    /// `i16` values.
    Int16(Vec<i16>),
    /// `u16` values.
    UInt16(Vec<u16>),
    /// `i32` values.
    Int32(Vec<i32>),
    /// `u32` values.
    UInt32(Vec<u32>),
    /// `i64` values.
    Int64(Vec<i64>),
    /// `u64` values.
    UInt64(Vec<u64>),
    /// `f32` values.
    Float32(Vec<f32>),
    /// `f64` values.
    Float64(Vec<f64>),
    /// Text values.
    String(Vec<String>),
}

macro_rules! element_values_from {
    ( $t:ty, $variant:ident ) => {
        impl From<Vec<$t>> for ElementValues {
            fn from(values: Vec<$t>) -> Self {
                Self::$variant(values)
            }
        }
    };
}

element_values_from!(u8, Byte);
element_values_from!(i8, Int8);
element_values_from!(i16, Int16);
element_values_from!(u16, UInt16);
element_values_from!(i32, Int32);
element_values_from!(u32, UInt32);
element_values_from!(i64, Int64);
element_values_from!(u64, UInt64);
element_values_from!(f32, Float32);
element_values_from!(f64, Float64);
element_values_from!(String, String);

impl From<Vec<&str>> for ElementValues {
    fn from(values: Vec<&str>) -> Self {
        Self::String(values.into_iter().map(str::to_string).collect())
    }
}

impl ElementValues {
    /// The number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element type of the values. Text values report [`ElementType::String`].
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Byte(_) => ElementType::Byte,
            Self::Int8(_) => ElementType::Int8,
            Self::Int16(_) => ElementType::Int16,
            Self::UInt16(_) => ElementType::UInt16,
            Self::Int32(_) => ElementType::Int32,
            Self::UInt32(_) => ElementType::UInt32,
            Self::Int64(_) => ElementType::Int64,
            Self::UInt64(_) => ElementType::UInt64,
            Self::Float32(_) => ElementType::Float32,
            Self::Float64(_) => ElementType::Float64,
            Self::String(_) => ElementType::String,
        }
    }

    /// Returns true if the values can be the values of a variable of `element_type`.
    #[must_use]
    pub fn matches(&self, element_type: ElementType) -> bool {
        let own = self.element_type();
        own == element_type || (own == ElementType::String && element_type.is_text())
    }

    /// The length in bytes of the longest text value, or [`None`] if the values are not text.
    #[must_use]
    pub fn max_text_len(&self) -> Option<usize> {
        match self {
            Self::String(v) => Some(v.iter().map(String::len).max().unwrap_or(0)),
            _ => None,
        }
    }

    /// Convert the values to the representation of `storage_type`.
    ///
    /// Text values become `char` values, each value padded with NUL characters to `text_width` bytes.
    /// Returns [`None`] if the values cannot be stored as `storage_type`.
    #[must_use]
    pub fn to_target(&self, storage_type: NcType, text_width: usize) -> Option<TargetValues> {
        let values = match (self, storage_type) {
            (Self::Byte(v), NcType::Short) => TargetValues::Short(widen(v)),
            (Self::Byte(v), NcType::UByte) => TargetValues::UByte(v.clone()),
            (Self::Int8(v), NcType::Byte) => TargetValues::Byte(v.clone()),
            (Self::Int16(v), NcType::Short) => TargetValues::Short(v.clone()),
            (Self::UInt16(v), NcType::Int) => TargetValues::Int(widen(v)),
            (Self::UInt16(v), NcType::UShort) => TargetValues::UShort(v.clone()),
            (Self::Int32(v), NcType::Int) => TargetValues::Int(v.clone()),
            (Self::UInt32(v), NcType::UInt) => TargetValues::UInt(v.clone()),
            (Self::Int64(v), NcType::Int64) => TargetValues::Int64(v.clone()),
            (Self::UInt64(v), NcType::UInt64) => TargetValues::UInt64(v.clone()),
            (Self::Float32(v), NcType::Float) => TargetValues::Float(v.clone()),
            (Self::Float64(v), NcType::Double) => TargetValues::Double(v.clone()),
            (Self::String(v), NcType::Char) => TargetValues::Char(pad_text(v, text_width)),
            _ => return None,
        };
        Some(values)
    }
}

fn widen<T: Copy, U: From<T>>(values: &[T]) -> Vec<U> {
    values.iter().copied().map(U::from).collect()
}

fn pad_text(values: &[String], width: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * width);
    for value in values {
        let value = value.as_bytes();
        let len = value.len().min(width);
        bytes.extend_from_slice(&value[..len]);
        bytes.resize(bytes.len() + width - len, 0);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_values_widening() {
        let values = ElementValues::from(vec![0u8, 200, 255]);
        assert_eq!(
            values.to_target(NcType::Short, 0),
            Some(TargetValues::Short(vec![0, 200, 255]))
        );
        assert_eq!(
            values.to_target(NcType::UByte, 0),
            Some(TargetValues::UByte(vec![0, 200, 255]))
        );
        let values = ElementValues::from(vec![65_535u16]);
        assert_eq!(
            values.to_target(NcType::Int, 0),
            Some(TargetValues::Int(vec![65_535]))
        );
        assert_eq!(values.to_target(NcType::Float, 0), None);
    }

    #[test]
    fn element_values_text() {
        let values = ElementValues::from(vec!["ab", "", "xyz"]);
        assert_eq!(values.max_text_len(), Some(3));
        assert_eq!(
            values.to_target(NcType::Char, 4),
            Some(TargetValues::Char(b"ab\0\0\0\0\0\0xyz\0".to_vec()))
        );
        assert!(values.matches(ElementType::Url));
        assert!(!values.matches(ElementType::Int32));
        assert_eq!(ElementValues::from(vec![1i32]).max_text_len(), None);
    }
}
