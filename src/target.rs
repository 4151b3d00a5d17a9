//! The target format.
//!
//! A [`TargetFormat`] is the low-level interface to the file being written.
//! Every operation either succeeds or returns a [`TargetError`] carrying the library's numeric code and message.
//!
//! Definitions ([`TargetFormat::define_dimension`], [`TargetFormat::define_variable`], ...) are only valid before [`TargetFormat::end_define`],
//! and [`TargetFormat::write_values`] only after it.
//!
//! This module includes:
//!  - [`MemoryTarget`]: records every definition and value in memory.
//!  - [`UsageLogTarget`]: logs each call and its result, then delegates to another target.

mod memory;
mod usage_log;

pub use memory::{
    MemoryAttribute, MemoryDimension, MemoryEnum, MemoryGroup, MemoryTarget, MemoryVariable,
};
pub use usage_log::UsageLogTarget;

use derive_more::Display;
use thiserror::Error;

use crate::{data_type::NcType, format::FileFormat};

/// The target error code for an operation on an invalid id or a closed file.
pub const NC_EBADID: i32 = -33;
/// The target error code for a definition outside define mode.
pub const NC_ENOTINDEFINE: i32 = -38;
/// The target error code for a write in define mode.
pub const NC_EINDEFINE: i32 = -39;
/// The target error code for a name already in use.
pub const NC_ENAMEINUSE: i32 = -42;
/// The target error code for a type mismatch.
pub const NC_EBADTYPE: i32 = -45;
/// The target error code for an invalid dimension id.
pub const NC_EBADDIM: i32 = -46;
/// The target error code for an index or count exceeding a dimension bound.
pub const NC_EEDGE: i32 = -57;
/// The target error code for an illegal name.
pub const NC_EBADNAME: i32 = -59;
/// The target error code for an input/output failure.
pub const NC_EIO: i32 = -68;
/// The target error code for a netCDF-4 operation on a classic file.
pub const NC_ENOTNC4: i32 = -111;
/// The target error code for bad chunk sizes.
pub const NC_EBADCHUNK: i32 = -127;

/// A group id. The root group of a file is the id returned by [`TargetFormat::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct NcGroupId(pub u32);

/// A dimension id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct NcDimId(pub u32);

/// A variable id, unique within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct NcVarId(pub u32);

/// A user defined type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct NcTypeId(pub u32);

/// The owner of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AttributeOwner {
    /// A group. Attributes of the root group are global attributes.
    #[display("group {_0}")]
    Group(NcGroupId),
    /// A variable.
    #[display("variable {_0}")]
    Variable(NcVarId),
}

/// The storage layout of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStorage {
    /// Values are stored contiguously.
    Contiguous,
    /// Values are stored in chunks with these extents.
    Chunked(Vec<u64>),
}

/// Values in their target representation.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValues {
    /// `byte` values.
    Byte(Vec<i8>),
    /// `char` values.
    Char(Vec<u8>),
    /// `short` values.
    Short(Vec<i16>),
    /// `int` values.
    Int(Vec<i32>),
    /// `float` values.
    Float(Vec<f32>),
    /// `double` values.
    Double(Vec<f64>),
    /// `ubyte` values.
    UByte(Vec<u8>),
    /// `ushort` values.
    UShort(Vec<u16>),
    /// `uint` values.
    UInt(Vec<u32>),
    /// `int64` values.
    Int64(Vec<i64>),
    /// `uint64` values.
    UInt64(Vec<u64>),
}

impl TargetValues {
    /// Create `char` values from text.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Char(text.as_bytes().to_vec())
    }

    /// The number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Char(v) | Self::UByte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::UShort(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
        }
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The target type of the elements.
    #[must_use]
    pub fn nc_type(&self) -> NcType {
        match self {
            Self::Byte(_) => NcType::Byte,
            Self::Char(_) => NcType::Char,
            Self::Short(_) => NcType::Short,
            Self::Int(_) => NcType::Int,
            Self::Float(_) => NcType::Float,
            Self::Double(_) => NcType::Double,
            Self::UByte(_) => NcType::UByte,
            Self::UShort(_) => NcType::UShort,
            Self::UInt(_) => NcType::UInt,
            Self::Int64(_) => NcType::Int64,
            Self::UInt64(_) => NcType::UInt64,
        }
    }

    /// The elements as native endian bytes.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        match self {
            Self::Byte(v) => bytemuck::cast_slice(v),
            Self::Char(v) | Self::UByte(v) => v,
            Self::Short(v) => bytemuck::cast_slice(v),
            Self::Int(v) => bytemuck::cast_slice(v),
            Self::Float(v) => bytemuck::cast_slice(v),
            Self::Double(v) => bytemuck::cast_slice(v),
            Self::UShort(v) => bytemuck::cast_slice(v),
            Self::UInt(v) => bytemuck::cast_slice(v),
            Self::Int64(v) => bytemuck::cast_slice(v),
            Self::UInt64(v) => bytemuck::cast_slice(v),
        }
    }

    /// The values as text, if they are `char` values.
    ///
    /// Trailing NUL characters are removed.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Char(v) => {
                let end = v.iter().rposition(|c| *c != 0).map_or(0, |i| i + 1);
                Some(String::from_utf8_lossy(&v[..end]).into_owned())
            }
            _ => None,
        }
    }
}

/// An error reported by a target format library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (error code {code})")]
pub struct TargetError {
    code: i32,
    message: String,
}

impl TargetError {
    /// Create a new target error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The numeric error code.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for TargetError {
    fn from(err: std::io::Error) -> Self {
        Self::new(NC_EIO, err.to_string())
    }
}

/// The operations of a target format library.
pub trait TargetFormat {
    /// Create the file in `format` and enter define mode.
    ///
    /// Returns the id of the root group.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the file cannot be created.
    fn create(&mut self, format: FileFormat) -> Result<NcGroupId, TargetError>;

    /// Define a child group named `name` of `parent`.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the format does not support groups or the name is in use.
    fn define_group(&mut self, parent: NcGroupId, name: &str) -> Result<NcGroupId, TargetError>;

    /// Define a dimension of length `size` in `group`.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the name is in use or the file is not in define mode.
    fn define_dimension(
        &mut self,
        group: NcGroupId,
        name: &str,
        size: u64,
    ) -> Result<NcDimId, TargetError>;

    /// Define an enumeration type with integer `base` type and `members` in `group`.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the format does not support user defined types or the name is in use.
    fn define_enum(
        &mut self,
        group: NcGroupId,
        name: &str,
        base: NcType,
        members: &[(String, i64)],
    ) -> Result<NcTypeId, TargetError>;

    /// Define a variable of `nc_type` with `dimensions` in `group`.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the name is in use, a dimension is invalid, or the file is not in define mode.
    fn define_variable(
        &mut self,
        group: NcGroupId,
        name: &str,
        nc_type: NcType,
        dimensions: &[NcDimId],
    ) -> Result<NcVarId, TargetError>;

    /// Set the storage layout of a variable.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the format does not support chunking or the extents are invalid.
    fn define_chunking(&mut self, variable: NcVarId, storage: &ChunkStorage)
        -> Result<(), TargetError>;

    /// Enable deflate compression of a variable.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the format does not support compression.
    fn define_compression(
        &mut self,
        variable: NcVarId,
        level: u32,
        shuffle: bool,
    ) -> Result<(), TargetError>;

    /// Define an attribute named `name` on `owner`, replacing any attribute of the same name.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the owner is invalid or the file is not in define mode.
    fn define_attribute(
        &mut self,
        owner: AttributeOwner,
        name: &str,
        value: &TargetValues,
    ) -> Result<(), TargetError>;

    /// Leave define mode.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the file is not in define mode.
    fn end_define(&mut self) -> Result<(), TargetError>;

    /// Write `values` to the hyperslab of `variable` at `start` with extent `count`.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the file is in define mode, the hyperslab is out of bounds, or the write fails.
    fn write_values(
        &mut self,
        variable: NcVarId,
        start: &[u64],
        count: &[u64],
        values: &TargetValues,
    ) -> Result<(), TargetError>;

    /// Close the file.
    ///
    /// # Errors
    /// Returns a [`TargetError`] if the file is not open.
    fn close(&mut self) -> Result<(), TargetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_values() {
        let values = TargetValues::Short(vec![1, -2, 3]);
        assert_eq!(values.len(), 3);
        assert_eq!(values.nc_type(), NcType::Short);
        assert_eq!(values.as_ne_bytes().len(), 6);
        assert_eq!(values.as_text(), None);

        let values = TargetValues::Char(b"abc\0\0".to_vec());
        assert_eq!(values.as_text().as_deref(), Some("abc"));
        assert_eq!(TargetValues::text("").len(), 0);
    }

    #[test]
    fn target_error_display() {
        let error = TargetError::new(NC_EBADID, "NetCDF: Not a valid ID");
        assert_eq!(error.to_string(), "NetCDF: Not a valid ID (error code -33)");
        assert_eq!(error.message(), "NetCDF: Not a valid ID");
    }
}
