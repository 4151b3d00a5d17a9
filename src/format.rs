//! Target file formats and data models.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The size limit of a classic format file, 2 GiB less one byte.
pub const CLASSIC_FILE_LIMIT: u64 = (1 << 31) - 1;

/// The size limit of a single fixed-size variable in a 64-bit offset file, 4 GiB less four bytes.
pub const OFFSET64_VARIABLE_LIMIT: u64 = (1 << 32) - 4;

/// A target file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    /// The classic format with 32-bit offsets.
    #[display("netCDF classic")]
    Classic,
    /// The classic data model with 64-bit offsets.
    #[display("netCDF 64-bit offset")]
    Offset64,
    /// The netCDF-4 format with the enhanced data model.
    #[default]
    #[display("netCDF-4")]
    Netcdf4,
    /// The netCDF-4 format restricted to the classic data model.
    #[display("netCDF-4 classic model")]
    Netcdf4Classic,
}

/// The data model a file format supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DataModel {
    /// No groups, no unsigned or 64-bit integers, no user defined types.
    #[display("classic")]
    Classic,
    /// Groups, the full set of integer types and enumerations.
    #[display("enhanced")]
    Enhanced,
}

impl FileFormat {
    /// The data model of the format.
    #[must_use]
    pub fn data_model(self) -> DataModel {
        match self {
            Self::Netcdf4 => DataModel::Enhanced,
            Self::Classic | Self::Offset64 | Self::Netcdf4Classic => DataModel::Classic,
        }
    }

    /// Returns true if the format is stored as netCDF-4 (HDF5), which supports chunking and compression.
    #[must_use]
    pub fn is_netcdf4(self) -> bool {
        matches!(self, Self::Netcdf4 | Self::Netcdf4Classic)
    }

    /// Returns true if the format can store nested groups.
    #[must_use]
    pub fn supports_groups(self) -> bool {
        self.data_model() == DataModel::Enhanced
    }

    /// The largest total file size the format can address, if bounded.
    #[must_use]
    pub fn structural_limit(self) -> Option<u64> {
        match self {
            Self::Classic => Some(CLASSIC_FILE_LIMIT),
            Self::Offset64 | Self::Netcdf4 | Self::Netcdf4Classic => None,
        }
    }

    /// The largest size of a single variable the format can store, if bounded.
    #[must_use]
    pub fn variable_limit(self) -> Option<u64> {
        match self {
            Self::Offset64 => Some(OFFSET64_VARIABLE_LIMIT),
            Self::Classic | Self::Netcdf4 | Self::Netcdf4Classic => None,
        }
    }
}
