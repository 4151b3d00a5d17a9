//! Transform errors.
//!
//! Every fallible public operation returns a [`TransformError`] or one of the specific errors it wraps.
//! Nothing is retried: the first error aborts the transform.

use thiserror::Error;

use crate::{
    data_type::ElementType, format::DataModel, format::FileFormat, source::SourceError,
    target::TargetError, transform::TransformState,
};

/// A transform error.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Invalid configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The source schema cannot be represented in the target.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Two variables require the same dimension with different sizes.
    #[error(transparent)]
    DimensionConflict(#[from] DimensionConflictError),
    /// The response would be too large.
    #[error(transparent)]
    SizeLimitExceeded(#[from] SizeLimitExceededError),
    /// The target format library reported an error.
    #[error(transparent)]
    TargetFormat(#[from] TargetFormatError),
    /// An internal invariant was violated.
    #[error(transparent)]
    InternalInvariant(#[from] InternalInvariantError),
    /// Reading source values failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The transform was cancelled.
    #[error("the transform was cancelled")]
    Cancelled,
}

/// An invalid configuration.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigurationError(String);

impl ConfigurationError {
    /// Create a new configuration error.
    #[must_use]
    pub fn new(message: String) -> Self {
        Self(message)
    }
}

/// The source schema cannot be represented in the target.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The element type of a variable has no representation in the data model.
    #[error("variable {variable} has element type {element_type}, which the {model} data model cannot represent")]
    UnsupportedElementType {
        /// The variable name.
        variable: String,
        /// The element type.
        element_type: ElementType,
        /// The target data model.
        model: DataModel,
    },
    /// The type of an attribute has no representation in the data model.
    #[error("attribute {attribute} has type {attribute_type}, which the {model} data model cannot represent without overflow; use the netCDF-4 enhanced model")]
    UnsupportedAttributeType {
        /// The attribute name.
        attribute: String,
        /// The attribute type.
        attribute_type: &'static str,
        /// The target data model.
        model: DataModel,
    },
    /// The number of values does not match the variable shape.
    #[error("variable {variable} has {actual} values, but its shape requires {expected}")]
    ValueCountMismatch {
        /// The variable name.
        variable: String,
        /// The number of elements in the shape.
        expected: u64,
        /// The number of values read.
        actual: u64,
    },
    /// The values read do not have the declared element type.
    #[error("variable {variable} is declared as {expected}, but its values are {actual}")]
    ValueTypeMismatch {
        /// The variable name.
        variable: String,
        /// The declared element type.
        expected: ElementType,
        /// The element type of the values.
        actual: ElementType,
    },
    /// A variable refers to an enumeration that is not defined in scope.
    #[error("variable {variable} refers to undefined enumeration {enumeration}")]
    UnknownEnumeration {
        /// The variable name.
        variable: String,
        /// The enumeration name.
        enumeration: String,
    },
    /// A field of an array of structures is not a scalar or array.
    #[error("field {field} of array of structures {variable} is not a scalar or array")]
    UnsupportedStructureField {
        /// The array of structures.
        variable: String,
        /// The field name.
        field: String,
    },
    /// An enumeration has a base type that is not an integer.
    #[error("enumeration {enumeration} has base type {base}, which is not an integer type")]
    InvalidEnumerationBase {
        /// The enumeration name.
        enumeration: String,
        /// The base type.
        base: ElementType,
    },
}

/// A dimension requested with a size different to an existing dimension of the same name.
#[derive(Debug, Error)]
#[error("dimension {name} found with size {existing}, but a variable requires size {requested}")]
pub struct DimensionConflictError {
    name: String,
    existing: u64,
    requested: u64,
}

impl DimensionConflictError {
    /// Create a new dimension conflict error.
    #[must_use]
    pub fn new(name: String, existing: u64, requested: u64) -> Self {
        Self {
            name,
            existing,
            requested,
        }
    }

    /// The dimension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The size of the existing dimension.
    #[must_use]
    pub fn existing(&self) -> u64 {
        self.existing
    }

    /// The requested size.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.requested
    }
}

/// The estimated response exceeds an admission limit.
#[derive(Debug, Error)]
pub enum SizeLimitExceededError {
    /// The whole response is too large.
    #[error("the requested response is too big: its estimated size is {estimated} bytes, but {format} responses are limited to {limit} bytes (configured limit: {}, format limit: {}); constrain the request to select less data", describe_limit(*.configured), describe_limit(.structural.unwrap_or(0)))]
    Response {
        /// The estimated size in bytes.
        estimated: u64,
        /// The effective limit in bytes.
        limit: u64,
        /// The configured limit in bytes, zero if unlimited.
        configured: u64,
        /// The format limit in bytes.
        structural: Option<u64>,
        /// The target format.
        format: FileFormat,
    },
    /// A single variable is too large for the format.
    #[error("variable {variable} is too big: its estimated size is {estimated} bytes, but {format} variables are limited to {limit} bytes; use a netCDF-4 format or constrain the request")]
    Variable {
        /// The variable name.
        variable: String,
        /// The estimated size in bytes.
        estimated: u64,
        /// The format limit in bytes.
        limit: u64,
        /// The target format.
        format: FileFormat,
    },
}

fn describe_limit(limit: u64) -> String {
    if limit == 0 {
        "unlimited".to_string()
    } else {
        format!("{limit} bytes")
    }
}

/// A target format operation failed.
#[derive(Debug, Error)]
#[error("{operation}: {source}")]
pub struct TargetFormatError {
    operation: String,
    source: TargetError,
}

impl TargetFormatError {
    /// Create a new target format error for a failed `operation`.
    #[must_use]
    pub fn new(operation: String, source: TargetError) -> Self {
        Self { operation, source }
    }

    /// A description of the failed operation.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The error reported by the target.
    #[must_use]
    pub fn target_error(&self) -> &TargetError {
        &self.source
    }
}

/// An internal invariant violation.
#[derive(Debug, Error)]
pub enum InternalInvariantError {
    /// A variable handled as an array is not one.
    #[error("variable {0} is not an array")]
    NotAnArray(String),
    /// A variable handled as a structure is not one.
    #[error("variable {0} is not a structure")]
    NotAStructure(String),
    /// A variable handled as a paired-array container is not one.
    #[error("variable {0} is not a paired-array container")]
    NotAPairedContainer(String),
    /// A dimension was used after it was released.
    #[error("dimension {0} is not registered")]
    UnknownDimension(usize),
    /// A dimension was used by a variable before it was defined in the target.
    #[error("dimension {0} has not been defined in the target")]
    UndefinedDimension(String),
    /// A scope has no target group.
    #[error("scope {0} has no target group")]
    UnknownScope(usize),
    /// A values buffer cannot be converted to the storage type of its variable.
    #[error("values of variable {0} cannot be converted to their storage type")]
    Conversion(String),
    /// An operation was attempted in the wrong transform state.
    #[error("{operation} is not valid in the {state} state")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The current state.
        state: TransformState,
    },
}

impl InternalInvariantError {
    /// Log the violation at error level and return it.
    ///
    /// Development builds panic instead of returning.
    pub(crate) fn logged(self) -> Self {
        log::error!("internal invariant violated: {self}");
        debug_assert!(false, "internal invariant violated: {self}");
        self
    }
}
