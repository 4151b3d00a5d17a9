//! The source dataset.
//!
//! A [`Dataset`] is a tree of [`Group`]s holding [`Variable`]s, declared dimensions, enumeration definitions and [`Attributes`].
//! Each variable carries a selection flag: only selected variables are exported.
//!
//! Values are either held inline or read on demand through a [`ValueReader`].

mod attribute;
mod group;
mod variable;

use std::{borrow::Cow, sync::Arc};

pub use attribute::{Attribute, AttributeValue, Attributes};
pub use group::{Dataset, EnumDefinition, Group};
pub use variable::{ArrayDimension, DataVariable, Variable, VariableKind};

use thiserror::Error;

use crate::values::ElementValues;

/// A failure to read source values.
#[derive(Debug, Error)]
#[error("failed to read source values: {0}")]
pub struct SourceError(String);

impl SourceError {
    /// Create a new source error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Reads the values of a variable on demand.
pub trait ValueReader: Send + Sync {
    /// Read every value of the variable, in row-major order.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the values cannot be read.
    fn read(&self) -> Result<ElementValues, SourceError>;
}

/// The values of a source variable.
#[derive(Clone)]
pub enum Values {
    /// Values held in memory.
    Inline(ElementValues),
    /// Values read on demand.
    Deferred(Arc<dyn ValueReader>),
}

impl core::fmt::Debug for Values {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Inline(values) => f.debug_tuple("Inline").field(values).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

impl From<ElementValues> for Values {
    fn from(values: ElementValues) -> Self {
        Self::Inline(values)
    }
}

macro_rules! values_from {
    ( $t:ty ) => {
        impl From<Vec<$t>> for Values {
            fn from(values: Vec<$t>) -> Self {
                Self::Inline(ElementValues::from(values))
            }
        }
    };
}

values_from!(u8);
values_from!(i8);
values_from!(i16);
values_from!(u16);
values_from!(i32);
values_from!(u32);
values_from!(i64);
values_from!(u64);
values_from!(f32);
values_from!(f64);
values_from!(String);
values_from!(&str);

impl Values {
    /// Read the values.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if deferred values cannot be read.
    pub fn read(&self) -> Result<Cow<'_, ElementValues>, SourceError> {
        match self {
            Self::Inline(values) => Ok(Cow::Borrowed(values)),
            Self::Deferred(reader) => reader.read().map(Cow::Owned),
        }
    }

    /// The inline values, if held in memory.
    #[must_use]
    pub fn inline(&self) -> Option<&ElementValues> {
        match self {
            Self::Inline(values) => Some(values),
            Self::Deferred(_) => None,
        }
    }
}
