use derive_more::Display;
use itertools::Itertools;

use crate::{
    chunk_layout::ChunkPlan,
    data_type::{ElementType, NcType},
    dimension::{DimensionId, ScopeId},
    error::{InternalInvariantError, SchemaError, TransformError},
    source::{Attributes, DataVariable, Variable},
    target::TargetValues,
    values::ElementValues,
};

/// A flattened variable, ready to be defined and written.
///
/// Borrows the source variable it was flattened from; its values are read when it is written.
#[derive(Debug, Clone, Display)]
#[display("{name} [{}] {nc_type}", shape.iter().join(", "))]
pub struct VariableDescriptor<'s> {
    pub(super) name: String,
    pub(super) original_name: String,
    pub(super) element_type: ElementType,
    pub(super) nc_type: NcType,
    pub(super) storage_type: NcType,
    pub(super) shape: Vec<u64>,
    pub(super) dimensions: Vec<DimensionId>,
    pub(super) chunk_plan: Option<ChunkPlan>,
    pub(super) embed: Vec<String>,
    pub(super) scope: ScopeId,
    pub(super) variable: &'s Variable,
    pub(super) data: &'s DataVariable,
    pub(super) parent_attributes: Vec<(String, &'s Attributes)>,
    pub(super) text_values: Option<ElementValues>,
}

impl<'s> VariableDescriptor<'s> {
    /// The flattened, sanitized name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The embed path and source name joined, before sanitization.
    #[must_use]
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Returns true if sanitization changed the name.
    #[must_use]
    pub fn is_renamed(&self) -> bool {
        self.name != self.original_name
    }

    /// The source element type.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The declared target type, an enumeration type for enumerated variables.
    #[must_use]
    pub fn nc_type(&self) -> NcType {
        self.nc_type
    }

    /// The type values are stored as.
    #[must_use]
    pub fn storage_type(&self) -> NcType {
        self.storage_type
    }

    /// The shape of the values, excluding the length axis of text variables.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The dimensions of each axis, including the length axis of text variables.
    #[must_use]
    pub fn dimensions(&self) -> &[DimensionId] {
        &self.dimensions
    }

    /// The chunk plan, [`None`] for scalars.
    #[must_use]
    pub fn chunk_plan(&self) -> Option<&ChunkPlan> {
        self.chunk_plan.as_ref()
    }

    /// The names of the enclosing structures.
    #[must_use]
    pub fn embed(&self) -> &[String] {
        &self.embed
    }

    /// The dimension scope.
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// The source variable.
    #[must_use]
    pub fn variable(&self) -> &'s Variable {
        self.variable
    }

    /// The attribute tables of the enclosing containers, outermost first, with their attribute name prefixes.
    #[must_use]
    pub fn parent_attributes(&self) -> &[(String, &'s Attributes)] {
        &self.parent_attributes
    }

    /// Returns true if the values are stored as fixed-width text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.text_values.is_some()
    }

    /// The number of values.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape
            .iter()
            .fold(1u64, |product, size| product.saturating_mul(*size))
    }

    /// Read the values and convert them to their storage representation.
    ///
    /// Text values are padded to `text_width` bytes.
    ///
    /// # Errors
    /// Returns a [`TransformError`] if the values cannot be read, have the wrong type, or have the wrong count.
    pub fn read_target_values(&self, text_width: u64) -> Result<TargetValues, TransformError> {
        let read;
        let values = if let Some(values) = &self.text_values {
            values
        } else {
            read = self.data.values.read()?;
            read.as_ref()
        };
        check_values(&self.original_name, self.element_type, self.num_elements(), values)?;
        let text_width = usize::try_from(text_width)
            .map_err(|_| InternalInvariantError::Conversion(self.name.clone()).logged())?;
        values
            .to_target(self.storage_type, text_width)
            .ok_or_else(|| InternalInvariantError::Conversion(self.name.clone()).logged().into())
    }
}

/// Check that `values` are of `element_type` and number `expected`.
pub(super) fn check_values(
    variable: &str,
    element_type: ElementType,
    expected: u64,
    values: &ElementValues,
) -> Result<(), SchemaError> {
    if !values.matches(element_type) {
        return Err(SchemaError::ValueTypeMismatch {
            variable: variable.to_string(),
            expected: element_type,
            actual: values.element_type(),
        });
    }
    if values.len() as u64 != expected {
        return Err(SchemaError::ValueCountMismatch {
            variable: variable.to_string(),
            expected,
            actual: values.len() as u64,
        });
    }
    Ok(())
}
