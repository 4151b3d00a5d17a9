use crate::data_type::ElementType;

use super::{Attributes, Values};

/// A dimension of a source array, or a dimension declared by a group.
///
/// An empty name marks an anonymous dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDimension {
    /// The dimension name, empty if anonymous.
    pub name: String,
    /// The dimension size after any constraint.
    pub size: u64,
}

impl ArrayDimension {
    /// Create a named dimension.
    #[must_use]
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }

    /// Create an anonymous dimension.
    #[must_use]
    pub fn anonymous(size: u64) -> Self {
        Self {
            name: String::new(),
            size,
        }
    }
}

/// The data of a scalar or array variable.
#[derive(Debug, Clone)]
pub struct DataVariable {
    /// The element type.
    pub element_type: ElementType,
    /// The dimensions, empty for a scalar.
    pub dimensions: Vec<ArrayDimension>,
    /// The values.
    pub values: Values,
    /// The name of the enumeration of an integer variable, if any.
    pub enumeration: Option<String>,
}

impl DataVariable {
    /// The dimension sizes.
    #[must_use]
    pub fn shape(&self) -> Vec<u64> {
        self.dimensions.iter().map(|d| d.size).collect()
    }

    /// The number of elements, saturating at [`u64::MAX`].
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.dimensions
            .iter()
            .fold(1u64, |product, d| product.saturating_mul(d.size))
    }
}

/// The kind of a source variable.
#[derive(Debug, Clone)]
pub enum VariableKind {
    /// A single value.
    Scalar(DataVariable),
    /// A multi-dimensional array of values.
    Array(DataVariable),
    /// A record of member variables.
    Structure(Vec<Variable>),
    /// A paired-array container: an array and the one-dimensional coordinate arrays (maps) of its dimensions.
    Grid {
        /// The data array.
        array: Box<Variable>,
        /// The maps.
        maps: Vec<Variable>,
    },
    /// A structure whose members belong to the enclosing scope.
    Bundle(Vec<Variable>),
    /// An array whose elements are records.
    ///
    /// Each field holds the values of that member for every element, in row-major order over `dimensions` then the field's own dimensions.
    StructureArray {
        /// The dimensions of the array.
        dimensions: Vec<ArrayDimension>,
        /// The record fields.
        fields: Vec<Variable>,
    },
}

/// A source variable.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    attributes: Attributes,
    selected: bool,
    kind: VariableKind,
}

impl Variable {
    fn new(name: &str, kind: VariableKind) -> Self {
        Self {
            name: name.to_string(),
            attributes: Attributes::default(),
            selected: true,
            kind,
        }
    }

    /// Create a scalar variable.
    #[must_use]
    pub fn scalar(name: &str, element_type: ElementType, values: impl Into<Values>) -> Self {
        Self::new(
            name,
            VariableKind::Scalar(DataVariable {
                element_type,
                dimensions: Vec::new(),
                values: values.into(),
                enumeration: None,
            }),
        )
    }

    /// Create an array variable.
    #[must_use]
    pub fn array(
        name: &str,
        element_type: ElementType,
        dimensions: Vec<ArrayDimension>,
        values: impl Into<Values>,
    ) -> Self {
        Self::new(
            name,
            VariableKind::Array(DataVariable {
                element_type,
                dimensions,
                values: values.into(),
                enumeration: None,
            }),
        )
    }

    /// Create a structure variable.
    #[must_use]
    pub fn structure(name: &str, members: Vec<Variable>) -> Self {
        Self::new(name, VariableKind::Structure(members))
    }

    /// Create a paired-array container.
    #[must_use]
    pub fn grid(name: &str, array: Variable, maps: Vec<Variable>) -> Self {
        Self::new(
            name,
            VariableKind::Grid {
                array: Box::new(array),
                maps,
            },
        )
    }

    /// Create a bundle whose members are promoted into the enclosing scope.
    #[must_use]
    pub fn bundle(name: &str, members: Vec<Variable>) -> Self {
        Self::new(name, VariableKind::Bundle(members))
    }

    /// Create an array of structures.
    #[must_use]
    pub fn structure_array(
        name: &str,
        dimensions: Vec<ArrayDimension>,
        fields: Vec<Variable>,
    ) -> Self {
        Self::new(name, VariableKind::StructureArray { dimensions, fields })
    }

    /// Set the attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the selection flag.
    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Mark an integer scalar or array as an instance of the enumeration named `enumeration`.
    ///
    /// Has no effect on other variable kinds.
    #[must_use]
    pub fn with_enumeration(mut self, enumeration: &str) -> Self {
        if let VariableKind::Scalar(data) | VariableKind::Array(data) = &mut self.kind {
            data.enumeration = Some(enumeration.to_string());
        }
        self
    }

    /// The variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The variable kind.
    #[must_use]
    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    /// The own selection flag of the variable.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// The data of a scalar or array variable.
    #[must_use]
    pub fn data(&self) -> Option<&DataVariable> {
        match &self.kind {
            VariableKind::Scalar(data) | VariableKind::Array(data) => Some(data),
            _ => None,
        }
    }

    /// Returns true if the variable is selected and, for composite variables, has a selected member.
    #[must_use]
    pub fn has_selected_content(&self) -> bool {
        if !self.selected {
            return false;
        }
        match &self.kind {
            VariableKind::Scalar(_) | VariableKind::Array(_) => true,
            VariableKind::Structure(members)
            | VariableKind::Bundle(members)
            | VariableKind::StructureArray {
                fields: members, ..
            } => members.iter().any(Variable::has_selected_content),
            VariableKind::Grid { array, maps } => {
                array.has_selected_content() || maps.iter().any(Variable::has_selected_content)
            }
        }
    }

    /// Returns true if the variable and every nested member is selected.
    #[must_use]
    pub fn is_fully_selected(&self) -> bool {
        if !self.selected {
            return false;
        }
        match &self.kind {
            VariableKind::Scalar(_) | VariableKind::Array(_) => true,
            VariableKind::Structure(members)
            | VariableKind::Bundle(members)
            | VariableKind::StructureArray {
                fields: members, ..
            } => members.iter().all(Variable::is_fully_selected),
            VariableKind::Grid { array, maps } => {
                array.is_fully_selected() && maps.iter().all(Variable::is_fully_selected)
            }
        }
    }

    /// Convert every structure named with `suffix`, at any depth, into a bundle.
    pub fn promote_suffixed_structures(&mut self, suffix: &str) {
        if let VariableKind::Structure(members) = &mut self.kind {
            if self.name.ends_with(suffix) {
                let members = std::mem::take(members);
                self.kind = VariableKind::Bundle(members);
            }
        }
        match &mut self.kind {
            VariableKind::Structure(members)
            | VariableKind::Bundle(members)
            | VariableKind::StructureArray {
                fields: members, ..
            } => {
                for member in members {
                    member.promote_suffixed_structures(suffix);
                }
            }
            VariableKind::Grid { .. } | VariableKind::Scalar(_) | VariableKind::Array(_) => {}
        }
    }
}
