use crate::data_type::ElementType;

use super::{ArrayDimension, Attributes, Variable};

/// An enumeration type declared by a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    /// The enumeration name.
    pub name: String,
    /// The integer base type.
    pub base: ElementType,
    /// The member labels and values, in declaration order.
    pub members: Vec<(String, i64)>,
}

impl EnumDefinition {
    /// Create a new enumeration definition.
    #[must_use]
    pub fn new(name: &str, base: ElementType, members: &[(&str, i64)]) -> Self {
        Self {
            name: name.to_string(),
            base,
            members: members
                .iter()
                .map(|(label, value)| ((*label).to_string(), *value))
                .collect(),
        }
    }
}

/// A source group.
#[derive(Debug, Clone, Default)]
pub struct Group {
    name: String,
    attributes: Attributes,
    dimensions: Vec<ArrayDimension>,
    enumerations: Vec<EnumDefinition>,
    variables: Vec<Variable>,
    groups: Vec<Group>,
}

impl Group {
    /// Create an empty group. The root group of a dataset has an empty name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the group attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Declare a shared dimension.
    #[must_use]
    pub fn with_dimension(mut self, name: &str, size: u64) -> Self {
        self.dimensions.push(ArrayDimension::new(name, size));
        self
    }

    /// Declare an enumeration type.
    #[must_use]
    pub fn with_enumeration(mut self, enumeration: EnumDefinition) -> Self {
        self.enumerations.push(enumeration);
        self
    }

    /// Add a variable.
    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Add a child group.
    #[must_use]
    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// The group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The declared dimensions.
    #[must_use]
    pub fn dimensions(&self) -> &[ArrayDimension] {
        &self.dimensions
    }

    /// The declared enumerations.
    #[must_use]
    pub fn enumerations(&self) -> &[EnumDefinition] {
        &self.enumerations
    }

    /// The variables.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The child groups.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Returns true if the group or a descendant has a selected variable.
    #[must_use]
    pub fn has_selected_content(&self) -> bool {
        self.variables.iter().any(Variable::has_selected_content)
            || self.groups.iter().any(Group::has_selected_content)
    }

    /// Returns true if every variable of the group and its descendants is fully selected.
    #[must_use]
    pub fn is_fully_selected(&self) -> bool {
        self.variables.iter().all(Variable::is_fully_selected)
            && self.groups.iter().all(Group::is_fully_selected)
    }

    fn promote_suffixed_structures(&mut self, suffix: &str) {
        for variable in &mut self.variables {
            variable.promote_suffixed_structures(suffix);
        }
        for group in &mut self.groups {
            group.promote_suffixed_structures(suffix);
        }
    }
}

/// A source dataset.
///
/// The attributes of the root group are the dataset (global) attributes.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    container_kind: Option<String>,
    root: Group,
}

impl Dataset {
    /// Create a dataset from its root group.
    #[must_use]
    pub fn new(root: Group) -> Self {
        Self {
            container_kind: None,
            root,
        }
    }

    /// Set the container kind of the source, such as `h5`.
    ///
    /// It determines the prefix of names that do not start with a letter or `_`.
    #[must_use]
    pub fn with_container_kind(mut self, container_kind: &str) -> Self {
        self.container_kind = Some(container_kind.to_string());
        self
    }

    /// The container kind of the source, if declared.
    #[must_use]
    pub fn container_kind(&self) -> Option<&str> {
        self.container_kind.as_deref()
    }

    /// The root group.
    #[must_use]
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// The dataset attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.root.attributes
    }

    /// Returns true if every variable of the dataset is selected.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.root.is_fully_selected()
    }

    /// Convert every structure whose name ends with `suffix` into a bundle, whose members are flattened into the enclosing scope.
    pub fn promote_suffixed_structures(&mut self, suffix: &str) {
        self.root.promote_suffixed_structures(suffix);
    }
}
