//! Group mapping.
//!
//! When the target format has groups, source groups are mapped onto target groups:
//!  - an unconstrained dataset maps every group; otherwise a group is mapped if it or a descendant has a selected variable,
//!    together with its ancestors,
//!  - each mapped group defines its declared dimensions, its enumerations, its flattened variables, then its attributes,
//!    before its child groups are mapped,
//!  - a declared dimension is defined with the largest size any selected variable in its scope requires.
//!
//! Named dimensions resolve to the nearest enclosing declaration.

use std::collections::{BTreeSet, HashMap};

use crate::{
    attributes, define,
    dimension::ScopeId,
    error::{TargetFormatError, TransformError},
    flatten::{SchemaFlattener, VariableDescriptor},
    source::{ArrayDimension, Attributes, Group, Variable, VariableKind},
    target::{NcGroupId, NcVarId, TargetFormat},
    transform::TransformContext,
};

/// The path of the root group.
pub const ROOT_PATH: &str = "/";

/// The path of a child group named `name` of the group at `parent`.
#[must_use]
pub fn child_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// The groups to map and the sizes of their declared dimensions.
#[derive(Debug, Clone, Default)]
pub struct GroupPlan {
    unconstrained: bool,
    included: BTreeSet<String>,
    dimension_sizes: HashMap<String, u64>,
}

impl GroupPlan {
    /// Plan the mapping of the groups under `root`.
    #[must_use]
    pub fn new(root: &Group, unconstrained: bool) -> Self {
        let mut plan = Self {
            unconstrained,
            ..Self::default()
        };
        plan.include(root, ROOT_PATH, unconstrained);
        plan.included.insert(ROOT_PATH.to_string());
        let mut scopes = Vec::new();
        plan.reconcile_group(root, ROOT_PATH, &mut scopes);
        plan
    }

    /// Returns true if the group at `path` is mapped.
    #[must_use]
    pub fn is_included(&self, path: &str) -> bool {
        self.included.contains(path)
    }

    /// The paths of the mapped groups, in lexicographic order.
    pub fn included(&self) -> impl Iterator<Item = &str> {
        self.included.iter().map(String::as_str)
    }

    /// The size to define the dimension `declared` of the group at `group_path` with.
    ///
    /// This is the largest size a selected variable requires. A dimension no selected variable uses keeps its declared
    /// size if the dataset is unconstrained, and is not defined otherwise.
    #[must_use]
    pub fn dimension_size(&self, group_path: &str, declared: &ArrayDimension) -> Option<u64> {
        self.dimension_sizes
            .get(&child_path(group_path, &declared.name))
            .copied()
            .or(self.unconstrained.then_some(declared.size))
    }

    /// Mark the group at `path` and its mapped descendants as mapped. Returns true if the group is mapped.
    fn include(&mut self, group: &Group, path: &str, unconstrained: bool) -> bool {
        let mut included = unconstrained || group.variables().iter().any(Variable::has_selected_content);
        for child in group.groups() {
            included |= self.include(child, &child_path(path, child.name()), unconstrained);
        }
        if included {
            self.included.insert(path.to_string());
        }
        included
    }

    fn reconcile_group<'g>(
        &mut self,
        group: &'g Group,
        path: &str,
        scopes: &mut Vec<(String, &'g [ArrayDimension])>,
    ) {
        scopes.push((path.to_string(), group.dimensions()));
        for variable in group.variables() {
            self.reconcile_variable(variable, &[], scopes);
        }
        for child in group.groups() {
            self.reconcile_group(child, &child_path(path, child.name()), scopes);
        }
        scopes.pop();
    }

    fn reconcile_variable(
        &mut self,
        variable: &Variable,
        leading: &[ArrayDimension],
        scopes: &[(String, &[ArrayDimension])],
    ) {
        if !variable.has_selected_content() {
            return;
        }
        match variable.kind() {
            VariableKind::Scalar(data) | VariableKind::Array(data) => {
                for dimension in leading.iter().chain(&data.dimensions) {
                    self.reconcile_dimension(dimension, scopes);
                }
            }
            VariableKind::Structure(members) | VariableKind::Bundle(members) => {
                for member in members {
                    self.reconcile_variable(member, leading, scopes);
                }
            }
            VariableKind::Grid { array, maps } => {
                for map in maps {
                    self.reconcile_variable(map, leading, scopes);
                }
                self.reconcile_variable(array, leading, scopes);
            }
            VariableKind::StructureArray { dimensions, fields } => {
                let leading = [leading, dimensions.as_slice()].concat();
                for field in fields {
                    self.reconcile_variable(field, &leading, scopes);
                }
            }
        }
    }

    fn reconcile_dimension(
        &mut self,
        dimension: &ArrayDimension,
        scopes: &[(String, &[ArrayDimension])],
    ) {
        if dimension.name.is_empty() {
            return;
        }
        let declaring = scopes.iter().rev().find(|(_, declared)| {
            declared
                .iter()
                .any(|declared| declared.name == dimension.name)
        });
        if let Some((path, _)) = declaring {
            let size = self
                .dimension_sizes
                .entry(child_path(path, &dimension.name))
                .or_default();
            *size = (*size).max(dimension.size);
        }
    }
}

/// A mapped group.
#[derive(Debug)]
pub struct GroupNode<'s> {
    /// The path of the source group.
    pub path: String,
    /// The dimension scope of the group.
    pub scope: ScopeId,
    /// The target group.
    pub group: NcGroupId,
    /// The flattened variables of the group and their target ids, in definition order.
    pub variables: Vec<(VariableDescriptor<'s>, NcVarId)>,
    /// Attributes promoted from bundles, not yet written for the root group.
    pub promoted_attributes: Attributes,
    /// The mapped child groups.
    pub children: Vec<GroupNode<'s>>,
}

impl<'s> GroupNode<'s> {
    /// Iterate over the variables of this group and its descendants, depth first.
    pub fn variables_recursive(&self) -> Box<dyn Iterator<Item = &(VariableDescriptor<'s>, NcVarId)> + '_> {
        Box::new(
            self.variables
                .iter()
                .chain(self.children.iter().flat_map(GroupNode::variables_recursive)),
        )
    }
}

/// Maps source groups onto target groups.
pub struct GroupMapper<'c, 't, T: TargetFormat + ?Sized> {
    context: &'c mut TransformContext,
    target: &'t mut T,
    plan: GroupPlan,
}

impl<'c, 't, T: TargetFormat + ?Sized> GroupMapper<'c, 't, T> {
    /// Create a mapper of the groups under `root`.
    pub fn new(
        context: &'c mut TransformContext,
        target: &'t mut T,
        root: &Group,
        unconstrained: bool,
    ) -> Self {
        Self {
            context,
            target,
            plan: GroupPlan::new(root, unconstrained),
        }
    }

    /// The group plan.
    #[must_use]
    pub fn plan(&self) -> &GroupPlan {
        &self.plan
    }

    /// Map `root` onto the target group `group`.
    ///
    /// The attributes of the root group are not written: they are the global attributes of the transform.
    ///
    /// # Errors
    /// Returns a [`TransformError`] if a variable cannot be flattened or the target rejects a definition.
    pub fn map_root<'s>(
        &mut self,
        root: &'s Group,
        group: NcGroupId,
    ) -> Result<GroupNode<'s>, TransformError> {
        self.map_group(root, ROOT_PATH.to_string(), ScopeId::ROOT, group)
    }

    fn map_group<'s>(
        &mut self,
        source: &'s Group,
        path: String,
        scope: ScopeId,
        group: NcGroupId,
    ) -> Result<GroupNode<'s>, TransformError> {
        log::debug!("mapping group {path}");
        self.context.set_scope_group(scope, group);

        for dimension in source.dimensions() {
            let Some(size) = self.plan.dimension_size(&path, dimension) else {
                log::trace!("skipping unused dimension {} of {path}", dimension.name);
                continue;
            };
            let id = self
                .context
                .dimensions_mut()
                .declare(scope, &dimension.name, size);
            define::define_dimension(self.target, self.context, id)?;
        }

        for enumeration in source.enumerations() {
            define::define_enumeration(self.target, self.context, scope, group, enumeration)?;
        }

        let flattened = SchemaFlattener::new(self.context, scope)
            .with_lexical_dimensions(true)
            .flatten(source.variables())?;
        let mut variables = Vec::with_capacity(flattened.descriptors.len());
        for descriptor in flattened.descriptors {
            let id = define::define_variable(self.target, self.context, &descriptor)?;
            variables.push((descriptor, id));
        }

        let promoted_attributes = if scope == ScopeId::ROOT {
            flattened.promoted_attributes
        } else {
            let mut group_attributes = source.attributes().clone();
            group_attributes.extend(&flattened.promoted_attributes);
            attributes::define_group_attributes(
                self.target,
                self.context,
                group,
                &group_attributes,
                false,
            )?;
            Attributes::default()
        };

        let mut children = Vec::new();
        for child in source.groups() {
            let child_path = child_path(&path, child.name());
            if !self.plan.is_included(&child_path) {
                log::trace!("skipping group {child_path} without selected variables");
                continue;
            }
            let name = self.context.sanitizer().sanitize(child.name());
            let child_group = self
                .target
                .define_group(group, &name)
                .map_err(|err| TargetFormatError::new(format!("define group {child_path}"), err))?;
            let child_scope = self.context.dimensions_mut().add_scope(scope);
            children.push(self.map_group(child, child_path, child_scope, child_group)?);
        }

        Ok(GroupNode {
            path,
            scope,
            group,
            variables,
            promoted_attributes,
            children,
        })
    }
}
