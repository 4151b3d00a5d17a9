use std::collections::HashMap;

use crate::{
    chunk_layout::ChunkLayoutPlanner,
    config::Config,
    dimension::{DimensionRegistry, ScopeId},
    error::InternalInvariantError,
    flatten::SharedMapTable,
    format::{DataModel, FileFormat},
    name::NameSanitizer,
    target::{NcGroupId, NcTypeId},
};

/// The state of one transform.
///
/// Owns the dimensions, shared maps and enumeration types of the transform, and the target group of each scope.
/// Nothing is shared between transforms.
#[derive(Debug, Clone)]
pub struct TransformContext {
    config: Config,
    sanitizer: NameSanitizer,
    planner: ChunkLayoutPlanner,
    dimensions: DimensionRegistry,
    shared_maps: SharedMapTable,
    enumerations: HashMap<(ScopeId, String), NcTypeId>,
    scope_groups: HashMap<ScopeId, NcGroupId>,
}

impl TransformContext {
    /// Create a context for a source of `container_kind` with `config`.
    #[must_use]
    pub fn new(config: Config, container_kind: Option<&str>) -> Self {
        let sanitizer = NameSanitizer::for_container(
            container_kind,
            config.name_prefix(),
            config.embed_separator(),
        );
        Self {
            planner: ChunkLayoutPlanner::new(*config.chunk_layout()),
            dimensions: DimensionRegistry::new(sanitizer.clone()),
            shared_maps: SharedMapTable::default(),
            enumerations: HashMap::new(),
            scope_groups: HashMap::new(),
            sanitizer,
            config,
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The target file format.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.config.file_format()
    }

    /// The data model of the target file format.
    #[must_use]
    pub fn model(&self) -> DataModel {
        self.config.file_format().data_model()
    }

    /// The name sanitizer.
    #[must_use]
    pub fn sanitizer(&self) -> &NameSanitizer {
        &self.sanitizer
    }

    /// The chunk layout planner.
    #[must_use]
    pub fn planner(&self) -> &ChunkLayoutPlanner {
        &self.planner
    }

    /// The dimension registry.
    #[must_use]
    pub fn dimensions(&self) -> &DimensionRegistry {
        &self.dimensions
    }

    /// Mutable access to the dimension registry.
    pub fn dimensions_mut(&mut self) -> &mut DimensionRegistry {
        &mut self.dimensions
    }

    /// The shared map table.
    #[must_use]
    pub fn shared_maps(&self) -> &SharedMapTable {
        &self.shared_maps
    }

    /// Mutable access to the shared map table.
    pub fn shared_maps_mut(&mut self) -> &mut SharedMapTable {
        &mut self.shared_maps
    }

    /// Record the target type of the enumeration named `name` declared in `scope`.
    pub fn register_enumeration(&mut self, scope: ScopeId, name: &str, id: NcTypeId) {
        self.enumerations.insert((scope, name.to_string()), id);
    }

    /// Find the target type of the enumeration named `name` visible from `scope`, nearest scope first.
    #[must_use]
    pub fn lookup_enumeration(&self, scope: ScopeId, name: &str) -> Option<NcTypeId> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(id) = self.enumerations.get(&(scope, name.to_string())) {
                return Some(*id);
            }
            current = self.dimensions.parent(scope);
        }
        None
    }

    /// Record the target group of `scope`.
    pub fn set_scope_group(&mut self, scope: ScopeId, group: NcGroupId) {
        self.scope_groups.insert(scope, group);
    }

    /// The target group of `scope`.
    ///
    /// # Errors
    /// Returns an [`InternalInvariantError`] if no group was recorded for `scope`.
    pub fn group_of(&self, scope: ScopeId) -> Result<NcGroupId, InternalInvariantError> {
        self.scope_groups
            .get(&scope)
            .copied()
            .ok_or_else(|| InternalInvariantError::UnknownScope(scope.index()).logged())
    }

    /// Clear every dimension, shared map, enumeration and scope.
    pub fn reset_all(&mut self) {
        self.dimensions.reset_all();
        self.shared_maps.clear();
        self.enumerations.clear();
        self.scope_groups.clear();
    }
}
