//! Schema flattening.
//!
//! The [`SchemaFlattener`] converts the variables of one scope into a flat sequence of [`VariableDescriptor`]s:
//!  - a structure contributes its members, named by the embed path of enclosing structure names joined with the embed separator,
//!  - a paired-array container contributes its maps then its array, with maps equal to an already emitted map shared instead of emitted again,
//!  - a bundle contributes its members to the enclosing scope and its attributes to the attributes of that scope,
//!  - an array of structures contributes one array per field, with the dimensions of the array of structures prepended.
//!
//! Every descriptor carries its resolved dimensions, its chunk plan, and the attribute tables of its enclosing containers.

mod descriptor;
mod shared_map;

pub use descriptor::VariableDescriptor;
pub use shared_map::{SharedMap, SharedMapCandidate, SharedMapTable};

use itertools::Itertools;

use crate::{
    data_type::NcType,
    dimension::{DimensionId, ScopeId},
    error::{InternalInvariantError, SchemaError, TransformError},
    format::DataModel,
    source::{ArrayDimension, Attributes, DataVariable, Group, Variable, VariableKind},
    transform::TransformContext,
};

/// The result of flattening a scope.
#[derive(Debug, Default)]
pub struct Flattened<'s> {
    /// The descriptors in flattening order.
    pub descriptors: Vec<VariableDescriptor<'s>>,
    /// Attributes promoted from bundles to the enclosing group.
    pub promoted_attributes: Attributes,
}

/// Flattens the variables of a scope.
pub struct SchemaFlattener<'c, 's> {
    context: &'c mut TransformContext,
    scope: ScopeId,
    lexical: bool,
    embed: Vec<String>,
    parents: Vec<(String, &'s Attributes)>,
    flattened: Flattened<'s>,
}

impl<'c, 's> SchemaFlattener<'c, 's> {
    /// Create a flattener of variables in `scope`.
    pub fn new(context: &'c mut TransformContext, scope: ScopeId) -> Self {
        Self {
            context,
            scope,
            lexical: false,
            embed: Vec::new(),
            parents: Vec::new(),
            flattened: Flattened::default(),
        }
    }

    /// Resolve named dimensions against the dimensions declared by the enclosing groups first.
    ///
    /// A variable whose dimension size differs from the declared size gets a dimension named `<variable>_<dimension>`.
    #[must_use]
    pub fn with_lexical_dimensions(mut self, lexical: bool) -> Self {
        self.lexical = lexical;
        self
    }

    /// Flatten `variables` and return the result.
    ///
    /// # Errors
    /// Returns a [`TransformError`] if a variable cannot be flattened.
    pub fn flatten(mut self, variables: &'s [Variable]) -> Result<Flattened<'s>, TransformError> {
        for variable in variables {
            self.flatten_variable(variable)?;
        }
        Ok(self.finish())
    }

    /// The result of flattening so far.
    #[must_use]
    pub fn finish(self) -> Flattened<'s> {
        self.flattened
    }

    /// Flatten a variable of any kind. Variables without selected content are skipped.
    ///
    /// # Errors
    /// Returns a [`TransformError`] if the variable cannot be flattened.
    pub fn flatten_variable(&mut self, variable: &'s Variable) -> Result<(), TransformError> {
        if !variable.has_selected_content() {
            log::trace!("skipping unselected variable {}", variable.name());
            return Ok(());
        }
        match variable.kind() {
            VariableKind::Scalar(_) | VariableKind::Array(_) => self.flatten_array(variable),
            VariableKind::Structure(_) => self.flatten_structure(variable),
            VariableKind::Grid { .. } => self.flatten_grid(variable),
            VariableKind::Bundle(members) => self.flatten_bundle(variable, members),
            VariableKind::StructureArray { dimensions, fields } => {
                self.flatten_structure_array(variable, dimensions, fields)
            }
        }
    }

    /// Flatten a scalar or array.
    ///
    /// A one-dimensional array named like its dimension is a map: it is shared with an equal map already emitted in scope.
    ///
    /// # Errors
    /// Returns [`InternalInvariantError::NotAnArray`] if the variable is not a scalar or array,
    /// or another [`TransformError`] if it cannot be flattened.
    pub fn flatten_array(&mut self, variable: &'s Variable) -> Result<(), TransformError> {
        let data = variable
            .data()
            .ok_or_else(|| InternalInvariantError::NotAnArray(variable.name().to_string()).logged())?;
        if is_map(variable, data) {
            self.flatten_map(variable, data, "")
        } else {
            self.emit(variable, data, &[]).map(|_| ())
        }
    }

    /// Flatten the members of a structure, with the structure name pushed onto the embed path.
    ///
    /// # Errors
    /// Returns [`InternalInvariantError::NotAStructure`] if the variable is not a structure,
    /// or another [`TransformError`] if a member cannot be flattened.
    pub fn flatten_structure(&mut self, variable: &'s Variable) -> Result<(), TransformError> {
        let VariableKind::Structure(members) = variable.kind() else {
            return Err(InternalInvariantError::NotAStructure(variable.name().to_string())
                .logged()
                .into());
        };
        self.enter(variable.name(), variable.attributes());
        let result = members
            .iter()
            .try_for_each(|member| self.flatten_variable(member));
        self.leave();
        result
    }

    /// Flatten the maps then the array of a paired-array container.
    ///
    /// The container attributes are added to the array attributes.
    ///
    /// # Errors
    /// Returns [`InternalInvariantError::NotAPairedContainer`] if the variable is not a paired-array container,
    /// or another [`TransformError`] if a map or the array cannot be flattened.
    pub fn flatten_grid(&mut self, variable: &'s Variable) -> Result<(), TransformError> {
        let VariableKind::Grid { array, maps } = variable.kind() else {
            return Err(
                InternalInvariantError::NotAPairedContainer(variable.name().to_string())
                    .logged()
                    .into(),
            );
        };
        for map in maps.iter().filter(|map| map.has_selected_content()) {
            let data = map
                .data()
                .ok_or_else(|| InternalInvariantError::NotAnArray(map.name().to_string()).logged())?;
            self.flatten_map(map, data, variable.name())?;
        }
        if array.has_selected_content() {
            let data = array.data().ok_or_else(|| {
                InternalInvariantError::NotAnArray(array.name().to_string()).logged()
            })?;
            self.parents.push((String::new(), variable.attributes()));
            let result = self.emit(array, data, &[]);
            self.parents.pop();
            result?;
        }
        Ok(())
    }

    /// Flatten the variables of nested groups into this scope, with each group name pushed onto the embed path.
    ///
    /// Used when the target format has no groups. Group attributes are prefixed like structure attributes.
    ///
    /// # Errors
    /// Returns a [`TransformError`] if a variable cannot be flattened.
    pub fn flatten_nested_groups(&mut self, groups: &'s [Group]) -> Result<(), TransformError> {
        for group in groups.iter().filter(|group| group.has_selected_content()) {
            self.enter(group.name(), group.attributes());
            let result = group
                .variables()
                .iter()
                .try_for_each(|variable| self.flatten_variable(variable))
                .and_then(|()| self.flatten_nested_groups(group.groups()));
            self.leave();
            result?;
        }
        Ok(())
    }

    fn flatten_bundle(
        &mut self,
        variable: &'s Variable,
        members: &'s [Variable],
    ) -> Result<(), TransformError> {
        if self.embed.is_empty() {
            self.flattened
                .promoted_attributes
                .extend(variable.attributes());
            members
                .iter()
                .try_for_each(|member| self.flatten_variable(member))
        } else {
            let prefix = self.embed.iter().join(self.context.sanitizer().separator());
            self.parents.push((prefix, variable.attributes()));
            let result = members
                .iter()
                .try_for_each(|member| self.flatten_variable(member));
            self.parents.pop();
            result
        }
    }

    fn flatten_structure_array(
        &mut self,
        variable: &'s Variable,
        dimensions: &'s [ArrayDimension],
        fields: &'s [Variable],
    ) -> Result<(), TransformError> {
        self.enter(variable.name(), variable.attributes());
        let result = fields
            .iter()
            .filter(|field| field.has_selected_content())
            .try_for_each(|field| {
                let data = field.data().ok_or_else(|| SchemaError::UnsupportedStructureField {
                    variable: variable.name().to_string(),
                    field: field.name().to_string(),
                })?;
                self.emit(field, data, dimensions).map(|_| ())
            });
        self.leave();
        result
    }

    fn flatten_map(
        &mut self,
        variable: &'s Variable,
        data: &'s DataVariable,
        owner: &str,
    ) -> Result<(), TransformError> {
        let [dimension] = data.dimensions.as_slice() else {
            self.emit(variable, data, &[])?;
            return Ok(());
        };
        let values = data.values.read()?;
        let candidate = SharedMapCandidate {
            name: variable.name(),
            scope: self.scope,
            element_type: data.element_type,
            dimension_name: &dimension.name,
            dimension_size: dimension.size,
            values: values.as_ref(),
        };
        if let Some(index) = self.context.shared_maps().find(&candidate) {
            log::debug!("sharing map {} with {owner}", variable.name());
            self.context.shared_maps_mut().share(index, owner);
            return Ok(());
        }
        let emitted_name = self.emit(variable, data, &[])?;
        self.context
            .shared_maps_mut()
            .register(&candidate, &emitted_name, owner);
        Ok(())
    }

    fn enter(&mut self, name: &str, attributes: &'s Attributes) {
        self.embed.push(self.context.sanitizer().sanitize(name));
        let prefix = self.embed.iter().join(self.context.sanitizer().separator());
        self.parents.push((prefix, attributes));
    }

    fn leave(&mut self) {
        self.embed.pop();
        self.parents.pop();
    }

    /// Emit a descriptor of `data` with `leading` dimensions prepended, returning its name.
    fn emit(
        &mut self,
        variable: &'s Variable,
        data: &'s DataVariable,
        leading: &[ArrayDimension],
    ) -> Result<String, TransformError> {
        let embedded = self
            .context
            .sanitizer()
            .embedded_name(&self.embed, variable.name());
        let model = self.context.model();
        let storage_type =
            data.element_type
                .nc_type(model)
                .ok_or_else(|| SchemaError::UnsupportedElementType {
                    variable: embedded.original.clone(),
                    element_type: data.element_type,
                    model,
                })?;
        let nc_type = self.declared_type(&embedded.original, data, storage_type)?;

        let mut dimensions = Vec::with_capacity(leading.len() + data.dimensions.len() + 1);
        let mut shape = Vec::with_capacity(leading.len() + data.dimensions.len());
        for dimension in leading.iter().chain(&data.dimensions) {
            dimensions.push(self.resolve_dimension(variable.name(), dimension)?);
            shape.push(dimension.size);
        }

        let (text_values, chunk_plan) = if data.element_type.is_text() {
            let values = data.values.read()?.into_owned();
            descriptor::check_values(
                &embedded.original,
                data.element_type,
                shape
                    .iter()
                    .fold(1u64, |product, size| product.saturating_mul(*size)),
                &values,
            )?;
            let width = values.max_text_len().unwrap_or_default() as u64 + 1;
            let registry = self.context.dimensions_mut();
            let id =
                registry.resolve_ignoring_size(self.scope, &format!("{}_len", embedded.name), width);
            registry.grow(id, width)?;
            dimensions.push(id);
            let chunk_plan = self.context.planner().plan_with_text(&shape, width);
            (Some(values), Some(chunk_plan))
        } else if shape.is_empty() {
            (None, None)
        } else {
            (None, Some(self.context.planner().plan(&shape)))
        };

        let descriptor = VariableDescriptor {
            name: embedded.name,
            original_name: embedded.original,
            element_type: data.element_type,
            nc_type,
            storage_type,
            shape,
            dimensions,
            chunk_plan,
            embed: self.embed.clone(),
            scope: self.scope,
            variable,
            data,
            parent_attributes: self.parents.clone(),
            text_values,
        };
        log::debug!("flattened {descriptor}");
        let name = descriptor.name.clone();
        self.flattened.descriptors.push(descriptor);
        Ok(name)
    }

    fn declared_type(
        &self,
        variable: &str,
        data: &DataVariable,
        storage_type: NcType,
    ) -> Result<NcType, SchemaError> {
        match (&data.enumeration, self.context.model()) {
            (Some(enumeration), DataModel::Enhanced) => self
                .context
                .lookup_enumeration(self.scope, enumeration)
                .map(NcType::Enum)
                .ok_or_else(|| SchemaError::UnknownEnumeration {
                    variable: variable.to_string(),
                    enumeration: enumeration.clone(),
                }),
            _ => Ok(storage_type),
        }
    }

    fn resolve_dimension(
        &mut self,
        variable: &str,
        dimension: &ArrayDimension,
    ) -> Result<DimensionId, TransformError> {
        let scope = self.scope;
        let registry = self.context.dimensions_mut();
        if self.lexical && !dimension.name.is_empty() {
            if let Some(id) = registry.lookup_declared(scope, &dimension.name) {
                let declared_size = registry.get(id).map(|declared| declared.size());
                if declared_size == Some(dimension.size) {
                    registry.retain(id)?;
                    return Ok(id);
                }
                let local = format!("{variable}_{}", dimension.name);
                log::debug!(
                    "variable {variable} uses dimension {} with size {}, resolving as {local}",
                    dimension.name,
                    dimension.size
                );
                return Ok(registry.resolve::<&str>(scope, &local, dimension.size, &[])?);
            }
        }
        Ok(registry.resolve(scope, &dimension.name, dimension.size, &self.embed)?)
    }
}

/// Returns true if `variable` is a one-dimensional array named like its dimension.
fn is_map(variable: &Variable, data: &DataVariable) -> bool {
    matches!(data.dimensions.as_slice(), [dimension] if dimension.name == variable.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        data_type::ElementType,
        format::FileFormat,
        source::{AttributeValue, Values},
    };

    fn context(format: FileFormat) -> TransformContext {
        let mut config = Config::default();
        config.set_file_format(format);
        TransformContext::new(config, None)
    }

    fn names(flattened: &Flattened<'_>) -> Vec<String> {
        flattened
            .descriptors
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    #[test]
    fn structures_are_embedded() {
        let variables = vec![Variable::structure(
            "Alpha",
            vec![Variable::structure(
                "Point",
                vec![
                    Variable::scalar("x", ElementType::Float64, vec![1.0f64]),
                    Variable::scalar("y", ElementType::Float64, vec![2.0f64]),
                ],
            )
            .with_attributes(Attributes::new().with("units", AttributeValue::text("m")))],
        )];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert_eq!(names(&flattened), ["Alpha.Point.x", "Alpha.Point.y"]);

        let x = &flattened.descriptors[0];
        assert_eq!(x.embed(), ["Alpha", "Point"]);
        assert!(x.chunk_plan().is_none());
        let prefixes: Vec<&str> = x
            .parent_attributes()
            .iter()
            .map(|(prefix, _)| prefix.as_str())
            .collect();
        assert_eq!(prefixes, ["Alpha", "Alpha.Point"]);
        assert!(!x.is_renamed());
    }

    #[test]
    fn unselected_members_are_skipped() {
        let variables = vec![
            Variable::structure(
                "S",
                vec![
                    Variable::scalar("a", ElementType::Int32, vec![1i32]),
                    Variable::scalar("b", ElementType::Int32, vec![2i32]).with_selected(false),
                ],
            ),
            Variable::structure(
                "Empty",
                vec![Variable::scalar("c", ElementType::Int32, vec![3i32]).with_selected(false)],
            ),
        ];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert_eq!(names(&flattened), ["S.a"]);
    }

    #[test]
    fn grid_maps_are_shared() {
        let lat = || {
            Variable::array(
                "lat",
                ElementType::Float32,
                vec![ArrayDimension::new("lat", 2)],
                vec![-10.0f32, 10.0],
            )
        };
        let grid = |name: &str| {
            Variable::grid(
                name,
                Variable::array(
                    name,
                    ElementType::Int16,
                    vec![ArrayDimension::new("lat", 2)],
                    vec![1i16, 2],
                ),
                vec![lat()],
            )
        };
        let variables = vec![grid("sst"), grid("ice")];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert_eq!(names(&flattened), ["lat", "sst", "ice"]);

        let maps = context.shared_maps().maps();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].ref_count(), 2);
        assert_eq!(maps[0].owners(), ["sst", "ice"]);
        assert_eq!(context.dimensions().len(), 1);
    }

    #[test]
    fn text_grid_maps_are_shared() {
        let grid = |name: &str| {
            Variable::grid(
                name,
                Variable::array(
                    name,
                    ElementType::Int16,
                    vec![ArrayDimension::new("station", 2)],
                    vec![1i16, 2],
                ),
                vec![Variable::array(
                    "station",
                    ElementType::String,
                    vec![ArrayDimension::new("station", 2)],
                    vec!["a", "b"],
                )],
            )
        };
        let variables = vec![grid("pressure"), grid("wind")];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert_eq!(names(&flattened), ["station", "pressure", "wind"]);

        let maps = context.shared_maps().maps();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].element_type(), ElementType::String);
        assert_eq!(maps[0].owners(), ["pressure", "wind"]);
    }

    #[test]
    fn grid_maps_with_different_values_are_not_shared() {
        let grid = |name: &str, first: f32| {
            Variable::grid(
                name,
                Variable::array(
                    name,
                    ElementType::Int16,
                    vec![ArrayDimension::new("lat", 2)],
                    vec![1i16, 2],
                ),
                vec![Variable::array(
                    "lat",
                    ElementType::Float32,
                    vec![ArrayDimension::new("lat", 2)],
                    vec![first, 10.0],
                )],
            )
        };
        let variables = vec![grid("sst", -10.0), grid("ice", -20.0)];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        // both maps are emitted, the target rejects the second name
        assert_eq!(names(&flattened), ["lat", "sst", "lat", "ice"]);
        assert_eq!(context.shared_maps().len(), 2);
    }

    #[test]
    fn dimension_conflict_in_structure_is_qualified() {
        let variables = vec![
            Variable::array(
                "a",
                ElementType::Int32,
                vec![ArrayDimension::new("x", 2)],
                vec![1i32, 2],
            ),
            Variable::structure(
                "S",
                vec![Variable::array(
                    "b",
                    ElementType::Int32,
                    vec![ArrayDimension::new("x", 3)],
                    vec![1i32, 2, 3],
                )],
            ),
        ];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        let b = &flattened.descriptors[1];
        let dimension = context.dimensions().get(b.dimensions()[0]).unwrap();
        assert_eq!(dimension.name(), "S.x");
        assert_eq!(dimension.size(), 3);
    }

    #[test]
    fn dimension_conflict_at_top_level() {
        let variables = vec![
            Variable::array(
                "a",
                ElementType::Int32,
                vec![ArrayDimension::new("x", 2)],
                vec![1i32, 2],
            ),
            Variable::array(
                "b",
                ElementType::Int32,
                vec![ArrayDimension::new("x", 3)],
                vec![1i32, 2, 3],
            ),
        ];
        let mut context = context(FileFormat::Netcdf4);
        let error = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap_err();
        assert!(matches!(error, TransformError::DimensionConflict(_)));
    }

    #[test]
    fn text_gets_length_dimension() {
        let variables = vec![Variable::array(
            "station",
            ElementType::String,
            vec![ArrayDimension::new("n", 3)],
            vec!["a", "bcd", "ef"],
        )];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        let station = &flattened.descriptors[0];
        assert!(station.is_text());
        assert_eq!(station.shape(), [3]);
        assert_eq!(station.dimensions().len(), 2);
        let length = context.dimensions().get(station.dimensions()[1]).unwrap();
        assert_eq!(length.name(), "station_len");
        assert_eq!(length.size(), 4);
        assert_eq!(station.chunk_plan().unwrap().as_slice(), [3, 4]);

        let values = station.read_target_values(4).unwrap();
        assert_eq!(values.len(), 12);
    }

    #[test]
    fn anonymous_dimensions_are_synthetic() {
        let variables = vec![Variable::array(
            "grid",
            ElementType::Float32,
            vec![ArrayDimension::anonymous(2), ArrayDimension::anonymous(2)],
            vec![0.0f32; 4],
        )];
        let mut context = context(FileFormat::Netcdf4);
        context
            .dimensions_mut()
            .reserve_synthetic_suffixes(["dim1"]);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        let names: Vec<&str> = flattened.descriptors[0]
            .dimensions()
            .iter()
            .map(|id| context.dimensions().get(*id).unwrap().name())
            .collect();
        assert_eq!(names, ["dim2", "dim3"]);
    }

    #[test]
    fn bundles_promote_attributes() {
        let variables = vec![Variable::bundle(
            "result_unwrap",
            vec![Variable::scalar("v", ElementType::Int32, vec![1i32])],
        )
        .with_attributes(Attributes::new().with("source", AttributeValue::text("model")))];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert_eq!(names(&flattened), ["v"]);
        assert!(flattened.promoted_attributes.get("source").is_some());
    }

    #[test]
    fn structure_arrays_prepend_dimensions() {
        let variables = vec![Variable::structure_array(
            "obs",
            vec![ArrayDimension::new("record", 2)],
            vec![
                Variable::array(
                    "pos",
                    ElementType::Float32,
                    vec![ArrayDimension::new("xy", 2)],
                    vec![0.0f32, 1.0, 2.0, 3.0],
                ),
                Variable::scalar("id", ElementType::String, vec!["a", "bb"]),
            ],
        )];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert_eq!(names(&flattened), ["obs.pos", "obs.id"]);
        assert_eq!(flattened.descriptors[0].shape(), [2, 2]);
        assert_eq!(flattened.descriptors[1].shape(), [2]);
        let length = context
            .dimensions()
            .get(flattened.descriptors[1].dimensions()[1])
            .unwrap();
        assert_eq!(length.name(), "obs.id_len");
    }

    #[test]
    fn classic_model_rejects_wide_integers() {
        let variables = vec![Variable::scalar("count", ElementType::UInt32, vec![1u32])];
        let mut context = context(FileFormat::Classic);
        let error = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap_err();
        assert!(matches!(
            error,
            TransformError::Schema(SchemaError::UnsupportedElementType { .. })
        ));

        let variables = vec![Variable::scalar("flag", ElementType::Byte, vec![1u8])];
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert_eq!(flattened.descriptors[0].storage_type(), NcType::Short);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "internal invariant violated"))]
    fn wrong_kind_is_an_invariant_violation() {
        let scalar = Variable::scalar("s", ElementType::Int32, vec![1i32]);
        let structure = Variable::structure("t", vec![]);
        let mut context = context(FileFormat::Netcdf4);
        let mut flattener = SchemaFlattener::new(&mut context, ScopeId::ROOT);
        assert!(matches!(
            flattener.flatten_array(&structure),
            Err(TransformError::InternalInvariant(
                InternalInvariantError::NotAnArray(_)
            ))
        ));
        assert!(matches!(
            flattener.flatten_structure(&scalar),
            Err(TransformError::InternalInvariant(
                InternalInvariantError::NotAStructure(_)
            ))
        ));
        assert!(matches!(
            flattener.flatten_grid(&scalar),
            Err(TransformError::InternalInvariant(
                InternalInvariantError::NotAPairedContainer(_)
            ))
        ));
    }

    #[test]
    fn values_are_checked_on_read() {
        let variables = vec![Variable::array(
            "short",
            ElementType::Int32,
            vec![ArrayDimension::new("x", 3)],
            Values::from(vec![1i32, 2]),
        )];
        let mut context = context(FileFormat::Netcdf4);
        let flattened = SchemaFlattener::new(&mut context, ScopeId::ROOT)
            .flatten(&variables)
            .unwrap();
        assert!(matches!(
            flattened.descriptors[0].read_target_values(0),
            Err(TransformError::Schema(SchemaError::ValueCountMismatch {
                expected: 3,
                actual: 2,
                ..
            }))
        ));
    }
}
