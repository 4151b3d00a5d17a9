//! Target definitions of dimensions, enumerations and flattened variables.

use crate::{
    attributes,
    dimension::{DimensionId, ScopeId},
    error::{InternalInvariantError, SchemaError, TargetFormatError, TransformError},
    flatten::VariableDescriptor,
    format::DataModel,
    source::EnumDefinition,
    target::{ChunkStorage, NcDimId, NcGroupId, NcTypeId, NcVarId, TargetError, TargetFormat},
    transform::TransformContext,
};

fn target_error(operation: impl FnOnce() -> String) -> impl FnOnce(TargetError) -> TransformError {
    move |err| TargetFormatError::new(operation(), err).into()
}

/// Define a registered dimension in the group of its scope, unless already defined.
///
/// # Errors
/// Returns a [`TransformError`] if the dimension is not registered or the target rejects it.
pub fn define_dimension<T: TargetFormat + ?Sized>(
    target: &mut T,
    context: &mut TransformContext,
    id: DimensionId,
) -> Result<NcDimId, TransformError> {
    let dimension = context
        .dimensions()
        .get(id)
        .ok_or_else(|| InternalInvariantError::UnknownDimension(id.index()).logged())?;
    if let Some(defined) = dimension.target() {
        return Ok(defined);
    }
    let group = context.group_of(dimension.scope())?;
    let (name, size) = (dimension.name().to_string(), dimension.size());
    let defined = target
        .define_dimension(group, &name, size)
        .map_err(target_error(|| format!("define dimension {name}")))?;
    log::debug!("defined dimension {name} of size {size}");
    context.dimensions_mut().set_target(id, defined)?;
    Ok(defined)
}

/// Define an enumeration declared in `scope` in its target `group`.
///
/// # Errors
/// Returns [`SchemaError::InvalidEnumerationBase`] if the base type is not an integer type,
/// or a [`TransformError`] if the target rejects it.
pub fn define_enumeration<T: TargetFormat + ?Sized>(
    target: &mut T,
    context: &mut TransformContext,
    scope: ScopeId,
    group: NcGroupId,
    enumeration: &EnumDefinition,
) -> Result<NcTypeId, TransformError> {
    let base = Some(enumeration.base)
        .filter(|base| base.is_integer())
        .and_then(|base| base.nc_type(DataModel::Enhanced))
        .ok_or_else(|| SchemaError::InvalidEnumerationBase {
            enumeration: enumeration.name.clone(),
            base: enumeration.base,
        })?;
    let name = context.sanitizer().sanitize(&enumeration.name);
    let id = target
        .define_enum(group, &name, base, &enumeration.members)
        .map_err(target_error(|| format!("define enumeration {name}")))?;
    context.register_enumeration(scope, &enumeration.name, id);
    Ok(id)
}

/// Define a flattened variable: its dimensions not yet defined, the variable, its storage layout, and its attributes.
///
/// In netCDF-4 formats, a non-scalar variable is chunked by its chunk plan, unless chunking is disabled or the
/// plan has a zero extent, and chunked variables are compressed if compression is enabled.
///
/// # Errors
/// Returns a [`TransformError`] if an attribute cannot be represented or the target rejects a definition.
pub fn define_variable<T: TargetFormat + ?Sized>(
    target: &mut T,
    context: &mut TransformContext,
    descriptor: &VariableDescriptor<'_>,
) -> Result<NcVarId, TransformError> {
    let group = context.group_of(descriptor.scope())?;
    let dimensions = descriptor
        .dimensions()
        .iter()
        .map(|id| define_dimension(target, context, *id))
        .collect::<Result<Vec<_>, _>>()?;
    let name = descriptor.name();
    let variable = target
        .define_variable(group, name, descriptor.nc_type(), &dimensions)
        .map_err(target_error(|| format!("define variable {name}")))?;

    let config = context.config();
    if context.format().is_netcdf4() && !dimensions.is_empty() {
        let storage = match descriptor.chunk_plan() {
            Some(plan) if config.chunking() && !plan.has_zero_extent() => {
                ChunkStorage::Chunked(plan.to_vec())
            }
            _ => ChunkStorage::Contiguous,
        };
        let chunked = matches!(storage, ChunkStorage::Chunked(_));
        target
            .define_chunking(variable, &storage)
            .map_err(target_error(|| format!("define chunking of {name}")))?;
        if chunked && config.compression() {
            target
                .define_compression(variable, config.compression_level(), config.shuffle())
                .map_err(target_error(|| format!("define compression of {name}")))?;
        }
    }

    attributes::define_variable_attributes(target, context, variable, descriptor)?;
    log::debug!("defined {descriptor}");
    Ok(variable)
}
