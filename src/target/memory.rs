//! An in-memory target.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::{data_type::NcType, format::FileFormat};

use super::{
    AttributeOwner, ChunkStorage, NcDimId, NcGroupId, NcTypeId, NcVarId, TargetError,
    TargetFormat, TargetValues, NC_EBADCHUNK, NC_EBADDIM, NC_EBADID, NC_EBADNAME, NC_EBADTYPE,
    NC_EEDGE, NC_EINDEFINE, NC_EIO, NC_ENAMEINUSE, NC_ENOTINDEFINE, NC_ENOTNC4,
};

/// An attribute recorded by a [`MemoryTarget`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAttribute {
    /// The attribute name.
    pub name: String,
    /// The attribute value.
    pub value: TargetValues,
}

/// A group recorded by a [`MemoryTarget`].
#[derive(Debug, Clone, Default)]
pub struct MemoryGroup {
    /// The group name, empty for the root group.
    pub name: String,
    /// The parent group.
    pub parent: Option<NcGroupId>,
    /// Child groups in definition order.
    pub groups: Vec<NcGroupId>,
    /// Dimensions in definition order.
    pub dimensions: Vec<NcDimId>,
    /// Enumeration types in definition order.
    pub types: Vec<NcTypeId>,
    /// Variables in definition order.
    pub variables: Vec<NcVarId>,
    /// Group attributes in definition order.
    pub attributes: Vec<MemoryAttribute>,
}

/// A dimension recorded by a [`MemoryTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDimension {
    /// The group of the dimension.
    pub group: NcGroupId,
    /// The dimension name.
    pub name: String,
    /// The dimension length.
    pub size: u64,
}

/// An enumeration type recorded by a [`MemoryTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEnum {
    /// The group of the type.
    pub group: NcGroupId,
    /// The type name.
    pub name: String,
    /// The integer base type.
    pub base: NcType,
    /// The members in definition order.
    pub members: Vec<(String, i64)>,
}

/// A variable recorded by a [`MemoryTarget`].
#[derive(Debug, Clone)]
pub struct MemoryVariable {
    /// The group of the variable.
    pub group: NcGroupId,
    /// The variable name.
    pub name: String,
    /// The variable type.
    pub nc_type: NcType,
    /// The dimensions of the variable.
    pub dimensions: Vec<NcDimId>,
    /// The storage layout, if set.
    pub storage: Option<ChunkStorage>,
    /// The deflate level and shuffle flag, if set.
    pub compression: Option<(u32, bool)>,
    /// Variable attributes in definition order.
    pub attributes: Vec<MemoryAttribute>,
    /// The written values, if any.
    pub values: Option<TargetValues>,
}

impl MemoryVariable {
    /// Get an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&TargetValues> {
        find_attribute(&self.attributes, name)
    }

    /// The names of the variable attributes in definition order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }
}

/// An in-memory target.
///
/// Records every definition and write. Enforces define mode, unique names within a group,
/// netCDF-4 only features, and hyperslab bounds, with the error codes of the netCDF library.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    format: Option<FileFormat>,
    define_mode: bool,
    closed: bool,
    groups: Vec<MemoryGroup>,
    dimensions: Vec<MemoryDimension>,
    types: Vec<MemoryEnum>,
    variables: Vec<MemoryVariable>,
    failing_writes: BTreeSet<String>,
    failing_close: bool,
    operations: usize,
    bytes_written: usize,
}

impl MemoryTarget {
    /// Create a new, empty memory target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes to variables named `name` fail with an input/output error.
    pub fn fail_writes_to(&mut self, name: &str) {
        self.failing_writes.insert(name.to_string());
    }

    /// Make closing fail with an input/output error after the file is released.
    pub fn fail_close(&mut self) {
        self.failing_close = true;
    }

    /// The format the file was created with.
    #[must_use]
    pub fn format(&self) -> Option<FileFormat> {
        self.format
    }

    /// Returns true if the file has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The number of operations received, successful or not.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations
    }

    /// The number of value bytes written.
    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// The root group.
    #[must_use]
    pub fn root(&self) -> Option<&MemoryGroup> {
        self.groups.first()
    }

    /// Get a group by its path, such as `/` or `/a/b`.
    #[must_use]
    pub fn group(&self, path: &str) -> Option<&MemoryGroup> {
        self.group_id(path).map(|id| &self.groups[id.0 as usize])
    }

    /// Get the id of a group by its path.
    #[must_use]
    pub fn group_id(&self, path: &str) -> Option<NcGroupId> {
        let mut current = NcGroupId(0);
        self.groups.first()?;
        for name in path.split('/').filter(|name| !name.is_empty()) {
            current = *self.groups[current.0 as usize]
                .groups
                .iter()
                .find(|child| self.groups[child.0 as usize].name == name)?;
        }
        Some(current)
    }

    /// Get a variable by group path and name.
    #[must_use]
    pub fn variable(&self, group_path: &str, name: &str) -> Option<&MemoryVariable> {
        self.group(group_path)?
            .variables
            .iter()
            .map(|id| &self.variables[id.0 as usize])
            .find(|variable| variable.name == name)
    }

    /// Get a dimension by id.
    #[must_use]
    pub fn dimension(&self, id: NcDimId) -> Option<&MemoryDimension> {
        self.dimensions.get(id.0 as usize)
    }

    /// Get an enumeration type by id.
    #[must_use]
    pub fn enum_type(&self, id: NcTypeId) -> Option<&MemoryEnum> {
        self.types.get(id.0 as usize)
    }

    /// The dimensions of a group as `(name, size)` pairs in definition order.
    #[must_use]
    pub fn group_dimensions(&self, group_path: &str) -> Vec<(String, u64)> {
        self.group(group_path).map_or_else(Vec::new, |group| {
            group
                .dimensions
                .iter()
                .map(|id| &self.dimensions[id.0 as usize])
                .map(|dimension| (dimension.name.clone(), dimension.size))
                .collect()
        })
    }

    /// The names of the variables of a group in definition order.
    #[must_use]
    pub fn variable_names(&self, group_path: &str) -> Vec<String> {
        self.group(group_path).map_or_else(Vec::new, |group| {
            group
                .variables
                .iter()
                .map(|id| self.variables[id.0 as usize].name.clone())
                .collect()
        })
    }

    /// The names of the dimensions of a variable.
    #[must_use]
    pub fn variable_dimension_names(&self, variable: &MemoryVariable) -> Vec<String> {
        variable
            .dimensions
            .iter()
            .map(|id| self.dimensions[id.0 as usize].name.clone())
            .collect()
    }

    /// The shape of a variable.
    #[must_use]
    pub fn variable_shape(&self, variable: &MemoryVariable) -> Vec<u64> {
        variable
            .dimensions
            .iter()
            .map(|id| self.dimensions[id.0 as usize].size)
            .collect()
    }

    /// Get a global attribute by name.
    #[must_use]
    pub fn global_attribute(&self, name: &str) -> Option<&TargetValues> {
        find_attribute(&self.root()?.attributes, name)
    }

    /// Get a group attribute by group path and name.
    #[must_use]
    pub fn group_attribute(&self, group_path: &str, name: &str) -> Option<&TargetValues> {
        find_attribute(&self.group(group_path)?.attributes, name)
    }

    /// Create a string representation of the group hierarchy.
    ///
    /// Each group lists its variables (with shape and type) followed by its child groups.
    #[must_use]
    pub fn hierarchy_tree(&self) -> String {
        fn update_tree(target: &MemoryTarget, string: &mut String, group: NcGroupId, depth: usize) {
            let group = &target.groups[group.0 as usize];
            for variable in &group.variables {
                let variable = &target.variables[variable.0 as usize];
                string.push_str(&" ".repeat(depth * 2));
                let type_name = match variable.nc_type {
                    NcType::Enum(id) => target.types[id.0 as usize].name.clone(),
                    nc_type => nc_type.to_string(),
                };
                string.push_str(&format!(
                    "{} [{}] {}\n",
                    variable.name,
                    target.variable_shape(variable).iter().join(", "),
                    type_name
                ));
            }
            for child in &group.groups {
                string.push_str(&" ".repeat(depth * 2));
                string.push_str(&target.groups[child.0 as usize].name);
                string.push('\n');
                update_tree(target, string, *child, depth + 1);
            }
        }

        let mut string = String::default();
        if !self.groups.is_empty() {
            string.push_str("/\n");
            update_tree(self, &mut string, NcGroupId(0), 1);
        }
        string
    }

    fn check_open(&mut self) -> Result<FileFormat, TargetError> {
        self.operations += 1;
        match self.format {
            Some(format) if !self.closed => Ok(format),
            _ => Err(TargetError::new(NC_EBADID, "NetCDF: Not a valid ID")),
        }
    }

    fn check_define_mode(&mut self) -> Result<FileFormat, TargetError> {
        let format = self.check_open()?;
        if self.define_mode {
            Ok(format)
        } else {
            Err(TargetError::new(
                NC_ENOTINDEFINE,
                "NetCDF: Operation not allowed in data mode",
            ))
        }
    }

    fn check_group(&self, group: NcGroupId) -> Result<&MemoryGroup, TargetError> {
        self.groups
            .get(group.0 as usize)
            .ok_or_else(|| TargetError::new(NC_EBADID, "NetCDF: Not a valid ID"))
    }

    fn check_name(&self, group: NcGroupId, name: &str, dimension: bool) -> Result<(), TargetError> {
        if name.is_empty() || name.contains('/') {
            return Err(TargetError::new(
                NC_EBADNAME,
                "NetCDF: Name contains illegal characters",
            ));
        }
        let group = self.check_group(group)?;
        // dimensions have their own namespace
        let in_use = if dimension {
            group
                .dimensions
                .iter()
                .any(|id| self.dimensions[id.0 as usize].name == name)
        } else {
            group
                .groups
                .iter()
                .any(|id| self.groups[id.0 as usize].name == name)
                || group
                    .variables
                    .iter()
                    .any(|id| self.variables[id.0 as usize].name == name)
                || group
                    .types
                    .iter()
                    .any(|id| self.types[id.0 as usize].name == name)
        };
        if in_use {
            Err(TargetError::new(
                NC_ENAMEINUSE,
                "NetCDF: String match to name in use",
            ))
        } else {
            Ok(())
        }
    }

    fn check_variable(&self, variable: NcVarId) -> Result<(), TargetError> {
        if (variable.0 as usize) < self.variables.len() {
            Ok(())
        } else {
            Err(TargetError::new(NC_EBADID, "NetCDF: Not a valid ID"))
        }
    }
}

fn find_attribute<'a>(attributes: &'a [MemoryAttribute], name: &str) -> Option<&'a TargetValues> {
    attributes
        .iter()
        .find(|attribute| attribute.name == name)
        .map(|attribute| &attribute.value)
}

fn bad_type() -> TargetError {
    TargetError::new(
        NC_EBADTYPE,
        "NetCDF: Not a valid data type or _FillValue type mismatch",
    )
}

fn not_netcdf4() -> TargetError {
    TargetError::new(
        NC_ENOTNC4,
        "NetCDF: Attempting netcdf-4 operation on netcdf-3 file",
    )
}

impl TargetFormat for MemoryTarget {
    fn create(&mut self, format: FileFormat) -> Result<NcGroupId, TargetError> {
        self.operations += 1;
        if self.format.is_some() {
            return Err(TargetError::new(NC_EIO, "NetCDF: File exists"));
        }
        self.format = Some(format);
        self.define_mode = true;
        self.groups.push(MemoryGroup::default());
        Ok(NcGroupId(0))
    }

    fn define_group(&mut self, parent: NcGroupId, name: &str) -> Result<NcGroupId, TargetError> {
        let format = self.check_define_mode()?;
        if !format.supports_groups() {
            return Err(not_netcdf4());
        }
        self.check_name(parent, name, false)?;
        let id = NcGroupId(u32::try_from(self.groups.len()).map_err(|_| not_netcdf4())?);
        self.groups.push(MemoryGroup {
            name: name.to_string(),
            parent: Some(parent),
            ..Default::default()
        });
        self.groups[parent.0 as usize].groups.push(id);
        Ok(id)
    }

    fn define_dimension(
        &mut self,
        group: NcGroupId,
        name: &str,
        size: u64,
    ) -> Result<NcDimId, TargetError> {
        self.check_define_mode()?;
        self.check_name(group, name, true)?;
        let id = NcDimId(
            u32::try_from(self.dimensions.len())
                .map_err(|_| TargetError::new(NC_EBADDIM, "NetCDF: Invalid dimension ID or name"))?,
        );
        self.dimensions.push(MemoryDimension {
            group,
            name: name.to_string(),
            size,
        });
        self.groups[group.0 as usize].dimensions.push(id);
        Ok(id)
    }

    fn define_enum(
        &mut self,
        group: NcGroupId,
        name: &str,
        base: NcType,
        members: &[(String, i64)],
    ) -> Result<NcTypeId, TargetError> {
        let format = self.check_define_mode()?;
        if !format.supports_groups() {
            return Err(not_netcdf4());
        }
        if matches!(
            base,
            NcType::Char | NcType::Float | NcType::Double | NcType::Enum(_)
        ) {
            return Err(bad_type());
        }
        self.check_name(group, name, false)?;
        let id = NcTypeId(
            u32::try_from(self.types.len()).map_err(|_| bad_type())?,
        );
        self.types.push(MemoryEnum {
            group,
            name: name.to_string(),
            base,
            members: members.to_vec(),
        });
        self.groups[group.0 as usize].types.push(id);
        Ok(id)
    }

    fn define_variable(
        &mut self,
        group: NcGroupId,
        name: &str,
        nc_type: NcType,
        dimensions: &[NcDimId],
    ) -> Result<NcVarId, TargetError> {
        self.check_define_mode()?;
        self.check_name(group, name, false)?;
        if dimensions
            .iter()
            .any(|id| id.0 as usize >= self.dimensions.len())
        {
            return Err(TargetError::new(
                NC_EBADDIM,
                "NetCDF: Invalid dimension ID or name",
            ));
        }
        if let NcType::Enum(id) = nc_type {
            if id.0 as usize >= self.types.len() {
                return Err(bad_type());
            }
        }
        let id = NcVarId(
            u32::try_from(self.variables.len())
                .map_err(|_| TargetError::new(NC_EBADID, "NetCDF: Not a valid ID"))?,
        );
        self.variables.push(MemoryVariable {
            group,
            name: name.to_string(),
            nc_type,
            dimensions: dimensions.to_vec(),
            storage: None,
            compression: None,
            attributes: Vec::new(),
            values: None,
        });
        self.groups[group.0 as usize].variables.push(id);
        Ok(id)
    }

    fn define_chunking(
        &mut self,
        variable: NcVarId,
        storage: &ChunkStorage,
    ) -> Result<(), TargetError> {
        let format = self.check_define_mode()?;
        if !format.is_netcdf4() {
            return Err(not_netcdf4());
        }
        self.check_variable(variable)?;
        let shape = self.variable_shape(&self.variables[variable.0 as usize]);
        if let ChunkStorage::Chunked(extents) = storage {
            let valid = extents.len() == shape.len()
                && extents
                    .iter()
                    .zip(&shape)
                    .all(|(extent, size)| *extent > 0 && extent <= size);
            if !valid {
                return Err(TargetError::new(NC_EBADCHUNK, "NetCDF: Bad chunk sizes."));
            }
        }
        self.variables[variable.0 as usize].storage = Some(storage.clone());
        Ok(())
    }

    fn define_compression(
        &mut self,
        variable: NcVarId,
        level: u32,
        shuffle: bool,
    ) -> Result<(), TargetError> {
        let format = self.check_define_mode()?;
        if !format.is_netcdf4() {
            return Err(not_netcdf4());
        }
        self.check_variable(variable)?;
        self.variables[variable.0 as usize].compression = Some((level, shuffle));
        Ok(())
    }

    fn define_attribute(
        &mut self,
        owner: AttributeOwner,
        name: &str,
        value: &TargetValues,
    ) -> Result<(), TargetError> {
        self.check_define_mode()?;
        let attributes = match owner {
            AttributeOwner::Group(group) => {
                self.check_group(group)?;
                &mut self.groups[group.0 as usize].attributes
            }
            AttributeOwner::Variable(variable) => {
                self.check_variable(variable)?;
                &mut self.variables[variable.0 as usize].attributes
            }
        };
        let attribute = MemoryAttribute {
            name: name.to_string(),
            value: value.clone(),
        };
        if let Some(existing) = attributes.iter_mut().find(|a| a.name == name) {
            *existing = attribute;
        } else {
            attributes.push(attribute);
        }
        Ok(())
    }

    fn end_define(&mut self) -> Result<(), TargetError> {
        self.check_define_mode()?;
        self.define_mode = false;
        Ok(())
    }

    fn write_values(
        &mut self,
        variable: NcVarId,
        start: &[u64],
        count: &[u64],
        values: &TargetValues,
    ) -> Result<(), TargetError> {
        self.check_open()?;
        if self.define_mode {
            return Err(TargetError::new(
                NC_EINDEFINE,
                "NetCDF: Operation not allowed in define mode",
            ));
        }
        self.check_variable(variable)?;
        let target = &self.variables[variable.0 as usize];
        if self.failing_writes.contains(&target.name) {
            return Err(TargetError::new(NC_EIO, "NetCDF: I/O failure"));
        }
        let shape = self.variable_shape(target);
        let in_bounds = start.len() == shape.len()
            && count.len() == shape.len()
            && start
                .iter()
                .zip(count)
                .zip(&shape)
                .all(|((start, count), size)| {
                    start.checked_add(*count).is_some_and(|end| end <= *size)
                });
        let elements = count
            .iter()
            .fold(1u64, |product, count| product.saturating_mul(*count));
        if !in_bounds || elements != values.len() as u64 {
            return Err(TargetError::new(
                NC_EEDGE,
                "NetCDF: Start+count exceeds dimension bound",
            ));
        }
        let storage_type = match target.nc_type {
            NcType::Enum(id) => self.types[id.0 as usize].base,
            nc_type => nc_type,
        };
        if storage_type != values.nc_type() {
            return Err(bad_type());
        }
        self.bytes_written += values.as_ne_bytes().len();
        self.variables[variable.0 as usize].values = Some(values.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), TargetError> {
        self.check_open()?;
        self.define_mode = false;
        self.closed = true;
        if self.failing_close {
            return Err(TargetError::new(NC_EIO, "NetCDF: I/O failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_target_define_and_write() {
        let mut target = MemoryTarget::new();
        let root = target.create(FileFormat::Netcdf4).unwrap();
        let time = target.define_dimension(root, "time", 3).unwrap();
        let temp = target
            .define_variable(root, "temp", NcType::Float, &[time])
            .unwrap();
        target
            .define_chunking(temp, &ChunkStorage::Chunked(vec![3]))
            .unwrap();
        target
            .define_attribute(
                AttributeOwner::Variable(temp),
                "units",
                &TargetValues::text("K"),
            )
            .unwrap();
        target.end_define().unwrap();
        target
            .write_values(temp, &[0], &[3], &TargetValues::Float(vec![1.0, 2.0, 3.0]))
            .unwrap();
        target.close().unwrap();

        let variable = target.variable("/", "temp").unwrap();
        assert_eq!(variable.attribute("units"), Some(&TargetValues::text("K")));
        assert_eq!(target.variable_shape(variable), vec![3]);
        assert_eq!(target.bytes_written(), 12);
        assert!(target.is_closed());
        assert_eq!(target.hierarchy_tree(), "/\n  temp [3] float\n");
    }

    #[test]
    fn memory_target_mode_errors() {
        let mut target = MemoryTarget::new();
        let root = target.create(FileFormat::Classic).unwrap();
        let x = target.define_dimension(root, "x", 2).unwrap();
        assert_eq!(
            target.define_dimension(root, "x", 2).unwrap_err().code(),
            NC_ENAMEINUSE
        );
        assert_eq!(
            target.define_group(root, "g").unwrap_err().code(),
            NC_ENOTNC4
        );
        let v = target.define_variable(root, "v", NcType::Int, &[x]).unwrap();
        assert_eq!(
            target
                .define_chunking(v, &ChunkStorage::Contiguous)
                .unwrap_err()
                .code(),
            NC_ENOTNC4
        );
        assert_eq!(
            target
                .write_values(v, &[0], &[2], &TargetValues::Int(vec![1, 2]))
                .unwrap_err()
                .code(),
            NC_EINDEFINE
        );
        target.end_define().unwrap();
        assert_eq!(
            target.define_dimension(root, "y", 1).unwrap_err().code(),
            NC_ENOTINDEFINE
        );
        assert_eq!(
            target
                .write_values(v, &[0], &[3], &TargetValues::Int(vec![1, 2, 3]))
                .unwrap_err()
                .code(),
            NC_EEDGE
        );
        target.close().unwrap();
        assert_eq!(target.close().unwrap_err().code(), NC_EBADID);
    }

    #[test]
    fn memory_target_groups() {
        let mut target = MemoryTarget::new();
        let root = target.create(FileFormat::Netcdf4).unwrap();
        let a = target.define_group(root, "a").unwrap();
        let b = target.define_group(a, "b").unwrap();
        let n = target.define_dimension(b, "n", 4).unwrap();
        let kind = target
            .define_enum(b, "kind", NcType::UByte, &[("land".to_string(), 0)])
            .unwrap();
        target
            .define_variable(b, "mask", NcType::Enum(kind), &[n])
            .unwrap();
        assert_eq!(target.group_id("/a/b"), Some(b));
        assert!(target.variable("/a/b", "mask").is_some());
        assert_eq!(target.group_dimensions("/a/b"), vec![("n".to_string(), 4)]);
        assert_eq!(target.hierarchy_tree(), "/\n  a\n    b\n      mask [4] kind\n");
    }

    #[test]
    fn memory_target_failing_writes() {
        let mut target = MemoryTarget::new();
        target.fail_writes_to("v");
        let root = target.create(FileFormat::Netcdf4).unwrap();
        let v = target.define_variable(root, "v", NcType::Int, &[]).unwrap();
        target.end_define().unwrap();
        assert_eq!(
            target
                .write_values(v, &[], &[], &TargetValues::Int(vec![1]))
                .unwrap_err()
                .code(),
            NC_EIO
        );
    }

    #[test]
    fn memory_target_failing_close() {
        let mut target = MemoryTarget::new();
        target.fail_close();
        target.create(FileFormat::Netcdf4).unwrap();
        assert_eq!(target.close().unwrap_err().code(), NC_EIO);
        assert!(target.is_closed());
        assert_eq!(target.close().unwrap_err().code(), NC_EBADID);
    }
}
