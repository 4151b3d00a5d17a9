//! Attribute emission.
//!
//! Source attributes are written to the target with these rules:
//!  - nested attribute tables are flattened, their attributes named `<table>.<attribute>`,
//!  - at global scope the attributes of tables named `*_GLOBAL` (and `HDF5_GLOBAL_integer_64`) are written unprefixed,
//!  - multi-valued text is joined with newlines,
//!  - a multi-valued `_FillValue` is renamed `Multi_FillValues`,
//!  - a text `_FillValue` keeps its first character, the full text is written as `Orig_FillValue`,
//!  - in the classic model unsigned bytes are widened to `short` and `uint16` to `int`, and wider integers are rejected,
//!  - attributes without values are skipped.
//!
//! Attribute names are sanitized like variable names.

use crate::{
    error::{SchemaError, TargetFormatError, TransformError},
    flatten::VariableDescriptor,
    format::DataModel,
    name::NameSanitizer,
    source::{AttributeValue, Attributes},
    target::{AttributeOwner, NcGroupId, NcVarId, TargetFormat, TargetValues},
    transform::TransformContext,
};

/// The name of the attribute recording the unsanitized name of a renamed variable.
pub const ORIGINAL_NAME_ATTRIBUTE: &str = "original_name";

const FILL_VALUE: &str = "_FillValue";
const MULTI_FILL_VALUES: &str = "Multi_FillValues";
const ORIG_FILL_VALUE: &str = "Orig_FillValue";

/// Returns true if the attributes of a table named `name` are written unprefixed at global scope.
#[must_use]
pub fn is_global_container(name: &str) -> bool {
    name.ends_with("_GLOBAL") || name == "HDF5_GLOBAL_integer_64"
}

/// Convert an attribute value to its target representation in `model`.
///
/// Returns [`None`] for empty values and nested tables.
///
/// # Errors
/// Returns [`SchemaError::UnsupportedAttributeType`] if `model` cannot represent the value.
pub fn convert_attribute(
    name: &str,
    value: &AttributeValue,
    model: DataModel,
) -> Result<Option<TargetValues>, SchemaError> {
    if value.is_empty() {
        return Ok(None);
    }
    let values = match (value, model) {
        (AttributeValue::Byte(v), DataModel::Classic) => {
            TargetValues::Short(v.iter().copied().map(i16::from).collect())
        }
        (AttributeValue::Byte(v), DataModel::Enhanced) => TargetValues::UByte(v.clone()),
        (AttributeValue::Int8(v), _) => TargetValues::Byte(v.clone()),
        (AttributeValue::Int16(v), _) => TargetValues::Short(v.clone()),
        (AttributeValue::UInt16(v), DataModel::Classic) => {
            TargetValues::Int(v.iter().copied().map(i32::from).collect())
        }
        (AttributeValue::UInt16(v), DataModel::Enhanced) => TargetValues::UShort(v.clone()),
        (AttributeValue::Int32(v), _) => TargetValues::Int(v.clone()),
        (AttributeValue::UInt32(v), DataModel::Enhanced) => TargetValues::UInt(v.clone()),
        (AttributeValue::Int64(v), DataModel::Enhanced) => TargetValues::Int64(v.clone()),
        (AttributeValue::UInt64(v), DataModel::Enhanced) => TargetValues::UInt64(v.clone()),
        (
            AttributeValue::UInt32(_) | AttributeValue::Int64(_) | AttributeValue::UInt64(_),
            DataModel::Classic,
        ) => {
            return Err(SchemaError::UnsupportedAttributeType {
                attribute: name.to_string(),
                attribute_type: value.type_name(),
                model,
            })
        }
        (AttributeValue::Float32(v), _) => TargetValues::Float(v.clone()),
        (AttributeValue::Float64(v), _) => TargetValues::Double(v.clone()),
        (
            AttributeValue::String(_) | AttributeValue::Url(_) | AttributeValue::OtherXml(_),
            _,
        ) => TargetValues::text(&value.joined_text().unwrap_or_default()),
        (AttributeValue::Container(_), _) => return Ok(None),
    };
    Ok(Some(values))
}

/// Define the attributes of a flattened variable.
///
/// The attributes of the enclosing containers are written first, prefixed with their embed path,
/// then the attributes of the variable, then [`ORIGINAL_NAME_ATTRIBUTE`] if the variable was renamed.
///
/// # Errors
/// Returns a [`TransformError`] if an attribute cannot be represented or the target rejects it.
pub fn define_variable_attributes<T: TargetFormat + ?Sized>(
    target: &mut T,
    context: &TransformContext,
    variable: NcVarId,
    descriptor: &VariableDescriptor<'_>,
) -> Result<(), TransformError> {
    let mut writer = AttributeWriter {
        target,
        sanitizer: context.sanitizer(),
        model: context.model(),
        owner: AttributeOwner::Variable(variable),
    };
    for (prefix, attributes) in descriptor.parent_attributes() {
        writer.write_table(prefix, attributes, false)?;
    }
    writer.write_table("", descriptor.variable().attributes(), false)?;
    if descriptor.is_renamed() {
        writer.define(
            ORIGINAL_NAME_ATTRIBUTE,
            &TargetValues::text(descriptor.original_name()),
        )?;
    }
    Ok(())
}

/// Define the attributes of a group.
///
/// With `global`, the attributes of `*_GLOBAL` tables are written unprefixed.
///
/// # Errors
/// Returns a [`TransformError`] if an attribute cannot be represented or the target rejects it.
pub fn define_group_attributes<T: TargetFormat + ?Sized>(
    target: &mut T,
    context: &TransformContext,
    group: NcGroupId,
    attributes: &Attributes,
    global: bool,
) -> Result<(), TransformError> {
    AttributeWriter {
        target,
        sanitizer: context.sanitizer(),
        model: context.model(),
        owner: AttributeOwner::Group(group),
    }
    .write_table("", attributes, global)
}

struct AttributeWriter<'a, T: ?Sized> {
    target: &'a mut T,
    sanitizer: &'a NameSanitizer,
    model: DataModel,
    owner: AttributeOwner,
}

impl<T: TargetFormat + ?Sized> AttributeWriter<'_, T> {
    fn write_table(
        &mut self,
        prefix: &str,
        attributes: &Attributes,
        global: bool,
    ) -> Result<(), TransformError> {
        for attribute in attributes {
            let name = if prefix.is_empty() {
                attribute.name.clone()
            } else {
                format!("{prefix}.{}", attribute.name)
            };
            match &attribute.value {
                AttributeValue::Container(inner) => {
                    if global && prefix.is_empty() && is_global_container(&attribute.name) {
                        self.write_table("", inner, false)?;
                    } else {
                        self.write_table(&name, inner, false)?;
                    }
                }
                value => self.write_value(&name, value)?,
            }
        }
        Ok(())
    }

    fn write_value(&mut self, name: &str, value: &AttributeValue) -> Result<(), TransformError> {
        let Some(values) = convert_attribute(name, value, self.model)? else {
            log::debug!("skipping empty attribute {name}");
            return Ok(());
        };
        if name != FILL_VALUE {
            return self.define(&self.sanitizer.sanitize(name), &values);
        }
        if value.len() > 1 {
            return self.define(MULTI_FILL_VALUES, &values);
        }
        match values.as_text() {
            Some(text) => {
                if let Some(first) = text.chars().next() {
                    let mut buffer = [0; 4];
                    self.define(FILL_VALUE, &TargetValues::text(first.encode_utf8(&mut buffer)))?;
                }
                self.define(ORIG_FILL_VALUE, &values)
            }
            None => self.define(FILL_VALUE, &values),
        }
    }

    fn define(&mut self, name: &str, values: &TargetValues) -> Result<(), TransformError> {
        self.target
            .define_attribute(self.owner, name, values)
            .map_err(|err| {
                TargetFormatError::new(format!("define attribute {name} of {}", self.owner), err)
                    .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config, data_type::NcType, format::FileFormat, target::MemoryTarget,
    };

    fn context(format: FileFormat) -> TransformContext {
        let mut config = Config::default();
        config.set_file_format(format);
        TransformContext::new(config, None)
    }

    #[test]
    fn classic_conversions() {
        let model = DataModel::Classic;
        assert_eq!(
            convert_attribute("a", &AttributeValue::Byte(vec![200]), model).unwrap(),
            Some(TargetValues::Short(vec![200]))
        );
        assert_eq!(
            convert_attribute("a", &AttributeValue::UInt16(vec![65535]), model).unwrap(),
            Some(TargetValues::Int(vec![65535]))
        );
        assert!(matches!(
            convert_attribute("a", &AttributeValue::Int64(vec![1]), model),
            Err(SchemaError::UnsupportedAttributeType { attribute_type: "int64", .. })
        ));
        assert_eq!(
            convert_attribute("a", &AttributeValue::Int64(vec![1]), DataModel::Enhanced).unwrap(),
            Some(TargetValues::Int64(vec![1]))
        );
        assert_eq!(
            convert_attribute("a", &AttributeValue::Float64(vec![]), model).unwrap(),
            None
        );
        assert_eq!(
            convert_attribute(
                "a",
                &AttributeValue::String(vec!["one".to_string(), "two".to_string()]),
                model
            )
            .unwrap(),
            Some(TargetValues::text("one\ntwo"))
        );
    }

    #[test]
    fn global_attributes() {
        let mut target = MemoryTarget::new();
        let root = target.create(FileFormat::Netcdf4).unwrap();
        let attributes = Attributes::new()
            .with(
                "NC_GLOBAL",
                AttributeValue::Container(
                    Attributes::new().with("title", AttributeValue::text("sea surface")),
                ),
            )
            .with(
                "metadata",
                AttributeValue::Container(
                    Attributes::new().with("version", AttributeValue::Int32(vec![2])),
                ),
            )
            .with("empty", AttributeValue::String(vec![]))
            .with("2nd pass", AttributeValue::Int8(vec![1]));
        define_group_attributes(
            &mut target,
            &context(FileFormat::Netcdf4),
            root,
            &attributes,
            true,
        )
        .unwrap();
        assert_eq!(
            target.global_attribute("title"),
            Some(&TargetValues::text("sea surface"))
        );
        assert_eq!(
            target.global_attribute("metadata.version"),
            Some(&TargetValues::Int(vec![2]))
        );
        assert_eq!(target.global_attribute("empty"), None);
        assert_eq!(
            target.global_attribute("nc_2nd_pass"),
            Some(&TargetValues::Byte(vec![1]))
        );
    }

    #[test]
    fn fill_values() {
        let mut target = MemoryTarget::new();
        let root = target.create(FileFormat::Netcdf4).unwrap();
        let a = target.define_variable(root, "a", NcType::Float, &[]).unwrap();
        let b = target.define_variable(root, "b", NcType::Char, &[]).unwrap();
        let context = context(FileFormat::Netcdf4);
        let mut writer = AttributeWriter {
            target: &mut target,
            sanitizer: context.sanitizer(),
            model: context.model(),
            owner: AttributeOwner::Variable(a),
        };
        writer
            .write_value(FILL_VALUE, &AttributeValue::Float32(vec![-1.0, -2.0]))
            .unwrap();
        writer.owner = AttributeOwner::Variable(b);
        writer
            .write_value(FILL_VALUE, &AttributeValue::text("missing"))
            .unwrap();

        let a = target.variable("/", "a").unwrap();
        assert_eq!(a.attribute_names(), [MULTI_FILL_VALUES]);
        let b = target.variable("/", "b").unwrap();
        assert_eq!(b.attribute(FILL_VALUE), Some(&TargetValues::text("m")));
        assert_eq!(
            b.attribute(ORIG_FILL_VALUE),
            Some(&TargetValues::text("missing"))
        );
    }
}
