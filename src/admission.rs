//! Admission control.
//!
//! Before anything is written, the size of the response is estimated from the selected variables and checked against
//! the configured limit, the addressable size of the target format, and the largest variable the format can store.

use crate::{
    config::Config,
    data_type::{ElementType, NcType},
    error::SizeLimitExceededError,
    format::DataModel,
    source::{DataVariable, Dataset, Group, Variable, VariableKind},
};

/// The estimated size of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeEstimate {
    total: u64,
    variables: Vec<(String, u64)>,
}

impl SizeEstimate {
    /// The estimated total size in bytes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The estimated size in bytes of each selected data variable, named by its path.
    #[must_use]
    pub fn variables(&self) -> &[(String, u64)] {
        &self.variables
    }

    fn add(&mut self, name: String, size: u64) {
        self.total = self.total.saturating_add(size);
        self.variables.push((name, size));
    }
}

/// Estimate the size of the selected variables of `dataset` when stored in `model`.
///
/// Text is counted as the longest value plus a terminator per element when the values are held in memory,
/// otherwise as one byte per element.
#[must_use]
pub fn estimate_size(dataset: &Dataset, model: DataModel) -> SizeEstimate {
    let mut estimate = SizeEstimate::default();
    let mut path = Vec::new();
    estimate_group(dataset.root(), model, &mut path, &mut estimate);
    estimate
}

/// Estimate the size of the response and check it against the limits of `config`.
///
/// # Errors
/// Returns a [`SizeLimitExceededError`] if the response is larger than the configured limit or the format limit,
/// or a variable is larger than the format allows.
pub fn check_admission(
    dataset: &Dataset,
    config: &Config,
) -> Result<SizeEstimate, SizeLimitExceededError> {
    let format = config.file_format();
    let estimate = estimate_size(dataset, format.data_model());

    let configured = config.max_response_size();
    let structural = format.structural_limit();
    let limit = match (configured, structural) {
        (0, structural) => structural,
        (configured, Some(structural)) => Some(configured.min(structural)),
        (configured, None) => Some(configured),
    };
    if let Some(limit) = limit {
        if estimate.total > limit {
            return Err(SizeLimitExceededError::Response {
                estimated: estimate.total,
                limit,
                configured,
                structural,
                format,
            });
        }
    }

    if let Some(limit) = format.variable_limit() {
        if let Some((variable, estimated)) = estimate.variables.iter().find(|(_, size)| *size > limit)
        {
            return Err(SizeLimitExceededError::Variable {
                variable: variable.clone(),
                estimated: *estimated,
                limit,
                format,
            });
        }
    }

    log::debug!("estimated response size {} bytes", estimate.total);
    Ok(estimate)
}

fn estimate_group(
    group: &Group,
    model: DataModel,
    path: &mut Vec<String>,
    estimate: &mut SizeEstimate,
) {
    for variable in group.variables() {
        estimate_variable(variable, 1, model, path, estimate);
    }
    for child in group.groups() {
        path.push(child.name().to_string());
        estimate_group(child, model, path, estimate);
        path.pop();
    }
}

fn estimate_variable(
    variable: &Variable,
    outer_elements: u64,
    model: DataModel,
    path: &mut Vec<String>,
    estimate: &mut SizeEstimate,
) {
    if !variable.has_selected_content() {
        return;
    }
    match variable.kind() {
        VariableKind::Scalar(data) | VariableKind::Array(data) => {
            path.push(variable.name().to_string());
            estimate.add(path.join("/"), data_size(data, outer_elements, model));
            path.pop();
        }
        VariableKind::Structure(members) => {
            path.push(variable.name().to_string());
            for member in members {
                estimate_variable(member, outer_elements, model, path, estimate);
            }
            path.pop();
        }
        VariableKind::Bundle(members) => {
            for member in members {
                estimate_variable(member, outer_elements, model, path, estimate);
            }
        }
        VariableKind::Grid { array, maps } => {
            for map in maps {
                estimate_variable(map, outer_elements, model, path, estimate);
            }
            estimate_variable(array, outer_elements, model, path, estimate);
        }
        VariableKind::StructureArray { dimensions, fields } => {
            let elements = dimensions
                .iter()
                .fold(outer_elements, |elements, d| elements.saturating_mul(d.size));
            path.push(variable.name().to_string());
            for field in fields {
                estimate_variable(field, elements, model, path, estimate);
            }
            path.pop();
        }
    }
}

fn data_size(data: &DataVariable, outer_elements: u64, model: DataModel) -> u64 {
    let elements = outer_elements.saturating_mul(data.num_elements());
    let element_size = if data.element_type.is_text() {
        data.values
            .inline()
            .and_then(crate::values::ElementValues::max_text_len)
            .map_or(1, |len| len as u64 + 1)
    } else {
        element_size(data.element_type, model)
    };
    elements.saturating_mul(element_size)
}

fn element_size(element_type: ElementType, model: DataModel) -> u64 {
    element_type
        .nc_type(model)
        .and_then(NcType::size)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        format::FileFormat,
        source::{ArrayDimension, Values},
    };

    fn dataset() -> Dataset {
        Dataset::new(
            Group::new("")
                .with_variable(Variable::array(
                    "temp",
                    ElementType::Float64,
                    vec![ArrayDimension::new("x", 1000)],
                    Values::from(vec![0.0f64; 1000]),
                ))
                .with_variable(Variable::array(
                    "name",
                    ElementType::String,
                    vec![ArrayDimension::new("n", 2)],
                    vec!["abc", "de"],
                ))
                .with_group(Group::new("g").with_variable(
                    Variable::array(
                        "flag",
                        ElementType::Byte,
                        vec![ArrayDimension::new("x", 1000)],
                        vec![0u8; 1000],
                    )
                    .with_selected(false),
                )),
        )
    }

    #[test]
    fn estimate() {
        let estimate = estimate_size(&dataset(), DataModel::Enhanced);
        assert_eq!(
            estimate.variables(),
            [("temp".to_string(), 8000), ("name".to_string(), 8)]
        );
        assert_eq!(estimate.total(), 8008);
    }

    #[test]
    fn classic_widens_bytes() {
        let dataset = Dataset::new(Group::new("").with_variable(Variable::array(
            "flag",
            ElementType::Byte,
            vec![ArrayDimension::new("x", 10)],
            vec![0u8; 10],
        )));
        assert_eq!(estimate_size(&dataset, DataModel::Classic).total(), 20);
        assert_eq!(estimate_size(&dataset, DataModel::Enhanced).total(), 10);
    }

    #[test]
    fn configured_limit() {
        let mut config = Config::default();
        config.set_max_response_size(8000);
        let error = check_admission(&dataset(), &config).unwrap_err();
        assert!(matches!(
            error,
            SizeLimitExceededError::Response {
                estimated: 8008,
                limit: 8000,
                ..
            }
        ));

        config.set_max_response_size(0);
        assert_eq!(check_admission(&dataset(), &config).unwrap().total(), 8008);
    }

    #[test]
    fn variable_limit() {
        let mut config = Config::default();
        config.set_file_format(FileFormat::Offset64);
        let dataset = Dataset::new(Group::new("").with_variable(Variable::array(
            "huge",
            ElementType::Float64,
            vec![ArrayDimension::new("x", 1 << 30)],
            Values::from(Vec::<f64>::new()),
        )));
        assert!(matches!(
            check_admission(&dataset, &config),
            Err(SizeLimitExceededError::Variable { estimated, .. }) if estimated == 8 << 30
        ));
    }

    #[test]
    fn element_counts_saturate() {
        let dataset = Dataset::new(Group::new("").with_variable(Variable::array(
            "cube",
            ElementType::Float64,
            vec![
                ArrayDimension::new("x", 1 << 32),
                ArrayDimension::new("y", 1 << 32),
                ArrayDimension::new("z", 1 << 32),
            ],
            Values::from(Vec::<f64>::new()),
        )));
        assert_eq!(
            estimate_size(&dataset, DataModel::Enhanced).total(),
            u64::MAX
        );

        let mut config = Config::default();
        config.set_max_response_size(1 << 40);
        assert!(matches!(
            check_admission(&dataset, &config),
            Err(SizeLimitExceededError::Response {
                estimated: u64::MAX,
                limit,
                ..
            }) if limit == 1 << 40
        ));
    }
}
