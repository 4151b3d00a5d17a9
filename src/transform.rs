//! The transform driver.
//!
//! A [`TransformDriver`] exports one [`Dataset`] to one [`TargetFormat`]:
//!  1. the configuration is validated and the response size is checked against the limits,
//!  2. the file is created,
//!  3. the variables are flattened and defined, flat or per group depending on the format, then the global attributes,
//!  4. the values are written in flattening order,
//!  5. the file is closed.
//!
//! If anything fails after the file is created, the file is closed and the driver is left [`TransformState::Failed`].

mod context;

pub use context::TransformContext;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use derive_more::Display;

use crate::{
    admission::{self, SizeEstimate},
    attributes, define,
    config::{global_config, Config},
    dimension::{Dimension, ScopeId},
    error::{InternalInvariantError, TargetFormatError, TransformError},
    flatten::{SchemaFlattener, SharedMap, VariableDescriptor},
    format::{DataModel, FileFormat},
    group_mapper::{GroupMapper, GroupNode},
    history::{self, HistoryOptions},
    source::{Attributes, Dataset},
    target::{NcGroupId, NcVarId, TargetFormat},
};

/// The state of a [`TransformDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransformState {
    /// Nothing has been done.
    #[display("init")]
    Init,
    /// The response size was admitted.
    #[display("admission checked")]
    AdmissionChecked,
    /// The target file was created.
    #[display("file opened")]
    FileOpened,
    /// Every dimension, variable and attribute was defined.
    #[display("metadata defined")]
    MetadataDefined,
    /// Every value was written.
    #[display("values written")]
    ValuesWritten,
    /// The target file was closed.
    #[display("closed")]
    Closed,
    /// The transform failed.
    #[display("failed")]
    Failed,
}

impl TransformState {
    /// Returns true if the transform has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// Per-request options of a transform.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    history: Option<HistoryOptions>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl TransformOptions {
    /// Create default options: no history, no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a history entry describing the request to the global attributes.
    #[must_use]
    pub fn with_history(mut self, history: HistoryOptions) -> Self {
        self.history = Some(history);
        self
    }

    /// Abort the transform with [`TransformError::Cancelled`] once `cancellation` is set.
    ///
    /// The flag is checked before admission and between writing variables.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// The history options.
    #[must_use]
    pub fn history(&self) -> Option<&HistoryOptions> {
        self.history.as_ref()
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|cancellation| cancellation.load(Ordering::Relaxed))
    }
}

/// The outcome of a successful transform.
#[derive(Debug, Clone)]
pub struct TransformSummary {
    format: FileFormat,
    estimate: SizeEstimate,
    variables: Vec<String>,
    shared_maps: Vec<SharedMap>,
}

impl TransformSummary {
    /// The file format written.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// The estimated response size.
    #[must_use]
    pub fn estimate(&self) -> &SizeEstimate {
        &self.estimate
    }

    /// The names of the variables written, in writing order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The emitted maps and the containers sharing them.
    #[must_use]
    pub fn shared_maps(&self) -> &[SharedMap] {
        &self.shared_maps
    }
}

/// Exports a dataset to a target format.
pub struct TransformDriver<'d, 't, T: TargetFormat + ?Sized> {
    dataset: &'d Dataset,
    target: &'t mut T,
    context: TransformContext,
    options: TransformOptions,
    state: TransformState,
}

impl<'d, 't, T: TargetFormat + ?Sized> TransformDriver<'d, 't, T> {
    /// Create a driver exporting `dataset` to `target` with `config`.
    #[must_use]
    pub fn new(
        dataset: &'d Dataset,
        target: &'t mut T,
        config: Config,
        options: TransformOptions,
    ) -> Self {
        let context = TransformContext::new(config, dataset.container_kind());
        Self {
            dataset,
            target,
            context,
            options,
            state: TransformState::Init,
        }
    }

    /// Create a driver exporting `dataset` to `target` with the global configuration.
    ///
    /// See [`global_config`](crate::config::global_config).
    #[must_use]
    pub fn with_global_config(
        dataset: &'d Dataset,
        target: &'t mut T,
        options: TransformOptions,
    ) -> Self {
        let config = global_config().clone();
        Self::new(dataset, target, config, options)
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> TransformState {
        self.state
    }

    /// The transform context.
    #[must_use]
    pub fn context(&self) -> &TransformContext {
        &self.context
    }

    /// Run the transform.
    ///
    /// # Errors
    /// Returns a [`TransformError`] if the configuration is invalid, the response is too large, the schema cannot be
    /// represented in the target format, the source values cannot be read, the target rejects an operation, or the
    /// transform is cancelled. A driver that is not in its initial state returns
    /// [`InternalInvariantError::InvalidState`].
    pub fn transform(&mut self) -> Result<TransformSummary, TransformError> {
        if self.state != TransformState::Init {
            return Err(InternalInvariantError::InvalidState {
                operation: "transform",
                state: self.state,
            }
            .logged()
            .into());
        }
        match self.run() {
            Ok(summary) => Ok(summary),
            Err(err) => {
                log::debug!("transform failed in state {}: {err}", self.state);
                if matches!(
                    self.state,
                    TransformState::FileOpened
                        | TransformState::MetadataDefined
                        | TransformState::ValuesWritten
                ) {
                    if let Err(close_err) = self.target.close() {
                        log::warn!("ignoring error closing the output after a failure: {close_err}");
                    }
                }
                self.state = TransformState::Failed;
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<TransformSummary, TransformError> {
        self.context.config().validate()?;
        self.check_cancelled()?;

        let estimate = admission::check_admission(self.dataset, self.context.config())?;
        self.state = TransformState::AdmissionChecked;

        let format = self.context.format();
        let root = self
            .target
            .create(format)
            .map_err(|err| TargetFormatError::new(format!("create {format} file"), err))?;
        self.state = TransformState::FileOpened;
        log::info!("created {format} file");

        let dataset = self.dataset;
        self.context.dimensions_mut().reserve_synthetic_suffixes(
            dataset.root().dimensions().iter().map(|d| d.name.as_str()),
        );

        let hierarchical = format.supports_groups() && !dataset.root().groups().is_empty();
        let (descriptors, promoted_attributes) = if hierarchical {
            self.define_hierarchical(root)?
        } else {
            self.define_flat(root)?
        };

        if !self.context.config().no_global_attributes() {
            let mut global_attributes = dataset.attributes().clone();
            global_attributes.extend(&promoted_attributes);
            if let Some(options) = self.options.history() {
                history::update_history(
                    &mut global_attributes,
                    options,
                    self.context.config().history_json(),
                );
            }
            attributes::define_group_attributes(
                self.target,
                &self.context,
                root,
                &global_attributes,
                true,
            )?;
        }

        self.target
            .end_define()
            .map_err(|err| TargetFormatError::new("end define mode".to_string(), err))?;
        self.state = TransformState::MetadataDefined;
        log::info!("defined {} variables", descriptors.len());

        for (descriptor, variable) in &descriptors {
            self.check_cancelled()?;
            self.write_variable(descriptor, *variable)?;
        }
        self.state = TransformState::ValuesWritten;

        let closed = self.target.close();
        self.state = TransformState::Closed;
        closed.map_err(|err| TargetFormatError::new("close".to_string(), err))?;
        log::info!("closed {format} file");

        let variables = descriptors
            .iter()
            .map(|(descriptor, _)| descriptor.name().to_string())
            .collect();
        for (descriptor, _) in &descriptors {
            for id in descriptor.dimensions() {
                self.context.dimensions_mut().release(*id)?;
            }
        }
        Ok(TransformSummary {
            format,
            estimate,
            variables,
            shared_maps: self.context.shared_maps().maps().to_vec(),
        })
    }

    fn define_flat(
        &mut self,
        root: NcGroupId,
    ) -> Result<(Vec<(VariableDescriptor<'d>, NcVarId)>, Attributes), TransformError>
    {
        let dataset = self.dataset;
        self.context.set_scope_group(ScopeId::ROOT, root);
        if self.context.model() == DataModel::Enhanced {
            for enumeration in dataset.root().enumerations() {
                define::define_enumeration(
                    self.target,
                    &mut self.context,
                    ScopeId::ROOT,
                    root,
                    enumeration,
                )?;
            }
        }

        let mut flattener = SchemaFlattener::new(&mut self.context, ScopeId::ROOT);
        for variable in dataset.root().variables() {
            flattener.flatten_variable(variable)?;
        }
        flattener.flatten_nested_groups(dataset.root().groups())?;
        let flattened = flattener.finish();

        let mut descriptors = Vec::with_capacity(flattened.descriptors.len());
        for descriptor in flattened.descriptors {
            let variable = define::define_variable(self.target, &mut self.context, &descriptor)?;
            descriptors.push((descriptor, variable));
        }
        Ok((descriptors, flattened.promoted_attributes))
    }

    fn define_hierarchical(
        &mut self,
        root: NcGroupId,
    ) -> Result<(Vec<(VariableDescriptor<'d>, NcVarId)>, Attributes), TransformError>
    {
        let dataset = self.dataset;
        let unconstrained = dataset.is_unconstrained();
        let mut mapper = GroupMapper::new(
            &mut self.context,
            self.target,
            dataset.root(),
            unconstrained,
        );
        let mut node = mapper.map_root(dataset.root(), root)?;
        let promoted_attributes = std::mem::take(&mut node.promoted_attributes);
        let mut descriptors = Vec::new();
        collect_variables(node, &mut descriptors);
        Ok((descriptors, promoted_attributes))
    }

    fn write_variable(
        &mut self,
        descriptor: &VariableDescriptor<'d>,
        variable: NcVarId,
    ) -> Result<(), TransformError> {
        let registry = self.context.dimensions();
        let count = descriptor
            .dimensions()
            .iter()
            .map(|id| {
                registry
                    .get(*id)
                    .map(Dimension::size)
                    .ok_or_else(|| InternalInvariantError::UnknownDimension(id.index()).logged())
            })
            .collect::<Result<Vec<_>, _>>()?;
        let text_width = if descriptor.is_text() {
            count.last().copied().unwrap_or_default()
        } else {
            0
        };
        let values = descriptor.read_target_values(text_width)?;
        let start = vec![0; count.len()];
        self.target
            .write_values(variable, &start, &count, &values)
            .map_err(|err| {
                TargetFormatError::new(format!("write values of {}", descriptor.name()), err)
            })?;
        log::debug!("wrote {descriptor}");
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), TransformError> {
        if self.options.is_cancelled() {
            log::info!("transform cancelled in state {}", self.state);
            Err(TransformError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn collect_variables<'s>(
    node: GroupNode<'s>,
    descriptors: &mut Vec<(VariableDescriptor<'s>, NcVarId)>,
) {
    descriptors.extend(node.variables);
    for child in node.children {
        collect_variables(child, descriptors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_type::ElementType,
        error::SizeLimitExceededError,
        source::{ArrayDimension, Group, Variable},
        target::{MemoryTarget, TargetValues},
    };

    fn dataset() -> Dataset {
        Dataset::new(
            Group::new("").with_variable(Variable::array(
                "temp",
                ElementType::Float32,
                vec![ArrayDimension::new("time", 3)],
                vec![1.0f32, 2.0, 3.0],
            )),
        )
    }

    #[test]
    fn transform_states() {
        let dataset = dataset();
        let mut target = MemoryTarget::new();
        let mut driver =
            TransformDriver::new(&dataset, &mut target, Config::default(), TransformOptions::new());
        assert_eq!(driver.state(), TransformState::Init);
        let summary = driver.transform().unwrap();
        assert_eq!(driver.state(), TransformState::Closed);
        assert!(driver.state().is_terminal());
        assert_eq!(summary.variables(), ["temp"]);
        assert_eq!(summary.estimate().total(), 12);
        assert_eq!(
            target.variable("/", "temp").unwrap().values,
            Some(TargetValues::Float(vec![1.0, 2.0, 3.0]))
        );
        assert!(target.is_closed());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "internal invariant violated"))]
    fn transform_runs_once() {
        let dataset = dataset();
        let mut target = MemoryTarget::new();
        let mut driver =
            TransformDriver::new(&dataset, &mut target, Config::default(), TransformOptions::new());
        driver.transform().unwrap();
        assert!(matches!(
            driver.transform(),
            Err(TransformError::InternalInvariant(
                InternalInvariantError::InvalidState { .. }
            ))
        ));
    }

    #[test]
    fn cancelled_before_admission() {
        let dataset = dataset();
        let mut target = MemoryTarget::new();
        let cancellation = Arc::new(AtomicBool::new(true));
        let mut driver = TransformDriver::new(
            &dataset,
            &mut target,
            Config::default(),
            TransformOptions::new().with_cancellation(cancellation),
        );
        assert!(matches!(driver.transform(), Err(TransformError::Cancelled)));
        assert_eq!(driver.state(), TransformState::Failed);
        assert_eq!(target.operation_count(), 0);
    }

    #[test]
    fn rejected_by_admission() {
        let dataset = dataset();
        let mut target = MemoryTarget::new();
        let mut config = Config::default();
        config.set_max_response_size(8);
        let mut driver =
            TransformDriver::new(&dataset, &mut target, config, TransformOptions::new());
        assert!(matches!(
            driver.transform(),
            Err(TransformError::SizeLimitExceeded(
                SizeLimitExceededError::Response { estimated: 12, .. }
            ))
        ));
        assert_eq!(driver.state(), TransformState::Failed);
        assert_eq!(target.operation_count(), 0);
    }

    #[test]
    fn transform_state_display() {
        assert_eq!(TransformState::MetadataDefined.to_string(), "metadata defined");
    }
}
