//! A target adapter which logs calls.

use std::{io::Write, sync::Arc};

use itertools::Itertools;
use parking_lot::Mutex;

use crate::{data_type::NcType, format::FileFormat};

use super::{
    AttributeOwner, ChunkStorage, NcDimId, NcGroupId, NcTypeId, NcVarId, TargetError,
    TargetFormat, TargetValues,
};

/// The usage log target adapter. Logs target method calls and their results, then returns the results of the wrapped target.
///
/// It is intended to aid in debugging by revealing the sequence of definitions and writes a transform performs.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::sync::Arc;
/// # use parking_lot::Mutex;
/// # use ncflat::target::{MemoryTarget, UsageLogTarget};
/// let log_writer = Arc::new(Mutex::new(std::io::stdout()));
/// let target = UsageLogTarget::new(MemoryTarget::new(), log_writer, || {
///     chrono::Utc::now().format("[%T%.3f] ").to_string()
/// });
/// ```
///
/// A transform through the above [`UsageLogTarget`] prints outputs like:
/// ```text
/// [23:41:19.885] create(netCDF-4) -> Ok(NcGroupId(0))
/// [23:41:19.885] define_dimension(0, time, 365) -> Ok(NcDimId(0))
/// [23:41:19.885] define_variable(0, temp, float, [0]) -> Ok(NcVarId(0))
/// [23:41:19.885] define_chunking(0, [365]) -> Ok(())
/// [23:41:19.886] end_define() -> Ok(())
/// [23:41:19.887] write_values(0, [0], [365], len=365) -> Ok(())
/// [23:41:19.891] close() -> Ok(())
/// ```
pub struct UsageLogTarget<T> {
    target: T,
    handle: Arc<Mutex<dyn Write + Send>>,
    prefix_func: fn() -> String,
}

impl<T> core::fmt::Debug for UsageLogTarget<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(f, "usage log")
    }
}

impl<T> UsageLogTarget<T> {
    /// Create a new usage log target adapter around `target`.
    pub fn new(target: T, handle: Arc<Mutex<dyn Write + Send>>, prefix_func: fn() -> String) -> Self {
        Self {
            target,
            handle,
            prefix_func,
        }
    }

    /// The wrapped target.
    pub fn inner(&self) -> &T {
        &self.target
    }

    /// Consume the adapter and return the wrapped target.
    pub fn into_inner(self) -> T {
        self.target
    }

    fn log(&self, call: std::fmt::Arguments) -> Result<(), TargetError> {
        writeln!(self.handle.lock(), "{}{call}", (self.prefix_func)())?;
        Ok(())
    }
}

impl<T: TargetFormat> TargetFormat for UsageLogTarget<T> {
    fn create(&mut self, format: FileFormat) -> Result<NcGroupId, TargetError> {
        let result = self.target.create(format);
        self.log(format_args!("create({format}) -> {result:?}"))?;
        result
    }

    fn define_group(&mut self, parent: NcGroupId, name: &str) -> Result<NcGroupId, TargetError> {
        let result = self.target.define_group(parent, name);
        self.log(format_args!("define_group({parent}, {name}) -> {result:?}"))?;
        result
    }

    fn define_dimension(
        &mut self,
        group: NcGroupId,
        name: &str,
        size: u64,
    ) -> Result<NcDimId, TargetError> {
        let result = self.target.define_dimension(group, name, size);
        self.log(format_args!(
            "define_dimension({group}, {name}, {size}) -> {result:?}"
        ))?;
        result
    }

    fn define_enum(
        &mut self,
        group: NcGroupId,
        name: &str,
        base: NcType,
        members: &[(String, i64)],
    ) -> Result<NcTypeId, TargetError> {
        let result = self.target.define_enum(group, name, base, members);
        self.log(format_args!(
            "define_enum({group}, {name}, {base}, [{}]) -> {result:?}",
            members
                .iter()
                .format_with(", ", |(name, value), f| f(&format_args!("{name}={value}")))
        ))?;
        result
    }

    fn define_variable(
        &mut self,
        group: NcGroupId,
        name: &str,
        nc_type: NcType,
        dimensions: &[NcDimId],
    ) -> Result<NcVarId, TargetError> {
        let result = self.target.define_variable(group, name, nc_type, dimensions);
        self.log(format_args!(
            "define_variable({group}, {name}, {nc_type}, [{}]) -> {result:?}",
            dimensions.iter().format(", ")
        ))?;
        result
    }

    fn define_chunking(
        &mut self,
        variable: NcVarId,
        storage: &ChunkStorage,
    ) -> Result<(), TargetError> {
        let result = self.target.define_chunking(variable, storage);
        match storage {
            ChunkStorage::Contiguous => {
                self.log(format_args!(
                    "define_chunking({variable}, contiguous) -> {result:?}"
                ))?;
            }
            ChunkStorage::Chunked(extents) => {
                self.log(format_args!(
                    "define_chunking({variable}, [{}]) -> {result:?}",
                    extents.iter().format(", ")
                ))?;
            }
        }
        result
    }

    fn define_compression(
        &mut self,
        variable: NcVarId,
        level: u32,
        shuffle: bool,
    ) -> Result<(), TargetError> {
        let result = self.target.define_compression(variable, level, shuffle);
        self.log(format_args!(
            "define_compression({variable}, {level}, shuffle={shuffle}) -> {result:?}"
        ))?;
        result
    }

    fn define_attribute(
        &mut self,
        owner: AttributeOwner,
        name: &str,
        value: &TargetValues,
    ) -> Result<(), TargetError> {
        let result = self.target.define_attribute(owner, name, value);
        self.log(format_args!(
            "define_attribute({owner}, {name}, {} len={}) -> {result:?}",
            value.nc_type(),
            value.len()
        ))?;
        result
    }

    fn end_define(&mut self) -> Result<(), TargetError> {
        let result = self.target.end_define();
        self.log(format_args!("end_define() -> {result:?}"))?;
        result
    }

    fn write_values(
        &mut self,
        variable: NcVarId,
        start: &[u64],
        count: &[u64],
        values: &TargetValues,
    ) -> Result<(), TargetError> {
        let result = self.target.write_values(variable, start, count, values);
        self.log(format_args!(
            "write_values({variable}, [{}], [{}], len={}) -> {result:?}",
            start.iter().format(", "),
            count.iter().format(", "),
            values.len()
        ))?;
        result
    }

    fn close(&mut self) -> Result<(), TargetError> {
        let result = self.target.close();
        self.log(format_args!("close() -> {result:?}"))?;
        result
    }
}
