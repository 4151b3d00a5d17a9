//! A rust library for exporting hierarchical, DAP-like datasets to [netCDF](https://www.unidata.ucar.edu/software/netcdf/).
//!
//! A source [`Dataset`](source::Dataset) is a tree of groups holding scalars, arrays, structures, paired-array
//! containers (grids), bundles and arrays of structures, with attributes at every level.
//! netCDF has only named dimensions, typed variables and attributes, and groups in the netCDF-4 formats.
//! `ncflat` bridges the two:
//!  - [`name`]: sanitizes names into legal netCDF names and builds embedded names of structure members,
//!  - [`dimension`]: resolves variable axes onto shared, uniquely named dimensions,
//!  - [`chunk_layout`]: plans chunk shapes for netCDF-4 variables,
//!  - [`flatten`]: flattens composite variables into [`VariableDescriptor`](flatten::VariableDescriptor)s,
//!  - [`group_mapper`]: maps source groups onto netCDF-4 groups,
//!  - [`transform`]: drives a transform from admission control to closing the output.
//!
//! The netCDF library itself sits behind the [`TargetFormat`](target::TargetFormat) trait.
//! [`MemoryTarget`](target::MemoryTarget) records a transform in memory, and
//! [`UsageLogTarget`](target::UsageLogTarget) logs the calls made to any target.
//!
//! ## Example
//! ```rust
//! # use ncflat::{
//! #     config::Config,
//! #     data_type::ElementType,
//! #     source::{ArrayDimension, Dataset, Group, Variable},
//! #     target::MemoryTarget,
//! #     transform::{TransformDriver, TransformOptions},
//! # };
//! let dataset = Dataset::new(
//!     Group::new("").with_variable(Variable::structure(
//!         "station",
//!         vec![Variable::array(
//!             "temperature",
//!             ElementType::Float32,
//!             vec![ArrayDimension::new("time", 3)],
//!             vec![281.5f32, 282.0, 283.25],
//!         )],
//!     )),
//! );
//!
//! let mut target = MemoryTarget::new();
//! let mut driver =
//!     TransformDriver::new(&dataset, &mut target, Config::default(), TransformOptions::new());
//! let summary = driver.transform()?;
//! assert_eq!(summary.variables(), ["station.temperature"]);
//! println!("{}", target.hierarchy_tree());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration
//! Transforms are configured with a [`Config`](config::Config), either passed to
//! [`TransformDriver::new`](transform::TransformDriver::new) or taken from the
//! [global configuration](config::global_config).
//!
//! ## Licence
//! `ncflat` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
// #![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod admission;
pub mod attributes;
pub mod chunk_layout;
pub mod config;
pub mod data_type;
pub mod define;
pub mod dimension;
pub mod error;
pub mod flatten;
pub mod format;
pub mod group_mapper;
pub mod history;
pub mod name;
pub mod source;
pub mod target;
pub mod transform;
pub mod values;
