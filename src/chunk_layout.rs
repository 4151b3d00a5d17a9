//! Chunk layout planning.
//!
//! A [`ChunkLayoutPlanner`] picks per-axis chunk extents for an array from its dimension sizes alone.
//! The plan bounds both the number of elements in a chunk and the number of chunks along the slow-varying axes.

use derive_more::{Deref, Display, From};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Per-axis chunk extents, outermost axis first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deref, From, Display, Serialize, Deserialize)]
#[display("[{}]", _0.iter().join(", "))]
pub struct ChunkPlan(Vec<u64>);

impl ChunkPlan {
    /// Create a chunk plan from extents.
    #[must_use]
    pub fn new(extents: Vec<u64>) -> Self {
        Self(extents)
    }

    /// The number of elements in one chunk.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        num_elements(&self.0)
    }

    /// Returns true if any extent is zero, in which case the array cannot be chunked.
    #[must_use]
    pub fn has_zero_extent(&self) -> bool {
        self.0.contains(&0)
    }

    /// Consume the plan and return its extents.
    #[must_use]
    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }
}

/// Chunk layout configuration parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct ChunkLayoutConfiguration {
    /// The largest extent chosen for an axis of a rank 2 or higher array, and for short rank 1 arrays.
    pub max_extent: u64,
    /// Rank 1 arrays larger than this use [`rank1_medium_extent`](Self::rank1_medium_extent).
    pub rank1_medium_threshold: u64,
    /// The extent of rank 1 arrays larger than [`rank1_medium_threshold`](Self::rank1_medium_threshold).
    pub rank1_medium_extent: u64,
    /// Rank 1 arrays larger than this use [`rank1_large_extent`](Self::rank1_large_extent).
    pub rank1_large_threshold: u64,
    /// The extent of rank 1 arrays larger than [`rank1_large_threshold`](Self::rank1_large_threshold).
    pub rank1_large_extent: u64,
    /// The element budget of a chunk of a rank 3 or higher array.
    pub max_chunk_elements: u64,
    /// The target upper bound on the number of chunks along the slow-varying axes.
    pub max_slow_chunks: u64,
}

impl Default for ChunkLayoutConfiguration {
    fn default() -> Self {
        Self {
            max_extent: 1024,
            rank1_medium_threshold: 65_536,
            rank1_medium_extent: 65_536,
            rank1_large_threshold: 16 * 1_048_576,
            rank1_large_extent: 1_048_576,
            max_chunk_elements: 1_048_576,
            max_slow_chunks: 512,
        }
    }
}

impl ChunkLayoutConfiguration {
    /// Check that every parameter is non-zero.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] naming the first zero parameter.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let parameters = [
            ("max_extent", self.max_extent),
            ("rank1_medium_extent", self.rank1_medium_extent),
            ("rank1_large_extent", self.rank1_large_extent),
            ("max_chunk_elements", self.max_chunk_elements),
            ("max_slow_chunks", self.max_slow_chunks),
        ];
        for (name, value) in parameters {
            if value == 0 {
                return Err(ConfigurationError::new(format!(
                    "chunk layout parameter {name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

/// Computes chunk plans.
#[derive(Debug, Clone, Default)]
pub struct ChunkLayoutPlanner {
    configuration: ChunkLayoutConfiguration,
}

impl ChunkLayoutPlanner {
    /// Create a planner from a configuration.
    #[must_use]
    pub fn new(configuration: ChunkLayoutConfiguration) -> Self {
        Self { configuration }
    }

    /// The planner configuration.
    #[must_use]
    pub fn configuration(&self) -> &ChunkLayoutConfiguration {
        &self.configuration
    }

    /// Plan the chunk extents of an array with dimension sizes `dimension_sizes`.
    ///
    /// - rank 0: an empty plan.
    /// - rank 1: the size capped at the maximum extent, scaled up for large arrays.
    /// - rank 2: each size capped at the maximum extent.
    /// - rank 3+: the two innermost axes as for rank 2, then outer axes while the element budget holds.
    ///   The axes left over default to an extent of 1, unless that leaves too many chunks along them.
    ///   In that case a rows-per-chunk factor is spread over them, innermost first.
    ///   The inner axes are then shrunk so that the chunk stays within the element budget.
    ///
    /// Extents never exceed the corresponding size. A zero size gives a zero extent.
    #[must_use]
    pub fn plan(&self, dimension_sizes: &[u64]) -> ChunkPlan {
        let config = &self.configuration;
        let capped = |size: u64| size.min(config.max_extent);
        match dimension_sizes {
            [] => ChunkPlan::default(),
            [size] => {
                let extent = if *size > config.rank1_large_threshold {
                    config.rank1_large_extent
                } else if *size > config.rank1_medium_threshold {
                    config.rank1_medium_extent
                } else {
                    config.max_extent
                };
                ChunkPlan(vec![extent.min(*size)])
            }
            [_, _] => ChunkPlan(dimension_sizes.iter().copied().map(capped).collect()),
            _ => self.plan_high_rank(dimension_sizes),
        }
    }

    /// Plan the chunk extents of a text array whose values are stored along a trailing axis of length `text_width`.
    #[must_use]
    pub fn plan_with_text(&self, dimension_sizes: &[u64], text_width: u64) -> ChunkPlan {
        let mut plan = self.plan(dimension_sizes);
        plan.0.push(text_width.min(self.configuration.max_extent));
        plan
    }

    fn plan_high_rank(&self, dimension_sizes: &[u64]) -> ChunkPlan {
        let config = &self.configuration;
        let rank = dimension_sizes.len();
        let mut extents = vec![1; rank];

        let mut elements: u64 = 1;
        for axis in [rank - 1, rank - 2] {
            extents[axis] = dimension_sizes[axis].min(config.max_extent);
            elements = elements.saturating_mul(extents[axis]);
        }

        // Fill outer axes innermost first until the element budget is spent
        let mut remaining = None;
        for axis in (0..rank - 2).rev() {
            let extent = dimension_sizes[axis].min(config.max_extent);
            let next = elements.saturating_mul(extent);
            if next > config.max_chunk_elements {
                remaining = Some(axis);
                break;
            }
            extents[axis] = extent;
            elements = next;
        }

        if let Some(last_remaining) = remaining {
            let remaining_sizes = &dimension_sizes[..=last_remaining];
            let slow_chunks = remaining_sizes
                .iter()
                .fold(1u64, |product, size| product.saturating_mul(*size));
            if slow_chunks > config.max_slow_chunks {
                let mut factor = slow_chunks.div_ceil(config.max_slow_chunks);
                for axis in (0..=last_remaining).rev() {
                    if factor <= 1 {
                        break;
                    }
                    let size = dimension_sizes[axis];
                    if size < factor {
                        extents[axis] = size;
                        factor = factor.div_ceil(size.max(1));
                    } else {
                        extents[axis] = factor;
                        factor = 1;
                    }
                }
            }
            for axis in 0..=last_remaining {
                extents[axis] = extents[axis].min(dimension_sizes[axis]);
            }
        }

        // Rows gained on the slow axes are given back by the filled outer axes (innermost first), then the two
        // innermost axes, then the slow axes themselves
        let first_filled = remaining.map_or(0, |axis| axis + 1);
        let shrink_order = (first_filled..rank - 2)
            .rev()
            .chain([rank - 2, rank - 1])
            .chain(0..first_filled);
        shrink_to_budget(&mut extents, shrink_order, config.max_chunk_elements);

        ChunkPlan(extents)
    }
}

fn num_elements(extents: &[u64]) -> u64 {
    extents
        .iter()
        .fold(1u64, |product, extent| product.saturating_mul(*extent))
}

/// Divide `extents` along `axes`, in order, until their product is at most `budget`.
fn shrink_to_budget(extents: &mut [u64], axes: impl IntoIterator<Item = usize>, budget: u64) {
    for axis in axes {
        let elements = num_elements(extents);
        if elements <= budget {
            return;
        }
        let shrink = elements.div_ceil(budget);
        extents[axis] = (extents[axis] / shrink).max(1);
    }
}
