//! Sample-set generation
//!
//! Full range when it fits the sample budget, otherwise a uniform draw of
//! distinct values. An optional start value is always included.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::Value;

/// Errors raised by sample generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// `min + range` does not fit in a value.
    #[error("sample range {min} + {range} overflows")]
    RangeOverflow {
        /// Lower bound.
        min: Value,
        /// Range length.
        range: u64,
    },
}

/// Which starting values to trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    /// Smallest sample.
    pub min: Value,
    /// Number of consecutive candidates starting at `min`.
    pub range: u64,
    /// Upper bound on the number of samples drawn from the range.
    pub max_samples: u64,
    /// Value of interest, always traced.
    pub start_value: Option<Value>,
    /// Seed for sub-sampling; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            min: 1,
            range: 1000,
            max_samples: 1000,
            start_value: None,
            seed: None,
        }
    }
}

impl SampleSpec {
    /// Every value in `min..min + range`.
    pub fn range(min: Value, range: u64) -> Self {
        Self {
            min,
            range,
            max_samples: range,
            ..Self::default()
        }
    }

    /// Limit the number of samples drawn.
    pub fn with_max_samples(mut self, max_samples: u64) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Always include `start_value`.
    pub fn with_start_value(mut self, start_value: Option<Value>) -> Self {
        self.start_value = start_value;
        self
    }

    /// Make sub-sampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Materialize the sample list.
    pub fn samples(&self) -> Result<Vec<Value>, SampleError> {
        let overflow = SampleError::RangeOverflow {
            min: self.min,
            range: self.range,
        };
        let span = i64::try_from(self.range).map_err(|_| overflow.clone())?;
        let max = self.min.checked_add(span).ok_or(overflow)?;

        let mut samples: Vec<Value> = if self.max_samples >= self.range {
            (self.min..max).collect()
        } else {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut used = HashSet::with_capacity(self.max_samples as usize);
            let mut drawn = Vec::with_capacity(self.max_samples as usize);
            while (drawn.len() as u64) < self.max_samples {
                let candidate = rng.gen_range(self.min..max);
                if used.insert(candidate) {
                    drawn.push(candidate);
                }
            }
            drawn
        };

        if let Some(start) = self.start_value {
            if !samples.contains(&start) {
                samples.push(start);
            }
        }
        Ok(samples)
    }
}
