//! The sample-point arbitrator.

use crate::sampling::opacity::OpacityMap;

/// Comparison direction for the relative-value policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The smaller value wins.
    Less,
    /// The larger value wins.
    Greater,
}

/// Which policy decides collisions.
#[derive(Debug, Clone)]
pub enum ArbitrationMode {
    /// Map both values through an opacity transfer function; higher opacity
    /// wins. Exact opacity ties go to the numerically larger raw value — an
    /// anti-banding rule, deliberately not first-write-wins.
    Opacity(OpacityMap),
    /// Plain comparison of raw values.
    RelativeValue(Direction),
}

/// Decides which of two candidate values at one sample location survives.
#[derive(Debug, Clone)]
pub struct SamplePointArbitrator {
    mode: ArbitrationMode,
    /// Index of the variable the arbitration examines, for multi-variable
    /// sample records.
    arbitration_variable: usize,
}

impl SamplePointArbitrator {
    pub fn new(mode: ArbitrationMode) -> Self {
        Self {
            mode,
            arbitration_variable: 0,
        }
    }

    pub fn with_arbitration_variable(mut self, index: usize) -> Self {
        self.arbitration_variable = index;
        self
    }

    pub fn arbitration_variable(&self) -> usize {
        self.arbitration_variable
    }

    /// Whether `candidate` should replace `current`.
    pub fn should_overwrite(&self, current: f64, candidate: f64) -> bool {
        match &self.mode {
            ArbitrationMode::Opacity(map) => {
                let cur = map.opacity(current);
                let cand = map.opacity(candidate);
                if cand != cur {
                    cand > cur
                } else {
                    candidate > current
                }
            }
            ArbitrationMode::RelativeValue(Direction::Less) => candidate < current,
            ArbitrationMode::RelativeValue(Direction::Greater) => candidate > current,
        }
    }
}
