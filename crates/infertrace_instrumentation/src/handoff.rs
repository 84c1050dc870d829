//! Heuristic sizes for data handed between pipeline components.
//!
//! The engine does not report how much data crosses a component boundary, so
//! handoffs are priced from a small lookup table keyed by `(from, to)`. The
//! defaults assume a 4096-wide hidden state in f32; hosts with other
//! dimensions should install their own table through the tracker options.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
}

/// Estimated cost of one handoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandoffCost {
    pub bytes: u64,
    pub bandwidth_gbps: f64,
    pub pressure: MemoryPressure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandoffRule {
    pub from: String,
    pub to: String,
    pub cost: HandoffCost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandoffTable {
    rules: Vec<HandoffRule>,
    fallback: HandoffCost,
}

const F32_BYTES: u64 = 4;

impl HandoffTable {
    #[must_use]
    pub fn new(fallback: HandoffCost) -> Self {
        Self { rules: Vec::new(), fallback }
    }

    /// Add or replace the rule for `(from, to)`.
    #[must_use]
    pub fn with_rule(mut self, from: impl Into<String>, to: impl Into<String>, cost: HandoffCost) -> Self {
        let (from, to) = (from.into(), to.into());
        match self.rules.iter_mut().find(|rule| rule.from == from && rule.to == to) {
            Some(rule) => rule.cost = cost,
            None => self.rules.push(HandoffRule { from, to, cost }),
        }
        self
    }

    #[must_use]
    pub fn lookup(&self, from: &str, to: &str) -> HandoffCost {
        self.rules
            .iter()
            .find(|rule| rule.from == from && rule.to == to)
            .map_or(self.fallback, |rule| rule.cost)
    }

    #[must_use]
    pub fn rules(&self) -> &[HandoffRule] {
        &self.rules
    }
}

impl Default for HandoffTable {
    fn default() -> Self {
        Self::new(HandoffCost {
            bytes: 1024 * F32_BYTES,
            bandwidth_gbps: 300.0,
            pressure: MemoryPressure::Low,
        })
        .with_rule(
            "attention",
            "mlp",
            HandoffCost {
                bytes: 4096 * F32_BYTES,
                bandwidth_gbps: 500.0,
                pressure: MemoryPressure::Medium,
            },
        )
        .with_rule(
            "mlp",
            "attention",
            HandoffCost {
                bytes: 4096 * F32_BYTES,
                bandwidth_gbps: 500.0,
                pressure: MemoryPressure::Low,
            },
        )
        .with_rule(
            "input",
            "attention",
            HandoffCost {
                bytes: 2048 * F32_BYTES,
                bandwidth_gbps: 400.0,
                pressure: MemoryPressure::Low,
            },
        )
    }
}
