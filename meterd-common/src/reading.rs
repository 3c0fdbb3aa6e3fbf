use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::measurement::Measurement;

/// A snapshot of all measurements decoded during one poll cycle of one meter.
///
/// The timestamp is taken when the cycle completes; registers are read
/// sequentially over the bus, so individual values are not mutually atomic
/// within the snapshot. Values are keyed by [`Measurement`] in a `BTreeMap`
/// so iteration and serialization order are deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    /// Configured meter name this snapshot belongs to.
    pub meter: String,

    /// Cycle completion time.
    pub timestamp: DateTime<Utc>,

    values: BTreeMap<Measurement, f64>,
}

impl Reading {
    /// Create a reading timestamped now.
    pub fn new(meter: impl Into<String>, values: BTreeMap<Measurement, f64>) -> Self {
        Self {
            meter: meter.into(),
            timestamp: Utc::now(),
            values,
        }
    }

    /// Value for a measurement, if the producing device family maps it.
    pub fn get(&self, measurement: Measurement) -> Option<f64> {
        self.values.get(&measurement).copied()
    }

    /// All values in measurement order.
    pub fn values(&self) -> impl Iterator<Item = (Measurement, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
