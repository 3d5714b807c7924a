//! Count observables (spec.md §6's "viz/count output" contract, ambient
//! half): [`CountRecorder`] accumulates per-observable population time
//! series. Serializing them to CELLBLENDER/ASCII files is the excluded
//! external writer; this module only does the recording.

use mcell_core::Time;
use serde::{Deserialize, Serialize};

/// A named series of `(time, value)` samples, shaped like
/// `oldies_core::TimeSeries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    pub time: Vec<Time>,
    pub values: Vec<f64>,
    pub name: String,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            time: Vec::new(),
            values: Vec::new(),
            name: name.into(),
        }
    }

    pub fn push(&mut self, t: Time, v: f64) {
        self.time.push(t);
        self.values.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// One count observable bound to a species-pattern match predicate,
/// sampled every `every_n_steps` diffusion steps (spec.md §6).
pub struct CountRecorder {
    series: Vec<TimeSeries>,
    names: Vec<String>,
}

impl CountRecorder {
    pub fn new(observable_names: impl IntoIterator<Item = String>) -> Self {
        let names: Vec<String> = observable_names.into_iter().collect();
        let series = names.iter().map(|n| TimeSeries::new(n.clone())).collect();
        Self { series, names }
    }

    pub fn record(&mut self, index: usize, t: Time, count: usize) {
        self.series[index].push(t, count as f64);
    }

    pub fn series(&self) -> &[TimeSeries] {
        &self.series
    }

    pub fn by_name(&self, name: &str) -> Option<&TimeSeries> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.series[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_tracks_independent_series_by_index() {
        let mut rec = CountRecorder::new(["A".to_string(), "C".to_string()]);
        rec.record(0, 0.0, 1000);
        rec.record(1, 0.0, 0);
        rec.record(0, 1.0, 500);
        rec.record(1, 1.0, 120);

        assert_eq!(rec.by_name("A").unwrap().values, vec![1000.0, 500.0]);
        assert_eq!(rec.by_name("C").unwrap().values, vec![0.0, 120.0]);
        assert!(rec.by_name("missing").is_none());
    }
}
