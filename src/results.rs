//! Per-scenario travel-time accumulator and summary writer, a direct port
//! of `results.py`'s `Recorder` (§5, §6 results sink).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;

use anyhow::Result;

#[derive(Debug, Clone, Default)]
pub struct ResultsSink {
    meter: BTreeMap<String, Vec<f64>>,
}

impl ResultsSink {
    pub fn new() -> Self {
        ResultsSink::default()
    }

    /// Ensure `key` exists even if no value is ever recorded for it, so the
    /// summary still reports the key (mirrors `Recorder.add_key`).
    pub fn add_key(&mut self, key: &str) {
        self.meter.entry(key.to_string()).or_default();
    }

    pub fn record(&mut self, key: &str, value: f64) {
        self.meter.entry(key.to_string()).or_default().push(value);
    }

    pub fn values(&self, key: &str) -> &[f64] {
        self.meter.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Write one `key, mean` line per key, in key order.
    pub fn summarize(&self, path: &str) -> Result<()> {
        let mut file = File::create(path)?;
        for (key, values) in &self.meter {
            writeln!(file, "{}, {}", key, Self::mean(values))?;
        }
        Ok(())
    }
}
