//! Benchmark report assembly and serialization
//!
//! Accumulates framework info, configuration setup and execution results,
//! then writes them as pretty-printed JSON at a caller-supplied path.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::PerformanceMetrics;

/// Framework identification block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    /// Framework name
    pub name: String,
    /// Framework version
    pub version: String,
}

/// Configuration block recorded alongside the results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSetup {
    /// Batch size
    pub batch_size: usize,
    /// Configured iteration count
    pub iterations: usize,
    /// Target device name
    pub target_device: String,
}

/// Full benchmark report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Framework identification
    pub framework: FrameworkInfo,
    /// Configuration used for the run
    pub configuration: ConfigurationSetup,
    /// Execution results, absent until a run completes
    pub execution_results: Option<PerformanceMetrics>,
}

/// Accumulates report sections and writes them as JSON
#[derive(Debug, Clone, Default)]
pub struct ReportWriter {
    report: BenchmarkReport,
}

impl ReportWriter {
    /// Create an empty report writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the framework identification block
    pub fn update_framework_info(&mut self, name: &str, version: &str) {
        self.report.framework = FrameworkInfo {
            name: name.to_string(),
            version: version.to_string(),
        };
    }

    /// Record the configuration block
    pub fn update_configuration_setup(
        &mut self,
        batch_size: usize,
        iterations: usize,
        target_device: &str,
    ) {
        self.report.configuration = ConfigurationSetup {
            batch_size,
            iterations,
            target_device: target_device.to_string(),
        };
    }

    /// Record the execution results
    pub fn update_execution_results(&mut self, metrics: PerformanceMetrics) {
        self.report.execution_results = Some(metrics);
    }

    /// Assembled report
    #[must_use]
    pub fn report(&self) -> &BenchmarkReport {
        &self.report
    }

    /// Serialize the report to pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.report)?)
    }

    /// Write the report to `path`
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if encoding fails or an `Io` error if
    /// the file cannot be written.
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        info!("wrote report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::aggregate;

    fn sample_writer() -> ReportWriter {
        let mut writer = ReportWriter::new();
        writer.update_framework_info("medir", "0.1.0");
        writer.update_configuration_setup(4, 100, "cpu");
        let metrics = aggregate(4, &[0.1, 0.2], &[], &[], None).unwrap();
        writer.update_execution_results(metrics);
        writer
    }

    #[test]
    fn test_report_json_round_trip() {
        let writer = sample_writer();
        let json = writer.to_json().unwrap();
        let parsed: BenchmarkReport = serde_json::from_str(&json).unwrap();
        assert_eq!(&parsed, writer.report());
        assert_eq!(parsed.framework.name, "medir");
        assert_eq!(parsed.configuration.batch_size, 4);
        assert!(parsed.execution_results.is_some());
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        sample_writer().write_report(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"target_device\": \"cpu\""));
    }

    #[test]
    fn test_empty_report_has_no_results() {
        let writer = ReportWriter::new();
        assert!(writer.report().execution_results.is_none());
    }
}
