//! Target device tags
//!
//! The engine does not manage devices itself; it only needs to know whether
//! the target is an accelerator, because accelerator-resident calls are
//! bracketed by synchronization barriers so that measured latency reflects
//! completed computation rather than kernel submission.

use serde::{Deserialize, Serialize};

use crate::error::{MedirError, Result};

/// Target device for inference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Host CPU
    #[default]
    Cpu,
    /// Accelerator (GPU)
    Gpu,
}

impl Device {
    /// Canonical string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }

    /// Parse from string
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an unrecognized device name.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" | "cuda" | "nvidia_gpu" => Ok(Self::Gpu),
            other => Err(MedirError::InvalidConfiguration(format!(
                "the device '{other}' is not supported"
            ))),
        }
    }

    /// Whether device synchronization barriers are required around calls
    #[must_use]
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Self::Gpu)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_devices() {
        assert_eq!(Device::parse("cpu").unwrap(), Device::Cpu);
        assert_eq!(Device::parse("CUDA").unwrap(), Device::Gpu);
        assert_eq!(Device::parse("nvidia_gpu").unwrap(), Device::Gpu);
    }

    #[test]
    fn test_parse_unknown_device_fails() {
        let err = Device::parse("tpu").unwrap_err();
        assert!(matches!(err, MedirError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_is_accelerator() {
        assert!(!Device::Cpu.is_accelerator());
        assert!(Device::Gpu.is_accelerator());
    }
}
