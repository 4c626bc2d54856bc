//! Minimal tensor type for benchmark payloads
//!
//! Row-major f32 storage with shape validation, a device-placement tag and
//! the row softmax used by the classification decode stage. The harness
//! measures how model calls are issued and timed, not what they compute, so
//! this stays deliberately small.

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{MedirError, Result};

/// N-dimensional f32 tensor in row-major order
///
/// # Examples
///
/// ```
/// use medir::Tensor;
///
/// let t = Tensor::from_vec(vec![2, 3], vec![
///     1.0, 2.0, 3.0,
///     4.0, 5.0, 6.0,
/// ]).unwrap();
///
/// assert_eq!(t.shape(), &[2, 3]);
/// assert_eq!(t.size(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// Flattened data in row-major order
    data: Vec<f32>,
    /// Shape of the tensor
    shape: Vec<usize>,
    /// Device the tensor currently resides on
    #[serde(default)]
    device: Device,
}

impl Tensor {
    /// Create a new tensor from a shape and flattened data
    ///
    /// # Errors
    ///
    /// Returns `Err` if the shape is empty, contains a zero dimension, or
    /// does not match the data length.
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        if shape.is_empty() {
            return Err(MedirError::InvalidShape {
                reason: "shape cannot be empty".to_string(),
            });
        }

        if shape.contains(&0) {
            return Err(MedirError::InvalidShape {
                reason: "shape dimensions cannot be zero".to_string(),
            });
        }

        let expected = shape.iter().product();
        if data.len() != expected {
            return Err(MedirError::DataShapeMismatch {
                data_size: data.len(),
                shape,
                expected,
            });
        }

        Ok(Self {
            data,
            shape,
            device: Device::Cpu,
        })
    }

    /// Shape of the tensor
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Underlying data slice
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Device the tensor currently resides on
    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Copy of this tensor placed on `device`
    #[must_use]
    pub fn to(&self, device: Device) -> Tensor {
        Tensor {
            data: self.data.clone(),
            shape: self.shape.clone(),
            device,
        }
    }

    /// Softmax along dimension `dim`
    ///
    /// Only the class dimension of a 2D `[batch, classes]` tensor is
    /// supported, which is all the classification decode stage needs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` if the tensor is not 2D or `dim != 1`.
    pub fn softmax(&self, dim: usize) -> Result<Tensor> {
        if self.ndim() != 2 || dim != 1 {
            return Err(MedirError::InvalidShape {
                reason: format!(
                    "softmax supports dim 1 of a 2D tensor, got dim {dim} of shape {:?}",
                    self.shape
                ),
            });
        }

        let cols = self.shape[1];
        let mut data = Vec::with_capacity(self.data.len());
        for row in self.data.chunks(cols) {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exp: Vec<f32> = row.iter().map(|x| (x - max).exp()).collect();
            let sum: f32 = exp.iter().sum();
            data.extend(exp.iter().map(|x| x / sum));
        }

        Ok(Tensor {
            data,
            shape: self.shape.clone(),
            device: self.device,
        })
    }
}
