use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use candle_core::{DType, Device, Tensor};

pub const COEF_TENSOR: &str = "coef";
pub const INTERCEPT_TENSOR: &str = "intercept";

/// Ordinary least squares weights, evaluated as `X · coef + intercept`.
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    coef: Tensor,
    intercept: Tensor,
    device: Device,
}

impl LinearRegressor {
    pub fn new(coef: Vec<f64>, intercept: f64) -> Result<Self> {
        let device = Device::Cpu;
        let len = coef.len();
        let coef = Tensor::from_vec(coef, (len, 1), &device)?;
        let intercept = Tensor::new(&[intercept], &device)?;
        Ok(Self {
            coef,
            intercept,
            device,
        })
    }

    /// Loads weights from a safetensors file holding `coef` and `intercept`.
    #[tracing::instrument(level = "info")]
    pub fn from_safetensors(path: &Path) -> Result<Self> {
        let device = Device::Cpu;
        let tensors = candle_core::safetensors::load(path, &device)
            .with_context(|| format!("Failed to read regressor {}", path.display()))?;
        Self::from_tensors(tensors, device)
    }

    fn from_tensors(mut tensors: HashMap<String, Tensor>, device: Device) -> Result<Self> {
        let Some(coef) = tensors.remove(COEF_TENSOR) else {
            bail!("Regressor is missing the {COEF_TENSOR} tensor");
        };
        let Some(intercept) = tensors.remove(INTERCEPT_TENSOR) else {
            bail!("Regressor is missing the {INTERCEPT_TENSOR} tensor");
        };

        // Single-target models only: coef may be stored as (n,) or (1, n)
        let len = coef.elem_count();
        if coef.rank() > 2 || (coef.rank() == 2 && coef.dims()[0] != 1) {
            bail!("Expected a single-target coef tensor, got shape {:?}", coef.dims());
        }
        if intercept.elem_count() != 1 {
            bail!("Expected a scalar intercept, got shape {:?}", intercept.dims());
        }

        Ok(Self {
            coef: coef.to_dtype(DType::F64)?.reshape((len, 1))?,
            intercept: intercept.to_dtype(DType::F64)?.reshape(1)?,
            device,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coef.elem_count()
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let n_features = self.n_features();
        let mut flat = Vec::with_capacity(rows.len() * n_features);
        for row in rows {
            if row.len() != n_features {
                bail!(
                    "Expected {n_features} features per row, got {}",
                    row.len()
                );
            }
            flat.extend_from_slice(row);
        }

        let x = Tensor::from_vec(flat, (rows.len(), n_features), &self.device)?;
        let y = x.matmul(&self.coef)?.broadcast_add(&self.intercept)?;
        Ok(y.flatten_all()?.to_vec1::<f64>()?)
    }

    /// Writes the weights in the layout `from_safetensors` reads.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tensors = HashMap::from([
            (COEF_TENSOR.to_string(), self.coef.flatten_all()?),
            (INTERCEPT_TENSOR.to_string(), self.intercept.clone()),
        ]);
        candle_core::safetensors::save(&tensors, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_the_affine_combination() {
        let regressor = LinearRegressor::new(vec![0.5, -1.0, 2.0], 10.0).unwrap();
        let predictions = regressor
            .predict(&[vec![1.0, 0.0, 3.0], vec![0.0, 1.0, 0.0]])
            .unwrap();
        assert_eq!(predictions, vec![16.5, 9.0]);
    }

    #[test]
    fn rejects_rows_of_the_wrong_width() {
        let regressor = LinearRegressor::new(vec![1.0, 1.0], 0.0).unwrap();
        assert!(regressor.predict(&[vec![1.0]]).is_err());
    }

    #[test]
    fn round_trips_through_safetensors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        LinearRegressor::new(vec![1.5, 0.25], -2.0)
            .unwrap()
            .save(&path)
            .unwrap();

        let regressor = LinearRegressor::from_safetensors(&path).unwrap();
        assert_eq!(regressor.n_features(), 2);
        assert_eq!(regressor.predict(&[vec![2.0, 4.0]]).unwrap(), vec![2.0]);
    }

    #[test]
    fn accepts_f32_weights_stored_as_a_row() {
        let device = Device::Cpu;
        let tensors = HashMap::from([
            (
                COEF_TENSOR.to_string(),
                Tensor::new(&[[2f32, 3f32]], &device).unwrap(),
            ),
            (
                INTERCEPT_TENSOR.to_string(),
                Tensor::new(1f32, &device).unwrap(),
            ),
        ]);

        let regressor = LinearRegressor::from_tensors(tensors, device).unwrap();
        assert_eq!(regressor.predict(&[vec![1.0, 1.0]]).unwrap(), vec![6.0]);
    }

    #[test]
    fn requires_both_tensors() {
        let device = Device::Cpu;
        let tensors = HashMap::from([(
            COEF_TENSOR.to_string(),
            Tensor::new(&[1f64], &device).unwrap(),
        )]);
        let err = LinearRegressor::from_tensors(tensors, device).unwrap_err();
        assert!(err.to_string().contains(INTERCEPT_TENSOR));
    }
}
