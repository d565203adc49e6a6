//! Standard Scaler - per-column zero mean / unit variance
//!
//! Population variance (ddof = 0). Columns with (near) zero variance get
//! scale 1 so constant features pass through centred instead of exploding.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::ReferenceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Array2<f64>) -> Result<Self, ReferenceError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(ReferenceError::EmptyPopulation);
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or(ReferenceError::EmptyPopulation)?;
        let std = data.std_axis(Axis(0), 0.0);

        let scale = std
            .iter()
            .map(|&s| if s < 10.0 * f64::EPSILON { 1.0 } else { s })
            .collect();

        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn check_width(&self, width: usize) -> Result<(), ReferenceError> {
        if width != self.n_features() {
            return Err(ReferenceError::Shape {
                expected: self.n_features(),
                actual: width,
            });
        }
        Ok(())
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ReferenceError> {
        self.check_width(data.ncols())?;

        let mut scaled = data.to_owned();
        for mut row in scaled.rows_mut() {
            for ((x, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *x = (*x - mean) / scale;
            }
        }
        Ok(scaled)
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ReferenceError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((x, mean), scale)| (x - mean) / scale)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_uses_population_variance() {
        let data = array![[1.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&data).unwrap();

        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
    }

    #[test]
    fn test_transform_standardizes_columns() {
        let data = array![[1.0, 100.0], [2.0, 300.0], [3.0, 200.0], [6.0, 400.0]];
        let scaler = StandardScaler::fit(&data).unwrap();
        let scaled = scaler.transform(&data).unwrap();

        for column in scaled.columns() {
            let mean = column.mean().unwrap();
            let std = column.std(0.0);
            assert!(mean.abs() < 1e-12);
            assert!((std - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_is_centred() {
        let data = array![[5.0], [5.0], [5.0]];
        let scaler = StandardScaler::fit(&data).unwrap();
        assert_eq!(scaler.scale, vec![1.0]);
        assert_eq!(scaler.transform_row(&[5.0]).unwrap(), vec![0.0]);
        assert_eq!(scaler.transform_row(&[7.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_empty_and_shape_errors() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert_eq!(StandardScaler::fit(&empty), Err(ReferenceError::EmptyPopulation));

        let scaler = StandardScaler::fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform_row(&[1.0]),
            Err(ReferenceError::Shape { expected: 2, actual: 1 })
        ));
    }
}
