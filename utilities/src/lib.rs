use nalgebra::{Matrix3, Vector3, Vector4};
use thiserror::Error;

/// Errors raised when validating plain numeric arrays at an API boundary.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum ValidationErrors {
    #[error("expected {expected} elements, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("element {index} is not a finite number")]
    NonFinite { index: usize },
}

/// Checks that `values` has exactly `expected` finite entries.
pub fn validate_finite(values: &[f64], expected: usize) -> Result<(), ValidationErrors> {
    if values.len() != expected {
        return Err(ValidationErrors::ShapeMismatch {
            expected,
            got: values.len(),
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ValidationErrors::NonFinite { index });
    }
    Ok(())
}

pub fn vector3_from_slice(values: &[f64]) -> Result<Vector3<f64>, ValidationErrors> {
    validate_finite(values, 3)?;
    Ok(Vector3::new(values[0], values[1], values[2]))
}

pub fn vector4_from_slice(values: &[f64]) -> Result<Vector4<f64>, ValidationErrors> {
    validate_finite(values, 4)?;
    Ok(Vector4::new(values[0], values[1], values[2], values[3]))
}

/// Builds a matrix from 9 row-major values.
pub fn matrix3_from_slice(values: &[f64]) -> Result<Matrix3<f64>, ValidationErrors> {
    validate_finite(values, 9)?;
    Ok(Matrix3::from_row_slice(values))
}

/// Checks that every component of a vector is finite.
pub fn validate_vector3(v: &Vector3<f64>) -> Result<(), ValidationErrors> {
    validate_finite(v.as_slice(), 3)
}
