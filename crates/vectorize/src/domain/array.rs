//! Row-major `f64` arrays passed to generalized ufuncs

use crate::error::VectorizeError;

#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdArray {
    /// Create an array, checking that `shape` describes exactly `data.len()` elements.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, VectorizeError> {
        if element_count(&shape) != Some(data.len()) {
            return Err(VectorizeError::ShapeMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional array.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Zero-dimensional array.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Number of elements described by `shape`, or `None` if it overflows `usize`.
pub(crate) fn element_count(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
}

/// Row-major strides, in elements, for `shape`.
pub(crate) fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1].saturating_mul(shape[axis + 1]);
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = NdArray::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, VectorizeError::ShapeMismatch { len: 5, .. }));
    }

    #[test]
    fn test_new_rejects_overflowing_shape() {
        let err = NdArray::new(vec![1 << 32, 1 << 32], Vec::new()).unwrap_err();
        assert!(matches!(err, VectorizeError::ShapeMismatch { len: 0, .. }));

        let err = NdArray::new(vec![usize::MAX, 2], vec![0.0; 2]).unwrap_err();
        assert!(matches!(err, VectorizeError::ShapeMismatch { len: 2, .. }));
    }

    #[test]
    fn test_new_accepts_empty_array_with_huge_extents() {
        let a = NdArray::new(vec![1 << 33, 1 << 33, 0], Vec::new()).unwrap();
        assert_eq!(a.shape(), [1 << 33, 1 << 33, 0]);
        assert!(a.data().is_empty());
    }

    #[test]
    fn test_element_count() {
        assert_eq!(element_count(&[2, 3, 4]), Some(24));
        assert_eq!(element_count(&[]), Some(1));
        assert_eq!(element_count(&[usize::MAX, 2]), None);
        assert_eq!(element_count(&[usize::MAX, 2, 0]), Some(0));
    }

    #[test]
    fn test_scalar_has_no_dimensions() {
        let a = NdArray::scalar(4.0);
        assert_eq!(a.ndim(), 0);
        assert_eq!(a.data(), [4.0]);
    }

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(row_major_strides(&[5]), vec![1]);
        assert!(row_major_strides(&[]).is_empty());
    }
}
