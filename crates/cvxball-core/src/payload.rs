//! Named n-dimensional arrays and the payloads that carry them.
//!
//! A [`NamedArray`] always satisfies `product(shape) == len(data)`; the only
//! fallible constructor is [`NamedArray::new`], which checks it. Values are
//! kept in an [`ndarray::ArrayD`], so flattening is row-major (last axis
//! fastest) in both directions.

use crate::{Result, TransportError};
use ndarray::{Array, Array1, ArrayD, Dimension, IxDyn};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// A single named array of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    name: String,
    values: ArrayD<f64>,
}

impl NamedArray {
    /// Build an array from flattened row-major data and a shape.
    ///
    /// Fails with [`TransportError::ShapeMismatch`] when the product of the
    /// shape differs from the number of values. An empty shape whose
    /// non-zero axes multiply past `isize::MAX` (e.g. `[0, usize::MAX / 2, 4]`)
    /// passes that check but cannot be allocated by ndarray and fails with
    /// [`TransportError::WireFormat`].
    pub fn new(name: impl Into<String>, data: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        let name = name.into();

        if shape_product(&shape) != Some(data.len()) {
            return Err(TransportError::ShapeMismatch {
                name,
                shape: shape
                    .iter()
                    .map(|&d| i64::try_from(d).unwrap_or(i64::MAX))
                    .collect(),
                len: data.len(),
            });
        }

        let values = ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| {
            TransportError::wire_format(format!("Cannot reshape array '{}': {}", name, e))
        })?;

        Ok(Self { name, values })
    }

    /// Wrap an existing ndarray of any dimensionality.
    pub fn from_array<D: Dimension>(name: impl Into<String>, array: Array<f64, D>) -> Self {
        Self {
            name: name.into(),
            values: array.into_dyn(),
        }
    }

    /// A zero-dimensional array holding one value.
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            values: ArrayD::from_elem(IxDyn(&[]), value),
        }
    }

    /// A one-dimensional array.
    pub fn vector(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::from_array(name, Array1::from(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    /// Flattened values in row-major order.
    pub fn data(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn as_array(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn into_array(self) -> ArrayD<f64> {
        self.values
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Product of a shape, or `None` on overflow. The empty shape has product 1.
pub(crate) fn shape_product(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// A set of uniquely named arrays.
///
/// Arrays are looked up by name; iteration order is by name and carries no
/// meaning on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    arrays: BTreeMap<String, NamedArray>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an array, returning any previous array with the same name.
    pub fn insert(&mut self, array: NamedArray) -> Option<NamedArray> {
        self.arrays.insert(array.name.clone(), array)
    }

    /// Builder-style insert.
    pub fn with(mut self, array: NamedArray) -> Self {
        self.insert(array);
        self
    }

    pub fn get(&self, name: &str) -> Option<&NamedArray> {
        self.arrays.get(name)
    }

    /// Look up an array that a computation cannot do without.
    pub fn require(&self, name: &str) -> Result<&NamedArray> {
        self.get(name).ok_or_else(|| {
            TransportError::invalid_input(format!("Missing required array: {}", name))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedArray> {
        self.arrays.values()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

impl FromIterator<NamedArray> for Payload {
    fn from_iter<I: IntoIterator<Item = NamedArray>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for array in iter {
            payload.insert(array);
        }
        payload
    }
}

impl IntoIterator for Payload {
    type Item = NamedArray;
    type IntoIter = btree_map::IntoValues<String, NamedArray>;

    fn into_iter(self) -> Self::IntoIter {
        self.arrays.into_values()
    }
}
