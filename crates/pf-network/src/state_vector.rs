//! Named per-point arrays packed into a flat solver vector.

use crate::error::{NetworkError, NetworkResult};
use nalgebra::DVector;
use pf_core::TagMap;
use pf_core::numeric::ensure_all_finite;

/// Insertion-ordered map from name to per-point array.
///
/// Packing is name-major, point-minor: entry `k`, point `i` lands at
/// `k * n_points + i`.
#[derive(Clone, Debug, PartialEq)]
pub struct StateVector {
    n_points: usize,
    entries: TagMap<Vec<f64>>,
}

impl StateVector {
    pub fn new(n_points: usize) -> Self {
        Self {
            n_points,
            entries: TagMap::new(),
        }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Add a named array filled with `seed`.
    pub fn declare(&mut self, name: impl Into<String>, seed: f64) -> NetworkResult<()> {
        let values = vec![seed; self.n_points];
        self.entries.insert(name, values)?;
        Ok(())
    }

    /// Add a named array with explicit values.
    pub fn declare_values(&mut self, name: impl Into<String>, values: Vec<f64>) -> NetworkResult<()> {
        let name = name.into();
        if values.len() != self.n_points {
            return Err(NetworkError::StateVector {
                what: format!(
                    "'{name}' has {} values, segment has {} points",
                    values.len(),
                    self.n_points
                ),
            });
        }
        self.entries.insert(name, values)?;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn require(&self, name: &str) -> NetworkResult<&[f64]> {
        self.get(name).ok_or_else(|| NetworkError::StateVector {
            what: format!("no entry named '{name}'"),
        })
    }

    pub fn require_mut(&mut self, name: &str) -> NetworkResult<&mut [f64]> {
        self.entries
            .get_mut(name)
            .map(Vec::as_mut_slice)
            .ok_or_else(|| NetworkError::StateVector {
                what: format!("no entry named '{name}'"),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of named entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the packed vector.
    pub fn flat_len(&self) -> usize {
        self.entries.len() * self.n_points
    }

    pub fn pack(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.flat_len(),
            self.entries.values().flat_map(|v| v.iter().copied()),
        )
    }

    pub fn unpack(&mut self, x: &DVector<f64>) -> NetworkResult<()> {
        if x.len() != self.flat_len() {
            return Err(NetworkError::StateVector {
                what: format!("expected {} values, got {}", self.flat_len(), x.len()),
            });
        }
        let n = self.n_points;
        for (k, values) in self.entries.values_mut().enumerate() {
            values.copy_from_slice(&x.as_slice()[k * n..(k + 1) * n]);
        }
        Ok(())
    }

    /// Largest absolute entry.
    pub fn max_abs(&self) -> f64 {
        self.entries
            .values()
            .flat_map(|v| v.iter())
            .fold(0.0_f64, |acc, x| acc.max(x.abs()))
    }

    pub fn ensure_finite(&self) -> NetworkResult<()> {
        for values in self.entries.values() {
            ensure_all_finite(values, "state vector entry")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pack_is_name_major() {
        let mut s = StateVector::new(2);
        s.declare_values("a", vec![1.0, 2.0]).unwrap();
        s.declare_values("b", vec![3.0, 4.0]).unwrap();
        assert_eq!(s.pack().as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn wrong_lengths_rejected() {
        let mut s = StateVector::new(3);
        assert!(s.declare_values("a", vec![1.0]).is_err());
        s.declare("a", 0.5).unwrap();
        assert!(s.declare("a", 0.5).is_err());
        assert!(s.unpack(&DVector::zeros(2)).is_err());
    }

    #[test]
    fn non_finite_entries_detected() {
        let mut s = StateVector::new(2);
        s.declare_values("a", vec![1.0, f64::NAN]).unwrap();
        assert!(s.ensure_finite().is_err());
    }

    proptest! {
        #[test]
        fn unpack_then_pack_is_identity(
            n in 1usize..6,
            k in 0usize..4,
            seed in -1e3f64..1e3,
        ) {
            let mut s = StateVector::new(n);
            for j in 0..k {
                s.declare(format!("u{j}"), 0.0).unwrap();
            }
            let x = DVector::from_fn(n * k, |i, _| seed + i as f64);
            s.unpack(&x).unwrap();
            prop_assert_eq!(s.pack(), x);
        }
    }
}
