//! Seeded synthetic classification data
//!
//! Each class is an isotropic Gaussian blob around its own center. Centers
//! sit on the signed coordinate axes, `separation` away from the origin, so
//! with a small `spread` the classes are linearly separable.

use super::Batch;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Shape of a synthetic cluster dataset
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterSpec {
    pub features: usize,
    pub classes: usize,
    /// Standard deviation of each blob
    pub spread: f32,
    /// Distance of every center from the origin
    pub separation: f32,
}

impl ClusterSpec {
    pub fn new(features: usize, classes: usize) -> Self {
        Self {
            features,
            classes,
            spread: 0.3,
            separation: 3.0,
        }
    }

    pub fn with_spread(mut self, spread: f32) -> Self {
        self.spread = spread;
        self
    }

    pub fn with_separation(mut self, separation: f32) -> Self {
        self.separation = separation;
        self
    }

    /// Center of class `class`: `±separation` along axis `class % features`
    pub fn center(&self, class: usize) -> Vec<f32> {
        let sign = if class < self.features { 1.0 } else { -1.0 };
        (0..self.features)
            .map(|d| {
                if d == class % self.features {
                    sign * self.separation
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn validate(&self, samples: usize, batch_size: usize) -> Result<()> {
        if self.features == 0 || self.classes < 2 {
            return Err(Error::InvalidParameter(format!(
                "need at least one feature and two classes, got {} features and {} classes",
                self.features, self.classes
            )));
        }
        if self.classes > 2 * self.features {
            return Err(Error::InvalidParameter(format!(
                "{} features can separate at most {} classes, got {}",
                self.features,
                2 * self.features,
                self.classes
            )));
        }
        if samples == 0 || batch_size == 0 {
            return Err(Error::InvalidParameter(
                "samples and batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Draw `samples` shuffled examples and cut them into batches
    ///
    /// Classes are balanced up to one example. The last batch is smaller
    /// when `batch_size` does not divide `samples`. The same seed always
    /// yields the same batches.
    pub fn generate(&self, samples: usize, batch_size: usize, seed: u64) -> Result<Vec<Batch>> {
        self.validate(samples, batch_size)?;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut labels: Vec<usize> = (0..samples).map(|i| i % self.classes).collect();
        labels.shuffle(&mut rng);

        let centers: Vec<Vec<f32>> = (0..self.classes).map(|c| self.center(c)).collect();

        labels
            .chunks(batch_size)
            .map(|chunk| {
                let mut data = Vec::with_capacity(chunk.len() * self.features);
                for &label in chunk {
                    data.extend(
                        centers[label]
                            .iter()
                            .map(|&c| c + self.spread * standard_normal(&mut rng)),
                    );
                }
                Batch::from_rows(data, self.features, chunk.to_vec())
            })
            .collect()
    }
}

/// Box–Muller sample from N(0, 1)
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = 1.0 - rng.random::<f32>();
    let u2: f32 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shapes() {
        let batches = ClusterSpec::new(4, 3).generate(50, 8, 1).unwrap();

        assert_eq!(batches.len(), 7);
        assert_eq!(batches[0].inputs.shape(), vec![8, 4]);
        assert_eq!(batches[6].size(), 2);

        let total: usize = batches.iter().map(Batch::size).sum();
        assert_eq!(total, 50);
        assert!(batches.iter().flat_map(|b| &b.labels).all(|&l| l < 3));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let spec = ClusterSpec::new(3, 4);
        let a = spec.generate(20, 5, 99).unwrap();
        let b = spec.generate(20, 5, 99).unwrap();
        let c = spec.generate(20, 5, 100).unwrap();

        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.labels, y.labels);
            assert_eq!(*x.inputs.data(), *y.inputs.data());
        }
        assert!(a.iter().zip(&c).any(|(x, z)| *x.inputs.data() != *z.inputs.data()));
    }

    #[test]
    fn test_points_lie_near_their_center() {
        let spec = ClusterSpec::new(2, 4).with_spread(0.1);
        for batch in spec.generate(40, 10, 5).unwrap() {
            let data = batch.inputs.data();
            for (row, &label) in batch.labels.iter().enumerate() {
                let center = spec.center(label);
                let dist: f32 = (0..2)
                    .map(|d| (data[[row, d]] - center[d]).powi(2))
                    .sum::<f32>()
                    .sqrt();
                assert!(dist < 1.0, "point {row} is {dist} from its center");
            }
        }
    }

    #[test]
    fn test_invalid_specs() {
        assert!(ClusterSpec::new(1, 3).generate(10, 2, 0).is_err());
        assert!(ClusterSpec::new(2, 1).generate(10, 2, 0).is_err());
        assert!(ClusterSpec::new(2, 2).generate(0, 2, 0).is_err());
        assert!(ClusterSpec::new(2, 2).generate(10, 0, 0).is_err());
    }
}
