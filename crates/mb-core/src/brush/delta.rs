use super::ManifoldBrush;
use crate::error::{BrushError, Result};
use crate::manifold::{Field, Manifold};

/// One-hot brush: weight at the seed, zero elsewhere.
#[derive(Clone, Debug)]
pub struct DeltaBrush {
    seed: Option<usize>,
    weight: f64,
}

impl DeltaBrush {
    pub fn new() -> Self {
        Self {
            seed: None,
            weight: 1.0,
        }
    }

    /// Seed used when `evaluate` is called without one.
    pub fn with_seed(mut self, seed: usize) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn seed(&self) -> Option<usize> {
        self.seed
    }

    pub fn set_seed(&mut self, seed: Option<usize>) {
        self.seed = seed;
    }
}

impl Default for DeltaBrush {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifoldBrush for DeltaBrush {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn evaluate_core(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field> {
        let seed = seed.or(self.seed).ok_or(BrushError::MissingSeed)?;
        manifold.check_vertex(seed)?;
        let mut field = Field::zeros(manifold.n());
        field[seed] = 1.0;
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;

    #[test]
    fn test_one_hot_at_seed() {
        let m = demo::path(5);
        let f = DeltaBrush::new().with_weight(3.0).evaluate(&m, Some(1)).unwrap();
        assert_eq!(f.as_slice(), &[0.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_falls_back_to_stored_seed() {
        let m = demo::path(5);
        let mut brush = DeltaBrush::new().with_seed(4);
        let f = brush.evaluate(&m, None).unwrap();
        assert_eq!(f[4], 1.0);

        // An explicit seed wins over the stored one
        let f = brush.evaluate(&m, Some(0)).unwrap();
        assert_eq!(f[0], 1.0);
        assert_eq!(f[4], 0.0);
    }

    #[test]
    fn test_missing_seed() {
        let m = demo::path(3);
        assert_eq!(
            DeltaBrush::new().evaluate(&m, None),
            Err(BrushError::MissingSeed)
        );
    }

    #[test]
    fn test_seed_out_of_range_fails_loudly() {
        let m = demo::path(3);
        assert_eq!(
            DeltaBrush::new().evaluate(&m, Some(3)),
            Err(BrushError::VertexOutOfRange { index: 3, n: 3 })
        );
    }
}
