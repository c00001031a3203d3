//! Excitation signals: what gets injected at the seed before a spectral
//! filter spreads it.
//!
//! A [`CompositeSignalModel`] is a weighted superposition of [`SignalModel`]s.
//! New excitation shapes belong here, not in the brushes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{BrushError, Result};
use crate::graph::DistanceQuery;
use crate::manifold::{Field, Manifold};

/// Everything a signal may look at while evaluating.
pub struct SignalContext<'a> {
    pub manifold: &'a Manifold,
    pub seed: usize,
    pub distances: &'a mut dyn DistanceQuery,
}

/// One excitation shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SignalModel {
    /// Unit impulse at the seed.
    Delta,
    /// I.i.d. Gaussian samples at every vertex. Unseeded noise draws fresh
    /// samples on every evaluation; a `seed` makes it repeatable.
    Noise {
        mean: f64,
        sigma: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Indicator of vertices within `radius` of the seed.
    Patch { radius: f64 },
}

impl SignalModel {
    pub fn noise(mean: f64, sigma: f64) -> Self {
        Self::Noise {
            mean,
            sigma,
            seed: None,
        }
    }

    pub fn evaluate(&self, n: usize, ctx: &mut SignalContext<'_>) -> Result<Field> {
        match self {
            Self::Delta => {
                if ctx.seed >= n {
                    return Err(BrushError::VertexOutOfRange { index: ctx.seed, n });
                }
                let mut field = Field::zeros(n);
                field[ctx.seed] = 1.0;
                Ok(field)
            }
            Self::Noise { mean, sigma, seed } => {
                if !sigma.is_finite() || *sigma < 0.0 {
                    return Err(BrushError::InvalidParameter(format!(
                        "noise sigma must be >= 0, got {sigma}"
                    )));
                }
                let field = match seed {
                    Some(s) => sample_gaussian(n, *mean, *sigma, &mut StdRng::seed_from_u64(*s)),
                    None => sample_gaussian(n, *mean, *sigma, &mut rand::rng()),
                };
                Ok(field)
            }
            Self::Patch { radius } => {
                let d = ctx.distances.distances(ctx.manifold, ctx.seed)?;
                if d.len() != n {
                    return Err(BrushError::InvalidParameter(format!(
                        "distance query returned {} values for {n} vertices",
                        d.len()
                    )));
                }
                Ok(d.map(|x| if x <= *radius { 1.0 } else { 0.0 }))
            }
        }
    }
}

/// A signal with its mixing weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedSignal {
    #[serde(flatten)]
    pub signal: SignalModel,
    #[serde(default = "unit_weight")]
    pub weight: f64,
}

fn unit_weight() -> f64 {
    1.0
}

/// Ordered weighted sum of signals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeSignalModel {
    components: Vec<WeightedSignal>,
}

impl CompositeSignalModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single unit impulse spectral brushes use by default.
    pub fn delta() -> Self {
        Self::new().with(SignalModel::Delta, 1.0)
    }

    pub fn with(mut self, signal: SignalModel, weight: f64) -> Self {
        self.push(signal, weight);
        self
    }

    pub fn push(&mut self, signal: SignalModel, weight: f64) {
        self.components.push(WeightedSignal { signal, weight });
    }

    pub fn components(&self) -> &[WeightedSignal] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// `Σ weightᵢ · signalᵢ`. An empty model yields zeros.
    pub fn evaluate(&self, n: usize, ctx: &mut SignalContext<'_>) -> Result<Field> {
        let mut total = Field::zeros(n);
        for component in &self.components {
            let field = component.signal.evaluate(n, ctx)?;
            total.axpy(component.weight, &field, 1.0);
        }
        Ok(total)
    }
}

fn sample_gaussian(n: usize, mean: f64, sigma: f64, rng: &mut impl Rng) -> Field {
    Field::from_fn(n, |_, _| mean + sigma * gauss_random(rng))
}

/// Box-Muller transform for generating Gaussian-distributed random numbers.
fn gauss_random(rng: &mut impl Rng) -> f64 {
    // Clamp u1 away from 0 to avoid ln(0) = -inf
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
