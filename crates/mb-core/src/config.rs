//! Declarative paint configuration.
//!
//! A [`PaintConfig`] names a brush, an optional kernel and an optional
//! excitation. It deserializes from JSON here and from TOML in the CLI, is
//! checked by [`validate`](PaintConfig::validate), and turns into live
//! objects with [`build`](PaintConfig::build).

use std::sync::Arc;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::brush::{Brush, DeltaBrush, GraphBrush, SelectionMode, SpectralBrush, TrajectoryBrush};
use crate::constants::DEFAULT_KERNEL;
use crate::error::{BrushError, Result};
use crate::kernel::{KernelModel, KernelParams, KernelRegistry};
use crate::signal::{CompositeSignalModel, SignalModel};

fn unit() -> f64 {
    1.0
}

fn one() -> usize {
    1
}

fn yes() -> bool {
    true
}

fn default_kernel() -> String {
    DEFAULT_KERNEL.to_string()
}

/// Brush section, tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrushSpec {
    Delta {
        #[serde(default = "unit")]
        weight: f64,
    },
    Graph {
        #[serde(default)]
        mode: SelectionMode,
        #[serde(default = "one")]
        k: usize,
        #[serde(default = "unit")]
        distance_threshold: f64,
        #[serde(default = "yes")]
        use_weighted: bool,
        #[serde(default = "unit")]
        weight: f64,
    },
    Spectral {
        #[serde(default = "unit")]
        weight: f64,
    },
    Trajectory {
        #[serde(default)]
        target: Option<usize>,
        /// Defaults to a spectral base.
        #[serde(default)]
        base: Option<Box<BrushSpec>>,
        #[serde(default = "yes")]
        use_weighted: bool,
        #[serde(default = "unit")]
        weight: f64,
    },
}

impl BrushSpec {
    fn weight(&self) -> f64 {
        match self {
            Self::Delta { weight }
            | Self::Graph { weight, .. }
            | Self::Spectral { weight }
            | Self::Trajectory { weight, .. } => *weight,
        }
    }

    fn uses_kernel(&self) -> bool {
        match self {
            Self::Spectral { .. } => true,
            Self::Trajectory { base, .. } => base.as_ref().is_none_or(|b| b.uses_kernel()),
            Self::Delta { .. } | Self::Graph { .. } => false,
        }
    }

    fn validate(&self) -> Result<()> {
        let weight = self.weight();
        if !weight.is_finite() {
            return Err(BrushError::Config(format!(
                "brush weight must be finite, got {weight}"
            )));
        }
        match self {
            Self::Graph {
                distance_threshold, ..
            } if !(distance_threshold.is_finite() && *distance_threshold >= 0.0) => {
                Err(BrushError::Config(format!(
                    "distance_threshold must be >= 0, got {distance_threshold}"
                )))
            }
            Self::Trajectory {
                base: Some(base), ..
            } => {
                if matches!(**base, Self::Trajectory { .. }) {
                    return Err(BrushError::Config(
                        "trajectory base cannot itself be a trajectory".into(),
                    ));
                }
                base.validate()
            }
            _ => Ok(()),
        }
    }

    fn build(&self, excitation: Option<&CompositeSignalModel>) -> Brush {
        match self {
            Self::Delta { weight } => DeltaBrush::new().with_weight(*weight).into(),
            Self::Graph {
                mode,
                k,
                distance_threshold,
                use_weighted,
                weight,
            } => GraphBrush::new()
                .with_mode(*mode)
                .with_k(*k)
                .with_distance_threshold(*distance_threshold)
                .with_weighted(*use_weighted)
                .with_weight(*weight)
                .into(),
            Self::Spectral { weight } => {
                let mut brush = SpectralBrush::new().with_weight(*weight);
                if let Some(e) = excitation {
                    brush.set_excitation(e.clone());
                }
                brush.into()
            }
            Self::Trajectory {
                target,
                base,
                use_weighted,
                weight,
            } => {
                let base = match base {
                    Some(spec) => spec.build(excitation),
                    None => Self::Spectral { weight: 1.0 }.build(excitation),
                };
                TrajectoryBrush::new(*target)
                    .with_base(base)
                    .with_weighted(*use_weighted)
                    .with_weight(*weight)
                    .into()
            }
        }
    }
}

/// Kernel section: family name plus overrides of its default parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    #[serde(rename = "type", default = "default_kernel")]
    pub kernel_type: String,
    #[serde(default)]
    pub params: KernelParams,
}

impl Default for KernelSpec {
    fn default() -> Self {
        Self {
            kernel_type: default_kernel(),
            params: KernelParams::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaintConfig {
    pub brush: BrushSpec,
    #[serde(default)]
    pub kernel: Option<KernelSpec>,
    /// Replaces the spectral default of a single unit impulse.
    #[serde(default)]
    pub excitation: Option<CompositeSignalModel>,
}

impl Default for PaintConfig {
    /// Spectral brush under the default heat kernel.
    fn default() -> Self {
        Self {
            brush: BrushSpec::Spectral { weight: 1.0 },
            kernel: Some(KernelSpec::default()),
            excitation: None,
        }
    }
}

impl PaintConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BrushError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BrushError::Config(e.to_string()))
    }

    /// Check everything that can be checked without a manifold.
    pub fn validate(&self, registry: &KernelRegistry) -> Result<()> {
        self.brush.validate()?;

        match &self.kernel {
            Some(kernel) => {
                if !registry.contains(&kernel.kernel_type) {
                    return Err(BrushError::InvalidKernelType(kernel.kernel_type.clone()));
                }
                if let Some((name, value)) = kernel.params.iter().find(|(_, v)| !v.is_finite()) {
                    return Err(BrushError::Config(format!(
                        "kernel parameter '{name}' must be finite, got {value}"
                    )));
                }
            }
            None if self.brush.uses_kernel() => {
                return Err(BrushError::Config(
                    "brush is kernel-driven but no kernel is configured".into(),
                ));
            }
            None => {}
        }

        if let Some(excitation) = &self.excitation {
            for component in excitation.components() {
                validate_signal(&component.signal)?;
                if !component.weight.is_finite() {
                    return Err(BrushError::Config(format!(
                        "excitation weight must be finite, got {}",
                        component.weight
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validate, then materialize the brush and (if configured) its kernel
    /// over `axis`. The kernel is already attached to a kernel-driven brush;
    /// it is also returned so a context can own it.
    pub fn build(
        &self,
        registry: Arc<KernelRegistry>,
        axis: Option<&DVector<f64>>,
    ) -> Result<(Brush, Option<KernelModel>)> {
        self.validate(&registry)?;

        let kernel = match &self.kernel {
            Some(spec) => {
                let axis = axis.ok_or(BrushError::MissingSpectralBasis)?;
                Some(
                    KernelModel::builder(registry)
                        .axis(axis.clone())
                        .kernel_type(&spec.kernel_type)
                        .params(spec.params.clone())
                        .build()?,
                )
            }
            None => None,
        };

        let mut brush = self.brush.build(self.excitation.as_ref());
        if brush.uses_kernel() {
            brush.set_kernel_model(kernel.clone());
        }
        Ok((brush, kernel))
    }
}

fn validate_signal(signal: &SignalModel) -> Result<()> {
    match signal {
        SignalModel::Delta => Ok(()),
        SignalModel::Noise { mean, sigma, .. } => {
            if !mean.is_finite() || !sigma.is_finite() || *sigma < 0.0 {
                return Err(BrushError::Config(format!(
                    "noise needs finite mean and sigma >= 0, got mean={mean} sigma={sigma}"
                )));
            }
            Ok(())
        }
        SignalModel::Patch { radius } => {
            if !radius.is_finite() || *radius < 0.0 {
                return Err(BrushError::Config(format!(
                    "patch radius must be >= 0, got {radius}"
                )));
            }
            Ok(())
        }
    }
}
