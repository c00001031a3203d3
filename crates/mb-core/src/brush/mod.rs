//! Brushes: rules that turn a seed vertex into a per-vertex weight field.
//!
//! Every brush implements [`ManifoldBrush`]. `evaluate_core` does the
//! variant-specific work and may fail; `evaluate` scales the result by the
//! brush weight. [`Brush`] is the closed set of variants the rest of the
//! engine passes around.

mod delta;
mod graph;
mod spectral;
mod trajectory;

pub use delta::DeltaBrush;
pub use graph::{GraphBrush, SelectionMode};
pub use spectral::SpectralBrush;
pub use trajectory::TrajectoryBrush;

use crate::error::Result;
use crate::kernel::KernelModel;
use crate::manifold::{Field, Manifold};

pub trait ManifoldBrush {
    /// Uniform multiplier applied after evaluation.
    fn weight(&self) -> f64;

    fn set_weight(&mut self, weight: f64);

    /// Unweighted field for `seed`. Takes `&mut self` so brushes can keep
    /// caches keyed on the manifold.
    fn evaluate_core(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field>;

    fn evaluate(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field> {
        let field = self.evaluate_core(manifold, seed)?;
        Ok(field * self.weight())
    }
}

/// Tagged brush variant.
#[derive(Clone, Debug)]
pub enum Brush {
    Delta(DeltaBrush),
    Graph(GraphBrush),
    Spectral(SpectralBrush),
    Trajectory(TrajectoryBrush),
}

impl Brush {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Delta(_) => "delta",
            Self::Graph(_) => "graph",
            Self::Spectral(_) => "spectral",
            Self::Trajectory(_) => "trajectory",
        }
    }

    /// Whether evaluation goes through a kernel model.
    pub fn uses_kernel(&self) -> bool {
        match self {
            Self::Spectral(_) => true,
            Self::Trajectory(t) => t.base().uses_kernel(),
            Self::Delta(_) | Self::Graph(_) => false,
        }
    }

    /// Attach (or detach) the kernel of a kernel-driven brush. No-op otherwise.
    pub fn set_kernel_model(&mut self, kernel: Option<KernelModel>) {
        match self {
            Self::Spectral(s) => s.set_kernel_model(kernel),
            Self::Trajectory(t) => t.set_kernel_model(kernel),
            Self::Delta(_) | Self::Graph(_) => {}
        }
    }

    pub fn kernel_model(&self) -> Option<&KernelModel> {
        match self {
            Self::Spectral(s) => s.kernel_model(),
            Self::Trajectory(t) => t.kernel_model(),
            Self::Delta(_) | Self::Graph(_) => None,
        }
    }

    /// Set the end vertex of a trajectory brush. No-op otherwise.
    pub fn set_target(&mut self, target: Option<usize>) {
        if let Self::Trajectory(t) = self {
            t.set_target(target);
        }
    }
}

impl ManifoldBrush for Brush {
    fn weight(&self) -> f64 {
        match self {
            Self::Delta(b) => b.weight(),
            Self::Graph(b) => b.weight(),
            Self::Spectral(b) => b.weight(),
            Self::Trajectory(b) => b.weight(),
        }
    }

    fn set_weight(&mut self, weight: f64) {
        match self {
            Self::Delta(b) => b.set_weight(weight),
            Self::Graph(b) => b.set_weight(weight),
            Self::Spectral(b) => b.set_weight(weight),
            Self::Trajectory(b) => b.set_weight(weight),
        }
    }

    fn evaluate_core(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field> {
        match self {
            Self::Delta(b) => b.evaluate_core(manifold, seed),
            Self::Graph(b) => b.evaluate_core(manifold, seed),
            Self::Spectral(b) => b.evaluate_core(manifold, seed),
            Self::Trajectory(b) => b.evaluate_core(manifold, seed),
        }
    }
}

impl From<DeltaBrush> for Brush {
    fn from(b: DeltaBrush) -> Self {
        Self::Delta(b)
    }
}

impl From<GraphBrush> for Brush {
    fn from(b: GraphBrush) -> Self {
        Self::Graph(b)
    }
}

impl From<SpectralBrush> for Brush {
    fn from(b: SpectralBrush) -> Self {
        Self::Spectral(b)
    }
}

impl From<TrajectoryBrush> for Brush {
    fn from(b: TrajectoryBrush) -> Self {
        Self::Trajectory(b)
    }
}
