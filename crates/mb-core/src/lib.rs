//! Manifold brush engine.
//!
//! Turns a seed vertex on a triangle mesh into a per-vertex weight field.
//! Brushes range from a one-hot impulse through graph neighborhoods to
//! spectral filters that shape an excitation in the mesh's Laplacian
//! eigenbasis with a kernel `g(λ)`. A reactive context keeps the field in
//! step with the manifold, seed, brush and kernel.
//!
//! Zero I/O. Geometry and eigenbases come from the caller; [`demo`] has a few
//! meshes with closed-form bases.

pub mod brush;
pub mod brush_model;
pub mod config;
pub mod constants;
pub mod context;
pub mod demo;
pub mod error;
pub mod graph;
pub mod kernel;
pub mod manifold;
pub mod playback;
pub mod signal;

pub use brush::{
    Brush, DeltaBrush, GraphBrush, ManifoldBrush, SelectionMode, SpectralBrush, TrajectoryBrush,
};
pub use brush_model::ManifoldBrushModel;
pub use config::{BrushSpec, KernelSpec, PaintConfig};
pub use constants::{DEFAULT_HEAT_TAU, DEFAULT_KERNEL, EPSILON};
pub use context::{ContextEvent, ContextState, ManifoldBrushContext, Recompute, SubscriptionId};
pub use error::{BrushError, Result};
pub use graph::{DistanceQuery, GraphCache, GraphDistance, MeshGraph, build_graph};
pub use kernel::{FilterFn, KernelFamily, KernelModel, KernelParams, KernelRegistry};
pub use manifold::{DualBasis, Field, Manifold, ManifoldId, normalize_max_abs};
pub use playback::TrajectoryPlayback;
pub use signal::{CompositeSignalModel, SignalContext, SignalModel, WeightedSignal};
