use super::{Brush, ManifoldBrush, SpectralBrush};
use crate::error::{BrushError, Result};
use crate::graph::GraphCache;
use crate::kernel::KernelModel;
use crate::manifold::{Field, Manifold, normalize_max_abs};

/// Sweeps a base brush along the shortest path from the seed to a target.
///
/// The path is recomputed on every call since either endpoint may have
/// moved; only the graph is cached. Evaluation is stateless: animated
/// playback lives in [`TrajectoryPlayback`](crate::playback::TrajectoryPlayback).
#[derive(Clone, Debug)]
pub struct TrajectoryBrush {
    target: Option<usize>,
    base: Box<Brush>,
    use_weighted: bool,
    weight: f64,
    cache: GraphCache,
}

impl TrajectoryBrush {
    /// Trajectory with a spectral base brush.
    pub fn new(target: Option<usize>) -> Self {
        Self {
            target,
            base: Box::new(Brush::Spectral(SpectralBrush::new())),
            use_weighted: true,
            weight: 1.0,
            cache: GraphCache::new(),
        }
    }

    pub fn with_base(mut self, base: Brush) -> Self {
        self.base = Box::new(base);
        self
    }

    /// Kernel for the base brush. The trajectory has no kernel of its own.
    pub fn with_kernel(mut self, kernel: KernelModel) -> Self {
        self.set_kernel_model(Some(kernel));
        self
    }

    pub fn with_weighted(mut self, use_weighted: bool) -> Self {
        self.use_weighted = use_weighted;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<usize>) {
        self.target = target;
    }

    pub fn base(&self) -> &Brush {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut Brush {
        &mut self.base
    }

    pub fn kernel_model(&self) -> Option<&KernelModel> {
        self.base.kernel_model()
    }

    pub fn set_kernel_model(&mut self, kernel: Option<KernelModel>) {
        self.base.set_kernel_model(kernel);
    }

    pub fn cache(&self) -> &GraphCache {
        &self.cache
    }

    /// Vertex sequence from `source` to the target, both inclusive.
    pub fn get_path(&mut self, manifold: &Manifold, source: usize) -> Result<Vec<usize>> {
        let target = self.target.ok_or(BrushError::MissingTarget)?;
        manifold.check_vertex(source)?;
        manifold.check_vertex(target)?;
        self.cache
            .get(manifold, self.use_weighted)
            .shortest_path(source, target)
            .ok_or(BrushError::NoPathFound {
                from: source,
                to: target,
            })
    }

    /// Base brush (weighted) applied at `path[index]`.
    pub fn evaluate_at_path_index(
        &mut self,
        manifold: &Manifold,
        path: &[usize],
        index: usize,
    ) -> Result<Field> {
        let vertex = *path.get(index).ok_or(BrushError::PathIndexOutOfRange {
            index,
            len: path.len(),
        })?;
        self.base.evaluate(manifold, Some(vertex))
    }

    /// Sum of the base brush over the whole path, normalized to unit peak.
    pub fn evaluate_full_trajectory(&mut self, manifold: &Manifold, source: usize) -> Result<Field> {
        let path = self.get_path(manifold, source)?;
        let mut total = Field::zeros(manifold.n());
        for index in 0..path.len() {
            total += self.evaluate_at_path_index(manifold, &path, index)?;
        }
        Ok(normalize_max_abs(total))
    }
}

impl ManifoldBrush for TrajectoryBrush {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn evaluate_core(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field> {
        let source = seed.ok_or(BrushError::MissingSeed)?;
        self.evaluate_full_trajectory(manifold, source)
    }
}
