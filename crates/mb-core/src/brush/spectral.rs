use super::ManifoldBrush;
use crate::error::{BrushError, Result};
use crate::graph::GraphDistance;
use crate::kernel::KernelModel;
use crate::manifold::{Field, Manifold, normalize_max_abs};
use crate::signal::{CompositeSignalModel, SignalContext};

/// Graph-Fourier filter brush.
///
/// Builds an excitation at the seed, projects it onto the manifold's
/// eigenbasis, scales each coefficient by the kernel `g(λ)`, reconstructs,
/// and normalizes to unit peak magnitude:
///
/// ```text
/// δ = excitation(seed)
/// w = U · (g(Λ) ⊙ Uᵀδ) / max|·|
/// ```
#[derive(Clone, Debug)]
pub struct SpectralBrush {
    kernel: Option<KernelModel>,
    excitation: CompositeSignalModel,
    distances: GraphDistance,
    weight: f64,
}

impl SpectralBrush {
    pub fn new() -> Self {
        Self {
            kernel: None,
            excitation: CompositeSignalModel::delta(),
            distances: GraphDistance::default(),
            weight: 1.0,
        }
    }

    pub fn with_kernel(mut self, kernel: KernelModel) -> Self {
        self.kernel = Some(kernel);
        self
    }

    pub fn with_excitation(mut self, excitation: CompositeSignalModel) -> Self {
        self.excitation = excitation;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn kernel_model(&self) -> Option<&KernelModel> {
        self.kernel.as_ref()
    }

    pub fn kernel_model_mut(&mut self) -> Option<&mut KernelModel> {
        self.kernel.as_mut()
    }

    pub fn set_kernel_model(&mut self, kernel: Option<KernelModel>) {
        self.kernel = kernel;
    }

    pub fn excitation(&self) -> &CompositeSignalModel {
        &self.excitation
    }

    pub fn set_excitation(&mut self, excitation: CompositeSignalModel) {
        self.excitation = excitation;
    }
}

impl Default for SpectralBrush {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifoldBrush for SpectralBrush {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn evaluate_core(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field> {
        let seed = seed.ok_or(BrushError::MissingSeed)?;
        manifold.check_vertex(seed)?;
        let dual = manifold.dual().ok_or(BrushError::MissingSpectralBasis)?;
        let kernel = self.kernel.as_ref().ok_or(BrushError::MissingKernelModel)?;

        let mut ctx = SignalContext {
            manifold,
            seed,
            distances: &mut self.distances,
        };
        let excitation = self.excitation.evaluate(manifold.n(), &mut ctx)?;

        let u = &dual.eigenvectors;
        let g = kernel.evaluate(&dual.eigenvalues);
        let coeffs = u.tr_mul(&excitation);
        let field = u * g.component_mul(&coeffs);
        Ok(normalize_max_abs(field))
    }
}
