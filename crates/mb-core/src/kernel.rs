//! Spectral filter families and the kernel model that materializes one.
//!
//! A [`KernelFamily`] knows two things: sensible parameters for a given
//! spectral axis, and how to turn parameters into a filter `g(λ)`. The
//! [`KernelRegistry`] maps names to families; hosts can register their own.
//!
//! [`KernelModel`] holds the axis, the selected family, its parameters, and the
//! built filter. It is only ever observed fully built: construction goes
//! through [`KernelModelBuilder`], and every setter computes the replacement
//! state before committing it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HEAT_TAU, DEFAULT_KERNEL, EIGENVALUE_TOLERANCE, EPSILON};
use crate::error::{BrushError, Result};
use crate::manifold::Manifold;

/// Pure per-eigenvalue filter.
pub type FilterFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Named real-valued kernel parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelParams(BTreeMap<String, f64>);

impl KernelParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Like [`get`](Self::get) but a missing name is an error.
    pub fn require(&self, name: &str) -> Result<f64> {
        self.get(name)
            .ok_or_else(|| BrushError::InvalidParameter(format!("missing parameter '{name}'")))
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A family of spectral filters.
pub trait KernelFamily: Send + Sync {
    /// Parameters that make sense for the given spectral axis.
    fn default_params(&self, axis: &DVector<f64>) -> KernelParams;

    /// Materialize the filter. Rejects missing or out-of-range parameters.
    fn build(&self, params: &KernelParams) -> Result<FilterFn>;
}

/// Family assembled from two closures, for host-registered kernels.
pub struct FnFamily<D, B> {
    defaults: D,
    builder: B,
}

impl<D, B> FnFamily<D, B>
where
    D: Fn(&DVector<f64>) -> KernelParams + Send + Sync,
    B: Fn(&KernelParams) -> Result<FilterFn> + Send + Sync,
{
    pub fn new(defaults: D, builder: B) -> Self {
        Self { defaults, builder }
    }
}

impl<D, B> KernelFamily for FnFamily<D, B>
where
    D: Fn(&DVector<f64>) -> KernelParams + Send + Sync,
    B: Fn(&KernelParams) -> Result<FilterFn> + Send + Sync,
{
    fn default_params(&self, axis: &DVector<f64>) -> KernelParams {
        (self.defaults)(axis)
    }

    fn build(&self, params: &KernelParams) -> Result<FilterFn> {
        (self.builder)(params)
    }
}

// --- Built-in families ---

/// Heat diffusion `g(λ) = exp(-τλ)`. Default τ puts `g(λ_max) = e⁻¹`.
pub struct HeatKernel;

impl KernelFamily for HeatKernel {
    fn default_params(&self, axis: &DVector<f64>) -> KernelParams {
        let tau = match axis_range(axis) {
            Some((_, hi)) if hi > EPSILON => 1.0 / hi,
            _ => DEFAULT_HEAT_TAU,
        };
        KernelParams::new().with("tau", tau)
    }

    fn build(&self, params: &KernelParams) -> Result<FilterFn> {
        let tau = non_negative(params, "tau")?;
        Ok(Arc::new(move |l: f64| (-tau * l).exp()))
    }
}

/// Spectral Mexican hat `g(λ) = (λ/s)·exp(1 - λ/s)`: zero at DC, peak 1 at `λ = s`.
pub struct MexicanHatKernel;

impl KernelFamily for MexicanHatKernel {
    fn default_params(&self, axis: &DVector<f64>) -> KernelParams {
        let scale = match axis_range(axis) {
            Some((lo, hi)) if hi - lo > EPSILON => lo + 0.25 * (hi - lo),
            _ => 1.0,
        };
        KernelParams::new().with("scale", scale)
    }

    fn build(&self, params: &KernelParams) -> Result<FilterFn> {
        let scale = positive(params, "scale")?;
        Ok(Arc::new(move |l: f64| {
            let x = l / scale;
            x * (1.0 - x).exp()
        }))
    }
}

/// Gaussian bump `g(λ) = exp(-(λ-c)² / 2w²)` around a center frequency.
pub struct BandPassKernel;

impl KernelFamily for BandPassKernel {
    fn default_params(&self, axis: &DVector<f64>) -> KernelParams {
        let (center, width) = match axis_range(axis) {
            Some((lo, hi)) if hi - lo > EPSILON => (0.5 * (lo + hi), (hi - lo) / 6.0),
            _ => (0.0, 1.0),
        };
        KernelParams::new()
            .with("center", center)
            .with("width", width)
    }

    fn build(&self, params: &KernelParams) -> Result<FilterFn> {
        let center = finite(params, "center")?;
        let width = positive(params, "width")?;
        Ok(Arc::new(move |l: f64| {
            let d = l - center;
            (-(d * d) / (2.0 * width * width)).exp()
        }))
    }
}

/// Ideal low-pass: 1 up to and including the cutoff, 0 above.
pub struct LowPassKernel;

impl KernelFamily for LowPassKernel {
    fn default_params(&self, axis: &DVector<f64>) -> KernelParams {
        let cutoff = axis_range(axis).map_or(1.0, |(lo, hi)| 0.5 * (lo + hi));
        KernelParams::new().with("cutoff", cutoff)
    }

    fn build(&self, params: &KernelParams) -> Result<FilterFn> {
        let cutoff = finite(params, "cutoff")?;
        Ok(Arc::new(move |l: f64| if l <= cutoff { 1.0 } else { 0.0 }))
    }
}

/// All-pass `g(λ) = 1`. Projection followed by reconstruction is then the identity.
pub struct IdentityKernel;

impl KernelFamily for IdentityKernel {
    fn default_params(&self, _axis: &DVector<f64>) -> KernelParams {
        KernelParams::new()
    }

    fn build(&self, _params: &KernelParams) -> Result<FilterFn> {
        Ok(Arc::new(|_| 1.0))
    }
}

fn axis_range(axis: &DVector<f64>) -> Option<(f64, f64)> {
    if axis.is_empty() {
        return None;
    }
    Some((axis.min(), axis.max()))
}

fn finite(params: &KernelParams, name: &str) -> Result<f64> {
    let v = params.require(name)?;
    if !v.is_finite() {
        return Err(BrushError::InvalidParameter(format!(
            "'{name}' must be finite, got {v}"
        )));
    }
    Ok(v)
}

fn non_negative(params: &KernelParams, name: &str) -> Result<f64> {
    let v = finite(params, name)?;
    if v < 0.0 {
        return Err(BrushError::InvalidParameter(format!(
            "'{name}' must be >= 0, got {v}"
        )));
    }
    Ok(v)
}

fn positive(params: &KernelParams, name: &str) -> Result<f64> {
    let v = finite(params, name)?;
    if v <= 0.0 {
        return Err(BrushError::InvalidParameter(format!(
            "'{name}' must be > 0, got {v}"
        )));
    }
    Ok(v)
}

// --- Registry ---

/// Name → kernel family table.
#[derive(Clone)]
pub struct KernelRegistry {
    families: BTreeMap<String, Arc<dyn KernelFamily>>,
}

impl KernelRegistry {
    /// Registry with no families at all.
    pub fn empty() -> Self {
        Self {
            families: BTreeMap::new(),
        }
    }

    /// Registry preloaded with `heat`, `mexican_hat`, `band_pass`, `low_pass`, `identity`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("heat", HeatKernel);
        registry.register("mexican_hat", MexicanHatKernel);
        registry.register("band_pass", BandPassKernel);
        registry.register("low_pass", LowPassKernel);
        registry.register("identity", IdentityKernel);
        registry
    }

    /// Add or replace a family.
    pub fn register(&mut self, name: &str, family: impl KernelFamily + 'static) {
        self.families.insert(name.to_string(), Arc::new(family));
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn KernelFamily>> {
        self.families
            .get(name)
            .ok_or_else(|| BrushError::InvalidKernelType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("families", &self.families.keys().collect::<Vec<_>>())
            .finish()
    }
}

// --- Model ---

/// Staged construction for [`KernelModel`]. Nothing is derived until
/// [`build`](Self::build), which sees registry, axis and type together.
pub struct KernelModelBuilder {
    registry: Arc<KernelRegistry>,
    axis: Option<DVector<f64>>,
    kernel_type: String,
    overrides: KernelParams,
}

impl KernelModelBuilder {
    pub fn axis(mut self, axis: DVector<f64>) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn kernel_type(mut self, name: &str) -> Self {
        self.kernel_type = name.to_string();
        self
    }

    /// Parameters applied on top of the family defaults.
    pub fn params(mut self, overrides: KernelParams) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn build(self) -> Result<KernelModel> {
        let axis = self
            .axis
            .ok_or_else(|| BrushError::Config("kernel model needs a spectral axis".into()))?;
        check_axis(&axis)?;

        let family = self.registry.get(&self.kernel_type)?;
        let mut params = family.default_params(&axis);
        for (name, value) in self.overrides.iter() {
            if !params.contains(name) {
                return Err(unknown_param(&self.kernel_type, name));
            }
            params.set(name, value);
        }
        let filter = family.build(&params)?;

        Ok(KernelModel {
            registry: self.registry,
            axis,
            kernel_type: self.kernel_type,
            params,
            filter,
        })
    }
}

/// A selected kernel family, its parameters, and the resulting filter.
#[derive(Clone)]
pub struct KernelModel {
    registry: Arc<KernelRegistry>,
    axis: DVector<f64>,
    kernel_type: String,
    params: KernelParams,
    filter: FilterFn,
}

impl KernelModel {
    pub fn builder(registry: Arc<KernelRegistry>) -> KernelModelBuilder {
        KernelModelBuilder {
            registry,
            axis: None,
            kernel_type: DEFAULT_KERNEL.to_string(),
            overrides: KernelParams::new(),
        }
    }

    /// Kernel over the manifold's own eigenvalues.
    pub fn for_manifold(
        registry: Arc<KernelRegistry>,
        manifold: &Manifold,
        kernel_type: &str,
    ) -> Result<Self> {
        let dual = manifold.dual().ok_or(BrushError::MissingSpectralBasis)?;
        Self::builder(registry)
            .axis(dual.eigenvalues.clone())
            .kernel_type(kernel_type)
            .build()
    }

    pub fn axis(&self) -> &DVector<f64> {
        &self.axis
    }

    pub fn kernel_type(&self) -> &str {
        &self.kernel_type
    }

    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    pub fn registry(&self) -> &Arc<KernelRegistry> {
        &self.registry
    }

    /// New axis: parameters reset to the family defaults for it.
    pub fn set_axis(&mut self, axis: DVector<f64>) -> Result<()> {
        check_axis(&axis)?;
        let family = self.registry.get(&self.kernel_type)?;
        let params = family.default_params(&axis);
        let filter = family.build(&params)?;
        self.axis = axis;
        self.params = params;
        self.filter = filter;
        Ok(())
    }

    /// New family: parameters reset to its defaults on the current axis.
    pub fn set_kernel_type(&mut self, name: &str) -> Result<()> {
        let family = self.registry.get(name)?;
        let params = family.default_params(&self.axis);
        let filter = family.build(&params)?;
        self.kernel_type = name.to_string();
        self.params = params;
        self.filter = filter;
        Ok(())
    }

    /// Replace all parameters. Only the filter is rebuilt.
    pub fn set_parameters(&mut self, params: KernelParams) -> Result<()> {
        let family = self.registry.get(&self.kernel_type)?;
        let known = family.default_params(&self.axis);
        if let Some(name) = params.names().find(|n| !known.contains(n)) {
            return Err(unknown_param(&self.kernel_type, name));
        }
        let filter = family.build(&params)?;
        self.params = params;
        self.filter = filter;
        Ok(())
    }

    /// Change one existing parameter.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        if !self.params.contains(name) {
            return Err(unknown_param(&self.kernel_type, name));
        }
        let mut params = self.params.clone();
        params.set(name, value);
        self.set_parameters(params)
    }

    /// Apply the filter elementwise.
    pub fn evaluate(&self, lambdas: &DVector<f64>) -> DVector<f64> {
        lambdas.map(|l| (self.filter)(l))
    }

    pub fn evaluate_scalar(&self, lambda: f64) -> f64 {
        (self.filter)(lambda)
    }
}

impl fmt::Debug for KernelModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelModel")
            .field("kernel_type", &self.kernel_type)
            .field("params", &self.params)
            .field("axis_len", &self.axis.len())
            .finish()
    }
}

fn check_axis(axis: &DVector<f64>) -> Result<()> {
    if let Some(bad) = axis
        .iter()
        .find(|l| !l.is_finite() || **l < -EIGENVALUE_TOLERANCE)
    {
        return Err(BrushError::InvalidParameter(format!(
            "spectral axis must be finite and nonnegative, found {bad}"
        )));
    }
    Ok(())
}

fn unknown_param(kernel_type: &str, name: &str) -> BrushError {
    BrushError::InvalidParameter(format!("kernel '{kernel_type}' has no parameter '{name}'"))
}
