//! Reactive coordinator that keeps the output field in step with its inputs.
//!
//! Every mutator follows the same three steps: apply the change, emit one
//! typed [`ContextEvent`], run [`ManifoldBrushContext::recompute`]. There is
//! exactly one recompute path, so the field never depends on the order in
//! which inputs were set.
//!
//! Recompute is the error boundary. A failing brush leaves the previous field
//! in place and the failure is logged and kept in `last_error`; it never
//! reaches the caller.

use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::brush::Brush;
use crate::brush_model::ManifoldBrushModel;
use crate::error::{BrushError, Result};
use crate::kernel::KernelModel;
use crate::manifold::{Field, Manifold};

/// Change notifications, one per observed input plus the output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContextEvent<'a> {
    ManifoldChanged,
    SeedChanged(usize),
    TargetChanged(Option<usize>),
    BrushModelChanged,
    BrushChanged,
    KernelModelChanged,
    /// A recompute succeeded; carries the new field.
    FieldChanged(&'a Field),
}

pub type Listener = Box<dyn FnMut(&ContextEvent<'_>)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// How far the context is from being able to produce a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// Neither a manifold nor a brush model.
    Uninitialized,
    /// Some inputs present, but no manifold or no active brush.
    PartiallyConfigured,
    /// Manifold and active brush both present.
    Ready,
}

/// Outcome of one recompute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recompute {
    /// Manifold, brush model or brush missing; field untouched.
    Skipped,
    /// Field replaced and `FieldChanged` emitted.
    Updated,
    /// Brush evaluation failed; field untouched, error kept in `last_error`.
    Failed,
}

/// Session-long owner of the painted field.
///
/// The context-level kernel model and target are pushed into the active
/// brush whenever they are set, and into any brush installed later, so
/// spectral and trajectory brushes follow the host's current configuration.
pub struct ManifoldBrushContext {
    manifold: Option<Arc<Manifold>>,
    seed: usize,
    target: Option<usize>,
    brush_model: Option<ManifoldBrushModel>,
    kernel_model: Option<KernelModel>,
    field: Option<Field>,
    last_error: Option<BrushError>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl ManifoldBrushContext {
    pub fn new() -> Self {
        Self {
            manifold: None,
            seed: 0,
            target: None,
            brush_model: None,
            kernel_model: None,
            field: None,
            last_error: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // --- Observers ---

    pub fn subscribe(&mut self, listener: impl FnMut(&ContextEvent<'_>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn emit(listeners: &mut [(SubscriptionId, Listener)], event: &ContextEvent<'_>) {
        for (_, listener) in listeners.iter_mut() {
            listener(event);
        }
    }

    // --- Accessors ---

    pub fn manifold(&self) -> Option<&Arc<Manifold>> {
        self.manifold.as_ref()
    }

    pub fn seed(&self) -> usize {
        self.seed
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn brush_model(&self) -> Option<&ManifoldBrushModel> {
        self.brush_model.as_ref()
    }

    pub fn brush(&self) -> Option<&Brush> {
        self.brush_model.as_ref().and_then(|m| m.brush())
    }

    pub fn kernel_model(&self) -> Option<&KernelModel> {
        self.kernel_model.as_ref()
    }

    /// Field from the last successful recompute, if any.
    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    /// Error from the most recent recompute; cleared by the next success.
    pub fn last_error(&self) -> Option<&BrushError> {
        self.last_error.as_ref()
    }

    pub fn state(&self) -> ContextState {
        let has_brush = self.brush().is_some();
        match (self.manifold.is_some(), self.brush_model.is_some()) {
            (true, true) if has_brush => ContextState::Ready,
            (false, false) => ContextState::Uninitialized,
            _ => ContextState::PartiallyConfigured,
        }
    }

    // --- Mutators ---

    /// Replace the manifold wholesale. Brush graph caches key on the new
    /// manifold's id and rebuild on the next evaluation.
    ///
    /// A kernel model whose axis differs from the new spectrum is moved onto
    /// it, which resets its parameters to that spectrum's defaults.
    pub fn set_manifold(&mut self, manifold: Option<Arc<Manifold>>) -> Recompute {
        self.manifold = manifold;
        Self::emit(&mut self.listeners, &ContextEvent::ManifoldChanged);
        if self.retune_kernel() {
            Self::emit(&mut self.listeners, &ContextEvent::KernelModelChanged);
        }
        self.recompute()
    }

    /// Align the kernel axis with the current manifold's eigenvalues.
    /// Returns true if the kernel changed.
    fn retune_kernel(&mut self) -> bool {
        let (Some(kernel), Some(dual)) = (
            self.kernel_model.as_mut(),
            self.manifold.as_ref().and_then(|m| m.dual()),
        ) else {
            return false;
        };
        if *kernel.axis() == dual.eigenvalues {
            return false;
        }
        if let Err(e) = kernel.set_axis(dual.eigenvalues.clone()) {
            warn!(error = %e, "kernel could not adopt the new spectrum");
            return false;
        }
        if let Some(brush) = self.brush_model.as_mut().and_then(|m| m.brush_mut()) {
            brush.set_kernel_model(self.kernel_model.clone());
        }
        true
    }

    pub fn set_seed(&mut self, seed: usize) -> Recompute {
        self.seed = seed;
        Self::emit(&mut self.listeners, &ContextEvent::SeedChanged(seed));
        self.recompute()
    }

    pub fn set_target(&mut self, target: Option<usize>) -> Recompute {
        self.target = target;
        if let Some(brush) = self.brush_model.as_mut().and_then(|m| m.brush_mut()) {
            brush.set_target(target);
        }
        Self::emit(&mut self.listeners, &ContextEvent::TargetChanged(target));
        self.recompute()
    }

    /// Swap the whole brush model. Brush edits made through
    /// [`set_brush`](Self::set_brush) and [`update_brush`](Self::update_brush)
    /// from now on route to the new model.
    pub fn set_brush_model(&mut self, model: Option<ManifoldBrushModel>) -> Recompute {
        self.brush_model = model;
        self.sync_active_brush();
        Self::emit(&mut self.listeners, &ContextEvent::BrushModelChanged);
        self.recompute()
    }

    /// Replace the active brush inside the current model, creating an empty
    /// model first if none is installed.
    pub fn set_brush(&mut self, brush: Option<Brush>) -> Recompute {
        if self.brush_model.is_none() {
            self.brush_model = Some(ManifoldBrushModel::empty());
            Self::emit(&mut self.listeners, &ContextEvent::BrushModelChanged);
        }
        if let Some(model) = self.brush_model.as_mut() {
            model.set_brush(brush);
        }
        self.sync_active_brush();
        Self::emit(&mut self.listeners, &ContextEvent::BrushChanged);
        self.recompute()
    }

    /// Edit the active brush in place (weights, modes, thresholds).
    /// Returns the closure's output with the recompute outcome, or `None` if
    /// there is no active brush; nothing is emitted then.
    pub fn update_brush<R>(&mut self, f: impl FnOnce(&mut Brush) -> R) -> Option<(R, Recompute)> {
        let brush = self.brush_model.as_mut().and_then(|m| m.brush_mut())?;
        let out = f(brush);
        Self::emit(&mut self.listeners, &ContextEvent::BrushChanged);
        Some((out, self.recompute()))
    }

    /// Set or clear the kernel model. Clearing also detaches it from the
    /// active brush.
    pub fn set_kernel_model(&mut self, kernel: Option<KernelModel>) -> Recompute {
        self.kernel_model = kernel;
        if let Some(brush) = self.brush_model.as_mut().and_then(|m| m.brush_mut()) {
            brush.set_kernel_model(self.kernel_model.clone());
        }
        Self::emit(&mut self.listeners, &ContextEvent::KernelModelChanged);
        self.recompute()
    }

    /// Edit the kernel model in place (parameters, type, axis). An error from
    /// `f` is returned and nothing is emitted; kernel setters leave the model
    /// unchanged on failure.
    pub fn update_kernel_model(
        &mut self,
        f: impl FnOnce(&mut KernelModel) -> Result<()>,
    ) -> Result<Recompute> {
        let kernel = self
            .kernel_model
            .as_mut()
            .ok_or(BrushError::MissingKernelModel)?;
        f(kernel)?;
        if let Some(brush) = self.brush_model.as_mut().and_then(|m| m.brush_mut()) {
            brush.set_kernel_model(self.kernel_model.clone());
        }
        Self::emit(&mut self.listeners, &ContextEvent::KernelModelChanged);
        Ok(self.recompute())
    }

    /// Push the context's target and kernel into a freshly installed brush.
    /// Unset context values leave the brush's own configuration alone.
    fn sync_active_brush(&mut self) {
        let Some(brush) = self.brush_model.as_mut().and_then(|m| m.brush_mut()) else {
            return;
        };
        if self.target.is_some() {
            brush.set_target(self.target);
        }
        if self.kernel_model.is_some() && brush.uses_kernel() {
            brush.set_kernel_model(self.kernel_model.clone());
        }
    }

    /// Re-evaluate the active brush at the current seed.
    pub fn recompute(&mut self) -> Recompute {
        let Some(manifold) = self.manifold.clone() else {
            trace!("recompute skipped: no manifold");
            return Recompute::Skipped;
        };
        let Some(model) = self.brush_model.as_mut() else {
            trace!("recompute skipped: no brush model");
            return Recompute::Skipped;
        };
        if model.brush().is_none() {
            trace!("recompute skipped: brush model has no brush");
            return Recompute::Skipped;
        }

        match model.evaluate(&manifold, Some(self.seed)) {
            Ok(field) => {
                self.last_error = None;
                let field = self.field.insert(field);
                Self::emit(&mut self.listeners, &ContextEvent::FieldChanged(field));
                Recompute::Updated
            }
            Err(e) => {
                warn!(
                    error = %e,
                    seed = self.seed,
                    brush = self.brush().map(|b| b.kind()).unwrap_or("none"),
                    "brush evaluation failed, keeping previous field"
                );
                self.last_error = Some(e);
                Recompute::Failed
            }
        }
    }
}

impl Default for ManifoldBrushContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManifoldBrushContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifoldBrushContext")
            .field("state", &self.state())
            .field("seed", &self.seed)
            .field("target", &self.target)
            .field("brush", &self.brush().map(|b| b.kind()))
            .field("kernel", &self.kernel_model.as_ref().map(|k| k.kernel_type()))
            .field("has_field", &self.field.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::brush::{DeltaBrush, GraphBrush, SelectionMode, SpectralBrush, TrajectoryBrush};
    use crate::demo;
    use crate::kernel::KernelRegistry;

    fn recorder(ctx: &mut ManifoldBrushContext) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        ctx.subscribe(move |e| {
            let name = match e {
                ContextEvent::ManifoldChanged => "manifold".to_string(),
                ContextEvent::SeedChanged(s) => format!("seed:{s}"),
                ContextEvent::TargetChanged(t) => format!("target:{t:?}"),
                ContextEvent::BrushModelChanged => "brush_model".to_string(),
                ContextEvent::BrushChanged => "brush".to_string(),
                ContextEvent::KernelModelChanged => "kernel".to_string(),
                ContextEvent::FieldChanged(f) => format!("field:{}", f.len()),
            };
            sink.borrow_mut().push(name);
        });
        log
    }

    #[test]
    fn test_state_machine() {
        let mut ctx = ManifoldBrushContext::new();
        assert_eq!(ctx.state(), ContextState::Uninitialized);

        ctx.set_manifold(Some(Arc::new(demo::path(4))));
        assert_eq!(ctx.state(), ContextState::PartiallyConfigured);

        ctx.set_brush_model(Some(ManifoldBrushModel::empty()));
        assert_eq!(ctx.state(), ContextState::PartiallyConfigured);

        ctx.set_brush(Some(DeltaBrush::new().into()));
        assert_eq!(ctx.state(), ContextState::Ready);

        ctx.set_manifold(None);
        assert_eq!(ctx.state(), ContextState::PartiallyConfigured);
    }

    #[test]
    fn test_recompute_without_brush_model_keeps_field() {
        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(Arc::new(demo::path(4))));
        ctx.set_brush(Some(DeltaBrush::new().into()));
        ctx.set_seed(2);
        let before = ctx.field().cloned();
        assert!(before.is_some());

        assert_eq!(ctx.set_brush_model(None), Recompute::Skipped);
        assert_eq!(ctx.recompute(), Recompute::Skipped);
        assert_eq!(ctx.field().cloned(), before);
    }

    #[test]
    fn test_event_order() {
        let mut ctx = ManifoldBrushContext::new();
        let log = recorder(&mut ctx);
        ctx.set_manifold(Some(Arc::new(demo::path(3))));
        ctx.set_brush_model(Some(ManifoldBrushModel::new(DeltaBrush::new())));
        ctx.set_seed(1);
        assert_eq!(
            *log.borrow(),
            vec!["manifold", "brush_model", "field:3", "seed:1", "field:3"]
        );
    }

    #[test]
    fn test_failure_keeps_last_field_and_records_error() {
        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(Arc::new(demo::path(4))));
        ctx.set_brush(Some(DeltaBrush::new().into()));
        ctx.set_seed(3);
        let good = ctx.field().cloned().unwrap();

        assert_eq!(ctx.set_seed(10), Recompute::Failed);
        assert_eq!(ctx.field(), Some(&good));
        assert_eq!(
            ctx.last_error(),
            Some(&BrushError::VertexOutOfRange { index: 10, n: 4 })
        );

        assert_eq!(ctx.set_seed(0), Recompute::Updated);
        assert!(ctx.last_error().is_none());
    }

    #[test]
    fn test_spectral_without_kernel_degrades() {
        let mut ctx = ManifoldBrushContext::new();
        let log = recorder(&mut ctx);
        ctx.set_manifold(Some(Arc::new(demo::ring(8))));
        assert_eq!(
            ctx.set_brush(Some(SpectralBrush::new().into())),
            Recompute::Failed
        );
        assert!(ctx.field().is_none());
        assert_eq!(ctx.last_error(), Some(&BrushError::MissingKernelModel));
        assert!(!log.borrow().iter().any(|e| e.starts_with("field")));
    }

    #[test]
    fn test_kernel_model_pushed_into_brush() {
        let m = Arc::new(demo::ring(8));
        let registry = Arc::new(KernelRegistry::with_builtins());
        let kernel = KernelModel::for_manifold(registry, &m, "heat").unwrap();

        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(m));
        ctx.set_kernel_model(Some(kernel));
        // Brush installed after the kernel still receives it
        assert_eq!(
            ctx.set_brush(Some(SpectralBrush::new().into())),
            Recompute::Updated
        );
        assert_eq!(ctx.brush().unwrap().kernel_model().unwrap().kernel_type(), "heat");

        let peak_before = ctx.field().unwrap()[1];
        let outcome = ctx
            .update_kernel_model(|k| k.set_parameter("tau", 10.0))
            .unwrap();
        assert_eq!(outcome, Recompute::Updated);
        assert!(ctx.field().unwrap()[1] > peak_before, "more diffusion spreads further");

        // Clearing the kernel detaches it and the next recompute fails softly
        assert_eq!(ctx.set_kernel_model(None), Recompute::Failed);
        assert!(ctx.brush().unwrap().kernel_model().is_none());
    }

    #[test]
    fn test_manifold_change_retunes_kernel() {
        let small = Arc::new(demo::ring(8));
        let registry = Arc::new(KernelRegistry::with_builtins());
        let kernel = KernelModel::for_manifold(Arc::clone(&registry), &small, "heat").unwrap();

        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(small));
        ctx.set_kernel_model(Some(kernel));
        ctx.set_brush(Some(SpectralBrush::new().into()));
        ctx.update_kernel_model(|k| k.set_parameter("tau", 3.0)).unwrap();
        let log = recorder(&mut ctx);

        let large = Arc::new(demo::ring(20));
        assert_eq!(ctx.set_manifold(Some(Arc::clone(&large))), Recompute::Updated);
        let expected = KernelModel::for_manifold(registry, &large, "heat").unwrap();
        let kernel = ctx.kernel_model().unwrap();
        assert_eq!(kernel.axis(), expected.axis());
        assert_eq!(kernel.params(), expected.params());
        let pushed = ctx.brush().unwrap().kernel_model().unwrap();
        assert_eq!(pushed.params(), expected.params());
        assert_eq!(*log.borrow(), vec!["manifold", "kernel", "field:20"]);
    }

    #[test]
    fn test_same_spectrum_keeps_kernel_params() {
        let m = Arc::new(demo::ring(8));
        let registry = Arc::new(KernelRegistry::with_builtins());
        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(Arc::clone(&m)));
        ctx.set_kernel_model(Some(KernelModel::for_manifold(registry, &m, "heat").unwrap()));
        ctx.update_kernel_model(|k| k.set_parameter("tau", 3.0)).unwrap();

        // Rebuilt mesh, same eigenvalues: overrides survive
        ctx.set_manifold(Some(Arc::new(demo::ring(8))));
        assert_eq!(ctx.kernel_model().unwrap().params().get("tau"), Some(3.0));
    }

    #[test]
    fn test_update_kernel_model_error_not_emitted() {
        let m = Arc::new(demo::ring(8));
        let registry = Arc::new(KernelRegistry::with_builtins());
        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(Arc::clone(&m)));
        ctx.set_kernel_model(Some(KernelModel::for_manifold(registry, &m, "heat").unwrap()));
        let log = recorder(&mut ctx);

        let err = ctx
            .update_kernel_model(|k| k.set_kernel_type("nope"))
            .unwrap_err();
        assert_eq!(err, BrushError::InvalidKernelType("nope".into()));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_update_kernel_model_without_kernel() {
        let mut ctx = ManifoldBrushContext::new();
        assert_eq!(
            ctx.update_kernel_model(|_| Ok(())),
            Err(BrushError::MissingKernelModel)
        );
    }

    #[test]
    fn test_target_pushed_into_trajectory() {
        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(Arc::new(demo::path(6))));
        ctx.set_target(Some(3));
        let brush = TrajectoryBrush::new(None).with_base(DeltaBrush::new().into());
        assert_eq!(ctx.set_brush(Some(brush.into())), Recompute::Updated);
        assert_eq!(ctx.field().unwrap().as_slice(), &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);

        ctx.set_target(Some(5));
        assert_eq!(ctx.field().unwrap().as_slice(), &[1.0; 6]);
    }

    #[test]
    fn test_replacing_brush_model_rearms_brush_updates() {
        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(Arc::new(demo::path(7))));
        ctx.set_seed(3);
        ctx.set_brush_model(Some(ManifoldBrushModel::new(DeltaBrush::new())));

        let replacement = ManifoldBrushModel::new(
            GraphBrush::new()
                .with_mode(SelectionMode::KNeighbors)
                .with_k(1)
                .with_weighted(false),
        );
        ctx.set_brush_model(Some(replacement));
        let log = recorder(&mut ctx);

        let edited = ctx.update_brush(|b| {
            if let Brush::Graph(g) = b {
                g.set_k(2);
            }
        });
        assert_eq!(edited, Some(((), Recompute::Updated)));
        assert_eq!(*log.borrow(), vec!["brush", "field:7"]);
        let covered = ctx.field().unwrap().iter().filter(|v| **v > 0.0).count();
        assert_eq!(covered, 5);
    }

    #[test]
    fn test_update_brush_without_brush_is_silent() {
        let mut ctx = ManifoldBrushContext::new();
        let log = recorder(&mut ctx);
        assert!(ctx.update_brush(|_| ()).is_none());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let mut ctx = ManifoldBrushContext::new();
        let log = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&log);
        let id = ctx.subscribe(move |_| *sink.borrow_mut() += 1);
        ctx.set_seed(1);
        assert!(ctx.unsubscribe(id));
        ctx.set_seed(2);
        assert_eq!(*log.borrow(), 1);
        assert!(!ctx.unsubscribe(id));
    }

    #[test]
    fn test_manifold_replacement_rebuilds_graph() {
        let mut ctx = ManifoldBrushContext::new();
        ctx.set_manifold(Some(Arc::new(demo::path(5))));
        ctx.set_brush(Some(GraphBrush::new().into()));
        for s in 0..5 {
            ctx.set_seed(s);
        }
        let builds = |ctx: &ManifoldBrushContext| match ctx.brush() {
            Some(Brush::Graph(g)) => g.cache().build_count(),
            _ => 0,
        };
        assert_eq!(builds(&ctx), 1);

        ctx.set_manifold(Some(Arc::new(demo::path(5))));
        assert_eq!(builds(&ctx), 2);
    }
}
