use crate::brush::{Brush, ManifoldBrush};
use crate::error::{BrushError, Result};
use crate::manifold::{Field, Manifold};

/// Holder for the active brush. Tool switches replace the brush in place.
#[derive(Clone, Debug, Default)]
pub struct ManifoldBrushModel {
    brush: Option<Brush>,
}

impl ManifoldBrushModel {
    pub fn new(brush: impl Into<Brush>) -> Self {
        Self {
            brush: Some(brush.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn brush(&self) -> Option<&Brush> {
        self.brush.as_ref()
    }

    pub fn brush_mut(&mut self) -> Option<&mut Brush> {
        self.brush.as_mut()
    }

    /// Install a new brush, returning the one it replaced.
    pub fn set_brush(&mut self, brush: Option<Brush>) -> Option<Brush> {
        std::mem::replace(&mut self.brush, brush)
    }

    pub fn evaluate(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field> {
        self.brush
            .as_mut()
            .ok_or(BrushError::MissingBrush)?
            .evaluate(manifold, seed)
    }
}
