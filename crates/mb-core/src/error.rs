use thiserror::Error;

/// Every failure the brush engine can report.
///
/// Brush evaluation returns these straight to its caller. The reactive
/// [`ManifoldBrushContext`](crate::context::ManifoldBrushContext) is the only
/// place that swallows them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrushError {
    /// The manifold carries no eigenbasis but the brush needs one.
    #[error("manifold has no spectral basis")]
    MissingSpectralBasis,

    /// A kernel-driven brush was evaluated with no kernel model attached.
    #[error("no kernel model attached to brush")]
    MissingKernelModel,

    /// A trajectory brush was evaluated before a target was set.
    #[error("no target vertex set")]
    MissingTarget,

    /// No seed was passed and the brush has none stored.
    #[error("no seed vertex given and none stored on the brush")]
    MissingSeed,

    /// The brush model holds no active brush.
    #[error("brush model has no active brush")]
    MissingBrush,

    /// Source and target lie in different connected components.
    #[error("no path from vertex {from} to vertex {to}")]
    NoPathFound { from: usize, to: usize },

    #[error("unknown kernel type '{0}'")]
    InvalidKernelType(String),

    #[error("unknown selection mode '{0}'")]
    InvalidSelectionMode(String),

    #[error("vertex {index} out of range for manifold with {n} vertices")]
    VertexOutOfRange { index: usize, n: usize },

    #[error("path index {index} out of range for path of length {len}")]
    PathIndexOutOfRange { index: usize, len: usize },

    #[error("invalid manifold: {0}")]
    InvalidManifold(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("config error: {0}")]
    Config(String),
}

impl BrushError {
    /// Missing collaborators at evaluation time, as opposed to bad input or
    /// topology failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingSpectralBasis
                | Self::MissingKernelModel
                | Self::MissingTarget
                | Self::MissingSeed
                | Self::MissingBrush
        )
    }
}

pub type Result<T> = std::result::Result<T, BrushError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_grouping() {
        assert!(BrushError::MissingSpectralBasis.is_configuration());
        assert!(BrushError::MissingKernelModel.is_configuration());
        assert!(!BrushError::NoPathFound { from: 0, to: 4 }.is_configuration());
        assert!(!BrushError::InvalidKernelType("x".into()).is_configuration());
    }

    #[test]
    fn test_display_messages() {
        let e = BrushError::NoPathFound { from: 0, to: 4 };
        assert_eq!(e.to_string(), "no path from vertex 0 to vertex 4");
        let e = BrushError::InvalidKernelType("wavelet".into());
        assert_eq!(e.to_string(), "unknown kernel type 'wavelet'");
    }
}
