use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{DMatrix, DVector};

use crate::constants::EIGENVALUE_TOLERANCE;
use crate::error::{BrushError, Result};

/// Per-vertex scalar output of a brush. Length always equals the vertex count.
pub type Field = DVector<f64>;

static NEXT_MANIFOLD_ID: AtomicU64 = AtomicU64::new(1);

/// Invalidation token for a manifold.
///
/// Every constructed [`Manifold`] draws a fresh id from a process-wide
/// generation counter. Caches compare ids instead of pointers, so replacing a
/// manifold wholesale (even with identical data) always invalidates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifoldId(u64);

impl ManifoldId {
    fn next() -> Self {
        Self(NEXT_MANIFOLD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Eigenvalues and eigenvectors of a discrete Laplacian on the mesh.
///
/// `eigenvectors` is N×K with one mode per column; columns are assumed
/// orthonormal by whoever computed them.
#[derive(Clone, Debug)]
pub struct DualBasis {
    pub eigenvalues: DVector<f64>,
    pub eigenvectors: DMatrix<f64>,
}

impl DualBasis {
    pub fn new(eigenvalues: DVector<f64>, eigenvectors: DMatrix<f64>) -> Result<Self> {
        let basis = Self {
            eigenvalues,
            eigenvectors,
        };
        basis.validate()?;
        Ok(basis)
    }

    /// One eigenvector column per eigenvalue, no negative eigenvalues.
    pub fn validate(&self) -> Result<()> {
        if self.eigenvectors.ncols() != self.eigenvalues.len() {
            return Err(BrushError::InvalidManifold(format!(
                "basis has {} eigenvalues but {} eigenvectors",
                self.eigenvalues.len(),
                self.eigenvectors.ncols()
            )));
        }
        if let Some(bad) = self.eigenvalues.iter().find(|l| **l < -EIGENVALUE_TOLERANCE) {
            return Err(BrushError::InvalidManifold(format!(
                "negative eigenvalue {bad}"
            )));
        }
        Ok(())
    }

    /// Number of retained modes (K).
    pub fn k(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Rows of the eigenvector matrix, i.e. the vertex count the basis was built for.
    pub fn n(&self) -> usize {
        self.eigenvectors.nrows()
    }
}

/// Triangulated surface with an optional spectral basis.
///
/// Read-only once built. Consumers hold it behind an `Arc` and key their
/// caches on [`Manifold::id`].
#[derive(Debug)]
pub struct Manifold {
    id: ManifoldId,
    vertices: Vec<[f64; 3]>,
    faces: Vec<[usize; 3]>,
    dual: Option<DualBasis>,
}

impl Manifold {
    /// Validate face indices and assign a fresh id.
    pub fn new(vertices: Vec<[f64; 3]>, faces: Vec<[usize; 3]>) -> Result<Self> {
        let n = vertices.len();
        for (f_idx, face) in faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v >= n) {
                return Err(BrushError::InvalidManifold(format!(
                    "face {f_idx} references vertex {bad}, but only {n} vertices exist"
                )));
            }
        }
        Ok(Self {
            id: ManifoldId::next(),
            vertices,
            faces,
            dual: None,
        })
    }

    /// Attach a spectral basis. Requires K ≤ N and one eigenvector row per vertex.
    /// The basis is re-validated since its fields can be set directly.
    pub fn with_dual(mut self, dual: DualBasis) -> Result<Self> {
        dual.validate()?;
        if dual.n() != self.n() {
            return Err(BrushError::InvalidManifold(format!(
                "basis has {} rows, manifold has {} vertices",
                dual.n(),
                self.n()
            )));
        }
        if dual.k() > self.n() {
            return Err(BrushError::InvalidManifold(format!(
                "basis has {} modes, more than {} vertices",
                dual.k(),
                self.n()
            )));
        }
        self.dual = Some(dual);
        Ok(self)
    }

    /// Skip validation for data that is correct by construction (demo meshes).
    pub(crate) fn assemble(
        vertices: Vec<[f64; 3]>,
        faces: Vec<[usize; 3]>,
        dual: Option<DualBasis>,
    ) -> Self {
        Self {
            id: ManifoldId::next(),
            vertices,
            faces,
            dual,
        }
    }

    pub fn id(&self) -> ManifoldId {
        self.id
    }

    /// Vertex count.
    pub fn n(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn dual(&self) -> Option<&DualBasis> {
        self.dual.as_ref()
    }

    /// Precondition check shared by every brush: `index` must name a vertex.
    pub fn check_vertex(&self, index: usize) -> Result<()> {
        if index >= self.n() {
            return Err(BrushError::VertexOutOfRange { index, n: self.n() });
        }
        Ok(())
    }

    /// Euclidean distance between two vertices.
    pub fn edge_length(&self, a: usize, b: usize) -> f64 {
        let (p, q) = (self.vertices[a], self.vertices[b]);
        let dx = p[0] - q[0];
        let dy = p[1] - q[1];
        let dz = p[2] - q[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Scale `field` so its largest magnitude is 1. Near-zero fields are returned as-is.
pub fn normalize_max_abs(mut field: Field) -> Field {
    let peak = field.amax();
    if peak > crate::constants::NORMALIZE_FLOOR {
        field /= peak;
    }
    field
}
