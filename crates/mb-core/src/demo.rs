//! Synthetic manifolds whose Laplacian eigenbases have closed forms.
//!
//! These stand in for the external geometry subsystem in tests, benches and
//! the CLI. No eigensolver is involved: every basis below is written down
//! analytically and is exactly orthonormal.

use std::f64::consts::{PI, TAU};

use nalgebra::{DMatrix, DVector};

use crate::manifold::{DualBasis, Manifold};

/// Cycle of `n` vertices on the unit circle, with the full Fourier basis of
/// the cycle-graph Laplacian. Eigenvalues `2 - 2cos(2πk/n)`, ascending.
///
/// Faces are degenerate `[i, i+1, i]` triangles so the graph adapter sees
/// exactly the ring edges.
pub fn ring(n: usize) -> Manifold {
    let vertices = (0..n)
        .map(|i| {
            let t = TAU * i as f64 / n as f64;
            [t.cos(), t.sin(), 0.0]
        })
        .collect();
    let faces = (0..n).map(|i| [i, (i + 1) % n, i]).collect();

    let mut columns: Vec<(f64, Vec<f64>)> = Vec::with_capacity(n);
    if n > 0 {
        let c0 = (1.0 / n as f64).sqrt();
        columns.push((0.0, vec![c0; n]));
    }
    let ck = (2.0 / n as f64).sqrt();
    for k in 1..n.div_ceil(2) {
        let lambda = 2.0 - 2.0 * (TAU * k as f64 / n as f64).cos();
        let cos_mode = (0..n)
            .map(|i| ck * (TAU * (k * i) as f64 / n as f64).cos())
            .collect();
        let sin_mode = (0..n)
            .map(|i| ck * (TAU * (k * i) as f64 / n as f64).sin())
            .collect();
        columns.push((lambda, cos_mode));
        columns.push((lambda, sin_mode));
    }
    if n >= 2 && n % 2 == 0 {
        let c = (1.0 / n as f64).sqrt();
        let alternating = (0..n).map(|i| if i % 2 == 0 { c } else { -c }).collect();
        columns.push((4.0, alternating));
    }

    Manifold::assemble(vertices, faces, Some(basis_from_columns(n, columns)))
}

/// Unit-spaced polyline `0 – 1 – … – n-1` along x, with the DCT-II basis of
/// the path-graph Laplacian. Eigenvalues `2 - 2cos(πk/n)`.
pub fn path(n: usize) -> Manifold {
    let vertices = (0..n).map(|i| [i as f64, 0.0, 0.0]).collect();
    let faces = (0..n.saturating_sub(1)).map(|i| [i, i + 1, i]).collect();
    let columns = (0..n).map(|k| path_mode(n, k)).collect();
    Manifold::assemble(vertices, faces, Some(basis_from_columns(n, columns)))
}

/// `w × h` lattice in the xy-plane, two triangles per cell, with the first
/// `k` separable cosine modes (products of path modes, sorted by eigenvalue).
///
/// The basis diagonalizes the 4-neighbor grid Laplacian, not the triangulated
/// one, which is fine for painting: brushes only need it orthonormal.
pub fn grid(w: usize, h: usize, k: usize) -> Manifold {
    let n = w * h;
    let mut vertices = Vec::with_capacity(n);
    for y in 0..h {
        for x in 0..w {
            vertices.push([x as f64, y as f64, 0.0]);
        }
    }
    let mut faces = Vec::with_capacity(2 * w.saturating_sub(1) * h.saturating_sub(1));
    for y in 0..h.saturating_sub(1) {
        for x in 0..w.saturating_sub(1) {
            let i = y * w + x;
            faces.push([i, i + 1, i + w]);
            faces.push([i + 1, i + w + 1, i + w]);
        }
    }

    let x_modes: Vec<(f64, Vec<f64>)> = (0..w).map(|a| path_mode(w, a)).collect();
    let y_modes: Vec<(f64, Vec<f64>)> = (0..h).map(|b| path_mode(h, b)).collect();
    let mut columns = Vec::with_capacity(n);
    for (ly, vy) in &y_modes {
        for (lx, vx) in &x_modes {
            let mut v = Vec::with_capacity(n);
            for yv in vy {
                for xv in vx {
                    v.push(xv * yv);
                }
            }
            columns.push((lx + ly, v));
        }
    }
    columns.sort_by(|a, b| a.0.total_cmp(&b.0));
    columns.truncate(k.min(n));

    Manifold::assemble(vertices, faces, Some(basis_from_columns(n, columns)))
}

/// Two triangles with no shared vertex: `{0,1,2}` and `{3,4,5}`. No basis.
pub fn disjoint_triangles() -> Manifold {
    let vertices = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [5.0, 0.0, 0.0],
        [6.0, 0.0, 0.0],
        [5.0, 1.0, 0.0],
    ];
    Manifold::assemble(vertices, vec![[0, 1, 2], [3, 4, 5]], None)
}

fn path_mode(n: usize, k: usize) -> (f64, Vec<f64>) {
    let nf = n as f64;
    let lambda = 2.0 - 2.0 * (PI * k as f64 / nf).cos();
    let c = if k == 0 {
        (1.0 / nf).sqrt()
    } else {
        (2.0 / nf).sqrt()
    };
    let v = (0..n)
        .map(|i| c * (PI * k as f64 * (i as f64 + 0.5) / nf).cos())
        .collect();
    (lambda, v)
}

fn basis_from_columns(n: usize, columns: Vec<(f64, Vec<f64>)>) -> DualBasis {
    let k = columns.len();
    let eigenvalues = DVector::from_iterator(k, columns.iter().map(|(l, _)| l.max(0.0)));
    let eigenvectors = DMatrix::from_fn(n, k, |i, j| columns[j].1[i]);
    DualBasis {
        eigenvalues,
        eigenvectors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_orthonormal(m: &Manifold) {
        let u = &m.dual().unwrap().eigenvectors;
        let gram = u.transpose() * u;
        let id = DMatrix::<f64>::identity(u.ncols(), u.ncols());
        assert_abs_diff_eq!(gram, id, epsilon = 1e-10);
    }

    #[test]
    fn test_ring_basis_complete_and_orthonormal() {
        for n in [1, 2, 3, 8, 9, 100] {
            let m = ring(n);
            assert_eq!(m.dual().unwrap().k(), n, "ring({n}) basis incomplete");
            assert_orthonormal(&m);
        }
    }

    #[test]
    fn test_ring_eigenvalues_ascending() {
        let m = ring(12);
        let l = &m.dual().unwrap().eigenvalues;
        for i in 1..l.len() {
            assert!(l[i] + 1e-12 >= l[i - 1], "eigenvalues not sorted at {i}");
        }
        assert!((l[l.len() - 1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_ring_basis_diagonalizes_cycle_laplacian() {
        let n = 10;
        let m = ring(n);
        let mut lap = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            lap[(i, i)] = 2.0;
            lap[(i, (i + 1) % n)] = -1.0;
            lap[(i, (i + n - 1) % n)] = -1.0;
        }
        let dual = m.dual().unwrap();
        let u = &dual.eigenvectors;
        let d = u.transpose() * &lap * u;
        let expected = DMatrix::from_diagonal(&dual.eigenvalues);
        assert_abs_diff_eq!(d, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_path_basis_orthonormal() {
        assert_orthonormal(&path(7));
    }

    #[test]
    fn test_grid_truncates_modes() {
        let m = grid(4, 3, 5);
        assert_eq!(m.n(), 12);
        assert_eq!(m.faces().len(), 2 * 3 * 2);
        assert_eq!(m.dual().unwrap().k(), 5);
        assert_orthonormal(&m);
    }

    #[test]
    fn test_disjoint_triangles_has_no_basis() {
        let m = disjoint_triangles();
        assert_eq!(m.n(), 6);
        assert!(m.dual().is_none());
    }
}
