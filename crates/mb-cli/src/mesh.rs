use std::fmt;
use std::str::FromStr;

use mb_core::{Manifold, demo};

/// Dense bases are `n × k`; keep the demo meshes small enough to hold one.
pub const MAX_VERTICES: usize = 2048;

/// Modes kept for grid meshes.
pub const GRID_MODES: usize = 64;

/// Demo mesh named on the command line: `ring:N`, `path:N`, `grid:WxH` or
/// `triangles`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshSpec {
    Ring(usize),
    Path(usize),
    Grid { w: usize, h: usize },
    Triangles,
}

impl MeshSpec {
    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Ring(n) | Self::Path(n) => *n,
            Self::Grid { w, h } => w * h,
            Self::Triangles => 6,
        }
    }

    pub fn build(&self) -> Manifold {
        match *self {
            Self::Ring(n) => demo::ring(n),
            Self::Path(n) => demo::path(n),
            Self::Grid { w, h } => demo::grid(w, h, GRID_MODES.min(w * h)),
            Self::Triangles => demo::disjoint_triangles(),
        }
    }
}

fn parse_count(kind: &str, raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid {kind} size '{raw}'"))
}

impl FromStr for MeshSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = match s.split_once(':') {
            None if s == "triangles" => Self::Triangles,
            Some(("ring", n)) => Self::Ring(parse_count("ring", n)?),
            Some(("path", n)) => Self::Path(parse_count("path", n)?),
            Some(("grid", dims)) => {
                let (w, h) = dims
                    .split_once(['x', 'X'])
                    .ok_or_else(|| format!("grid size must look like WxH, got '{dims}'"))?;
                Self::Grid {
                    w: parse_count("grid", w)?,
                    h: parse_count("grid", h)?,
                }
            }
            _ => {
                return Err(format!(
                    "unknown mesh '{s}' (expected ring:N, path:N, grid:WxH or triangles)"
                ));
            }
        };

        let n = spec.vertex_count();
        if matches!(spec, Self::Ring(_)) && n < 3 {
            return Err(format!("ring needs at least 3 vertices, got {n}"));
        }
        if n == 0 {
            return Err("mesh must have at least one vertex".into());
        }
        if n > MAX_VERTICES {
            return Err(format!("mesh has {n} vertices, limit is {MAX_VERTICES}"));
        }
        Ok(spec)
    }
}

impl fmt::Display for MeshSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ring(n) => write!(f, "ring:{n}"),
            Self::Path(n) => write!(f, "path:{n}"),
            Self::Grid { w, h } => write!(f, "grid:{w}x{h}"),
            Self::Triangles => f.write_str("triangles"),
        }
    }
}
