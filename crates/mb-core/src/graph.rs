//! Mesh → graph adapter and the shortest-path queries brushes need.
//!
//! Edges come from triangle sides. Weighted graphs use Euclidean edge length,
//! unweighted graphs use 1 per edge, so distances become hop counts.
//! Degenerate faces are allowed; self-edges are dropped.

use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Bfs, EdgeRef};
use tracing::debug;

use crate::error::{BrushError, Result};
use crate::manifold::{Field, Manifold, ManifoldId};

/// Undirected weighted adjacency over the manifold's vertices.
/// Node `i` of the inner graph is vertex `i` of the mesh.
#[derive(Clone, Debug)]
pub struct MeshGraph {
    graph: UnGraph<(), f64>,
}

/// Build the vertex graph of `manifold`.
pub fn build_graph(manifold: &Manifold, use_weighted: bool) -> MeshGraph {
    let n = manifold.n();
    let mut graph = UnGraph::<(), f64>::with_capacity(n, manifold.faces().len() * 3);
    for _ in 0..n {
        graph.add_node(());
    }

    for face in manifold.faces() {
        for (a, b) in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
            if a == b {
                continue;
            }
            let weight = if use_weighted {
                manifold.edge_length(a, b)
            } else {
                1.0
            };
            // Shared edges between adjacent faces collapse into one
            graph.update_edge(NodeIndex::new(a), NodeIndex::new(b), weight);
        }
    }

    MeshGraph { graph }
}

impl MeshGraph {
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node(&self, vertex: usize) -> Option<NodeIndex> {
        (vertex < self.vertex_count()).then(|| NodeIndex::new(vertex))
    }

    /// Single-source Dijkstra. Unreachable vertices get `f64::INFINITY`.
    /// `None` if `source` is not a vertex.
    pub fn distances_from(&self, source: usize) -> Option<Vec<f64>> {
        let start = self.node(source)?;
        let mut out = vec![f64::INFINITY; self.vertex_count()];
        for (node, d) in dijkstra(&self.graph, start, None, |e| *e.weight()) {
            out[node.index()] = d;
        }
        Some(out)
    }

    /// Minimum-weight vertex sequence from `source` to `target`, inclusive.
    /// `None` when the two are in different components or either is not a vertex.
    pub fn shortest_path(&self, source: usize, target: usize) -> Option<Vec<usize>> {
        let start = self.node(source)?;
        let goal = self.node(target)?;
        astar(&self.graph, start, |n| n == goal, |e| *e.weight(), |_| 0.0)
            .map(|(_, path)| path.into_iter().map(|n| n.index()).collect())
    }

    /// Membership mask of the connected component containing `source`.
    /// Breadth-first, ignores edge weights. `None` if `source` is not a vertex.
    pub fn component_mask(&self, source: usize) -> Option<Vec<bool>> {
        let start = self.node(source)?;
        let mut mask = vec![false; self.vertex_count()];
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            mask[node.index()] = true;
        }
        Some(mask)
    }
}

/// Lazily built graph, reused until the manifold id or weighting changes.
///
/// Owned by a single brush. Seeds move every interaction tick while the mesh
/// stays put, so the rebuild count should stay at one per manifold.
#[derive(Clone, Debug, Default)]
pub struct GraphCache {
    key: Option<(ManifoldId, bool)>,
    graph: Option<MeshGraph>,
    builds: usize,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph for `manifold`, building it on first use or after invalidation.
    pub fn get(&mut self, manifold: &Manifold, use_weighted: bool) -> &MeshGraph {
        let key = (manifold.id(), use_weighted);
        if self.key != Some(key) {
            self.graph = None;
            self.key = Some(key);
        }
        let builds = &mut self.builds;
        self.graph.get_or_insert_with(|| {
            *builds += 1;
            debug!(
                manifold = manifold.id().get(),
                vertices = manifold.n(),
                use_weighted,
                "building mesh graph"
            );
            build_graph(manifold, use_weighted)
        })
    }

    /// How many times a graph has been built. Used to verify cache reuse.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.graph = None;
    }
}

/// Per-vertex distance from a source vertex.
///
/// Exact geodesics are out of scope; [`GraphDistance`] answers with graph
/// shortest paths. Hosts with a real geodesic solver can plug it in here.
pub trait DistanceQuery {
    fn distances(&mut self, manifold: &Manifold, source: usize) -> Result<Field>;
}

/// Shortest-path approximation of surface distance over mesh edges.
#[derive(Clone, Debug)]
pub struct GraphDistance {
    cache: GraphCache,
    use_weighted: bool,
}

impl GraphDistance {
    pub fn new(use_weighted: bool) -> Self {
        Self {
            cache: GraphCache::new(),
            use_weighted,
        }
    }

    pub fn cache(&self) -> &GraphCache {
        &self.cache
    }
}

impl Default for GraphDistance {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DistanceQuery for GraphDistance {
    fn distances(&mut self, manifold: &Manifold, source: usize) -> Result<Field> {
        manifold.check_vertex(source)?;
        let n = manifold.n();
        self.cache
            .get(manifold, self.use_weighted)
            .distances_from(source)
            .map(Field::from_vec)
            .ok_or(BrushError::VertexOutOfRange { index: source, n })
    }
}
