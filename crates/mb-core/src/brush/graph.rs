use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ManifoldBrush;
use crate::error::{BrushError, Result};
use crate::graph::GraphCache;
use crate::manifold::{Field, Manifold};

/// How a [`GraphBrush`] decides which vertices it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Shortest-path distance from the seed at most `k`.
    #[default]
    KNeighbors,
    /// Shortest-path distance from the seed at most `distance_threshold`.
    Distance,
    /// The seed's whole connected component.
    Component,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KNeighbors => "k_neighbors",
            Self::Distance => "distance",
            Self::Component => "component",
        }
    }
}

impl FromStr for SelectionMode {
    type Err = BrushError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "k_neighbors" | "kneighbors" => Ok(Self::KNeighbors),
            "distance" => Ok(Self::Distance),
            "component" => Ok(Self::Component),
            _ => Err(BrushError::InvalidSelectionMode(s.to_string())),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator brush over a graph neighborhood of the seed.
///
/// The mesh graph is built on first use and kept until a different manifold
/// (or weighting) shows up; moving the seed never rebuilds it.
#[derive(Clone, Debug)]
pub struct GraphBrush {
    mode: SelectionMode,
    k: usize,
    distance_threshold: f64,
    use_weighted: bool,
    weight: f64,
    cache: GraphCache,
}

impl GraphBrush {
    pub fn new() -> Self {
        Self {
            mode: SelectionMode::default(),
            k: 1,
            distance_threshold: 1.0,
            use_weighted: true,
            weight: 1.0,
            cache: GraphCache::new(),
        }
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_distance_threshold(mut self, threshold: f64) -> Self {
        self.distance_threshold = threshold;
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

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn set_k(&mut self, k: usize) {
        self.k = k;
    }

    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    pub fn set_distance_threshold(&mut self, threshold: f64) {
        self.distance_threshold = threshold;
    }

    pub fn use_weighted(&self) -> bool {
        self.use_weighted
    }

    pub fn set_use_weighted(&mut self, use_weighted: bool) {
        self.use_weighted = use_weighted;
    }

    pub fn cache(&self) -> &GraphCache {
        &self.cache
    }
}

impl Default for GraphBrush {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifoldBrush for GraphBrush {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn evaluate_core(&mut self, manifold: &Manifold, seed: Option<usize>) -> Result<Field> {
        let seed = seed.ok_or(BrushError::MissingSeed)?;
        manifold.check_vertex(seed)?;
        let out_of_range = BrushError::VertexOutOfRange {
            index: seed,
            n: manifold.n(),
        };
        let graph = self.cache.get(manifold, self.use_weighted);

        let limit = match self.mode {
            SelectionMode::KNeighbors => self.k as f64,
            SelectionMode::Distance => self.distance_threshold,
            SelectionMode::Component => {
                let mask = graph.component_mask(seed).ok_or(out_of_range)?;
                return Ok(indicator(mask.into_iter()));
            }
        };
        let distances = graph.distances_from(seed).ok_or(out_of_range)?;
        Ok(indicator(distances.into_iter().map(|d| d <= limit)))
    }
}

fn indicator(mask: impl ExactSizeIterator<Item = bool>) -> Field {
    let n = mask.len();
    Field::from_iterator(n, mask.map(|inside| if inside { 1.0 } else { 0.0 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;

    fn support(f: &Field) -> Vec<usize> {
        f.iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_distance_threshold_on_unit_path() {
        let m = demo::path(5);
        let mut brush = GraphBrush::new()
            .with_mode(SelectionMode::Distance)
            .with_distance_threshold(2.0)
            .with_weighted(false);
        let f = brush.evaluate(&m, Some(0)).unwrap();
        assert_eq!(support(&f), vec![0, 1, 2]);
    }

    #[test]
    fn test_k_neighbors_counts_hops() {
        let m = demo::path(7);
        let mut brush = GraphBrush::new().with_k(2).with_weighted(false);
        let f = brush.evaluate(&m, Some(3)).unwrap();
        assert_eq!(support(&f), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_k_zero_is_seed_only() {
        let m = demo::path(4);
        let f = GraphBrush::new().with_k(0).evaluate(&m, Some(2)).unwrap();
        assert_eq!(support(&f), vec![2]);
    }

    #[test]
    fn test_component_ignores_distance() {
        let m = demo::disjoint_triangles();
        let mut brush = GraphBrush::new()
            .with_mode(SelectionMode::Component)
            .with_k(0)
            .with_distance_threshold(0.0);
        let f = brush.evaluate(&m, Some(5)).unwrap();
        assert_eq!(support(&f), vec![3, 4, 5]);
    }

    #[test]
    fn test_weight_scales_indicator() {
        let m = demo::path(3);
        let f = GraphBrush::new()
            .with_k(5)
            .with_weight(0.5)
            .evaluate(&m, Some(0))
            .unwrap();
        assert!(f.iter().all(|v| *v == 0.5));
    }

    #[test]
    fn test_graph_cached_across_seeds() {
        let m = demo::path(6);
        let mut brush = GraphBrush::new();
        for seed in 0..6 {
            brush.evaluate(&m, Some(seed)).unwrap();
        }
        assert_eq!(brush.cache().build_count(), 1);

        let replacement = demo::path(6);
        brush.evaluate(&replacement, Some(0)).unwrap();
        assert_eq!(brush.cache().build_count(), 2);
    }

    #[test]
    fn test_missing_seed() {
        let m = demo::path(3);
        assert_eq!(
            GraphBrush::new().evaluate(&m, None),
            Err(BrushError::MissingSeed)
        );
    }

    #[test]
    fn test_selection_mode_parse() {
        assert_eq!(
            "k_neighbors".parse::<SelectionMode>().unwrap(),
            SelectionMode::KNeighbors
        );
        assert_eq!(
            "component".parse::<SelectionMode>().unwrap(),
            SelectionMode::Component
        );
        assert_eq!(
            "radial".parse::<SelectionMode>(),
            Err(BrushError::InvalidSelectionMode("radial".into()))
        );
        assert_eq!(SelectionMode::Distance.to_string(), "distance");
    }
}
