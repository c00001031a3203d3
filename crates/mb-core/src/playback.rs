//! Step-wise playback of a trajectory brush.
//!
//! A playback is an explicit, pausable fold over the trajectory path: each
//! [`tick`](TrajectoryPlayback::tick) evaluates the base brush at the next
//! path vertex and adds it to a running total. The host drives the clock.
//! Once every vertex has been visited the field equals
//! [`TrajectoryBrush::evaluate`](crate::brush::ManifoldBrush::evaluate) for
//! the same source.

use tracing::debug;

use crate::brush::{ManifoldBrush, TrajectoryBrush};
use crate::error::Result;
use crate::manifold::{Field, Manifold, normalize_max_abs};

#[derive(Clone, Debug, Default)]
pub struct TrajectoryPlayback {
    path: Vec<usize>,
    cursor: usize,
    accumulated: Option<Field>,
    weight: f64,
    running: bool,
}

impl TrajectoryPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the path from `source` to the brush's target and rewind.
    /// On error the previous playback state is kept.
    pub fn start(
        &mut self,
        brush: &mut TrajectoryBrush,
        manifold: &Manifold,
        source: usize,
    ) -> Result<()> {
        let path = brush.get_path(manifold, source)?;
        debug!(source, steps = path.len(), "trajectory playback started");
        self.path = path;
        self.cursor = 0;
        self.accumulated = Some(Field::zeros(manifold.n()));
        self.weight = brush.weight();
        self.running = true;
        Ok(())
    }

    /// Advance one path vertex. Returns the field so far, or `None` when
    /// stopped or already finished.
    pub fn tick(
        &mut self,
        brush: &mut TrajectoryBrush,
        manifold: &Manifold,
    ) -> Result<Option<Field>> {
        if !self.running || self.is_finished() {
            return Ok(None);
        }
        let step = brush.evaluate_at_path_index(manifold, &self.path, self.cursor)?;
        if let Some(total) = self.accumulated.as_mut() {
            *total += step;
        }
        self.cursor += 1;
        if self.is_finished() {
            self.running = false;
            debug!(steps = self.path.len(), "trajectory playback finished");
        }
        Ok(self.field())
    }

    /// Halt playback. Safe to call any number of times.
    pub fn stop(&mut self) {
        if self.running {
            debug!(at = self.cursor, of = self.path.len(), "trajectory playback stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.accumulated.is_some() && self.cursor >= self.path.len()
    }

    /// Fraction of the path visited, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.path.is_empty() {
            return 0.0;
        }
        self.cursor as f64 / self.path.len() as f64
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Accumulated field, normalized to unit peak and scaled by the brush
    /// weight captured at [`start`](Self::start).
    pub fn field(&self) -> Option<Field> {
        self.accumulated
            .as_ref()
            .map(|total| normalize_max_abs(total.clone()) * self.weight)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::brush::DeltaBrush;
    use crate::demo;
    use crate::error::BrushError;

    fn delta_trajectory(target: usize) -> TrajectoryBrush {
        TrajectoryBrush::new(Some(target))
            .with_base(DeltaBrush::new().into())
            .with_weighted(false)
    }

    #[test]
    fn test_ticks_reach_full_trajectory() {
        let m = demo::path(6);
        let mut brush = delta_trajectory(4).with_weight(2.0);
        let mut playback = TrajectoryPlayback::new();
        playback.start(&mut brush, &m, 1).unwrap();
        assert_eq!(playback.path(), &[1, 2, 3, 4]);

        let mut last = None;
        while let Some(f) = playback.tick(&mut brush, &m).unwrap() {
            last = Some(f);
        }
        assert!(playback.is_finished());
        assert!(!playback.is_running());
        assert_eq!(playback.progress(), 1.0);

        let full = brush.evaluate(&m, Some(1)).unwrap();
        assert_abs_diff_eq!(last.unwrap(), full, epsilon = 1e-12);
    }

    #[test]
    fn test_partial_progress() {
        let m = demo::path(5);
        let mut brush = delta_trajectory(4);
        let mut playback = TrajectoryPlayback::new();
        playback.start(&mut brush, &m, 0).unwrap();
        playback.tick(&mut brush, &m).unwrap();
        let f = playback.tick(&mut brush, &m).unwrap().unwrap();
        assert_eq!(f.as_slice(), &[1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(playback.progress(), 0.4);
        assert!(playback.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let m = demo::path(5);
        let mut brush = delta_trajectory(4);
        let mut playback = TrajectoryPlayback::new();
        playback.stop();
        playback.start(&mut brush, &m, 0).unwrap();
        playback.tick(&mut brush, &m).unwrap();
        playback.stop();
        playback.stop();
        assert!(!playback.is_running());
        assert_eq!(playback.tick(&mut brush, &m).unwrap(), None);
        // Field so far survives a stop
        assert_eq!(playback.field().unwrap()[0], 1.0);
    }

    #[test]
    fn test_tick_before_start() {
        let m = demo::path(3);
        let mut brush = delta_trajectory(2);
        let mut playback = TrajectoryPlayback::new();
        assert_eq!(playback.tick(&mut brush, &m).unwrap(), None);
        assert!(!playback.is_finished());
        assert_eq!(playback.progress(), 0.0);
    }

    #[test]
    fn test_failed_start_keeps_state() {
        let m = demo::disjoint_triangles();
        let mut brush = delta_trajectory(1);
        let mut playback = TrajectoryPlayback::new();
        playback.start(&mut brush, &m, 0).unwrap();

        brush.set_target(Some(4));
        assert_eq!(
            playback.start(&mut brush, &m, 0),
            Err(BrushError::NoPathFound { from: 0, to: 4 })
        );
        assert_eq!(playback.path(), &[0, 1]);
        assert!(playback.is_running());
    }
}
