//! Bounded, cursor-addressed trajectory history.
use std::collections::VecDeque;
use std::time::Instant;

use livestate_traits::{MotionType, Pose};

use crate::compress::Record;

/// One recorded tool-tip position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub pose: Pose,
    pub motion_type: MotionType,
    pub timestamp: Instant,
}

/// Answer to "what was recorded after cursor C".
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryDelta {
    /// The requested cursor predates the oldest retained entry; `points`
    /// start from the oldest retained entry instead.
    pub was_reset: bool,
    pub cursor: u64,
    pub points: Vec<PositionSample>,
    pub count: usize,
}

/// Ring of samples plus the cursor bookkeeping.
///
/// `cursor` counts appended entries over the buffer's lifetime and never goes
/// back. `oldest_cursor` is the lowest cursor value a reader may still resume
/// from; anything below it is stale.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffer {
    samples: VecDeque<PositionSample>,
    max_history: usize,
    cursor: u64,
    oldest_cursor: u64,
}

impl TrajectoryBuffer {
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            samples: VecDeque::with_capacity(max_history.min(4096)),
            max_history,
            cursor: 0,
            oldest_cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn oldest_cursor(&self) -> u64 {
        self.oldest_cursor
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn last(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    /// Change capacity, evicting immediately if the buffer is now over it.
    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history.max(1);
        self.evict();
    }

    /// Drop everything; every cursor handed out so far becomes stale.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.oldest_cursor = self.cursor + 1;
    }

    pub fn apply(&mut self, record: Record) {
        match record {
            Record::Skip => {}
            Record::Append(s) => self.push(s),
            Record::Merge(s) => self.overwrite_last(s),
            // Only the bootstrap pair may be discarded; older history from a
            // previous run stays and the sample is merged instead.
            Record::Collapse(s) if self.samples.len() <= 2 => {
                self.clear();
                self.push(s);
            }
            Record::Collapse(s) => self.overwrite_last(s),
        }
        self.check_invariant();
    }

    fn push(&mut self, s: PositionSample) {
        self.samples.push_back(s);
        self.cursor += 1;
        self.evict();
    }

    fn overwrite_last(&mut self, s: PositionSample) {
        match self.samples.back_mut() {
            Some(last) => *last = s,
            None => self.push(s),
        }
    }

    fn evict(&mut self) {
        if self.samples.len() > self.max_history {
            let excess = self.samples.len() - self.max_history;
            self.samples.drain(..excess);
            self.oldest_cursor += excess as u64;
        }
    }

    fn check_invariant(&self) {
        debug_assert!(
            self.samples.is_empty()
                || self.oldest_cursor + self.samples.len() as u64 <= self.cursor + 1,
            "oldest_cursor {} too far ahead of cursor {} for {} entries",
            self.oldest_cursor,
            self.cursor,
            self.samples.len()
        );
    }

    pub fn delta_since(&self, since: u64) -> TrajectoryDelta {
        let was_reset = since < self.oldest_cursor;
        // A stale reader resyncs from everything retained. Without a clear this
        // equals `cursor - oldest_cursor`; after one it also covers the first
        // entry recorded since.
        let count = if was_reset {
            self.samples.len()
        } else {
            usize::try_from(self.cursor.saturating_sub(since))
                .unwrap_or(usize::MAX)
                .min(self.samples.len())
        };
        let points = self
            .samples
            .iter()
            .skip(self.samples.len() - count)
            .copied()
            .collect();
        TrajectoryDelta {
            was_reset,
            cursor: self.cursor,
            points,
            count,
        }
    }

    /// Entries `[start, start + count)`, both clamped to the buffer. `None`
    /// means "to the end".
    pub fn history(&self, start: usize, count: Option<usize>) -> Vec<PositionSample> {
        let start = start.min(self.samples.len());
        let available = self.samples.len() - start;
        let count = count.map_or(available, |c| c.min(available));
        self.samples.range(start..start + count).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(x: f64) -> PositionSample {
        PositionSample {
            pose: Pose::xyz(x, 0.0, 0.0),
            motion_type: MotionType::Feed,
            timestamp: Instant::now(),
        }
    }

    fn xs(v: &[PositionSample]) -> Vec<f64> {
        v.iter().map(|p| p.pose.x).collect()
    }

    #[test]
    fn starts_empty_at_cursor_zero() {
        let b = TrajectoryBuffer::new(10);
        assert_eq!((b.cursor(), b.oldest_cursor(), b.len()), (0, 0, 0));
        let d = b.delta_since(0);
        assert!(!d.was_reset);
        assert_eq!(d.count, 0);
    }

    #[test]
    fn merge_overwrites_without_moving_cursor() {
        let mut b = TrajectoryBuffer::new(10);
        b.apply(Record::Append(s(1.0)));
        b.apply(Record::Append(s(2.0)));
        b.apply(Record::Append(s(3.0)));
        b.apply(Record::Merge(s(4.0)));
        assert_eq!(b.cursor(), 3);
        assert_eq!(xs(&b.history(0, None)), [1.0, 2.0, 4.0]);
    }

    #[test]
    fn collapse_restarts_only_a_bootstrap_pair() {
        let mut b = TrajectoryBuffer::new(10);
        b.apply(Record::Append(s(1.0)));
        b.apply(Record::Append(s(2.0)));
        b.apply(Record::Collapse(s(3.0)));
        assert_eq!(xs(&b.history(0, None)), [3.0]);
        assert_eq!((b.cursor(), b.oldest_cursor()), (3, 3));

        // With older history in front, collapse degrades to a merge.
        b.apply(Record::Append(s(4.0)));
        b.apply(Record::Append(s(5.0)));
        b.apply(Record::Collapse(s(6.0)));
        assert_eq!(xs(&b.history(0, None)), [3.0, 4.0, 6.0]);
        assert_eq!(b.cursor(), 5);
    }

    #[test]
    fn eviction_is_batched_and_accounted() {
        let mut b = TrajectoryBuffer::new(5);
        for i in 0..5 {
            b.apply(Record::Append(s(f64::from(i))));
        }
        b.set_max_history(2);
        assert_eq!(b.len(), 2);
        assert_eq!(b.oldest_cursor(), 3);
        assert_eq!(xs(&b.history(0, None)), [3.0, 4.0]);
    }

    #[test]
    fn clear_makes_every_prior_cursor_stale() {
        let mut b = TrajectoryBuffer::new(10);
        b.apply(Record::Append(s(1.0)));
        b.apply(Record::Append(s(2.0)));
        b.clear();
        for c in 0..=2 {
            assert!(b.delta_since(c).was_reset);
        }
        assert!(!b.delta_since(3).was_reset);
        b.apply(Record::Append(s(9.0)));
        let d = b.delta_since(0);
        assert!(d.was_reset);
        assert_eq!(xs(&d.points), [9.0]);
    }

    #[test]
    fn history_clamps_start_and_count() {
        let mut b = TrajectoryBuffer::new(10);
        for i in 0..4 {
            b.apply(Record::Append(s(f64::from(i))));
        }
        assert_eq!(xs(&b.history(1, Some(2))), [1.0, 2.0]);
        assert_eq!(xs(&b.history(3, Some(99))), [3.0]);
        assert!(b.history(10, None).is_empty());
        assert!(b.history(0, Some(0)).is_empty());
    }

    #[test]
    fn future_cursor_yields_nothing() {
        let mut b = TrajectoryBuffer::new(10);
        b.apply(Record::Append(s(1.0)));
        let d = b.delta_since(50);
        assert!(!d.was_reset);
        assert_eq!(d.count, 0);
        assert_eq!(d.cursor, 1);
    }
}
