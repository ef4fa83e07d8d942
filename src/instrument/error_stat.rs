use serde::{Deserialize, Serialize};

/// Counters for one error item within one shard.
///
/// Timestamps are microseconds since the Unix epoch; `0` means "never seen".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStat {
    pub count: u64,
    pub handled_count: u64,
    pub first_seen: u64,
    pub last_seen: u64,
}

impl ErrorStat {
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.handled_count == 0
    }

    /// Account one occurrence observed at `now_us`.
    pub fn record(&mut self, now_us: u64, handled: bool) {
        self.count = self.count.saturating_add(1);
        if handled {
            self.handled_count = self.handled_count.saturating_add(1);
        }
        if self.first_seen == 0 {
            self.first_seen = now_us;
        }
        self.last_seen = now_us;
    }

    /// Fold `other` into `self`: counts add, first_seen keeps the earliest
    /// non-zero value, last_seen keeps the latest.
    pub fn aggregate(&mut self, other: &ErrorStat) {
        if other.is_empty() {
            return;
        }
        self.count = self.count.saturating_add(other.count);
        self.handled_count = self.handled_count.saturating_add(other.handled_count);
        if other.first_seen != 0 && (self.first_seen == 0 || other.first_seen < self.first_seen) {
            self.first_seen = other.first_seen;
        }
        if other.last_seen > self.last_seen {
            self.last_seen = other.last_seen;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One `ErrorStat` per item index of a single error class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorStatArray {
    stats: Vec<ErrorStat>,
}

impl ErrorStatArray {
    pub fn new(items: usize) -> Self {
        Self { stats: vec![ErrorStat::default(); items] }
    }

    pub fn len(&self) -> usize { self.stats.len() }
    pub fn is_empty(&self) -> bool { self.stats.is_empty() }

    pub fn get(&self, item: usize) -> Option<&ErrorStat> { self.stats.get(item) }
    pub fn get_mut(&mut self, item: usize) -> Option<&mut ErrorStat> { self.stats.get_mut(item) }

    pub fn aggregate(&mut self, other: &ErrorStatArray) {
        for (mine, theirs) in self.stats.iter_mut().zip(other.stats.iter()) {
            mine.aggregate(theirs);
        }
    }

    pub fn reset(&mut self) {
        self.stats.iter_mut().for_each(ErrorStat::reset);
    }
}

/// Per-class stat arrays held by a single shard entry (a thread, an account, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorStats {
    classes: Vec<ErrorStatArray>,
}

impl ErrorStats {
    pub fn with_layout(items_per_class: &[usize]) -> Self {
        Self { classes: items_per_class.iter().map(|&n| ErrorStatArray::new(n)).collect() }
    }

    pub fn stat(&self, class: usize, item: usize) -> Option<&ErrorStat> {
        self.classes.get(class).and_then(|a| a.get(item))
    }

    pub fn stat_mut(&mut self, class: usize, item: usize) -> Option<&mut ErrorStat> {
        self.classes.get_mut(class).and_then(|a| a.get_mut(item))
    }

    pub fn class(&self, class: usize) -> Option<&ErrorStatArray> { self.classes.get(class) }

    pub fn aggregate(&mut self, other: &ErrorStats) {
        for (mine, theirs) in self.classes.iter_mut().zip(other.classes.iter()) {
            mine.aggregate(theirs);
        }
    }

    pub fn reset(&mut self) {
        self.classes.iter_mut().for_each(ErrorStatArray::reset);
    }

    /// Sum of `count` across every class and item.
    pub fn total_count(&self) -> u64 {
        self.classes
            .iter()
            .flat_map(|a| a.stats.iter())
            .fold(0u64, |acc, s| acc.saturating_add(s.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_keeps_earliest_first_and_latest_last() {
        let mut a = ErrorStat { count: 2, handled_count: 1, first_seen: 50, last_seen: 90 };
        let b = ErrorStat { count: 3, handled_count: 0, first_seen: 20, last_seen: 70 };
        a.aggregate(&b);
        assert_eq!(a, ErrorStat { count: 5, handled_count: 1, first_seen: 20, last_seen: 90 });
    }

    #[test]
    fn aggregate_into_empty_takes_other_timestamps() {
        let mut a = ErrorStat::default();
        a.aggregate(&ErrorStat { count: 1, handled_count: 1, first_seen: 7, last_seen: 7 });
        assert_eq!(a.first_seen, 7);
        assert_eq!(a.last_seen, 7);
    }

    #[test]
    fn aggregate_ignores_empty_other() {
        let mut a = ErrorStat { count: 1, handled_count: 0, first_seen: 10, last_seen: 10 };
        a.aggregate(&ErrorStat::default());
        assert_eq!(a.first_seen, 10);
        assert_eq!(a.count, 1);
    }

    #[test]
    fn record_sets_first_seen_once() {
        let mut s = ErrorStat::default();
        s.record(100, false);
        s.record(250, true);
        assert_eq!(s, ErrorStat { count: 2, handled_count: 1, first_seen: 100, last_seen: 250 });
    }

    #[test]
    fn stats_layout_bounds() {
        let mut stats = ErrorStats::with_layout(&[3, 0]);
        assert!(stats.stat(0, 2).is_some());
        assert!(stats.stat(0, 3).is_none());
        assert!(stats.stat(1, 0).is_none());
        assert!(stats.stat(2, 0).is_none());
        stats.stat_mut(0, 1).unwrap().record(5, false);
        assert_eq!(stats.total_count(), 1);
        stats.reset();
        assert_eq!(stats.total_count(), 0);
    }
}
