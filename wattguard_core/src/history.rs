//! Fixed-capacity sample ring and the short-window averager.
//!
//! The ring is a boxed slice allocated once, plus a write head and a fill
//! count. Callers only see `record` and `recent(k)`; `recent` returns a
//! borrowed, restartable iterator ordered newest first.

use crate::sample::{Metrics, Sample};

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    slots: Box<[Sample]>,
    // Index the next sample is written to.
    head: usize,
    len: usize,
}

impl HistoryBuffer {
    /// Create a ring holding `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Sample::default(); capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a sample, overwriting the oldest once full. O(1).
    pub fn record(&mut self, sample: Sample) {
        self.slots[self.head] = sample;
        self.head = (self.head + 1) % self.slots.len();
        if self.len < self.slots.len() {
            self.len += 1;
        }
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.recent(1).next()
    }

    /// Up to `k` most recent samples, newest first.
    pub fn recent(&self, k: usize) -> Recent<'_> {
        Recent {
            buf: self,
            front: 0,
            back: k.min(self.len),
        }
    }

    /// All stored samples, oldest first.
    pub fn chronological(&self) -> std::iter::Rev<Recent<'_>> {
        self.recent(self.len).rev()
    }

    // `age` 0 is the newest sample; caller guarantees `age < len`.
    fn nth_newest(&self, age: usize) -> &Sample {
        let cap = self.slots.len();
        &self.slots[(self.head + cap - 1 - age) % cap]
    }
}

/// Iterator over the most recent samples, newest first.
#[derive(Debug, Clone)]
pub struct Recent<'a> {
    buf: &'a HistoryBuffer,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Recent<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let s = self.buf.nth_newest(self.front);
        self.front += 1;
        Some(s)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Recent<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.buf.nth_newest(self.back))
    }
}

impl ExactSizeIterator for Recent<'_> {}

/// Arithmetic mean of each metric over a sample sequence; `None` when empty.
pub fn mean_of<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Option<Metrics> {
    let mut sum = Metrics::ZERO;
    let mut n = 0u32;
    for s in samples {
        sum = sum + s.metrics();
        n += 1;
    }
    if n == 0 {
        return None;
    }
    let n = n as f32;
    Some(sum.map(|v| v / n))
}

/// Mean of the most recent `window` samples.
#[derive(Debug, Clone, Copy)]
pub struct ShortWindowAverager {
    window: usize,
}

impl ShortWindowAverager {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Mean over `recent(window)`. Uses fewer samples while the ring fills;
    /// falls back to `instant` when nothing has been recorded yet.
    pub fn mean(&self, history: &HistoryBuffer, instant: &Sample) -> Metrics {
        mean_of(history.recent(self.window)).unwrap_or_else(|| instant.metrics())
    }
}
