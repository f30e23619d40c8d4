use std::time::Duration;

/// Handle to a scheduled continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    generation: u64,
    seq: u64,
}

#[derive(Debug, Clone)]
struct Pending<K> {
    id: TimerId,
    due_ms: u64,
    kind: K,
}

/// Single-shot continuations on a session-local clock.
///
/// The clock only moves through [`Timers::advance`], so a session driven by
/// ticks is fully deterministic. [`Timers::reset`] drops everything pending and
/// starts a new generation: a handle from an earlier generation never fires and
/// can no longer be cancelled into the current one.
#[derive(Debug, Clone)]
pub struct Timers<K> {
    clock_ms: u64,
    generation: u64,
    next_seq: u64,
    pending: Vec<Pending<K>>,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self {
            clock_ms: 0,
            generation: 0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<K: Copy> Timers<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn schedule(&mut self, delay: Duration, kind: K) -> TimerId {
        let id = TimerId {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.push(Pending {
            id,
            due_ms: self.clock_ms + delay.as_millis() as u64,
            kind,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        before != self.pending.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancel everything and open a new generation.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.generation += 1;
    }

    pub fn advance(&mut self, dt: Duration) {
        self.clock_ms += dt.as_millis() as u64;
    }

    /// Move the clock forward to `deadline_ms`, stopping early at the first
    /// continuation due on the way. The clock then reads that continuation's
    /// due time, so anything it schedules is measured from the right instant.
    pub fn pop_until(&mut self, deadline_ms: u64) -> Option<K> {
        let next_due = self
            .pending
            .iter()
            .filter(|p| p.id.generation == self.generation)
            .map(|p| p.due_ms)
            .min();
        match next_due {
            Some(due) if due <= deadline_ms => {
                self.clock_ms = self.clock_ms.max(due);
                self.pop_due()
            }
            _ => {
                self.clock_ms = self.clock_ms.max(deadline_ms);
                None
            }
        }
    }

    /// Remove and return the earliest continuation that is due.
    ///
    /// Callers drain one at a time so a continuation that cancels or resets
    /// takes effect before the next one is considered.
    pub fn pop_due(&mut self) -> Option<K> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due_ms <= self.clock_ms && p.id.generation == self.generation)
            .min_by_key(|(_, p)| (p.due_ms, p.id.seq))
            .map(|(idx, _)| idx)?;
        Some(self.pending.remove(idx).kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Kind {
        A,
        B,
        C,
    }

    #[test]
    fn fires_in_due_order() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_millis(300), Kind::A);
        timers.schedule(Duration::from_millis(100), Kind::B);
        timers.schedule(Duration::from_millis(100), Kind::C);

        assert_eq!(timers.pop_due(), None);

        timers.advance(Duration::from_millis(100));
        assert_eq!(timers.pop_due(), Some(Kind::B));
        assert_eq!(timers.pop_due(), Some(Kind::C));
        assert_eq!(timers.pop_due(), None);

        timers.advance(Duration::from_millis(250));
        assert_eq!(timers.pop_due(), Some(Kind::A));
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn cancel_removes_a_single_timer() {
        let mut timers = Timers::new();
        let a = timers.schedule(Duration::from_millis(10), Kind::A);
        timers.schedule(Duration::from_millis(10), Kind::B);

        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert!(!timers.is_pending(a));

        timers.advance(Duration::from_millis(10));
        assert_eq!(timers.pop_due(), Some(Kind::B));
        assert_eq!(timers.pop_due(), None);
    }

    #[test]
    fn reset_drops_pending_and_keeps_clock() {
        let mut timers = Timers::new();
        timers.advance(Duration::from_millis(50));
        let stale = timers.schedule(Duration::from_millis(10), Kind::A);

        timers.reset();
        assert_eq!(timers.now_ms(), 50);
        assert_eq!(timers.generation(), 1);

        let fresh = timers.schedule(Duration::from_millis(10), Kind::B);
        assert_ne!(stale, fresh);
        assert!(!timers.cancel(stale));

        timers.advance(Duration::from_millis(100));
        assert_eq!(timers.pop_due(), Some(Kind::B));
        assert_eq!(timers.pop_due(), None);
    }

    #[test]
    fn pop_until_stops_at_each_due_time() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_millis(100), Kind::A);
        timers.schedule(Duration::from_millis(400), Kind::B);

        assert_eq!(timers.pop_until(1_000), Some(Kind::A));
        assert_eq!(timers.now_ms(), 100);
        timers.schedule(Duration::from_millis(50), Kind::C);

        assert_eq!(timers.pop_until(1_000), Some(Kind::C));
        assert_eq!(timers.now_ms(), 150);
        assert_eq!(timers.pop_until(1_000), Some(Kind::B));
        assert_eq!(timers.pop_until(1_000), None);
        assert_eq!(timers.now_ms(), 1_000);
    }

    #[test]
    fn zero_delay_fires_on_next_drain() {
        let mut timers = Timers::new();
        timers.schedule(Duration::ZERO, Kind::C);
        assert_eq!(timers.pop_due(), Some(Kind::C));
    }
}
