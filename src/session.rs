use std::time::Duration;

use crate::game::{CueKind, FeedbackKind, FeedbackTarget, GameEvent, SessionStatus};
use crate::record::Record;
use crate::timer::{TimerId, Timers};

/// State every game session carries regardless of its rules.
///
/// `K` is the game's own continuation type.
#[derive(Debug, Clone)]
pub struct SessionCore<K> {
    pub status: SessionStatus,
    pub timers: Timers<K>,
    pub error_count: u32,
    /// Session clock reading when the current run started.
    pub started_at_ms: Option<u64>,
    events: Vec<GameEvent>,
}

impl<K> Default for SessionCore<K> {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            timers: Timers::default(),
            error_count: 0,
            started_at_ms: None,
            events: Vec::new(),
        }
    }
}

impl<K: Copy> SessionCore<K> {
    /// Cancel everything pending and go back to Idle.
    ///
    /// Undrained events are kept so a final record still reaches the caller.
    pub fn reset(&mut self) {
        self.timers.reset();
        self.status = SessionStatus::Idle;
        self.error_count = 0;
        self.started_at_ms = None;
    }

    /// Mark the start of a fresh run. Returns false while one is in progress.
    pub fn begin(&mut self) -> bool {
        if self.status.is_running() {
            return false;
        }
        self.reset();
        self.started_at_ms = Some(self.timers.now_ms());
        self.status = SessionStatus::Presenting;
        true
    }

    pub fn elapsed(&self) -> Duration {
        let start = self.started_at_ms.unwrap_or(self.timers.now_ms());
        Duration::from_millis(self.timers.now_ms().saturating_sub(start))
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn after(&mut self, delay: Duration, kind: K) -> TimerId {
        self.timers.schedule(delay, kind)
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn feedback(&mut self, kind: FeedbackKind) {
        self.emit(GameEvent::Feedback(kind));
    }

    pub fn cue(&mut self, cue: CueKind) {
        self.emit(GameEvent::Cue(cue));
    }

    pub fn pulse(&mut self, target: FeedbackTarget) {
        self.emit(GameEvent::Pulse(target));
    }

    pub fn shake(&mut self, target: FeedbackTarget) {
        self.emit(GameEvent::Shake(target));
    }

    /// Close the run with a summary record.
    pub fn finish(&mut self, record: Record) {
        self.timers.reset();
        self.status = SessionStatus::Finished;
        self.emit(GameEvent::SessionEnded(record));
    }

    /// Clock reading `dt` from now.
    pub fn deadline(&self, dt: Duration) -> u64 {
        self.timers.now_ms() + dt.as_millis() as u64
    }

    /// Next continuation due no later than `deadline`. Callers run each one
    /// before asking again, so one that finishes the session suppresses the
    /// rest.
    pub fn next_until(&mut self, deadline: u64) -> Option<K> {
        self.timers.pop_until(deadline)
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Step {
        Show,
    }

    #[test]
    fn begin_refuses_while_running() {
        let mut core: SessionCore<Step> = SessionCore::default();
        assert!(core.begin());
        assert_eq!(core.status, SessionStatus::Presenting);
        assert!(!core.begin());
    }

    #[test]
    fn reset_cancels_pending_continuations() {
        let mut core: SessionCore<Step> = SessionCore::default();
        core.begin();
        core.after(Duration::from_millis(10), Step::Show);
        core.error_count = 2;

        core.reset();
        let deadline = core.deadline(Duration::from_millis(50));
        assert_eq!(core.next_until(deadline), None);
        assert_eq!(core.error_count, 0);
        assert_eq!(core.status, SessionStatus::Idle);
    }

    #[test]
    fn elapsed_counts_from_begin() {
        let mut core: SessionCore<Step> = SessionCore::default();
        core.timers.advance(Duration::from_millis(100));
        core.begin();
        let deadline = core.deadline(Duration::from_millis(250));
        core.after(Duration::from_millis(100), Step::Show);
        assert_eq!(core.next_until(deadline), Some(Step::Show));
        assert_eq!(core.elapsed(), Duration::from_millis(100));
        assert_eq!(core.next_until(deadline), None);
        assert_eq!(core.elapsed(), Duration::from_millis(250));
    }
}
