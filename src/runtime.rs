use std::io::Write;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::debug;

use crate::game::{CueKind, FeedbackHooks};

/// What the front-end loop reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GymEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events.
pub trait GymEventSource: Send + 'static {
    /// Wait up to `timeout` for the next event.
    fn recv_timeout(&self, timeout: Duration) -> Result<GymEvent, RecvTimeoutError>;
}

/// Events arriving over a channel, either from a crossterm reader thread or
/// from a test harness holding the sender.
pub struct ChannelEventSource {
    rx: Receiver<GymEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<GymEvent>) -> Self {
        Self { rx }
    }

    /// Spawn a thread reading the terminal. Only key presses are forwarded,
    /// so terminals that report releases don't answer twice.
    pub fn crossterm() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => GymEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => GymEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    debug!("terminal reader stopped: {}", e);
                    break;
                }
            };
            if tx.send(ev).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl GymEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GymEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How much session time one idle loop iteration stands for.
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Advances the application one event at a time, turning quiet periods into
/// ticks. Every step also reports the wall time since the previous one, so
/// session clocks keep running while keys arrive.
pub struct Runner<E: GymEventSource, T: Ticker> {
    events: E,
    ticker: T,
    last: Instant,
}

impl<E: GymEventSource, T: Ticker> Runner<E, T> {
    pub fn new(events: E, ticker: T) -> Self {
        Self {
            events,
            ticker,
            last: Instant::now(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.ticker.interval()
    }

    /// Next event, or `Tick` once the interval passes without one, paired
    /// with the time elapsed since the last step. A closed source keeps
    /// ticking at the interval so running games still finish.
    pub fn step(&mut self) -> (GymEvent, Duration) {
        let interval = self.ticker.interval();
        let event = match self.events.recv_timeout(interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => GymEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(interval);
                GymEvent::Tick
            }
        };
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        (event, elapsed)
    }
}

/// Feedback hooks for a plain terminal: audible cues become the BEL
/// character, animations are left to the screen.
pub struct TerminalBell<W: Write> {
    out: W,
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FeedbackHooks for TerminalBell<W> {
    fn play_cue(&mut self, kind: CueKind) {
        // presentation ticks and clicks would ring far too often
        if matches!(kind, CueKind::Click | CueKind::Digit(_)) {
            return;
        }
        if let Err(e) = self.out.write_all(b"\x07").and_then(|_| self.out.flush()) {
            debug!("bell failed: {}", e);
        }
    }
}
