use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::Record;
use crate::trial::{ColorName, SoundKind, Trial};

/// The four games of the suite.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameType {
    #[value(alias = "schulte")]
    GridSearch,
    #[value(alias = "stroop")]
    Interference,
    #[value(alias = "memory")]
    SequenceMemory,
    #[value(alias = "auditory")]
    AuditoryAttention,
}

impl GameType {
    pub const ALL: [GameType; 4] = [
        GameType::GridSearch,
        GameType::Interference,
        GameType::SequenceMemory,
        GameType::AuditoryAttention,
    ];

    /// Parse the kebab-case name used in storage and on the command line.
    pub fn from_name(name: &str) -> Option<GameType> {
        GameType::ALL.into_iter().find(|g| g.to_string() == name)
    }

    /// Short human title used by the terminal front-end.
    pub fn title(&self) -> &'static str {
        match self {
            GameType::GridSearch => "Schulte Grid",
            GameType::Interference => "Stroop",
            GameType::SequenceMemory => "Sequence Memory",
            GameType::AuditoryAttention => "Auditory Attention",
        }
    }
}

/// Lifecycle shared by every game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Presenting,
    AwaitingInput,
    Scoring,
    Finished,
}

impl SessionStatus {
    /// A session in one of these states holds the application's single
    /// active slot.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            SessionStatus::Presenting | SessionStatus::AwaitingInput | SessionStatus::Scoring
        )
    }

    pub fn accepts_input(&self) -> bool {
        *self == SessionStatus::AwaitingInput
    }
}

/// Result of feeding one input event to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    Accepted,
    /// The input arrived in a state that cannot take it and was dropped.
    Ignored,
}

impl InputStatus {
    pub fn is_accepted(&self) -> bool {
        *self == InputStatus::Accepted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Correct,
    Incorrect,
    Timeout,
    LevelComplete,
    GameComplete,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Click,
    Correct,
    Wrong,
    Success,
    GameOver,
    Digit(u8),
    Sound(SoundKind),
}

/// What a pulse or shake animation should be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTarget {
    Cell(u32),
    Option(ColorName),
    Item(usize),
}

/// Everything a session tells the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    TrialReady(Trial),
    /// One element of a paced stimulus (sequence item, sound) is now shown.
    StimulusShown { index: usize },
    PresentationFinished,
    Feedback(FeedbackKind),
    /// The correct answer should be displayed after a wrong memory answer.
    AnswerRevealed,
    Cue(CueKind),
    Pulse(FeedbackTarget),
    Shake(FeedbackTarget),
    /// A record for a finished level inside a still-running session.
    Record(Record),
    SessionEnded(Record),
}

/// Presentation collaborator. Every method defaults to doing nothing.
pub trait Presenter {
    fn on_trial_ready(&mut self, _game: GameType, _trial: &Trial) {}
    fn on_feedback(&mut self, _game: GameType, _kind: FeedbackKind) {}
    fn on_session_ended(&mut self, _summary: &Record) {}
}

/// Fire-and-forget audio/visual effects.
pub trait FeedbackHooks {
    fn play_cue(&mut self, _kind: CueKind) {}
    fn pulse(&mut self, _target: FeedbackTarget) {}
    fn shake(&mut self, _target: FeedbackTarget) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl FeedbackHooks for NoopHooks {}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {}

/// Common surface of the four game state machines.
///
/// Input handlers return [`InputStatus::Ignored`] when the event does not
/// apply to the current state or to this game.
pub trait GameSession {
    fn game_type(&self) -> GameType;
    fn status(&self) -> SessionStatus;

    /// Idle (or Finished) to Presenting. A no-op while running.
    fn start(&mut self) -> Result<()>;

    /// Any state to Idle, cancelling pending continuations.
    fn stop(&mut self);

    fn on_tick(&mut self, dt: Duration);

    fn on_cell_click(&mut self, _value: u32) -> InputStatus {
        InputStatus::Ignored
    }

    fn on_option_select(&mut self, _choice: ColorName) -> InputStatus {
        InputStatus::Ignored
    }

    fn on_digit_key(&mut self, _digit: u8) -> InputStatus {
        InputStatus::Ignored
    }

    fn on_submit(&mut self) -> InputStatus {
        InputStatus::Ignored
    }

    fn on_backspace(&mut self) -> InputStatus {
        InputStatus::Ignored
    }

    fn on_clear(&mut self) -> InputStatus {
        InputStatus::Ignored
    }

    fn on_timeout(&mut self) -> InputStatus {
        InputStatus::Ignored
    }

    fn error_count(&self) -> u32;

    fn drain_events(&mut self) -> Vec<GameEvent>;

    fn is_running(&self) -> bool {
        self.status().is_running()
    }
}
