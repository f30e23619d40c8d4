use std::time::Duration;

use rand::rngs::StdRng;
use tracing::{debug, error, info};

use crate::difficulty::{adapt_memory, MemoryDifficulty};
use crate::error::Result;
use crate::game::{
    CueKind, FeedbackKind, FeedbackTarget, GameEvent, GameSession, GameType, InputStatus,
    SessionStatus,
};
use crate::record::{MemoryMetrics, Record, RecordMetrics};
use crate::scoring;
use crate::session::SessionCore;
use crate::trial::{generate_sequence, MemoryMode, SequenceTrial, Trial, VISUAL_POSITIONS};

const LEAD_IN: Duration = Duration::from_millis(500);
const VISUAL_STEP: Duration = Duration::from_millis(1000);
/// How long a visual position stays lit within its step.
const VISUAL_HIGHLIGHT: Duration = Duration::from_millis(800);
const DIGIT_STEP: Duration = Duration::from_millis(800);
const NEXT_ROUND_DELAY: Duration = Duration::from_millis(1000);
const REVEAL_DELAY: Duration = Duration::from_millis(1000);
/// Time the revealed answer stays up before the next round.
const REVEAL_HOLD: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySettings {
    pub mode: MemoryMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Show(usize),
    Hide,
    PresentationDone,
    Reveal,
    NextRound,
}

pub struct MemoryGame {
    core: SessionCore<Step>,
    settings: MemorySettings,
    difficulty: MemoryDifficulty,
    trial: Option<SequenceTrial>,
    response: Vec<u8>,
    /// Index of the item currently being shown, while presenting.
    showing: Option<usize>,
    revealed: bool,
    rng: StdRng,
}

impl MemoryGame {
    pub fn new(settings: MemorySettings, rng: StdRng) -> Self {
        Self {
            core: SessionCore::default(),
            settings,
            difficulty: MemoryDifficulty::new(settings.mode),
            trial: None,
            response: Vec::new(),
            showing: None,
            revealed: false,
            rng,
        }
    }

    pub fn mode(&self) -> MemoryMode {
        self.settings.mode
    }

    pub fn difficulty(&self) -> MemoryDifficulty {
        self.difficulty
    }

    pub fn trial(&self) -> Option<&SequenceTrial> {
        self.trial.as_ref()
    }

    pub fn response(&self) -> &[u8] {
        &self.response
    }

    pub fn showing(&self) -> Option<u8> {
        let idx = self.showing?;
        self.trial.as_ref().and_then(|t| t.items.get(idx).copied())
    }

    /// True while the correct answer is displayed after a miss.
    pub fn revealed(&self) -> bool {
        self.revealed
    }

    fn item_step(&self) -> Duration {
        match self.settings.mode {
            MemoryMode::Visual => VISUAL_STEP,
            MemoryMode::Digit => DIGIT_STEP,
        }
    }

    fn start_round(&mut self) -> Result<()> {
        let trial = generate_sequence(
            self.settings.mode,
            self.difficulty.sequence_length,
            &mut self.rng,
        )?;
        debug!(length = trial.items.len(), "memory round");

        self.response.clear();
        self.showing = None;
        self.revealed = false;
        self.core.status = SessionStatus::Presenting;

        let step = self.item_step();
        for idx in 0..trial.items.len() {
            let at = LEAD_IN + step * idx as u32;
            self.core.after(at, Step::Show(idx));
            if self.settings.mode == MemoryMode::Visual {
                self.core.after(at + VISUAL_HIGHLIGHT, Step::Hide);
            }
        }
        self.core
            .after(LEAD_IN + step * trial.items.len() as u32, Step::PresentationDone);

        self.core.emit(GameEvent::TrialReady(Trial::Sequence(trial.clone())));
        self.trial = Some(trial);
        Ok(())
    }

    fn show(&mut self, idx: usize) {
        let Some(item) = self.trial.as_ref().and_then(|t| t.items.get(idx).copied()) else {
            return;
        };
        self.showing = Some(idx);
        self.core.emit(GameEvent::StimulusShown { index: idx });
        match self.settings.mode {
            MemoryMode::Visual => self.core.pulse(FeedbackTarget::Cell(item as u32)),
            MemoryMode::Digit => self.core.cue(CueKind::Digit(item)),
        }
    }

    fn evaluate(&mut self) {
        let Some(trial) = self.trial.as_ref() else {
            return;
        };
        let correct = scoring::sequence_matches(&trial.items, &self.response);
        self.core.status = SessionStatus::Scoring;
        self.difficulty = adapt_memory(self.difficulty, correct);

        if correct {
            self.core.feedback(FeedbackKind::Correct);
            self.core.cue(CueKind::Correct);
            self.core.after(NEXT_ROUND_DELAY, Step::NextRound);
        } else {
            self.core.error_count += 1;
            self.core.feedback(FeedbackKind::Incorrect);
            self.core.cue(CueKind::Wrong);
            self.core.after(REVEAL_DELAY, Step::Reveal);
            self.core.after(REVEAL_DELAY + REVEAL_HOLD, Step::NextRound);
        }
    }

    fn run(&mut self, step: Step) {
        match step {
            Step::Show(idx) => self.show(idx),
            Step::Hide => self.showing = None,
            Step::PresentationDone => {
                self.showing = None;
                self.core.status = SessionStatus::AwaitingInput;
                self.core.emit(GameEvent::PresentationFinished);
            }
            Step::Reveal => {
                self.revealed = true;
                self.core.emit(GameEvent::AnswerRevealed);
            }
            Step::NextRound => {
                if let Err(e) = self.start_round() {
                    error!("could not start memory round: {}", e);
                    self.core.reset();
                }
            }
        }
    }

    fn push(&mut self, item: u8) -> InputStatus {
        let length = self.difficulty.sequence_length;
        if self.response.len() >= length {
            return InputStatus::Ignored;
        }
        self.response.push(item);
        InputStatus::Accepted
    }
}

impl GameSession for MemoryGame {
    fn game_type(&self) -> GameType {
        GameType::SequenceMemory
    }

    fn status(&self) -> SessionStatus {
        self.core.status
    }

    fn start(&mut self) -> Result<()> {
        if self.core.status.is_running() {
            return Ok(());
        }
        self.core.begin();
        self.difficulty = MemoryDifficulty::new(self.settings.mode);
        if let Err(e) = self.start_round() {
            error!("could not start sequence memory: {}", e);
            self.core.reset();
            return Err(e);
        }
        Ok(())
    }

    /// Memory has no natural end, so stopping a running session records the
    /// best span reached.
    fn stop(&mut self) {
        if self.core.status == SessionStatus::Idle {
            return;
        }
        let metrics = MemoryMetrics {
            mode: self.settings.mode,
            level: self.difficulty.best_span,
            sequence_length: self.difficulty.sequence_length,
            correct_streak: self.difficulty.correct_streak,
        };
        info!(span = metrics.level, "sequence memory stopped");
        self.core
            .emit(GameEvent::SessionEnded(Record::new(true, RecordMetrics::SequenceMemory(metrics))));
        self.core.reset();
        self.trial = None;
        self.response.clear();
        self.showing = None;
        self.revealed = false;
    }

    fn on_tick(&mut self, dt: Duration) {
        let deadline = self.core.deadline(dt);
        while let Some(step) = self.core.next_until(deadline) {
            self.run(step);
        }
    }

    fn on_cell_click(&mut self, position: u32) -> InputStatus {
        if self.settings.mode != MemoryMode::Visual || !self.core.status.accepts_input() {
            return InputStatus::Ignored;
        }
        if position == 0 || position > VISUAL_POSITIONS as u32 {
            return InputStatus::Ignored;
        }
        if self.push(position as u8) == InputStatus::Ignored {
            return InputStatus::Ignored;
        }
        self.core.pulse(FeedbackTarget::Cell(position));
        self.core.cue(CueKind::Click);
        if self.response.len() == self.difficulty.sequence_length {
            self.evaluate();
        }
        InputStatus::Accepted
    }

    fn on_digit_key(&mut self, digit: u8) -> InputStatus {
        if self.settings.mode != MemoryMode::Digit || !self.core.status.accepts_input() {
            return InputStatus::Ignored;
        }
        if digit > 9 {
            return InputStatus::Ignored;
        }
        let status = self.push(digit);
        if status.is_accepted() {
            self.core.cue(CueKind::Digit(digit));
        }
        status
    }

    fn on_submit(&mut self) -> InputStatus {
        if !self.core.status.accepts_input() || self.response.is_empty() {
            return InputStatus::Ignored;
        }
        self.evaluate();
        InputStatus::Accepted
    }

    fn on_backspace(&mut self) -> InputStatus {
        if !self.core.status.accepts_input() || self.response.pop().is_none() {
            return InputStatus::Ignored;
        }
        InputStatus::Accepted
    }

    fn on_clear(&mut self) -> InputStatus {
        if !self.core.status.accepts_input() || self.response.is_empty() {
            return InputStatus::Ignored;
        }
        self.response.clear();
        InputStatus::Accepted
    }

    fn error_count(&self) -> u32 {
        self.core.error_count
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        self.core.drain()
    }
}
