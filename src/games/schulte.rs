use std::time::Duration;

use rand::rngs::StdRng;
use tracing::{debug, error, info};

use crate::difficulty::{next_grid_level, GridDifficulty, MAX_GRID_LEVEL};
use crate::error::{GymError, Result};
use crate::game::{
    CueKind, FeedbackKind, FeedbackTarget, GameEvent, GameSession, GameType, InputStatus,
    SessionStatus,
};
use crate::record::{GridMetrics, Record, RecordMetrics};
use crate::scoring;
use crate::session::SessionCore;
use crate::trial::{generate_grid, ContentType, GridTrial, Trial, MAX_LETTER_GRID};

/// Pause between a completed level and the next grid in a multi-level run.
const NEXT_LEVEL_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchulteSettings {
    pub start_level: usize,
    /// Last level of the run. Equal to `start_level` for a single grid.
    pub end_level: usize,
    pub content: ContentType,
}

impl Default for SchulteSettings {
    fn default() -> Self {
        Self {
            start_level: 0,
            end_level: 0,
            content: ContentType::Number,
        }
    }
}

impl SchulteSettings {
    pub fn single(level: usize, content: ContentType) -> Self {
        Self {
            start_level: level,
            end_level: level,
            content,
        }
    }

    /// Play from `start_level` through the largest grid.
    pub fn marathon(start_level: usize, content: ContentType) -> Self {
        Self {
            start_level,
            end_level: MAX_GRID_LEVEL,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    TimeLimit,
    NextLevel,
}

pub struct SchulteGame {
    core: SessionCore<Step>,
    settings: SchulteSettings,
    difficulty: GridDifficulty,
    trial: Option<GridTrial>,
    next_item: u32,
    level_started_ms: u64,
    rng: StdRng,
}

impl SchulteGame {
    pub fn new(settings: SchulteSettings, rng: StdRng) -> Self {
        Self {
            core: SessionCore::default(),
            settings,
            difficulty: GridDifficulty {
                level: settings.start_level,
                content: settings.content,
            },
            trial: None,
            next_item: 1,
            level_started_ms: 0,
            rng,
        }
    }

    pub fn trial(&self) -> Option<&GridTrial> {
        self.trial.as_ref()
    }

    /// Value the player has to find next.
    pub fn next_item(&self) -> u32 {
        self.next_item
    }

    pub fn completed_items(&self) -> u32 {
        self.next_item.saturating_sub(1)
    }

    pub fn level(&self) -> usize {
        self.difficulty.level
    }

    pub fn time_limit(&self) -> Duration {
        self.difficulty.params().time_limit()
    }

    pub fn level_elapsed(&self) -> Duration {
        Duration::from_millis(self.core.now_ms().saturating_sub(self.level_started_ms))
    }

    pub fn time_remaining(&self) -> Duration {
        self.time_limit().saturating_sub(self.level_elapsed())
    }

    fn validate(&self) -> Result<()> {
        let settings = self.settings;
        if settings.start_level > settings.end_level || settings.end_level > MAX_GRID_LEVEL {
            return Err(GymError::invalid_difficulty(
                GameType::GridSearch,
                format!(
                    "levels {}..={} outside 0..={}",
                    settings.start_level, settings.end_level, MAX_GRID_LEVEL
                ),
            ));
        }
        if settings.content == ContentType::Letter {
            let size = crate::difficulty::GRID_LEVELS[settings.end_level].size;
            if size > MAX_LETTER_GRID {
                return Err(GymError::invalid_difficulty(
                    GameType::GridSearch,
                    format!("letter content needs size <= {}, got {}", MAX_LETTER_GRID, size),
                ));
            }
        }
        Ok(())
    }

    fn present_level(&mut self) -> Result<()> {
        let trial = generate_grid(self.difficulty.level, self.difficulty.content, &mut self.rng)?;
        debug!(level = self.difficulty.level, size = trial.size, "grid presented");

        self.next_item = 1;
        self.core.error_count = 0;
        self.level_started_ms = self.core.now_ms();
        self.core.status = SessionStatus::Presenting;
        self.core.emit(GameEvent::TrialReady(Trial::Grid(trial.clone())));
        self.trial = Some(trial);

        self.core.after(self.time_limit(), Step::TimeLimit);
        self.core.status = SessionStatus::AwaitingInput;
        self.core.emit(GameEvent::PresentationFinished);
        Ok(())
    }

    fn metrics(&self, timeout: bool) -> GridMetrics {
        let params = self.difficulty.params();
        let completed = self.completed_items();
        GridMetrics {
            time: self.level_elapsed().as_secs_f64(),
            time_limit: params.time_limit_secs,
            grid_size: params.size,
            content_type: self.difficulty.content,
            error_count: self.core.error_count,
            completed_items: completed,
            total_items: (params.size * params.size) as u32,
            accuracy: scoring::grid_accuracy(completed, self.core.error_count),
            timeout,
            level: self.difficulty.level + 1,
        }
    }

    fn complete_level(&mut self) {
        self.core.status = SessionStatus::Scoring;
        let record = Record::new(true, RecordMetrics::GridSearch(self.metrics(false)));
        self.core.cue(CueKind::Success);

        let next = next_grid_level(self.difficulty)
            .filter(|next| next.level <= self.settings.end_level);
        match next {
            Some(next) => {
                info!(level = self.difficulty.level + 1, "grid level complete");
                self.core.timers.reset();
                self.core.feedback(FeedbackKind::LevelComplete);
                self.core.emit(GameEvent::Record(record));
                self.difficulty = next;
                self.core.after(NEXT_LEVEL_DELAY, Step::NextLevel);
            }
            None => {
                info!(level = self.difficulty.level + 1, "grid run complete");
                self.core.feedback(FeedbackKind::GameComplete);
                self.core.finish(record);
            }
        }
    }

    fn time_out(&mut self) {
        info!(
            completed = self.completed_items(),
            level = self.difficulty.level + 1,
            "grid timed out"
        );
        self.core.status = SessionStatus::Scoring;
        let record = Record::new(false, RecordMetrics::GridSearch(self.metrics(true)));
        self.core.feedback(FeedbackKind::Timeout);
        self.core.cue(CueKind::GameOver);
        self.core.finish(record);
    }

    fn run(&mut self, step: Step) {
        match step {
            Step::TimeLimit => {
                if self.core.status.accepts_input() {
                    self.time_out();
                }
            }
            Step::NextLevel => {
                if let Err(e) = self.present_level() {
                    error!("could not present next grid: {}", e);
                    self.core.reset();
                }
            }
        }
    }
}

impl GameSession for SchulteGame {
    fn game_type(&self) -> GameType {
        GameType::GridSearch
    }

    fn status(&self) -> SessionStatus {
        self.core.status
    }

    fn start(&mut self) -> Result<()> {
        if self.core.status.is_running() {
            return Ok(());
        }
        self.validate()?;
        self.core.begin();
        self.difficulty = GridDifficulty {
            level: self.settings.start_level,
            content: self.settings.content,
        };
        if let Err(e) = self.present_level() {
            error!("could not start grid search: {}", e);
            self.core.reset();
            return Err(e);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.core.status == SessionStatus::Idle {
            return;
        }
        debug!("grid search stopped");
        self.core.reset();
        self.trial = None;
    }

    fn on_tick(&mut self, dt: Duration) {
        let deadline = self.core.deadline(dt);
        while let Some(step) = self.core.next_until(deadline) {
            self.run(step);
        }
    }

    fn on_cell_click(&mut self, value: u32) -> InputStatus {
        if !self.core.status.accepts_input() {
            return InputStatus::Ignored;
        }
        let Some(total) = self.trial.as_ref().map(|t| t.total_items()) else {
            return InputStatus::Ignored;
        };
        if value == 0 || value > total {
            return InputStatus::Ignored;
        }

        if value == self.next_item {
            self.core.pulse(FeedbackTarget::Cell(value));
            self.core.cue(CueKind::Click);
            self.next_item += 1;
            if self.next_item > total {
                self.complete_level();
            }
        } else {
            self.core.error_count += 1;
            self.core.shake(FeedbackTarget::Cell(value));
            self.core.cue(CueKind::Wrong);
        }
        InputStatus::Accepted
    }

    fn on_timeout(&mut self) -> InputStatus {
        if !self.core.status.accepts_input() {
            return InputStatus::Ignored;
        }
        self.time_out();
        InputStatus::Accepted
    }

    fn error_count(&self) -> u32 {
        self.core.error_count
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        self.core.drain()
    }
}
