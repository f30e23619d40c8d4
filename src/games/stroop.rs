use std::time::Duration;

use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::difficulty::InterferenceDifficulty;
use crate::error::{GymError, Result};
use crate::game::{
    CueKind, FeedbackKind, FeedbackTarget, GameEvent, GameSession, GameType, InputStatus,
    SessionStatus,
};
use crate::record::{InterferenceMetrics, Record, RecordMetrics};
use crate::scoring;
use crate::session::SessionCore;
use crate::timer::TimerId;
use crate::trial::{generate_interference, ColorName, InterferenceTrial, Trial};
use crate::util::mean;

const AFTER_ANSWER: Duration = Duration::from_millis(500);
const AFTER_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    QuestionTimeout,
    NextQuestion,
}

pub struct StroopGame {
    core: SessionCore<Step>,
    settings: InterferenceDifficulty,
    trial: Option<InterferenceTrial>,
    answered: u32,
    correct: u32,
    incorrect: u32,
    response_times: Vec<f64>,
    question_shown_ms: u64,
    question_timer: Option<TimerId>,
    rng: StdRng,
}

impl StroopGame {
    pub fn new(settings: InterferenceDifficulty, rng: StdRng) -> Self {
        Self {
            core: SessionCore::default(),
            settings,
            trial: None,
            answered: 0,
            correct: 0,
            incorrect: 0,
            response_times: Vec::new(),
            question_shown_ms: 0,
            question_timer: None,
            rng,
        }
    }

    pub fn settings(&self) -> InterferenceDifficulty {
        self.settings
    }

    pub fn trial(&self) -> Option<&InterferenceTrial> {
        self.trial.as_ref()
    }

    /// 1-based number of the question on screen.
    pub fn question_number(&self) -> u32 {
        (self.answered + 1).min(self.settings.question_count)
    }

    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    pub fn incorrect_count(&self) -> u32 {
        self.incorrect
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        let limit = self.settings.time_limit()?;
        let shown = Duration::from_millis(self.core.now_ms().saturating_sub(self.question_shown_ms));
        Some(limit.saturating_sub(shown))
    }

    fn present_question(&mut self) {
        let trial = generate_interference(self.settings.tier, &mut self.rng);
        self.core.status = SessionStatus::Presenting;
        self.core.emit(GameEvent::TrialReady(Trial::Interference(trial.clone())));
        self.trial = Some(trial);
        self.question_shown_ms = self.core.now_ms();
        self.question_timer = self
            .settings
            .time_limit()
            .map(|limit| self.core.after(limit, Step::QuestionTimeout));
        self.core.status = SessionStatus::AwaitingInput;
        self.core.emit(GameEvent::PresentationFinished);
    }

    fn response_secs(&self) -> f64 {
        self.core.now_ms().saturating_sub(self.question_shown_ms) as f64 / 1000.0
    }

    fn cancel_question_timer(&mut self) {
        if let Some(id) = self.question_timer.take() {
            self.core.timers.cancel(id);
        }
    }

    fn time_out_question(&mut self) {
        self.cancel_question_timer();
        self.core.status = SessionStatus::Scoring;
        let secs = self
            .settings
            .time_limit()
            .map(|d| d.as_secs_f64())
            .unwrap_or_else(|| self.response_secs());
        self.response_times.push(secs);
        self.incorrect += 1;
        self.core.error_count += 1;
        self.answered += 1;
        debug!(question = self.answered, "question timed out");
        self.core.feedback(FeedbackKind::Timeout);
        self.core.cue(CueKind::Wrong);
        self.core.after(AFTER_TIMEOUT, Step::NextQuestion);
    }

    fn finish(&mut self) {
        let accuracy = scoring::interference_accuracy(self.correct, self.settings.question_count);
        let average = mean(&self.response_times).unwrap_or(0.0);
        let metrics = InterferenceMetrics {
            mode: self.settings.mode,
            question_count: self.settings.question_count,
            time_limit: self.settings.time_limit_secs,
            tier: self.settings.tier,
            correct_count: self.correct,
            incorrect_count: self.incorrect,
            accuracy,
            average_response_time: average,
            total_time: self.response_times.iter().sum(),
            score: accuracy.round() as u32,
        };
        info!(
            correct = self.correct,
            incorrect = self.incorrect,
            "interference session complete"
        );
        self.core.feedback(FeedbackKind::GameComplete);
        self.core.cue(CueKind::Success);
        self.core
            .finish(Record::new(true, RecordMetrics::Interference(metrics)));
    }

    fn run(&mut self, step: Step) {
        match step {
            Step::QuestionTimeout => {
                if self.core.status.accepts_input() {
                    self.time_out_question();
                }
            }
            Step::NextQuestion => {
                if self.answered >= self.settings.question_count {
                    self.finish();
                } else {
                    self.present_question();
                }
            }
        }
    }
}

impl GameSession for StroopGame {
    fn game_type(&self) -> GameType {
        GameType::Interference
    }

    fn status(&self) -> SessionStatus {
        self.core.status
    }

    fn start(&mut self) -> Result<()> {
        if self.core.status.is_running() {
            return Ok(());
        }
        if self.settings.question_count == 0 {
            return Err(GymError::invalid_difficulty(
                GameType::Interference,
                "question count must be at least 1",
            ));
        }
        self.core.begin();
        self.answered = 0;
        self.correct = 0;
        self.incorrect = 0;
        self.response_times.clear();
        self.present_question();
        Ok(())
    }

    fn stop(&mut self) {
        if self.core.status == SessionStatus::Idle {
            return;
        }
        debug!(answered = self.answered, "interference stopped");
        self.core.reset();
        self.question_timer = None;
        self.trial = None;
    }

    fn on_tick(&mut self, dt: Duration) {
        let deadline = self.core.deadline(dt);
        while let Some(step) = self.core.next_until(deadline) {
            self.run(step);
        }
    }

    fn on_option_select(&mut self, choice: ColorName) -> InputStatus {
        if !self.core.status.accepts_input() {
            return InputStatus::Ignored;
        }
        let Some(trial) = self.trial.as_ref() else {
            return InputStatus::Ignored;
        };
        if !trial.options.contains(&choice) {
            return InputStatus::Ignored;
        }

        let correct = scoring::interference_correct(trial, self.settings.mode, choice);
        self.cancel_question_timer();
        self.core.status = SessionStatus::Scoring;
        self.response_times.push(self.response_secs());
        self.answered += 1;

        if correct {
            self.correct += 1;
            self.core.feedback(FeedbackKind::Correct);
            self.core.cue(CueKind::Correct);
            self.core.pulse(FeedbackTarget::Option(choice));
        } else {
            self.incorrect += 1;
            self.core.error_count += 1;
            self.core.feedback(FeedbackKind::Incorrect);
            self.core.cue(CueKind::Wrong);
            self.core.shake(FeedbackTarget::Option(choice));
        }
        self.core.after(AFTER_ANSWER, Step::NextQuestion);
        InputStatus::Accepted
    }

    fn on_timeout(&mut self) -> InputStatus {
        if !self.core.status.accepts_input() {
            return InputStatus::Ignored;
        }
        self.time_out_question();
        InputStatus::Accepted
    }

    fn error_count(&self) -> u32 {
        self.core.error_count
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        self.core.drain()
    }
}
