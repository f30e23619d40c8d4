use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, error, info};

use crate::difficulty::{adapt_auditory, AuditoryDifficulty};
use crate::error::Result;
use crate::game::{
    CueKind, FeedbackKind, FeedbackTarget, GameEvent, GameSession, GameType, InputStatus,
    SessionStatus,
};
use crate::record::{AuditoryMetrics, Record, RecordMetrics};
use crate::scoring;
use crate::session::SessionCore;
use crate::trial::{generate_auditory, AuditoryTrial, SoundKind, Trial};

const LEAD_IN: Duration = Duration::from_millis(500);
/// Gap between the target cue and the first sequence item.
const TARGET_GAP: Duration = Duration::from_millis(1500);
const ITEM_STEP: Duration = Duration::from_millis(1000);
const NEXT_LEVEL_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    TargetCue,
    Sound(usize),
    PresentationDone,
    NextLevel,
}

pub struct AuditoryGame {
    core: SessionCore<Step>,
    difficulty: AuditoryDifficulty,
    trial: Option<AuditoryTrial>,
    /// 1-based positions named by the player.
    response: Vec<usize>,
    playing: Option<usize>,
    rng: StdRng,
}

impl AuditoryGame {
    pub fn new(rng: StdRng) -> Self {
        Self {
            core: SessionCore::default(),
            difficulty: AuditoryDifficulty::default(),
            trial: None,
            response: Vec::new(),
            playing: None,
            rng,
        }
    }

    pub fn difficulty(&self) -> AuditoryDifficulty {
        self.difficulty
    }

    pub fn trial(&self) -> Option<&AuditoryTrial> {
        self.trial.as_ref()
    }

    pub fn response(&self) -> &[usize] {
        &self.response
    }

    /// Index of the sound currently playing, while presenting.
    pub fn playing(&self) -> Option<usize> {
        self.playing
    }

    /// Play the current sequence again from the start. Only while waiting for
    /// an answer; the response is cleared.
    pub fn replay(&mut self) -> InputStatus {
        if !self.core.status.accepts_input() || self.trial.is_none() {
            return InputStatus::Ignored;
        }
        debug!("auditory replay");
        self.response.clear();
        self.schedule_playback();
        InputStatus::Accepted
    }

    fn start_level(&mut self) -> Result<()> {
        let target = *SoundKind::ALL
            .choose(&mut self.rng)
            .unwrap_or(&SoundKind::High);
        let trial = generate_auditory(target, self.difficulty.sequence_length, &mut self.rng)?;
        self.present(trial);
        Ok(())
    }

    fn present(&mut self, trial: AuditoryTrial) {
        debug!(
            level = self.difficulty.level,
            target = trial.target.name(),
            "auditory level"
        );
        self.response.clear();
        self.core.emit(GameEvent::TrialReady(Trial::Auditory(trial.clone())));
        self.trial = Some(trial);
        self.schedule_playback();
    }

    fn schedule_playback(&mut self) {
        let Some(len) = self.trial.as_ref().map(|t| t.sequence.len()) else {
            return;
        };
        self.core.status = SessionStatus::Presenting;
        self.playing = None;
        self.core.after(LEAD_IN, Step::TargetCue);
        let first = LEAD_IN + TARGET_GAP;
        for idx in 0..len {
            self.core.after(first + ITEM_STEP * idx as u32, Step::Sound(idx));
        }
        self.core
            .after(first + ITEM_STEP * len as u32, Step::PresentationDone);
    }

    fn run(&mut self, step: Step) {
        match step {
            Step::TargetCue => {
                if let Some(target) = self.trial.as_ref().map(|t| t.target) {
                    self.core.cue(CueKind::Sound(target));
                }
            }
            Step::Sound(idx) => {
                let Some(sound) = self.trial.as_ref().and_then(|t| t.sequence.get(idx).copied())
                else {
                    return;
                };
                self.playing = Some(idx);
                self.core.emit(GameEvent::StimulusShown { index: idx });
                self.core.cue(CueKind::Sound(sound));
            }
            Step::PresentationDone => {
                self.playing = None;
                self.core.status = SessionStatus::AwaitingInput;
                self.core.emit(GameEvent::PresentationFinished);
            }
            Step::NextLevel => {
                if let Err(e) = self.start_level() {
                    error!("could not start auditory level: {}", e);
                    self.core.reset();
                }
            }
        }
    }
}

impl GameSession for AuditoryGame {
    fn game_type(&self) -> GameType {
        GameType::AuditoryAttention
    }

    fn status(&self) -> SessionStatus {
        self.core.status
    }

    fn start(&mut self) -> Result<()> {
        if self.core.status.is_running() {
            return Ok(());
        }
        self.core.begin();
        self.difficulty = AuditoryDifficulty::default();
        if let Err(e) = self.start_level() {
            error!("could not start auditory attention: {}", e);
            self.core.reset();
            return Err(e);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.core.status == SessionStatus::Idle {
            return;
        }
        debug!(level = self.difficulty.level, "auditory attention stopped");
        self.core.reset();
        self.trial = None;
        self.response.clear();
        self.playing = None;
    }

    fn on_tick(&mut self, dt: Duration) {
        let deadline = self.core.deadline(dt);
        while let Some(step) = self.core.next_until(deadline) {
            self.run(step);
        }
    }

    /// Name a 1-based sequence position as a target occurrence.
    fn on_cell_click(&mut self, position: u32) -> InputStatus {
        if !self.core.status.accepts_input() {
            return InputStatus::Ignored;
        }
        let Some(len) = self.trial.as_ref().map(|t| t.sequence.len()) else {
            return InputStatus::Ignored;
        };
        let position = position as usize;
        if position == 0
            || position > len
            || self.response.len() >= len
            || self.response.contains(&position)
        {
            return InputStatus::Ignored;
        }
        self.response.push(position);
        self.core.pulse(FeedbackTarget::Item(position));
        InputStatus::Accepted
    }

    fn on_submit(&mut self) -> InputStatus {
        if !self.core.status.accepts_input() || self.response.is_empty() {
            return InputStatus::Ignored;
        }
        let Some(trial) = self.trial.as_ref() else {
            return InputStatus::Ignored;
        };
        let targets = trial.target_positions();
        self.core.status = SessionStatus::Scoring;

        if scoring::positions_match(&targets, &self.response) {
            self.core.feedback(FeedbackKind::Correct);
            self.core.cue(CueKind::Success);
            self.difficulty = adapt_auditory(self.difficulty);
            self.core.after(NEXT_LEVEL_DELAY, Step::NextLevel);
        } else {
            let accuracy = scoring::auditory_accuracy(&targets, &self.response);
            self.core.error_count += 1;
            info!(level = self.difficulty.level, accuracy, "auditory game over");
            let metrics = AuditoryMetrics {
                level: self.difficulty.level,
                sequence_length: self.difficulty.sequence_length,
                accuracy,
            };
            self.core.feedback(FeedbackKind::GameOver);
            self.core.cue(CueKind::GameOver);
            self.core
                .finish(Record::new(true, RecordMetrics::AuditoryAttention(metrics)));
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::SeedableRng;

    fn targets_at_two_and_five() -> AuditoryTrial {
        use SoundKind::*;
        AuditoryTrial {
            target: Low,
            sequence: vec![High, Low, Short, Long, Low],
        }
    }

    /// A running game waiting for input on a known trial.
    fn waiting_on(trial: AuditoryTrial) -> AuditoryGame {
        let mut g = AuditoryGame::new(StdRng::seed_from_u64(8));
        g.start().unwrap();
        g.core.timers.reset();
        g.present(trial);
        g.on_tick(Duration::from_secs(10));
        assert_eq!(g.status(), SessionStatus::AwaitingInput);
        g.drain_events();
        g
    }

    #[test]
    fn exact_positions_advance_the_level() {
        let mut g = waiting_on(targets_at_two_and_five());
        g.on_cell_click(2);
        g.on_cell_click(5);
        assert_eq!(g.on_submit(), InputStatus::Accepted);
        assert_eq!(g.difficulty().level, 2);
        assert_eq!(g.difficulty().sequence_length, 6);
        assert_eq!(g.status(), SessionStatus::Scoring);

        g.on_tick(NEXT_LEVEL_DELAY);
        assert_eq!(g.status(), SessionStatus::Presenting);
        assert_eq!(g.trial().map(|t| t.sequence.len()), Some(6));
    }

    #[test]
    fn partial_answer_ends_the_game() {
        let mut g = waiting_on(targets_at_two_and_five());
        g.on_cell_click(2);
        g.on_submit();
        assert_eq!(g.status(), SessionStatus::Finished);

        let events = g.drain_events();
        assert!(events.contains(&GameEvent::Feedback(FeedbackKind::GameOver)));
        let record = events
            .iter()
            .find_map(|e| match e {
                GameEvent::SessionEnded(r) => Some(r),
                _ => None,
            })
            .unwrap();
        assert_matches!(&record.metrics, RecordMetrics::AuditoryAttention(m) => {
            assert_eq!(m.accuracy, 0.5);
            assert_eq!(m.level, 1);
        });
    }

    #[test]
    fn playback_follows_cue_then_items() {
        let mut g = AuditoryGame::new(StdRng::seed_from_u64(2));
        g.start().unwrap();
        g.drain_events();

        g.on_tick(LEAD_IN);
        assert_matches!(g.drain_events().as_slice(), [GameEvent::Cue(CueKind::Sound(_))]);

        g.on_tick(TARGET_GAP);
        assert_eq!(g.playing(), Some(0));
        // five items: the last at 2000 + 4000 ms, input opens 1000 ms later
        g.on_tick(Duration::from_millis(4_999));
        assert_eq!(g.status(), SessionStatus::Presenting);
        g.on_tick(Duration::from_millis(1));
        assert_eq!(g.status(), SessionStatus::AwaitingInput);
    }

    #[test]
    fn duplicate_and_out_of_range_positions_are_ignored() {
        let mut g = waiting_on(targets_at_two_and_five());
        assert_eq!(g.on_cell_click(2), InputStatus::Accepted);
        assert_eq!(g.on_cell_click(2), InputStatus::Ignored);
        assert_eq!(g.on_cell_click(0), InputStatus::Ignored);
        assert_eq!(g.on_cell_click(6), InputStatus::Ignored);
        assert_eq!(g.response(), &[2]);
    }

    #[test]
    fn replay_clears_response_and_presents_again() {
        let mut g = waiting_on(targets_at_two_and_five());
        g.on_cell_click(5);
        assert_eq!(g.replay(), InputStatus::Accepted);
        assert!(g.response().is_empty());
        assert_eq!(g.status(), SessionStatus::Presenting);
        assert_eq!(g.replay(), InputStatus::Ignored);
        assert_eq!(g.on_cell_click(2), InputStatus::Ignored);

        g.on_tick(Duration::from_secs(10));
        assert_eq!(g.status(), SessionStatus::AwaitingInput);
        assert_eq!(g.trial(), Some(&targets_at_two_and_five()));
    }

    #[test]
    fn stop_cancels_playback_without_record() {
        let mut g = AuditoryGame::new(StdRng::seed_from_u64(3));
        g.start().unwrap();
        g.on_tick(Duration::from_millis(600));
        g.stop();
        g.drain_events();
        g.on_tick(Duration::from_secs(10));
        assert!(g.drain_events().is_empty());
        assert_eq!(g.status(), SessionStatus::Idle);
    }
}
