use std::time::Duration;

use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::error::Result;
use crate::game::{
    FeedbackHooks, GameEvent, GameSession, GameType, InputStatus, NoopHooks, NoopPresenter,
    Presenter,
};
use crate::games::{AuditoryGame, MemoryGame, MemorySettings, SchulteGame, SchulteSettings, StroopGame};
use crate::difficulty::InterferenceDifficulty;
use crate::record::Record;
use crate::stats::RecordSink;
use crate::trial::ColorName;

/// Settings for every game, handed to the arena when a session is created.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameSettings {
    pub schulte: SchulteSettings,
    pub interference: InterferenceDifficulty,
    pub memory: MemorySettings,
}

/// The one session that may be running.
pub enum ActiveGame {
    Grid(SchulteGame),
    Interference(StroopGame),
    Memory(MemoryGame),
    Auditory(AuditoryGame),
}

impl ActiveGame {
    pub fn new(game: GameType, settings: &GameSettings, rng: StdRng) -> Self {
        match game {
            GameType::GridSearch => ActiveGame::Grid(SchulteGame::new(settings.schulte, rng)),
            GameType::Interference => {
                ActiveGame::Interference(StroopGame::new(settings.interference, rng))
            }
            GameType::SequenceMemory => ActiveGame::Memory(MemoryGame::new(settings.memory, rng)),
            GameType::AuditoryAttention => ActiveGame::Auditory(AuditoryGame::new(rng)),
        }
    }

    pub fn session(&self) -> &dyn GameSession {
        match self {
            ActiveGame::Grid(g) => g,
            ActiveGame::Interference(g) => g,
            ActiveGame::Memory(g) => g,
            ActiveGame::Auditory(g) => g,
        }
    }

    pub fn session_mut(&mut self) -> &mut dyn GameSession {
        match self {
            ActiveGame::Grid(g) => g,
            ActiveGame::Interference(g) => g,
            ActiveGame::Memory(g) => g,
            ActiveGame::Auditory(g) => g,
        }
    }
}

/// A record emitted by a session together with whether the sink kept it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub record: Record,
    pub persisted: bool,
}

/// Owns the active session and routes its events.
///
/// Records go to the sink, trial and feedback events to the presenter, and
/// cues and animations to the feedback hooks. Cues are dropped when sound is
/// off.
pub struct Arena {
    active: Option<ActiveGame>,
    sink: Box<dyn RecordSink>,
    presenter: Box<dyn Presenter>,
    hooks: Box<dyn FeedbackHooks>,
    sound_enabled: bool,
    last_outcome: Option<Outcome>,
}

impl Arena {
    pub fn new(sink: Box<dyn RecordSink>) -> Self {
        Self {
            active: None,
            sink,
            presenter: Box::new(NoopPresenter),
            hooks: Box::new(NoopHooks),
            sound_enabled: true,
            last_outcome: None,
        }
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn FeedbackHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
    }

    pub fn sink(&self) -> &dyn RecordSink {
        self.sink.as_ref()
    }

    pub fn sink_mut(&mut self) -> &mut dyn RecordSink {
        self.sink.as_mut()
    }

    pub fn active(&self) -> Option<&ActiveGame> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveGame> {
        self.active.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map(|a| a.session().is_running())
            .unwrap_or(false)
    }

    /// The most recent record a session produced.
    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    /// Stop whatever is running and start `game`.
    pub fn start(
        &mut self,
        game: GameType,
        settings: &GameSettings,
        rng: StdRng,
    ) -> Result<Vec<GameEvent>> {
        let mut events = self.stop();
        info!(%game, "starting session");
        self.last_outcome = None;

        let mut active = ActiveGame::new(game, settings, rng);
        let started = active.session_mut().start();
        self.active = Some(active);
        started?;
        events.extend(self.dispatch());
        Ok(events)
    }

    /// Start the same game again with fresh state.
    pub fn restart(&mut self) -> Result<Vec<GameEvent>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(Vec::new());
        };
        let mut events = Vec::new();
        if active.session().is_running() {
            active.session_mut().stop();
            events.extend(self.dispatch());
        }
        self.last_outcome = None;
        if let Some(active) = self.active.as_mut() {
            active.session_mut().start()?;
        }
        events.extend(self.dispatch());
        Ok(events)
    }

    /// Stop the active session, keeping it around so its final state can
    /// still be shown.
    pub fn stop(&mut self) -> Vec<GameEvent> {
        match self.active.as_mut() {
            Some(active) => active.session_mut().stop(),
            None => return Vec::new(),
        }
        self.dispatch()
    }

    /// Drop the session entirely, stopping it first.
    pub fn close(&mut self) -> Vec<GameEvent> {
        let events = self.stop();
        self.active = None;
        events
    }

    pub fn tick(&mut self, dt: Duration) -> Vec<GameEvent> {
        self.forward(|s| {
            s.on_tick(dt);
            InputStatus::Accepted
        })
        .1
    }

    pub fn cell_click(&mut self, value: u32) -> (InputStatus, Vec<GameEvent>) {
        self.forward(|s| s.on_cell_click(value))
    }

    pub fn option_select(&mut self, choice: ColorName) -> (InputStatus, Vec<GameEvent>) {
        self.forward(|s| s.on_option_select(choice))
    }

    pub fn digit_key(&mut self, digit: u8) -> (InputStatus, Vec<GameEvent>) {
        self.forward(|s| s.on_digit_key(digit))
    }

    pub fn submit(&mut self) -> (InputStatus, Vec<GameEvent>) {
        self.forward(|s| s.on_submit())
    }

    pub fn backspace(&mut self) -> (InputStatus, Vec<GameEvent>) {
        self.forward(|s| s.on_backspace())
    }

    pub fn clear(&mut self) -> (InputStatus, Vec<GameEvent>) {
        self.forward(|s| s.on_clear())
    }

    pub fn timeout(&mut self) -> (InputStatus, Vec<GameEvent>) {
        self.forward(|s| s.on_timeout())
    }

    pub fn replay(&mut self) -> (InputStatus, Vec<GameEvent>) {
        let status = match self.active.as_mut() {
            Some(ActiveGame::Auditory(g)) => g.replay(),
            _ => InputStatus::Ignored,
        };
        (status, self.dispatch())
    }

    fn forward<F>(&mut self, f: F) -> (InputStatus, Vec<GameEvent>)
    where
        F: FnOnce(&mut dyn GameSession) -> InputStatus,
    {
        let status = match self.active.as_mut() {
            Some(active) => f(active.session_mut()),
            None => return (InputStatus::Ignored, Vec::new()),
        };
        (status, self.dispatch())
    }

    /// Drain the session's events, act on them, and hand them back for
    /// rendering.
    fn dispatch(&mut self) -> Vec<GameEvent> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        let game = active.session().game_type();
        let events = active.session_mut().drain_events();

        for event in &events {
            match event {
                GameEvent::TrialReady(trial) => self.presenter.on_trial_ready(game, trial),
                GameEvent::Feedback(kind) => self.presenter.on_feedback(game, *kind),
                GameEvent::Cue(cue) => {
                    if self.sound_enabled {
                        self.hooks.play_cue(*cue);
                    }
                }
                GameEvent::Pulse(target) => self.hooks.pulse(*target),
                GameEvent::Shake(target) => self.hooks.shake(*target),
                GameEvent::Record(record) => self.persist(record),
                GameEvent::SessionEnded(record) => {
                    self.persist(record);
                    self.presenter.on_session_ended(record);
                }
                GameEvent::StimulusShown { .. }
                | GameEvent::PresentationFinished
                | GameEvent::AnswerRevealed => {}
            }
        }
        events
    }

    fn persist(&mut self, record: &Record) {
        let outcome = match self.sink.append(record) {
            Ok(stored) => Outcome {
                record: stored,
                persisted: true,
            },
            Err(e) => {
                warn!(game = %record.game_type(), "record not persisted: {}", e);
                Outcome {
                    record: record.clone(),
                    persisted: false,
                }
            }
        };
        self.last_outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GymError;
    use crate::game::{CueKind, FeedbackKind, SessionStatus};
    use crate::record::AggregateStats;
    use crate::stats::MemorySink;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    fn arena() -> Arena {
        Arena::new(Box::new(MemorySink::default()))
    }

    fn grid_values(arena: &Arena) -> u32 {
        match arena.active() {
            Some(ActiveGame::Grid(g)) => g.trial().map(|t| t.total_items()).unwrap_or(0),
            _ => 0,
        }
    }

    #[test]
    fn completed_grid_is_appended_to_the_sink() {
        let mut arena = arena();
        arena
            .start(GameType::GridSearch, &GameSettings::default(), rng())
            .unwrap();
        for v in 1..=grid_values(&arena) {
            arena.tick(Duration::from_millis(300));
            arena.cell_click(v);
        }
        assert!(!arena.is_running());
        let outcome = arena.last_outcome().unwrap();
        assert!(outcome.persisted);
        assert!(outcome.record.id.is_some());
        assert_eq!(arena.sink().query(GameType::GridSearch, None).unwrap().len(), 1);
    }

    #[test]
    fn starting_another_game_stops_the_first() {
        let mut arena = arena();
        let settings = GameSettings::default();
        arena.start(GameType::SequenceMemory, &settings, rng()).unwrap();
        arena.tick(Duration::from_secs(1));
        arena.start(GameType::Interference, &settings, rng()).unwrap();

        assert_eq!(
            arena.active().map(|a| a.session().game_type()),
            Some(GameType::Interference)
        );
        // stopping memory appends its record
        let memory = arena.sink().query(GameType::SequenceMemory, None).unwrap();
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn input_without_a_session_is_ignored() {
        let mut arena = arena();
        assert_eq!(arena.cell_click(1).0, InputStatus::Ignored);
        assert!(arena.tick(Duration::from_secs(1)).is_empty());
        assert!(arena.stop().is_empty());
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn append(&mut self, _record: &Record) -> Result<Record> {
            Err(GymError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "quota exceeded",
            )))
        }
        fn query(&self, _game: GameType, _limit: Option<usize>) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }
        fn aggregate(&self, _game: GameType) -> Result<AggregateStats> {
            Ok(AggregateStats::default())
        }
        fn clear(&mut self, _game: Option<GameType>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn persistence_failure_keeps_the_session_result() {
        let mut arena = Arena::new(Box::new(FailingSink));
        arena
            .start(GameType::GridSearch, &GameSettings::default(), rng())
            .unwrap();
        arena.timeout();
        let outcome = arena.last_outcome().unwrap();
        assert!(!outcome.persisted);
        assert!(!outcome.record.completed);
        assert_eq!(
            arena.active().map(|a| a.session().status()),
            Some(SessionStatus::Finished)
        );
    }

    #[derive(Default)]
    struct Recorder {
        cues: Vec<CueKind>,
        feedback: Vec<FeedbackKind>,
        ended: usize,
    }

    struct SharedHooks(Rc<RefCell<Recorder>>);
    impl FeedbackHooks for SharedHooks {
        fn play_cue(&mut self, kind: CueKind) {
            self.0.borrow_mut().cues.push(kind);
        }
    }

    struct SharedPresenter(Rc<RefCell<Recorder>>);
    impl Presenter for SharedPresenter {
        fn on_feedback(&mut self, _game: GameType, kind: FeedbackKind) {
            self.0.borrow_mut().feedback.push(kind);
        }
        fn on_session_ended(&mut self, _summary: &Record) {
            self.0.borrow_mut().ended += 1;
        }
    }

    #[test]
    fn cues_respect_the_sound_setting() {
        let seen = Rc::new(RefCell::new(Recorder::default()));
        let mut arena = arena()
            .with_hooks(Box::new(SharedHooks(seen.clone())))
            .with_presenter(Box::new(SharedPresenter(seen.clone())));
        arena.set_sound_enabled(false);
        arena
            .start(GameType::GridSearch, &GameSettings::default(), rng())
            .unwrap();
        arena.cell_click(2);
        assert!(seen.borrow().cues.is_empty());

        arena.set_sound_enabled(true);
        arena.cell_click(3);
        arena.timeout();
        assert_eq!(seen.borrow().cues.first(), Some(&CueKind::Wrong));
        assert_eq!(seen.borrow().feedback, vec![FeedbackKind::Timeout]);
        assert_eq!(seen.borrow().ended, 1);
    }

    struct GamesSeen(Rc<RefCell<Vec<GameType>>>);
    impl Presenter for GamesSeen {
        fn on_trial_ready(&mut self, game: GameType, _trial: &crate::trial::Trial) {
            self.0.borrow_mut().push(game);
        }
        fn on_feedback(&mut self, game: GameType, _kind: FeedbackKind) {
            self.0.borrow_mut().push(game);
        }
        fn on_session_ended(&mut self, summary: &Record) {
            self.0.borrow_mut().push(summary.game_type());
        }
    }

    #[test]
    fn switching_games_drops_pending_steps_of_the_old_one() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut arena = arena().with_presenter(Box::new(GamesSeen(seen.clone())));
        let settings = GameSettings::default();
        arena.start(GameType::Interference, &settings, rng()).unwrap();
        let answer = match arena.active() {
            Some(ActiveGame::Interference(g)) => g.trial().unwrap().ink(),
            _ => panic!("stroop expected"),
        };
        // the next question is now scheduled 500ms out
        arena.option_select(answer);

        arena.start(GameType::SequenceMemory, &settings, rng()).unwrap();
        seen.borrow_mut().clear();
        let events = arena.tick(Duration::from_secs(4));

        assert!(seen.borrow().iter().all(|g| *g == GameType::SequenceMemory));
        assert!(!events.iter().any(|e| matches!(
            e,
            GameEvent::Feedback(FeedbackKind::Timeout | FeedbackKind::Correct)
                | GameEvent::SessionEnded(_)
        )));
        assert!(arena
            .sink()
            .query(GameType::Interference, None)
            .unwrap()
            .is_empty());
        assert_eq!(
            arena.active().map(|a| a.session().game_type()),
            Some(GameType::SequenceMemory)
        );
        assert!(arena.is_running());
    }

    #[test]
    fn restart_replaces_the_run() {
        let mut arena = arena();
        arena
            .start(GameType::AuditoryAttention, &GameSettings::default(), rng())
            .unwrap();
        arena.tick(Duration::from_millis(700));
        arena.restart().unwrap();
        assert!(arena.is_running());
        // aborted auditory runs leave no record
        assert!(arena
            .sink()
            .query(GameType::AuditoryAttention, None)
            .unwrap()
            .is_empty());
    }
}
