use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, warn};

use crate::arena::{ActiveGame, Arena, Outcome};
use crate::config::{Config, ConfigStore};
use crate::error::Result;
use crate::game::{FeedbackKind, GameEvent, GameSession, GameType, InputStatus};
use crate::record::{AggregateStats, Record};
use crate::runtime::GymEvent;

/// Plays shown in the history chart.
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Menu,
    Playing,
    Result,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

/// Menu entries below the four games.
pub const MENU_LEN: usize = GameType::ALL.len() + 1;

pub struct App {
    pub state: AppState,
    pub arena: Arena,
    pub config: Config,
    config_store: Option<Box<dyn ConfigStore>>,
    pub menu_index: usize,
    pub history_game: GameType,
    /// Grid cursor as (row, col).
    pub cursor: (usize, usize),
    /// Auditory position cursor, 1-based.
    pub position_cursor: usize,
    pub last_feedback: Option<FeedbackKind>,
    pub result: Option<Outcome>,
    seed: Option<u64>,
    runs: u64,
}

impl App {
    pub fn new(arena: Arena, config: Config) -> Self {
        let mut arena = arena;
        arena.set_sound_enabled(config.sound_enabled);
        Self {
            state: AppState::Menu,
            arena,
            config,
            config_store: None,
            menu_index: 0,
            history_game: GameType::GridSearch,
            cursor: (0, 0),
            position_cursor: 1,
            last_feedback: None,
            result: None,
            seed: None,
            runs: 0,
        }
    }

    pub fn with_config_store(mut self, store: Box<dyn ConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    /// Seed every session's generator, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn next_rng(&mut self) -> StdRng {
        self.runs += 1;
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.runs)),
            None => StdRng::from_entropy(),
        }
    }

    pub fn active_game(&self) -> Option<GameType> {
        self.arena.active().map(|a| a.session().game_type())
    }

    pub fn start_game(&mut self, game: GameType) -> Result<()> {
        let settings = self.config.game_settings();
        let rng = self.next_rng();
        self.reset_view();
        match self.arena.start(game, &settings, rng) {
            Ok(events) => {
                self.state = AppState::Playing;
                self.absorb(events);
                Ok(())
            }
            Err(e) => {
                self.state = AppState::Menu;
                Err(e)
            }
        }
    }

    /// Start from the menu; a failed start leaves the menu up.
    fn launch(&mut self, game: GameType) {
        if let Err(e) = self.start_game(game) {
            warn!(%game, "could not start: {}", e);
        }
    }

    fn reset_view(&mut self) {
        self.cursor = (0, 0);
        self.position_cursor = 1;
        self.last_feedback = None;
        self.result = None;
    }

    /// Handle one runner step. The session clock advances by `elapsed`
    /// before the event itself, so time spent between keys still counts.
    pub fn on_event(&mut self, event: GymEvent, elapsed: Duration) -> AppAction {
        self.on_tick(elapsed);
        match event {
            GymEvent::Key(key) => self.on_key(key),
            GymEvent::Resize | GymEvent::Tick => AppAction::Continue,
        }
    }

    pub fn on_tick(&mut self, dt: Duration) {
        if self.state == AppState::Playing {
            let events = self.arena.tick(dt);
            self.absorb(events);
        }
    }

    fn absorb(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::TrialReady(_) => {
                    self.cursor = (0, 0);
                    self.position_cursor = 1;
                    self.last_feedback = None;
                }
                GameEvent::Feedback(kind) => self.last_feedback = Some(kind),
                GameEvent::SessionEnded(_) => {
                    self.result = self.arena.last_outcome().cloned();
                    self.state = AppState::Result;
                }
                _ => {}
            }
        }
    }

    fn apply(&mut self, (_, events): (InputStatus, Vec<GameEvent>)) {
        self.absorb(events);
    }

    /// End the running session from the keyboard.
    pub fn stop_game(&mut self) {
        let events = self.arena.stop();
        self.absorb(events);
        if self.state == AppState::Playing {
            self.state = AppState::Menu;
        }
    }

    pub fn toggle_sound(&mut self) {
        self.config.sound_enabled = !self.config.sound_enabled;
        self.arena.set_sound_enabled(self.config.sound_enabled);
        self.save_config();
    }

    fn save_config(&self) {
        if let Some(store) = &self.config_store {
            if let Err(e) = store.save(&self.config) {
                warn!("could not save config: {}", e);
            }
        }
    }

    pub fn history(&self) -> Vec<Record> {
        self.arena
            .sink()
            .query(self.history_game, Some(HISTORY_LIMIT))
            .unwrap_or_else(|e| {
                warn!("could not read history: {}", e);
                Vec::new()
            })
    }

    pub fn history_stats(&self) -> AggregateStats {
        self.arena
            .sink()
            .aggregate(self.history_game)
            .unwrap_or_default()
    }

    pub fn on_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.arena.close();
            return AppAction::Quit;
        }

        match self.state {
            AppState::Menu => return self.on_menu_key(key.code),
            AppState::Playing => self.on_play_key(key.code),
            AppState::Result => self.on_result_key(key.code),
            AppState::History => self.on_history_key(key.code),
        }
        AppAction::Continue
    }

    fn on_menu_key(&mut self, code: KeyCode) -> AppAction {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Up => self.menu_index = (self.menu_index + MENU_LEN - 1) % MENU_LEN,
            KeyCode::Down => self.menu_index = (self.menu_index + 1) % MENU_LEN,
            KeyCode::Char('s') => self.toggle_sound(),
            KeyCode::Char('h') => self.state = AppState::History,
            KeyCode::Enter => match GameType::ALL.get(self.menu_index) {
                Some(game) => self.launch(*game),
                None => self.state = AppState::History,
            },
            KeyCode::Char(c) => {
                if let Some(game) = c
                    .to_digit(10)
                    .and_then(|d| GameType::ALL.get((d as usize).wrapping_sub(1)))
                {
                    self.launch(*game);
                }
            }
            _ => {}
        }
        AppAction::Continue
    }

    fn on_result_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('r') => {
                self.reset_view();
                match self.arena.restart() {
                    Ok(events) => {
                        self.state = AppState::Playing;
                        self.absorb(events);
                    }
                    Err(e) => {
                        error!("could not restart: {}", e);
                        self.state = AppState::Menu;
                    }
                }
            }
            KeyCode::Char('h') => {
                if let Some(game) = self.active_game() {
                    self.history_game = game;
                }
                self.state = AppState::History;
            }
            KeyCode::Esc | KeyCode::Char('m') => {
                self.arena.close();
                self.state = AppState::Menu;
            }
            _ => {}
        }
    }

    fn on_history_key(&mut self, code: KeyCode) {
        let idx = GameType::ALL
            .iter()
            .position(|g| *g == self.history_game)
            .unwrap_or(0);
        let len = GameType::ALL.len();
        match code {
            KeyCode::Left => self.history_game = GameType::ALL[(idx + len - 1) % len],
            KeyCode::Right | KeyCode::Tab => self.history_game = GameType::ALL[(idx + 1) % len],
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                self.state = match self.result {
                    Some(_) => AppState::Result,
                    None => AppState::Menu,
                }
            }
            _ => {}
        }
    }

    fn on_play_key(&mut self, code: KeyCode) {
        if code == KeyCode::Esc {
            self.stop_game();
            return;
        }
        let Some(game) = self.active_game() else {
            return;
        };
        match game {
            GameType::GridSearch => self.on_grid_key(code),
            GameType::Interference => {
                if let KeyCode::Char(c) = code {
                    let choice = self.stroop_option(c);
                    if let Some(choice) = choice {
                        let result = self.arena.option_select(choice);
                        self.apply(result);
                    }
                }
            }
            GameType::SequenceMemory => self.on_memory_key(code),
            GameType::AuditoryAttention => self.on_auditory_key(code),
        }
    }

    fn stroop_option(&self, key: char) -> Option<crate::trial::ColorName> {
        let idx = key.to_digit(10)?.checked_sub(1)? as usize;
        match self.arena.active() {
            Some(ActiveGame::Interference(g)) => g.trial()?.options.get(idx).copied(),
            _ => None,
        }
    }

    fn on_grid_key(&mut self, code: KeyCode) {
        let Some(ActiveGame::Grid(g)) = self.arena.active() else {
            return;
        };
        let Some(size) = g.trial().map(|t| t.size) else {
            return;
        };
        let (row, col) = self.cursor;
        match code {
            KeyCode::Up => self.cursor = (row.saturating_sub(1), col),
            KeyCode::Down => self.cursor = ((row + 1).min(size - 1), col),
            KeyCode::Left => self.cursor = (row, col.saturating_sub(1)),
            KeyCode::Right => self.cursor = (row, (col + 1).min(size - 1)),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let value = g.trial().map(|t| t.cell(row, col).value);
                if let Some(value) = value {
                    let result = self.arena.cell_click(value);
                    self.apply(result);
                }
            }
            _ => {}
        }
    }

    fn on_memory_key(&mut self, code: KeyCode) {
        let visual = matches!(
            self.arena.active(),
            Some(ActiveGame::Memory(g)) if g.mode() == crate::trial::MemoryMode::Visual
        );
        let result = match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let d = c.to_digit(10).unwrap_or(0);
                if visual {
                    self.arena.cell_click(d)
                } else {
                    self.arena.digit_key(d as u8)
                }
            }
            KeyCode::Enter => self.arena.submit(),
            KeyCode::Backspace => self.arena.backspace(),
            KeyCode::Delete => self.arena.clear(),
            _ => return,
        };
        self.apply(result);
    }

    fn on_auditory_key(&mut self, code: KeyCode) {
        let len = match self.arena.active() {
            Some(ActiveGame::Auditory(g)) => g.trial().map(|t| t.sequence.len()).unwrap_or(0),
            _ => 0,
        };
        let result = match code {
            KeyCode::Left => {
                self.position_cursor = self.position_cursor.saturating_sub(1).max(1);
                return;
            }
            KeyCode::Right => {
                self.position_cursor = (self.position_cursor + 1).min(len.max(1));
                return;
            }
            KeyCode::Char(' ') => self.arena.cell_click(self.position_cursor as u32),
            KeyCode::Char('r') => self.arena.replay(),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.arena.cell_click(c.to_digit(10).unwrap_or(0))
            }
            KeyCode::Enter => self.arena.submit(),
            KeyCode::Backspace => self.arena.backspace(),
            KeyCode::Delete => self.arena.clear(),
            _ => return,
        };
        self.apply(result);
    }
}
