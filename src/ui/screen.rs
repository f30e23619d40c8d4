use crossterm::event::KeyEvent;
use ratatui::Frame;

use crate::app::{App, AppState};
use crate::ui::history::render_history;

/// A UI Screen boundary: responsible for rendering and optional key handling
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
    /// Optional per-screen key handling. Returns true if the key was handled.
    fn on_key(&mut self, _key: KeyEvent, _app: &mut App) -> bool {
        false
    }
}

/// Game picker
pub struct MenuScreen;

impl Screen for MenuScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// The running game board
pub struct GameScreen;

impl Screen for GameScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Finished board with the result overlay on top
pub struct ResultScreen;

impl Screen for ResultScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Past records - uses dedicated renderer
pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Menu => Box::new(MenuScreen),
        AppState::Playing => Box::new(GameScreen),
        AppState::Result => Box::new(ResultScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
