//! The four game state machines.

pub mod auditory;
pub mod memory;
pub mod schulte;
pub mod stroop;

pub use auditory::AuditoryGame;
pub use memory::{MemoryGame, MemorySettings};
pub use schulte::{SchulteGame, SchulteSettings};
pub use stroop::StroopGame;

/// Drive a session for `total` in `step` sized ticks.
#[cfg(test)]
pub(crate) fn run_for(
    session: &mut dyn crate::game::GameSession,
    total: std::time::Duration,
    step: std::time::Duration,
) {
    let mut elapsed = std::time::Duration::ZERO;
    while elapsed < total {
        session.on_tick(step);
        elapsed += step;
    }
}
