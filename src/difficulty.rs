//! Difficulty state and the pure per-game adapters.
//!
//! Adapters never fail: they saturate at the floors and ceilings of each game
//! so the next trial request always stays inside the generator's range.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::trial::{ContentType, MemoryMode, MAX_AUDITORY_SEQUENCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLevel {
    pub size: usize,
    pub time_limit_secs: u64,
}

impl GridLevel {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }
}

pub const GRID_LEVELS: [GridLevel; 8] = [
    GridLevel { size: 3, time_limit_secs: 15 },
    GridLevel { size: 4, time_limit_secs: 30 },
    GridLevel { size: 5, time_limit_secs: 45 },
    GridLevel { size: 6, time_limit_secs: 60 },
    GridLevel { size: 7, time_limit_secs: 90 },
    GridLevel { size: 8, time_limit_secs: 120 },
    GridLevel { size: 9, time_limit_secs: 150 },
    GridLevel { size: 10, time_limit_secs: 180 },
];

pub const MAX_GRID_LEVEL: usize = GRID_LEVELS.len() - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Tier {
    pub fn palette_size(&self) -> usize {
        match self {
            Tier::Easy => 4,
            Tier::Medium => 5,
            Tier::Hard => 6,
        }
    }
}

/// Which attribute of the target cell the interference game scores.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StroopMode {
    /// Name the ink.
    #[default]
    Classic,
    /// Name the word.
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridDifficulty {
    pub level: usize,
    pub content: ContentType,
}

impl GridDifficulty {
    pub fn params(&self) -> GridLevel {
        GRID_LEVELS[self.level.min(MAX_GRID_LEVEL)]
    }
}

/// Interference settings are fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterferenceDifficulty {
    pub mode: StroopMode,
    pub question_count: u32,
    /// Zero means unlimited.
    pub time_limit_secs: u32,
    pub tier: Tier,
}

impl Default for InterferenceDifficulty {
    fn default() -> Self {
        Self {
            mode: StroopMode::Classic,
            question_count: 20,
            time_limit_secs: 3,
            tier: Tier::Medium,
        }
    }
}

impl InterferenceDifficulty {
    pub fn time_limit(&self) -> Option<Duration> {
        match self.time_limit_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        }
    }
}

pub const MEMORY_FLOOR: usize = 3;
/// Consecutive correct answers at one length needed to grow it.
pub const MEMORY_STREAK_TO_GROW: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDifficulty {
    pub mode: MemoryMode,
    pub sequence_length: usize,
    pub correct_streak: u32,
    /// Longest sequence answered correctly so far.
    pub best_span: usize,
}

impl MemoryDifficulty {
    pub fn new(mode: MemoryMode) -> Self {
        Self {
            mode,
            sequence_length: MEMORY_FLOOR,
            correct_streak: 0,
            best_span: MEMORY_FLOOR,
        }
    }
}

impl Default for MemoryDifficulty {
    fn default() -> Self {
        Self::new(MemoryMode::Visual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditoryDifficulty {
    pub level: u32,
    pub sequence_length: usize,
}

impl Default for AuditoryDifficulty {
    fn default() -> Self {
        Self {
            level: 1,
            sequence_length: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyState {
    Grid(GridDifficulty),
    Interference(InterferenceDifficulty),
    Memory(MemoryDifficulty),
    Auditory(AuditoryDifficulty),
}

/// Next grid level after a completed grid, or `None` at the top of the table.
pub fn next_grid_level(previous: GridDifficulty) -> Option<GridDifficulty> {
    (previous.level < MAX_GRID_LEVEL).then(|| GridDifficulty {
        level: previous.level + 1,
        ..previous
    })
}

pub fn adapt_memory(previous: MemoryDifficulty, correct: bool) -> MemoryDifficulty {
    let mut next = previous;
    if correct {
        next.correct_streak += 1;
        next.best_span = next.best_span.max(previous.sequence_length);
        if next.correct_streak >= MEMORY_STREAK_TO_GROW {
            next.sequence_length = (next.sequence_length + 1).min(next.mode.max_length());
            next.correct_streak = 0;
        }
    } else {
        next.correct_streak = 0;
        next.sequence_length = next.sequence_length.saturating_sub(1).max(MEMORY_FLOOR);
    }
    next
}

/// Only successful levels move the auditory game; a miss ends it.
pub fn adapt_auditory(previous: AuditoryDifficulty) -> AuditoryDifficulty {
    AuditoryDifficulty {
        level: previous.level + 1,
        sequence_length: (previous.sequence_length + 1).min(MAX_AUDITORY_SEQUENCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_table_sizes_and_limits() {
        let sizes: Vec<usize> = GRID_LEVELS.iter().map(|l| l.size).collect();
        assert_eq!(sizes, vec![3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(GRID_LEVELS[1].time_limit(), Duration::from_secs(30));
        assert_eq!(GRID_LEVELS[7].time_limit(), Duration::from_secs(180));
    }

    #[test]
    fn grid_level_saturates_at_top() {
        let top = GridDifficulty {
            level: MAX_GRID_LEVEL,
            content: ContentType::Number,
        };
        assert_eq!(next_grid_level(top), None);

        let first = GridDifficulty::default();
        assert_eq!(next_grid_level(first).map(|d| d.level), Some(1));
    }

    #[test]
    fn memory_grows_after_two_correct() {
        let start = MemoryDifficulty::new(MemoryMode::Digit);
        let once = adapt_memory(start, true);
        assert_eq!(once.sequence_length, 3);
        assert_eq!(once.correct_streak, 1);

        let twice = adapt_memory(once, true);
        assert_eq!(twice.sequence_length, 4);
        assert_eq!(twice.correct_streak, 0);
        assert_eq!(twice.best_span, 3);
    }

    #[test]
    fn memory_never_drops_below_floor() {
        let mut state = MemoryDifficulty::new(MemoryMode::Visual);
        for _ in 0..5 {
            state = adapt_memory(state, false);
            assert_eq!(state.sequence_length, MEMORY_FLOOR);
            assert_eq!(state.correct_streak, 0);
        }
    }

    #[test]
    fn memory_miss_resets_streak_and_shrinks() {
        let state = MemoryDifficulty {
            mode: MemoryMode::Digit,
            sequence_length: 6,
            correct_streak: 1,
            best_span: 6,
        };
        let next = adapt_memory(state, false);
        assert_eq!(next.sequence_length, 5);
        assert_eq!(next.correct_streak, 0);
        assert_eq!(next.best_span, 6);
    }

    #[test]
    fn memory_visual_caps_at_nine() {
        let mut state = MemoryDifficulty {
            mode: MemoryMode::Visual,
            sequence_length: 9,
            correct_streak: 0,
            best_span: 9,
        };
        state = adapt_memory(adapt_memory(state, true), true);
        assert_eq!(state.sequence_length, 9);
    }

    #[test]
    fn auditory_increases_and_caps() {
        let next = adapt_auditory(AuditoryDifficulty::default());
        assert_eq!(next.level, 2);
        assert_eq!(next.sequence_length, 6);

        let capped = adapt_auditory(AuditoryDifficulty {
            level: 30,
            sequence_length: MAX_AUDITORY_SEQUENCE,
        });
        assert_eq!(capped.sequence_length, MAX_AUDITORY_SEQUENCE);
        assert_eq!(capped.level, 31);
    }

    #[test]
    fn interference_defaults() {
        let d = InterferenceDifficulty::default();
        assert_eq!(d.question_count, 20);
        assert_eq!(d.time_limit(), Some(Duration::from_secs(3)));
        assert_eq!(d.tier.palette_size(), 5);
        let unlimited = InterferenceDifficulty {
            time_limit_secs: 0,
            ..d
        };
        assert_eq!(unlimited.time_limit(), None);
    }
}
