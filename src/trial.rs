//! Trial generation for all four games.
//!
//! Every generator is pure apart from the random source passed in, so a
//! seeded `StdRng` reproduces a trial exactly. Generators validate their
//! parameters and never clamp: out-of-range requests fail with
//! [`GymError::InvalidDifficulty`].

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::difficulty::{DifficultyState, Tier, GRID_LEVELS};
use crate::error::{GymError, Result};
use crate::game::GameType;

/// Number of colours available for grid cell backgrounds.
pub const GRID_PALETTE_SIZE: usize = 6;
/// Largest grid side that may use letter labels.
pub const MAX_LETTER_GRID: usize = 5;
pub const STROOP_ROWS: usize = 4;
pub const STROOP_COLS: usize = 5;
pub const VISUAL_POSITIONS: usize = 9;
pub const MAX_DIGIT_SEQUENCE: usize = 20;
pub const MAX_AUDITORY_SEQUENCE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Number,
    Letter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub value: u32,
    pub label: String,
    pub color: usize,
}

/// A shuffled N×N layout, cells in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTrial {
    pub size: usize,
    pub content: ContentType,
    pub cells: Vec<GridCell>,
}

impl GridTrial {
    pub fn total_items(&self) -> u32 {
        (self.size * self.size) as u32
    }

    pub fn cell(&self, row: usize, col: usize) -> &GridCell {
        &self.cells[row * self.size + col]
    }

    /// Label shown for the item the player must find next.
    pub fn label_for(&self, value: u32) -> String {
        item_label(self.content, value)
    }
}

fn item_label(content: ContentType, value: u32) -> String {
    match content {
        ContentType::Number => value.to_string(),
        ContentType::Letter => {
            let offset = ((value.saturating_sub(1)) % 26) as u8;
            char::from(b'A' + offset).to_string()
        }
    }
}

/// The colour words of the interference palette, in palette order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Red,
    Blue,
    White,
    Yellow,
    Purple,
    Black,
}

impl ColorName {
    pub const PALETTE: [ColorName; 6] = [
        ColorName::Red,
        ColorName::Blue,
        ColorName::White,
        ColorName::Yellow,
        ColorName::Purple,
        ColorName::Black,
    ];

    /// The word as displayed on screen.
    pub fn word(&self) -> &'static str {
        match self {
            ColorName::Red => "红色",
            ColorName::Blue => "蓝色",
            ColorName::White => "白色",
            ColorName::Yellow => "黄色",
            ColorName::Purple => "紫色",
            ColorName::Black => "黑色",
        }
    }

    pub fn english(&self) -> &'static str {
        match self {
            ColorName::Red => "red",
            ColorName::Blue => "blue",
            ColorName::White => "white",
            ColorName::Yellow => "yellow",
            ColorName::Purple => "purple",
            ColorName::Black => "black",
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            ColorName::Red => (0xFF, 0x6B, 0x6B),
            ColorName::Blue => (0x4E, 0xCD, 0xC4),
            ColorName::White => (0xFF, 0xFF, 0xFF),
            ColorName::Yellow => (0xFF, 0xE6, 0x6D),
            ColorName::Purple => (0xC7, 0xCE, 0xEA),
            ColorName::Black => (0x00, 0x00, 0x00),
        }
    }

    pub fn from_word(word: &str) -> Option<ColorName> {
        ColorName::PALETTE.into_iter().find(|c| c.word() == word)
    }

    /// Palette slice active for a difficulty tier.
    pub fn slice_for(tier: Tier) -> &'static [ColorName] {
        &ColorName::PALETTE[..tier.palette_size()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StroopCell {
    pub word: ColorName,
    pub ink: ColorName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterferenceTrial {
    /// `STROOP_ROWS` rows of `STROOP_COLS` cells.
    pub matrix: Vec<Vec<StroopCell>>,
    pub target: (usize, usize),
    /// Choices offered to the player: the active palette slice, shuffled.
    pub options: Vec<ColorName>,
}

impl InterferenceTrial {
    pub fn target_cell(&self) -> StroopCell {
        self.matrix[self.target.0][self.target.1]
    }

    pub fn word(&self) -> ColorName {
        self.target_cell().word
    }

    pub fn ink(&self) -> ColorName {
        self.target_cell().ink
    }
}

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
pub enum MemoryMode {
    #[default]
    Visual,
    Digit,
}

impl MemoryMode {
    pub fn max_length(&self) -> usize {
        match self {
            MemoryMode::Visual => VISUAL_POSITIONS,
            MemoryMode::Digit => MAX_DIGIT_SEQUENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTrial {
    pub mode: MemoryMode,
    /// Grid positions 1..=9 in visual mode, digits 0..=9 in digit mode.
    pub items: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    High,
    Low,
    Short,
    Long,
}

impl SoundKind {
    pub const ALL: [SoundKind; 4] = [SoundKind::High, SoundKind::Low, SoundKind::Short, SoundKind::Long];

    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::High => "high",
            SoundKind::Low => "low",
            SoundKind::Short => "short",
            SoundKind::Long => "long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditoryTrial {
    pub target: SoundKind,
    pub sequence: Vec<SoundKind>,
}

impl AuditoryTrial {
    /// 1-based positions at which the target occurs.
    pub fn target_positions(&self) -> Vec<usize> {
        self.sequence
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == self.target)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trial {
    Grid(GridTrial),
    Interference(InterferenceTrial),
    Sequence(SequenceTrial),
    Auditory(AuditoryTrial),
}

impl Trial {
    pub fn game_type(&self) -> GameType {
        match self {
            Trial::Grid(_) => GameType::GridSearch,
            Trial::Interference(_) => GameType::Interference,
            Trial::Sequence(_) => GameType::SequenceMemory,
            Trial::Auditory(_) => GameType::AuditoryAttention,
        }
    }
}

/// Build the next trial for any game from its difficulty state.
///
/// The auditory target is drawn here too; sessions that need to pick the
/// target themselves call [`generate_auditory`] directly.
pub fn generate<R: Rng + ?Sized>(state: &DifficultyState, rng: &mut R) -> Result<Trial> {
    match state {
        DifficultyState::Grid(grid) => {
            generate_grid(grid.level, grid.content, rng).map(Trial::Grid)
        }
        DifficultyState::Interference(settings) => {
            Ok(Trial::Interference(generate_interference(settings.tier, rng)))
        }
        DifficultyState::Memory(memory) => {
            generate_sequence(memory.mode, memory.sequence_length, rng).map(Trial::Sequence)
        }
        DifficultyState::Auditory(auditory) => {
            let target = *SoundKind::ALL.choose(rng).unwrap_or(&SoundKind::High);
            generate_auditory(target, auditory.sequence_length, rng).map(Trial::Auditory)
        }
    }
}

pub fn generate_grid<R: Rng + ?Sized>(
    level: usize,
    content: ContentType,
    rng: &mut R,
) -> Result<GridTrial> {
    let Some(params) = GRID_LEVELS.get(level) else {
        return Err(GymError::invalid_difficulty(
            GameType::GridSearch,
            format!("level {} outside 0..={}", level, GRID_LEVELS.len() - 1),
        ));
    };
    let size = params.size;
    if content == ContentType::Letter && size > MAX_LETTER_GRID {
        return Err(GymError::invalid_difficulty(
            GameType::GridSearch,
            format!("letter content needs size <= {}, got {}", MAX_LETTER_GRID, size),
        ));
    }

    let mut values: Vec<u32> = (1..=(size * size) as u32).collect();
    values.shuffle(rng);

    let colors = assign_colors(size, GRID_PALETTE_SIZE, rng);

    let cells = values
        .into_iter()
        .zip(colors)
        .map(|(value, color)| GridCell {
            value,
            label: item_label(content, value),
            color,
        })
        .collect();

    Ok(GridTrial {
        size,
        content,
        cells,
    })
}

/// Row-major colour fill where each cell avoids its up and left neighbour.
///
/// With fewer than three colours a cell can run out of choices; it then takes
/// a uniformly random colour and may match a neighbour.
pub fn assign_colors<R: Rng + ?Sized>(size: usize, palette: usize, rng: &mut R) -> Vec<usize> {
    let mut colors: Vec<usize> = Vec::with_capacity(size * size);
    if palette == 0 {
        return vec![0; size * size];
    }
    for row in 0..size {
        for col in 0..size {
            let up = (row > 0).then(|| colors[(row - 1) * size + col]);
            let left = (col > 0).then(|| colors[row * size + col - 1]);
            let free: Vec<usize> = (0..palette)
                .filter(|c| Some(*c) != up && Some(*c) != left)
                .collect();
            let color = match free.choose(rng) {
                Some(c) => *c,
                None => rng.gen_range(0..palette),
            };
            colors.push(color);
        }
    }
    colors
}

pub fn generate_interference<R: Rng + ?Sized>(tier: Tier, rng: &mut R) -> InterferenceTrial {
    let slice = ColorName::slice_for(tier);
    let mut matrix: Vec<Vec<StroopCell>> = Vec::with_capacity(STROOP_ROWS);

    for row in 0..STROOP_ROWS {
        let mut cells: Vec<StroopCell> = Vec::with_capacity(STROOP_COLS);
        for col in 0..STROOP_COLS {
            let up = (row > 0).then(|| matrix[row - 1][col].word);
            let left = (col > 0).then(|| cells[col - 1].word);
            let words: Vec<ColorName> = slice
                .iter()
                .copied()
                .filter(|w| Some(*w) != up && Some(*w) != left)
                .collect();
            let word = *words.choose(rng).unwrap_or(&slice[0]);
            cells.push(StroopCell {
                word,
                ink: pick_ink(word, slice, rng),
            });
        }
        matrix.push(cells);
    }

    let target = (rng.gen_range(0..STROOP_ROWS), rng.gen_range(0..STROOP_COLS));
    let mut options = slice.to_vec();
    options.shuffle(rng);

    InterferenceTrial {
        matrix,
        target,
        options,
    }
}

/// Uniform ink from the slice, never the word's own colour.
fn pick_ink<R: Rng + ?Sized>(word: ColorName, slice: &[ColorName], rng: &mut R) -> ColorName {
    let inks: Vec<ColorName> = slice.iter().copied().filter(|c| *c != word).collect();
    *inks.choose(rng).unwrap_or(&word)
}

pub fn generate_sequence<R: Rng + ?Sized>(
    mode: MemoryMode,
    length: usize,
    rng: &mut R,
) -> Result<SequenceTrial> {
    if length == 0 || length > mode.max_length() {
        return Err(GymError::invalid_difficulty(
            GameType::SequenceMemory,
            format!("{:?} length {} outside 1..={}", mode, length, mode.max_length()),
        ));
    }

    let items = match mode {
        MemoryMode::Visual => {
            let mut positions: Vec<u8> = (1..=VISUAL_POSITIONS as u8).collect();
            positions.shuffle(rng);
            positions.truncate(length);
            positions
        }
        MemoryMode::Digit => (0..length).map(|_| rng.gen_range(0..10u8)).collect(),
    };

    Ok(SequenceTrial { mode, items })
}

pub fn generate_auditory<R: Rng + ?Sized>(
    target: SoundKind,
    length: usize,
    rng: &mut R,
) -> Result<AuditoryTrial> {
    if length == 0 || length > MAX_AUDITORY_SEQUENCE {
        return Err(GymError::invalid_difficulty(
            GameType::AuditoryAttention,
            format!("length {} outside 1..={}", length, MAX_AUDITORY_SEQUENCE),
        ));
    }

    let mut sequence: Vec<SoundKind> = (0..length)
        .map(|_| SoundKind::ALL[rng.gen_range(0..SoundKind::ALL.len())])
        .collect();

    if !sequence.contains(&target) {
        let idx = rng.gen_range(0..length);
        sequence[idx] = target;
    }

    Ok(AuditoryTrial { target, sequence })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::{AuditoryDifficulty, GridDifficulty, MemoryDifficulty};
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn grid_is_a_permutation_for_every_level() {
        let mut rng = rng(1);
        for level in 0..GRID_LEVELS.len() {
            let trial = generate_grid(level, ContentType::Number, &mut rng).unwrap();
            let n = trial.size * trial.size;
            assert_eq!(trial.cells.len(), n);
            let sorted: Vec<u32> = trial.cells.iter().map(|c| c.value).sorted().collect();
            assert_eq!(sorted, (1..=n as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn grid_neighbours_never_share_a_colour() {
        for seed in 0..50 {
            let mut rng = rng(seed);
            let trial = generate_grid(seed as usize % 8, ContentType::Number, &mut rng).unwrap();
            let n = trial.size;
            for row in 0..n {
                for col in 0..n {
                    let here = trial.cell(row, col).color;
                    assert!(here < GRID_PALETTE_SIZE);
                    if row + 1 < n {
                        assert_ne!(here, trial.cell(row + 1, col).color);
                    }
                    if col + 1 < n {
                        assert_ne!(here, trial.cell(row, col + 1).color);
                    }
                }
            }
        }
    }

    #[test]
    fn tiny_palette_falls_back_to_random_colours() {
        let mut rng = rng(3);
        let colors = assign_colors(4, 2, &mut rng);
        assert_eq!(colors.len(), 16);
        assert!(colors.iter().all(|c| *c < 2));
    }

    #[test]
    fn letter_grid_labels_cycle_from_a() {
        let mut rng = rng(9);
        let trial = generate_grid(2, ContentType::Letter, &mut rng).unwrap();
        assert_eq!(trial.size, 5);
        for cell in &trial.cells {
            let expected = char::from(b'A' + ((cell.value - 1) % 26) as u8).to_string();
            assert_eq!(cell.label, expected);
        }
        assert_eq!(trial.label_for(26), "Z");
        assert_eq!(trial.label_for(27), "A");
    }

    #[test]
    fn letter_content_rejected_above_five() {
        let mut rng = rng(2);
        let err = generate_grid(3, ContentType::Letter, &mut rng).unwrap_err();
        assert!(matches!(err, GymError::InvalidDifficulty { .. }));
    }

    #[test]
    fn grid_level_out_of_range_is_invalid() {
        let mut rng = rng(2);
        assert!(generate_grid(8, ContentType::Number, &mut rng).is_err());
    }

    #[test]
    fn interference_ink_never_matches_word() {
        for tier in [Tier::Easy, Tier::Medium, Tier::Hard] {
            for seed in 0..40 {
                let trial = generate_interference(tier, &mut rng(seed));
                let slice = ColorName::slice_for(tier);
                assert_eq!(trial.options.len(), slice.len());
                for (r, row) in trial.matrix.iter().enumerate() {
                    assert_eq!(row.len(), STROOP_COLS);
                    for (c, cell) in row.iter().enumerate() {
                        assert_ne!(cell.word, cell.ink);
                        assert!(slice.contains(&cell.word));
                        assert!(slice.contains(&cell.ink));
                        if r > 0 {
                            assert_ne!(cell.word, trial.matrix[r - 1][c].word);
                        }
                        if c > 0 {
                            assert_ne!(cell.word, row[c - 1].word);
                        }
                    }
                }
                assert_ne!(trial.word(), trial.ink());
            }
        }
    }

    #[test]
    fn visual_sequence_has_distinct_positions() {
        let trial = generate_sequence(MemoryMode::Visual, 9, &mut rng(4)).unwrap();
        assert_eq!(trial.items.iter().unique().count(), 9);
        assert!(trial.items.iter().all(|p| (1..=9).contains(p)));
    }

    #[test]
    fn digit_sequence_stays_in_range() {
        let trial = generate_sequence(MemoryMode::Digit, 15, &mut rng(5)).unwrap();
        assert_eq!(trial.items.len(), 15);
        assert!(trial.items.iter().all(|d| *d <= 9));
    }

    #[test]
    fn sequence_length_limits() {
        assert!(generate_sequence(MemoryMode::Visual, 10, &mut rng(1)).is_err());
        assert!(generate_sequence(MemoryMode::Digit, 0, &mut rng(1)).is_err());
        assert!(generate_sequence(MemoryMode::Digit, 20, &mut rng(1)).is_ok());
    }

    #[test]
    fn auditory_target_always_present() {
        for seed in 0..200 {
            for target in SoundKind::ALL {
                let trial = generate_auditory(target, 1 + (seed as usize % 8), &mut rng(seed)).unwrap();
                assert!(trial.sequence.contains(&target));
                assert!(!trial.target_positions().is_empty());
            }
        }
    }

    #[test]
    fn target_positions_are_one_based() {
        let trial = AuditoryTrial {
            target: SoundKind::Low,
            sequence: vec![
                SoundKind::High,
                SoundKind::Low,
                SoundKind::Short,
                SoundKind::Long,
                SoundKind::Low,
            ],
        };
        assert_eq!(trial.target_positions(), vec![2, 5]);
    }

    #[test]
    fn dispatch_matches_difficulty_kind() {
        let mut rng = rng(11);
        let grid = generate(&DifficultyState::Grid(GridDifficulty::default()), &mut rng).unwrap();
        assert_eq!(grid.game_type(), GameType::GridSearch);

        let memory = generate(
            &DifficultyState::Memory(MemoryDifficulty::new(MemoryMode::Digit)),
            &mut rng,
        )
        .unwrap();
        assert!(matches!(memory, Trial::Sequence(ref s) if s.items.len() == 3));

        let auditory =
            generate(&DifficultyState::Auditory(AuditoryDifficulty::default()), &mut rng).unwrap();
        assert!(matches!(auditory, Trial::Auditory(ref a) if a.sequence.len() == 5));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = generate_grid(1, ContentType::Number, &mut rng(42)).unwrap();
        let b = generate_grid(1, ContentType::Number, &mut rng(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn colour_words_round_trip() {
        for color in ColorName::PALETTE {
            assert_eq!(ColorName::from_word(color.word()), Some(color));
        }
        assert_eq!(ColorName::slice_for(Tier::Easy).len(), 4);
        assert_eq!(ColorName::slice_for(Tier::Medium).len(), 5);
        assert_eq!(ColorName::slice_for(Tier::Hard).len(), 6);
    }
}
