use std::collections::HashSet;
use std::fmt;

use crate::difficulty::StroopMode;
use crate::trial::{ColorName, InterferenceTrial};

/// Ordered equality, used for memory answers.
pub fn sequence_matches<T: PartialEq>(expected: &[T], response: &[T]) -> bool {
    expected == response
}

/// Set equality with exact cardinality: no duplicates, nothing missing and
/// nothing extra.
pub fn positions_match(targets: &[usize], response: &[usize]) -> bool {
    let expected: HashSet<usize> = targets.iter().copied().collect();
    let given: HashSet<usize> = response.iter().copied().collect();
    given.len() == response.len() && given == expected
}

/// The colour that counts as correct for this trial in the given mode.
pub fn interference_answer(trial: &InterferenceTrial, mode: StroopMode) -> ColorName {
    match mode {
        StroopMode::Classic => trial.ink(),
        StroopMode::Reverse => trial.word(),
    }
}

pub fn interference_correct(trial: &InterferenceTrial, mode: StroopMode, choice: ColorName) -> bool {
    interference_answer(trial, mode) == choice
}

/// Grid accuracy in percent. A run without any clicks counts as perfect.
pub fn grid_accuracy(completed: u32, errors: u32) -> f64 {
    let clicks = completed + errors;
    if clicks == 0 {
        return 100.0;
    }
    completed as f64 / clicks as f64 * 100.0
}

/// Interference accuracy in percent of the configured question count.
pub fn interference_accuracy(correct: u32, question_count: u32) -> f64 {
    if question_count == 0 {
        return 0.0;
    }
    correct as f64 / question_count as f64 * 100.0
}

/// Fraction of target positions the player named, in 0..=1.
pub fn auditory_accuracy(targets: &[usize], response: &[usize]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let given: HashSet<usize> = response.iter().copied().collect();
    let matched = targets.iter().filter(|t| given.contains(t)).count();
    matched as f64 / targets.len() as f64
}

/// Performance comment shown on the result overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comment {
    Excellent,
    Good,
    Fair,
    KeepPracticing,
    AlmostThere,
    GoodProgress,
    NeedsPractice,
    DontGiveUp,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Comment::Excellent => "Excellent! Outstanding focus.",
            Comment::Good => "Good job, keep it up.",
            Comment::Fair => "Not bad, there is room to improve.",
            Comment::KeepPracticing => "Keep practicing, you will get faster.",
            Comment::AlmostThere => "So close! Almost finished.",
            Comment::GoodProgress => "Good progress, try to speed up.",
            Comment::NeedsPractice => "Needs more practice.",
            Comment::DontGiveUp => "Don't give up, try again.",
        };
        write!(f, "{}", text)
    }
}

/// Comment for a completed grid, from seconds per item and wrong clicks.
pub fn grid_completion_comment(avg_secs_per_item: f64, errors: u32) -> Comment {
    match (avg_secs_per_item, errors) {
        (t, 0) if t < 0.5 => Comment::Excellent,
        (t, e) if t < 1.0 && e < 3 => Comment::Good,
        (t, e) if t < 2.0 && e < 5 => Comment::Fair,
        _ => Comment::KeepPracticing,
    }
}

/// Comment for a grid that ran out of time, from percent completed.
pub fn grid_timeout_comment(percent_completed: f64) -> Comment {
    match percent_completed {
        p if p >= 90.0 => Comment::AlmostThere,
        p if p >= 70.0 => Comment::GoodProgress,
        p if p >= 50.0 => Comment::NeedsPractice,
        _ => Comment::DontGiveUp,
    }
}

pub fn interference_comment(accuracy_percent: f64, avg_response_secs: f64) -> Comment {
    match (accuracy_percent, avg_response_secs) {
        (a, t) if a >= 90.0 && t < 1.0 => Comment::Excellent,
        (a, t) if a >= 80.0 && t < 2.0 => Comment::Good,
        (a, t) if a >= 60.0 && t < 3.0 => Comment::Fair,
        _ => Comment::KeepPracticing,
    }
}

pub fn auditory_comment(level: u32) -> Comment {
    match level {
        l if l >= 8 => Comment::Excellent,
        l if l >= 6 => Comment::Good,
        l if l >= 4 => Comment::Fair,
        _ => Comment::KeepPracticing,
    }
}

pub fn memory_comment(span: usize) -> Comment {
    match span {
        s if s >= 7 => Comment::Excellent,
        s if s >= 5 => Comment::Good,
        s if s >= 4 => Comment::Fair,
        _ => Comment::KeepPracticing,
    }
}
