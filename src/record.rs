use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::difficulty::{StroopMode, Tier};
use crate::game::GameType;
use crate::scoring::{self, Comment};
use crate::trial::{ContentType, MemoryMode};
use crate::util::mean;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMetrics {
    /// Seconds from the first grid appearing to completion or timeout.
    pub time: f64,
    pub time_limit: u64,
    pub grid_size: usize,
    pub content_type: ContentType,
    pub error_count: u32,
    pub completed_items: u32,
    pub total_items: u32,
    /// Percent.
    pub accuracy: f64,
    pub timeout: bool,
    /// 1-based level index.
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterferenceMetrics {
    pub mode: StroopMode,
    pub question_count: u32,
    pub time_limit: u32,
    pub tier: Tier,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub accuracy: f64,
    /// Seconds.
    pub average_response_time: f64,
    /// Seconds.
    pub total_time: f64,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub mode: MemoryMode,
    /// Best span reached during the session.
    pub level: usize,
    pub sequence_length: usize,
    pub correct_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditoryMetrics {
    pub level: u32,
    pub sequence_length: usize,
    /// Fraction in 0..=1.
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "kebab-case")]
pub enum RecordMetrics {
    GridSearch(GridMetrics),
    Interference(InterferenceMetrics),
    SequenceMemory(MemoryMetrics),
    AuditoryAttention(AuditoryMetrics),
}

impl RecordMetrics {
    pub fn game_type(&self) -> GameType {
        match self {
            RecordMetrics::GridSearch(_) => GameType::GridSearch,
            RecordMetrics::Interference(_) => GameType::Interference,
            RecordMetrics::SequenceMemory(_) => GameType::SequenceMemory,
            RecordMetrics::AuditoryAttention(_) => GameType::AuditoryAttention,
        }
    }
}

/// Summary of one finished session or level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Assigned by the sink on append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: DateTime<Local>,
    pub completed: bool,
    #[serde(flatten)]
    pub metrics: RecordMetrics,
}

impl Record {
    pub fn new(completed: bool, metrics: RecordMetrics) -> Self {
        Self {
            id: None,
            timestamp: Local::now(),
            completed,
            metrics,
        }
    }

    pub fn game_type(&self) -> GameType {
        self.metrics.game_type()
    }

    /// The headline number used for best/average statistics.
    pub fn headline(&self) -> Option<f64> {
        match &self.metrics {
            RecordMetrics::GridSearch(m) => self.completed.then_some(m.time),
            RecordMetrics::Interference(m) => Some(m.score as f64),
            RecordMetrics::SequenceMemory(m) => Some(m.level as f64),
            RecordMetrics::AuditoryAttention(m) => Some(m.level as f64),
        }
    }

    pub fn comment(&self) -> Comment {
        match &self.metrics {
            RecordMetrics::GridSearch(m) if m.timeout => {
                let percent = if m.total_items == 0 {
                    0.0
                } else {
                    m.completed_items as f64 / m.total_items as f64 * 100.0
                };
                scoring::grid_timeout_comment(percent)
            }
            RecordMetrics::GridSearch(m) => {
                let per_item = if m.total_items == 0 {
                    0.0
                } else {
                    m.time / m.total_items as f64
                };
                scoring::grid_completion_comment(per_item, m.error_count)
            }
            RecordMetrics::Interference(m) => {
                scoring::interference_comment(m.accuracy, m.average_response_time)
            }
            RecordMetrics::SequenceMemory(m) => scoring::memory_comment(m.level),
            RecordMetrics::AuditoryAttention(m) => scoring::auditory_comment(m.level),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregateStats {
    pub best: Option<f64>,
    pub average: Option<f64>,
    pub total_count: usize,
}

/// Best/average/count over every record of `game` in `records`.
pub fn aggregate(game: GameType, records: &[Record]) -> AggregateStats {
    let records: Vec<&Record> = records.iter().filter(|r| r.game_type() == game).collect();
    let headlines: Vec<f64> = records.iter().filter_map(|r| r.headline()).collect();

    let best = match game {
        GameType::GridSearch => headlines.iter().copied().reduce(f64::min),
        _ => headlines.iter().copied().reduce(f64::max),
    };

    let average = match game {
        GameType::AuditoryAttention => {
            let accuracies: Vec<f64> = records
                .iter()
                .filter_map(|r| match &r.metrics {
                    RecordMetrics::AuditoryAttention(m) => Some(m.accuracy),
                    _ => None,
                })
                .collect();
            mean(&accuracies)
        }
        _ => mean(&headlines),
    };

    AggregateStats {
        best,
        average,
        total_count: records.len(),
    }
}
