use std::time::Duration;

use crate::config::Config;
use crate::error::QuizError;
use crate::sequencer::QuestionList;
use crate::stats::{AnswerOutcome, SessionStats};
use crate::vocab::{split_subwords, Subparts, VocabEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum GameState {
    Menu,
    Question,
    Answer,
    End,
    Review,
    Paused,
}

/// Current state plus the one to return to after a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateRecord {
    pub current: GameState,
    pub previous: Option<GameState>,
}

impl Default for StateRecord {
    fn default() -> Self {
        Self {
            current: GameState::Menu,
            previous: None,
        }
    }
}

/// Validated per-session settings; fixed for the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizSettings {
    pub question_count: usize,
    pub use_timer: bool,
    pub time_per_question_ms: u64,
    pub limit_attempts: bool,
    /// Zero when attempts are unlimited
    pub attempts_per_question: u32,
    pub duplicate_questions: bool,
}

impl QuizSettings {
    pub fn time_per_question(&self) -> Duration {
        Duration::from_millis(self.time_per_question_ms)
    }
}

/// Parse a settings field and check it against an inclusive range.
pub fn verify_integer_input(field: &str, value: &str, min: i64, max: i64) -> Result<i64, QuizError> {
    let invalid = || QuizError::InvalidSettingsInput {
        field: field.to_string(),
        value: value.to_string(),
    };
    let parsed: i64 = value.trim().parse().map_err(|_| invalid())?;
    if parsed < min || parsed > max {
        tracing::error!("{} must be between {} and {}, got {}", field, min, max, parsed);
        return Err(invalid());
    }
    Ok(parsed)
}

/// Raw menu inputs, as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub question_count: String,
    pub use_all_questions: bool,
    pub use_timer: bool,
    pub answer_secs: String,
    pub limit_attempts: bool,
    pub attempts: String,
    pub duplicate_questions: bool,
}

impl SettingsForm {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            question_count: cfg.default_question_count.to_string(),
            use_all_questions: cfg.use_all_questions,
            use_timer: cfg.use_timer,
            answer_secs: cfg.answer_secs.to_string(),
            limit_attempts: cfg.limit_attempts,
            attempts: cfg.attempts_per_question.to_string(),
            duplicate_questions: cfg.duplicate_questions,
        }
    }

    /// Question count never exceeds the entries available to draw from.
    pub fn parse(&self, cfg: &Config, available: usize) -> Result<QuizSettings, QuizError> {
        let question_count = if self.use_all_questions {
            if available == 0 {
                return Err(QuizError::InsufficientData {
                    requested: 1,
                    available,
                });
            }
            available
        } else {
            verify_integer_input("question count", &self.question_count, 1, available as i64)? as usize
        };

        let time_per_question_ms = if self.use_timer {
            let secs = verify_integer_input(
                "answer time",
                &self.answer_secs,
                cfg.min_answer_secs as i64,
                cfg.max_answer_secs as i64,
            )?;
            secs as u64 * 1000
        } else {
            0
        };

        let attempts_per_question = if self.limit_attempts {
            verify_integer_input(
                "attempts",
                &self.attempts,
                cfg.min_attempts as i64,
                cfg.max_attempts as i64,
            )? as u32
        } else {
            0
        };

        Ok(QuizSettings {
            question_count,
            use_timer: self.use_timer,
            time_per_question_ms,
            limit_attempts: self.limit_attempts,
            attempts_per_question,
            duplicate_questions: self.duplicate_questions,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaRefs {
    pub audio: Option<String>,
    pub image: Option<String>,
    pub attribution: Option<String>,
    pub narration_secs: Option<f64>,
}

/// The question on screen and its in-progress answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentQuestion {
    pub vocab_index: usize,
    pub source_text: String,
    pub target_text: String,
    pub subwords: Vec<String>,
    pub separators: Vec<String>,
    /// One answer field per subword
    pub fragments: Vec<String>,
    pub attempts_remaining: i32,
    pub media: MediaRefs,
}

impl CurrentQuestion {
    pub fn from_entry(vocab_index: usize, entry: &VocabEntry, attempts: u32) -> Self {
        let parts = split_subwords(&entry.eng);
        Self {
            vocab_index,
            source_text: entry.native_display().to_string(),
            target_text: entry.eng.clone(),
            fragments: vec![String::new(); parts.subwords.len()],
            subwords: parts.subwords,
            separators: parts.separators,
            attempts_remaining: attempts as i32,
            media: MediaRefs {
                audio: entry.audio.clone(),
                image: entry.image.clone(),
                attribution: entry.attribution.clone(),
                narration_secs: entry.effective_audio_duration,
            },
        }
    }

    /// Answer rebuilt from the typed fragments and original separators.
    pub fn typed_text(&self) -> String {
        Subparts {
            subwords: self.fragments.clone(),
            separators: self.separators.clone(),
        }
        .reconstruct()
    }
}

/// Everything a stop or a new quiz throws away.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: StateRecord,
    pub settings: QuizSettings,
    pub questions: QuestionList,
    pub current_question: Option<CurrentQuestion>,
    pub stats: SessionStats,
    /// Outcome per question position, `None` until answered
    pub progress: Vec<Option<AnswerOutcome>>,
}

impl Session {
    pub fn new(settings: QuizSettings, questions: QuestionList) -> Self {
        let progress = vec![None; questions.len()];
        Self {
            state: StateRecord::default(),
            settings,
            questions,
            current_question: None,
            stats: SessionStats::default(),
            progress,
        }
    }
}
