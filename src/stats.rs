use crate::util::{mean, round_dp};

/// How a question was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum AnswerOutcome {
    Correct,
    OutOfAttempts,
    OutOfTime,
    ShowAnswer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub correct: u32,
    pub incorrect: u32,
    pub shown: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
}

pub fn total_answered(score: &Score) -> u32 {
    score.correct + score.incorrect + score.shown
}

pub fn correct_ratio(score: &Score) -> f64 {
    match total_answered(score) {
        0 => 0.0,
        total => score.correct as f64 / total as f64,
    }
}

/// Mean answer time in seconds to 2 dp, 0 with no timed answers.
pub fn average_answer_time(times: &[f64]) -> f64 {
    mean(times).map(|m| round_dp(m, 2)).unwrap_or(0.0)
}

/// Running totals for one session; only a full reset clears them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub score: Score,
    pub streak: Streak,
    /// Seconds taken on timed, non-revealed answers
    pub answer_times: Vec<f64>,
}

impl SessionStats {
    pub fn record(&mut self, outcome: AnswerOutcome, answer_secs: Option<f64>) {
        match outcome {
            AnswerOutcome::Correct => self.score.correct += 1,
            AnswerOutcome::OutOfAttempts | AnswerOutcome::OutOfTime => self.score.incorrect += 1,
            AnswerOutcome::ShowAnswer => self.score.shown += 1,
        }

        self.streak.current = if outcome == AnswerOutcome::Correct {
            self.streak.current + 1
        } else {
            0
        };
        self.streak.longest = self.streak.longest.max(self.streak.current);

        if let Some(secs) = answer_secs {
            self.answer_times.push(round_dp(secs, 4));
        }
    }

    pub fn total_answered(&self) -> u32 {
        total_answered(&self.score)
    }

    pub fn correct_ratio(&self) -> f64 {
        correct_ratio(&self.score)
    }

    pub fn average_answer_time(&self) -> f64 {
        average_answer_time(&self.answer_times)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CompletionTier {
    Zero,
    Low,
    Average,
    High,
    Perfect,
}

const TIER_BREAKPOINTS: [(f64, CompletionTier); 5] = [
    (0.0, CompletionTier::Zero),
    (0.25, CompletionTier::Low),
    (0.75, CompletionTier::Average),
    (0.9999, CompletionTier::High),
    (1.0, CompletionTier::Perfect),
];

impl CompletionTier {
    /// First ascending breakpoint the ratio does not exceed.
    pub fn from_ratio(ratio: f64) -> Self {
        TIER_BREAKPOINTS
            .iter()
            .find(|(threshold, _)| ratio <= *threshold)
            .map(|(_, tier)| *tier)
            .unwrap_or(CompletionTier::Perfect)
    }

    pub fn message(self) -> &'static str {
        match self {
            CompletionTier::Zero => "Oh dear! Did the answers run away?",
            CompletionTier::Low => "Still warming up! Give it everything next time!",
            CompletionTier::Average => "Nicely done! Aim even higher next time!",
            CompletionTier::High => "Brilliant! Just a little more for full marks!",
            CompletionTier::Perfect => "Wow! A perfect score! You're a genius!",
        }
    }
}
