use crate::error::QuizError;
use crate::stats::AnswerOutcome;

/// Who triggered a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    User,
    /// Countdown reached zero; skips field validation.
    TimerExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FieldIssue {
    #[strum(serialize = "please fill in this field")]
    EmptyField,
    #[strum(serialize = "not enough characters")]
    MissingCharacters,
}

/// First answer field that blocks a user submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationIssue {
    pub index: usize,
    pub issue: FieldIssue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
    Correct,
    /// Wrong, but the question stays open.
    Retry,
    OutOfAttempts,
    OutOfTime,
}

/// Only closing verdicts can be scored; a retry has no outcome.
impl TryFrom<Verdict> for AnswerOutcome {
    type Error = QuizError;

    fn try_from(verdict: Verdict) -> Result<Self, Self::Error> {
        match verdict {
            Verdict::Correct => Ok(AnswerOutcome::Correct),
            Verdict::OutOfAttempts => Ok(AnswerOutcome::OutOfAttempts),
            Verdict::OutOfTime => Ok(AnswerOutcome::OutOfTime),
            Verdict::Retry => Err(QuizError::InvalidOutcome(verdict.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// Per-fragment match flags, in subword order.
    pub matches: Vec<bool>,
}

/// Keep only the characters an answer field accepts, capped at the subword length.
pub fn sanitize_fragment(raw: &str, expected_len: usize) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '\'')
        .take(expected_len)
        .collect()
}

pub fn fragment_matches(expected: &str, submitted: &str) -> bool {
    expected.to_lowercase() == submitted.to_lowercase()
}

/// Every field must be filled to its full length before a user submission counts.
pub fn validate(expected: &[String], fragments: &[String]) -> Result<(), ValidationIssue> {
    for (index, subword) in expected.iter().enumerate() {
        let fragment = fragments.get(index).map(String::as_str).unwrap_or("");
        if fragment.is_empty() {
            return Err(ValidationIssue {
                index,
                issue: FieldIssue::EmptyField,
            });
        }
        if fragment.chars().count() < subword.chars().count() {
            return Err(ValidationIssue {
                index,
                issue: FieldIssue::MissingCharacters,
            });
        }
    }
    Ok(())
}

/// Compare fragments against the expected subwords and consume one attempt.
///
/// `attempts_remaining` is decremented on every evaluation, including timer
/// expiry. With unlimited attempts it simply counts down past zero.
pub fn evaluate(
    expected: &[String],
    fragments: &[String],
    mode: SubmitMode,
    limit_attempts: bool,
    attempts_remaining: &mut i32,
) -> Evaluation {
    let matches: Vec<bool> = expected
        .iter()
        .enumerate()
        .map(|(i, subword)| {
            let fragment = fragments.get(i).map(String::as_str).unwrap_or("");
            fragment_matches(subword, fragment)
        })
        .collect();

    *attempts_remaining -= 1;

    let verdict = if matches.iter().all(|m| *m) {
        Verdict::Correct
    } else if mode == SubmitMode::TimerExpired {
        Verdict::OutOfTime
    } else if limit_attempts && *attempts_remaining <= 0 {
        Verdict::OutOfAttempts
    } else {
        Verdict::Retry
    };

    Evaluation { verdict, matches }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_only_closing_verdicts_score() {
        assert_eq!(AnswerOutcome::try_from(Verdict::Correct), Ok(AnswerOutcome::Correct));
        assert_eq!(
            AnswerOutcome::try_from(Verdict::OutOfTime),
            Ok(AnswerOutcome::OutOfTime)
        );
        assert_eq!(
            AnswerOutcome::try_from(Verdict::Retry),
            Err(QuizError::InvalidOutcome("retry".to_string()))
        );
    }

    #[test]
    fn test_case_insensitive_match() {
        let mut attempts = 0;
        let eval = evaluate(&words(&["cat"]), &words(&["CAT"]), SubmitMode::User, false, &mut attempts);
        assert_eq!(eval.verdict, Verdict::Correct);
        assert_eq!(eval.matches, vec![true]);
    }

    #[test]
    fn test_wrong_with_unlimited_attempts_retries() {
        let mut attempts = 0;
        let eval = evaluate(&words(&["cat"]), &words(&["dog"]), SubmitMode::User, false, &mut attempts);
        assert_eq!(eval.verdict, Verdict::Retry);
        assert_eq!(attempts, -1);
    }

    #[test]
    fn test_last_attempt_exhausted() {
        let mut attempts = 1;
        let eval = evaluate(&words(&["cat"]), &words(&["dog"]), SubmitMode::User, true, &mut attempts);
        assert_eq!(eval.verdict, Verdict::OutOfAttempts);
        assert_eq!(attempts, 0);
    }

    #[test]
    fn test_attempts_left_retries() {
        let mut attempts = 3;
        let eval = evaluate(&words(&["cat"]), &words(&["cot"]), SubmitMode::User, true, &mut attempts);
        assert_eq!(eval.verdict, Verdict::Retry);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_timer_expiry_is_out_of_time_regardless_of_attempts() {
        let mut attempts = 3;
        let eval = evaluate(
            &words(&["polar", "bear"]),
            &words(&["polar", ""]),
            SubmitMode::TimerExpired,
            true,
            &mut attempts,
        );
        assert_eq!(eval.verdict, Verdict::OutOfTime);
        assert_eq!(eval.matches, vec![true, false]);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_timer_expiry_with_correct_answer_scores_correct() {
        let mut attempts = 1;
        let eval = evaluate(&words(&["cat"]), &words(&["cat"]), SubmitMode::TimerExpired, true, &mut attempts);
        assert_eq!(eval.verdict, Verdict::Correct);
    }

    #[test]
    fn test_missing_fragments_do_not_match() {
        let mut attempts = 0;
        let eval = evaluate(&words(&["ice", "cream"]), &words(&["ice"]), SubmitMode::TimerExpired, false, &mut attempts);
        assert_eq!(eval.matches, vec![true, false]);
    }

    #[test]
    fn test_validate_reports_first_issue() {
        let expected = words(&["ice", "cream"]);
        assert_eq!(
            validate(&expected, &words(&["ice", ""])),
            Err(ValidationIssue {
                index: 1,
                issue: FieldIssue::EmptyField
            })
        );
        assert_eq!(
            validate(&expected, &words(&["ic", "cream"])),
            Err(ValidationIssue {
                index: 0,
                issue: FieldIssue::MissingCharacters
            })
        );
        assert_eq!(validate(&expected, &words(&["ICE", "CREAM"])), Ok(()));
    }

    #[test]
    fn test_sanitize_fragment() {
        assert_eq!(sanitize_fragment("c-a t!", 3), "cat");
        assert_eq!(sanitize_fragment("don't", 5), "don't");
        assert_eq!(sanitize_fragment("catalog", 3), "cat");
    }

    #[test]
    fn test_field_issue_messages() {
        assert_eq!(FieldIssue::EmptyField.to_string(), "please fill in this field");
        assert_eq!(FieldIssue::MissingCharacters.to_string(), "not enough characters");
    }
}
