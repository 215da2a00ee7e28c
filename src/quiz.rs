use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use crate::audio::{AudioClip, AudioPlayer, Cue, Playback};
use crate::clock::{Countdown, TimeSource};
use crate::config::Config;
use crate::error::QuizError;
use crate::evaluator::{self, SubmitMode, ValidationIssue, Verdict};
use crate::sequencer::{generate_question_list, QuestionList};
use crate::session::{CurrentQuestion, GameState, QuizSettings, Session, SettingsForm};
use crate::stats::{AnswerOutcome, CompletionTier, SessionStats};
use crate::vocab::VocabEntry;

/// Notifications for the front end, drained after each input or tick.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizEvent {
    StateChanged { from: GameState, to: GameState },
    QuestionRendered { position: usize },
    TimerTick { remaining: Duration },
    TimeWarning,
    ValidationFailed(ValidationIssue),
    AttemptFailed { attempts_remaining: i32 },
    Answered(AnswerOutcome),
    NextAvailable,
    Completed { tier: CompletionTier, celebrate: bool },
    ReviewAvailable,
    MediaFailed(String),
}

/// Result of one answer submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Not in a state that accepts answers
    Ignored,
    Rejected(ValidationIssue),
    Retry { attempts_remaining: i32 },
    Answered(AnswerOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterNarration {
    EnableNext,
    FinalDelay,
    Done,
}

/// Feedback after an answer, one suspension point per variant.
#[derive(Debug)]
enum Stage {
    Idle,
    OutcomeCue {
        cue: Playback,
        then: AfterNarration,
    },
    Narration {
        audio: Playback,
        audio_done: bool,
        highlight: Countdown,
        then: AfterNarration,
    },
    FinalDelay(Countdown),
    CompletionCue(Playback),
}

impl Stage {
    fn cancel(&self) {
        match self {
            Stage::OutcomeCue { cue, .. } | Stage::CompletionCue(cue) => cue.cancel(),
            Stage::Narration { audio, .. } => audio.cancel(),
            Stage::Idle | Stage::FinalDelay(_) => {}
        }
    }

    fn pause(&mut self, now: Duration) {
        match self {
            Stage::Narration { highlight, .. } => highlight.pause(now),
            Stage::FinalDelay(delay) => delay.pause(now),
            _ => {}
        }
    }

    fn resume(&mut self, now: Duration) {
        match self {
            Stage::Narration { highlight, .. } => {
                highlight.start(now);
            }
            Stage::FinalDelay(delay) => {
                delay.start(now);
            }
            _ => {}
        }
    }
}

fn countdown_finished(countdown: &mut Countdown, now: Duration) -> bool {
    countdown.tick(now);
    countdown.is_expired()
}

/// The quiz state machine.
///
/// Owns the session, the question timer and the feedback pipeline. Nothing
/// here blocks: audio completion and delays are polled from `on_tick`, so a
/// front end only needs to forward input and call `on_tick` regularly.
pub struct Quiz {
    config: Config,
    vocab: Vec<VocabEntry>,
    session: Session,
    timer: Countdown,
    stage: Stage,
    next_enabled: bool,
    review_enabled: bool,
    celebrate: bool,
    completion: Option<CompletionTier>,
    validation_issue: Option<ValidationIssue>,
    events: Vec<QuizEvent>,
    audio: Box<dyn AudioPlayer>,
    clock: Arc<dyn TimeSource>,
    rng: StdRng,
}

impl Quiz {
    pub fn new(
        config: Config,
        vocab: Vec<VocabEntry>,
        audio: Box<dyn AudioPlayer>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            vocab,
            session: Session::default(),
            timer: Countdown::disabled(),
            stage: Stage::Idle,
            next_enabled: false,
            review_enabled: false,
            celebrate: false,
            completion: None,
            validation_issue: None,
            events: Vec::new(),
            audio,
            clock,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> GameState {
        self.session.state.current
    }

    pub fn previous_state(&self) -> Option<GameState> {
        self.session.state.previous
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.session.settings
    }

    pub fn stats(&self) -> &SessionStats {
        &self.session.stats
    }

    pub fn current_question(&self) -> Option<&CurrentQuestion> {
        self.session.current_question.as_ref()
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn vocab(&self) -> &[VocabEntry] {
        &self.vocab
    }

    pub fn next_enabled(&self) -> bool {
        self.next_enabled
    }

    pub fn review_enabled(&self) -> bool {
        self.review_enabled
    }

    pub fn celebrate(&self) -> bool {
        self.celebrate
    }

    pub fn completion(&self) -> Option<CompletionTier> {
        self.completion
    }

    pub fn validation_issue(&self) -> Option<ValidationIssue> {
        self.validation_issue
    }

    /// True once the post-answer feedback has fully played out.
    pub fn is_idle(&self) -> bool {
        matches!(self.stage, Stage::Idle)
    }

    /// How far the narration highlight has run, while it runs.
    pub fn highlight_progress(&self) -> Option<f64> {
        match &self.stage {
            Stage::Narration { highlight, .. } => Some(1.0 - highlight.fraction_remaining()),
            _ => None,
        }
    }

    pub fn drain_events(&mut self) -> Vec<QuizEvent> {
        std::mem::take(&mut self.events)
    }

    /// Swap the entries the next quiz draws from. Only allowed from the menu.
    pub fn set_vocabulary(&mut self, vocab: Vec<VocabEntry>) -> bool {
        if self.state() != GameState::Menu {
            return false;
        }
        self.vocab = vocab;
        true
    }

    pub fn play_cue(&mut self, cue: Cue) {
        let _detached = self.audio.play(AudioClip::Cue(cue));
    }

    /// Validate the menu settings, draw the questions and show the first one.
    pub fn new_quiz(&mut self, form: &SettingsForm) -> Result<(), QuizError> {
        if self.state() != GameState::Menu {
            debug!("ignoring new quiz request in {}", self.state());
            return Ok(());
        }

        let settings = form.parse(&self.config, self.vocab.len())?;
        let indices = generate_question_list(
            &mut self.rng,
            self.vocab.len(),
            settings.question_count,
            settings.duplicate_questions,
        )?;

        self.reset();
        self.session = Session::new(settings, QuestionList::new(indices));
        self.timer = if settings.use_timer {
            Countdown::new(settings.time_per_question()).with_warning(self.config.time_warning())
        } else {
            Countdown::disabled()
        };
        info!(
            "new quiz: {} questions, timer {}, attempts {}",
            settings.question_count,
            if settings.use_timer {
                format!("{}ms", settings.time_per_question_ms)
            } else {
                "off".to_string()
            },
            if settings.limit_attempts {
                settings.attempts_per_question.to_string()
            } else {
                "unlimited".to_string()
            }
        );

        self.transition(GameState::Question);
        self.render_question();
        Ok(())
    }

    /// Replace one answer field, keeping only characters it accepts.
    pub fn set_fragment(&mut self, index: usize, raw: &str) -> bool {
        if self.state() != GameState::Question {
            return false;
        }
        let Some(question) = self.session.current_question.as_mut() else {
            return false;
        };
        let Some(limit) = question.subwords.get(index).map(|s| s.chars().count()) else {
            return false;
        };
        question.fragments[index] = evaluator::sanitize_fragment(raw, limit);
        self.validation_issue = None;
        true
    }

    /// Append to the first answer field with room left.
    pub fn type_char(&mut self, c: char) -> bool {
        if self.state() != GameState::Question || !(c.is_ascii_alphanumeric() || c == '\'') {
            return false;
        }
        let Some(question) = self.session.current_question.as_mut() else {
            return false;
        };
        let open = question
            .fragments
            .iter()
            .zip(&question.subwords)
            .position(|(fragment, subword)| fragment.chars().count() < subword.chars().count());
        let Some(index) = open else {
            return false;
        };
        question.fragments[index].push(c);
        self.validation_issue = None;
        true
    }

    /// Remove the last typed character across all answer fields.
    pub fn backspace(&mut self) -> bool {
        if self.state() != GameState::Question {
            return false;
        }
        let Some(question) = self.session.current_question.as_mut() else {
            return false;
        };
        let Some(index) = question.fragments.iter().rposition(|f| !f.is_empty()) else {
            return false;
        };
        question.fragments[index].pop();
        self.validation_issue = None;
        true
    }

    pub fn submit_answer(&mut self) -> Submission {
        self.check_answer(SubmitMode::User)
    }

    /// Give up on the current question and reveal the answer.
    pub fn show_answer(&mut self) -> bool {
        if self.state() != GameState::Question {
            return false;
        }
        self.validation_issue = None;
        self.handle_answer(AnswerOutcome::ShowAnswer);
        true
    }

    pub fn next_question(&mut self) -> bool {
        if self.state() != GameState::Answer || !self.next_enabled {
            return false;
        }
        let next = self.session.questions.position() as isize + 1;
        if let Err(e) = self.session.questions.jump_to(next) {
            debug!("no next question: {}", e);
            return false;
        }
        self.transition(GameState::Question);
        self.render_question();
        true
    }

    /// Jump to a question in review. Out-of-range indices change nothing.
    pub fn change_question_index(&mut self, index: isize) -> bool {
        if self.state() != GameState::Review {
            return false;
        }
        match self.session.questions.jump_to(index) {
            Ok(_) => {
                self.render_question();
                true
            }
            Err(e) => {
                trace!("review navigation ignored: {}", e);
                false
            }
        }
    }

    pub fn review(&mut self) -> bool {
        if self.state() != GameState::End || !self.review_enabled {
            return false;
        }
        self.celebrate = false;
        self.transition(GameState::Review);
        self.change_question_index(0)
    }

    /// Play the current entry's narration again once feedback has settled.
    pub fn replay_narration(&mut self) -> bool {
        if !matches!(self.state(), GameState::Answer | GameState::Review) || !self.is_idle() {
            return false;
        }
        self.stage = self.narration_stage(AfterNarration::Done);
        self.advance_stage();
        true
    }

    pub fn pause(&mut self) -> bool {
        let current = self.state();
        if matches!(current, GameState::Menu | GameState::Paused) {
            return false;
        }
        let now = self.clock.now();
        self.timer.pause(now);
        self.stage.pause(now);
        self.audio.pause_all();
        self.session.state.previous = Some(current);
        self.transition(GameState::Paused);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state() != GameState::Paused {
            return false;
        }
        let Some(previous) = self.session.state.previous.take() else {
            warn!("paused without a state to return to");
            return false;
        };
        let now = self.clock.now();
        self.transition(previous);
        self.audio.resume_all();
        self.stage.resume(now);
        if previous == GameState::Question {
            self.timer.start(now);
        }
        self.advance_stage();
        true
    }

    /// Abandon the session and return to the menu.
    pub fn stop(&mut self) -> bool {
        let from = self.state();
        if from == GameState::Menu {
            return false;
        }
        self.timer.pause(self.clock.now());
        self.cancel_stage();
        self.audio.stop_all();
        self.reset();
        info!("quiz stopped from {}", from);
        self.events.push(QuizEvent::StateChanged {
            from,
            to: GameState::Menu,
        });
        true
    }

    /// Drive the question timer and the feedback pipeline.
    pub fn on_tick(&mut self) {
        match self.state() {
            GameState::Menu | GameState::Paused => return,
            GameState::Question => {
                if let Some(tick) = self.timer.tick(self.clock.now()) {
                    self.events.push(QuizEvent::TimerTick {
                        remaining: tick.remaining,
                    });
                    if tick.warning {
                        self.play_cue(Cue::TimeWarning);
                        self.events.push(QuizEvent::TimeWarning);
                    }
                    if tick.expired {
                        debug!("answer time expired");
                        self.check_answer(SubmitMode::TimerExpired);
                    }
                }
            }
            _ => {}
        }
        self.advance_stage();
    }

    fn transition(&mut self, to: GameState) {
        let from = self.session.state.current;
        if from == to {
            return;
        }
        debug!("state {} -> {}", from, to);
        self.session.state.current = to;
        self.events.push(QuizEvent::StateChanged { from, to });
    }

    fn reset(&mut self) {
        self.session = Session::default();
        self.timer = Countdown::disabled();
        self.stage = Stage::Idle;
        self.next_enabled = false;
        self.review_enabled = false;
        self.celebrate = false;
        self.completion = None;
        self.validation_issue = None;
    }

    fn cancel_stage(&mut self) {
        std::mem::replace(&mut self.stage, Stage::Idle).cancel();
    }

    fn render_question(&mut self) {
        self.cancel_stage();
        let position = self.session.questions.position();
        let Some(entry) = self
            .session
            .questions
            .current()
            .and_then(|i| self.vocab.get(i).map(|e| (i, e)))
        else {
            warn!("no vocabulary entry for question {}", position);
            return;
        };
        let (vocab_index, entry) = entry;
        self.session.current_question = Some(CurrentQuestion::from_entry(
            vocab_index,
            entry,
            self.session.settings.attempts_per_question,
        ));
        self.events.push(QuizEvent::QuestionRendered { position });

        if self.state() == GameState::Review {
            self.stage = self.narration_stage(AfterNarration::Done);
            self.advance_stage();
        } else {
            self.next_enabled = false;
            self.validation_issue = None;
            let now = self.clock.now();
            self.timer.reset(now);
            self.timer.start(now);
        }
    }

    fn check_answer(&mut self, mode: SubmitMode) -> Submission {
        if self.state() != GameState::Question {
            return Submission::Ignored;
        }
        let limit_attempts = self.session.settings.limit_attempts;
        let Some(question) = self.session.current_question.as_mut() else {
            return Submission::Ignored;
        };

        if mode == SubmitMode::User {
            if let Err(issue) = evaluator::validate(&question.subwords, &question.fragments) {
                debug!("field {}: {}", issue.index, issue.issue);
                self.validation_issue = Some(issue);
                self.events.push(QuizEvent::ValidationFailed(issue));
                return Submission::Rejected(issue);
            }
        }

        let evaluation = evaluator::evaluate(
            &question.subwords,
            &question.fragments,
            mode,
            limit_attempts,
            &mut question.attempts_remaining,
        );
        for (fragment, matched) in question.fragments.iter_mut().zip(&evaluation.matches) {
            if !matched {
                fragment.clear();
            }
        }
        let attempts_remaining = question.attempts_remaining;
        self.validation_issue = None;

        if evaluation.verdict == Verdict::Retry {
            debug!("wrong answer, {} attempts remaining", attempts_remaining);
            self.play_cue(Cue::Incorrect);
            self.events
                .push(QuizEvent::AttemptFailed { attempts_remaining });
            return Submission::Retry { attempts_remaining };
        }

        match AnswerOutcome::try_from(evaluation.verdict) {
            Ok(outcome) => {
                self.handle_answer(outcome);
                Submission::Answered(outcome)
            }
            Err(e) => {
                warn!("answer not scored: {}", e);
                Submission::Ignored
            }
        }
    }

    fn handle_answer(&mut self, outcome: AnswerOutcome) {
        self.timer.pause(self.clock.now());
        self.audio.stop_all();
        self.transition(GameState::Answer);

        let answer_secs = (self.session.settings.use_timer && outcome != AnswerOutcome::ShowAnswer)
            .then(|| self.timer.elapsed().as_secs_f64());
        self.session.stats.record(outcome, answer_secs);

        let position = self.session.questions.position();
        if let Some(slot) = self.session.progress.get_mut(position) {
            *slot = Some(outcome);
        }
        info!("question {} answered: {}", position + 1, outcome);
        self.events.push(QuizEvent::Answered(outcome));

        let then = if self.session.questions.is_last() {
            AfterNarration::FinalDelay
        } else {
            AfterNarration::EnableNext
        };
        self.cancel_stage();
        let cue = self.audio.play(AudioClip::Cue(Cue::for_outcome(outcome)));
        self.stage = Stage::OutcomeCue { cue, then };
        self.advance_stage();
    }

    fn narration_stage(&mut self, then: AfterNarration) -> Stage {
        let (file, secs) = match self.session.current_question.as_ref() {
            Some(q) => (q.media.audio.clone(), q.media.narration_secs),
            None => (None, None),
        };
        let audio = match file {
            Some(file) => self
                .audio
                .play(AudioClip::Narration(self.config.narration_path(&file))),
            None => Playback::resolved(),
        };
        let length = secs
            .filter(|s| *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .unwrap_or_else(|| self.config.default_narration());

        let mut highlight = Countdown::new(length);
        highlight.start(self.clock.now());
        Stage::Narration {
            audio,
            audio_done: false,
            highlight,
            then,
        }
    }

    fn after_narration(&mut self, then: AfterNarration, now: Duration) -> Stage {
        match then {
            AfterNarration::EnableNext => {
                self.next_enabled = true;
                self.events.push(QuizEvent::NextAvailable);
                Stage::Idle
            }
            AfterNarration::FinalDelay => {
                let mut delay = Countdown::new(self.config.final_delay());
                delay.start(now);
                Stage::FinalDelay(delay)
            }
            AfterNarration::Done => Stage::Idle,
        }
    }

    fn end_quiz(&mut self) -> Stage {
        self.transition(GameState::End);
        let ratio = self.session.stats.correct_ratio();
        let tier = CompletionTier::from_ratio(ratio);
        self.completion = Some(tier);
        self.celebrate = ratio >= self.config.celebration_ratio;
        info!(
            "quiz complete: {}/{} correct ({})",
            self.session.stats.score.correct,
            self.session.stats.total_answered(),
            tier
        );
        self.events.push(QuizEvent::Completed {
            tier,
            celebrate: self.celebrate,
        });

        let cue = if self.session.stats.score.correct == 0 {
            Cue::QuizFailed
        } else {
            Cue::QuizCompleted
        };
        Stage::CompletionCue(self.audio.play(AudioClip::Cue(cue)))
    }

    /// Media errors are reported and treated as finished playback.
    fn poll_playback(&mut self, playback: &mut Playback) -> Poll<()> {
        match playback.poll() {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => Poll::Ready(()),
            Poll::Ready(Err(e)) => {
                warn!("{}", e);
                self.events.push(QuizEvent::MediaFailed(e.to_string()));
                Poll::Ready(())
            }
        }
    }

    /// Run the feedback pipeline until it reaches a step that must wait.
    fn advance_stage(&mut self) {
        if self.state() == GameState::Paused {
            return;
        }
        let now = self.clock.now();
        loop {
            match std::mem::replace(&mut self.stage, Stage::Idle) {
                Stage::Idle => return,
                Stage::OutcomeCue { mut cue, then } => {
                    if self.poll_playback(&mut cue).is_pending() {
                        self.stage = Stage::OutcomeCue { cue, then };
                        return;
                    }
                    self.stage = self.narration_stage(then);
                }
                Stage::Narration {
                    mut audio,
                    audio_done,
                    mut highlight,
                    then,
                } => {
                    let audio_done = audio_done || self.poll_playback(&mut audio).is_ready();
                    if !(countdown_finished(&mut highlight, now) && audio_done) {
                        self.stage = Stage::Narration {
                            audio,
                            audio_done,
                            highlight,
                            then,
                        };
                        return;
                    }
                    self.stage = self.after_narration(then, now);
                }
                Stage::FinalDelay(mut delay) => {
                    if !countdown_finished(&mut delay, now) {
                        self.stage = Stage::FinalDelay(delay);
                        return;
                    }
                    self.stage = self.end_quiz();
                }
                Stage::CompletionCue(mut cue) => {
                    if self.poll_playback(&mut cue).is_pending() {
                        self.stage = Stage::CompletionCue(cue);
                        return;
                    }
                    self.review_enabled = true;
                    self.events.push(QuizEvent::ReviewAvailable);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ManualAudio;
    use crate::clock::ManualTimeSource;
    use crate::evaluator::FieldIssue;
    use assert_matches::assert_matches;

    struct Harness {
        quiz: Quiz,
        clock: ManualTimeSource,
        audio: ManualAudio,
    }

    fn vocab() -> Vec<VocabEntry> {
        vec![
            VocabEntry::new("cat", "ねこ").with_audio("cat.mp3"),
            VocabEntry::new("dog", "いぬ").with_audio("dog.mp3"),
            VocabEntry::new("polar bear", "ホッキョクグマ").with_audio("polar_bear.mp3"),
        ]
    }

    fn form(count: usize, timer: bool, attempts: Option<u32>) -> SettingsForm {
        SettingsForm {
            question_count: count.to_string(),
            use_all_questions: false,
            use_timer: timer,
            answer_secs: "20".into(),
            limit_attempts: attempts.is_some(),
            attempts: attempts.unwrap_or(3).to_string(),
            duplicate_questions: false,
        }
    }

    fn harness() -> Harness {
        let clock = ManualTimeSource::new();
        let audio = ManualAudio::new();
        let quiz = Quiz::new(
            Config::default(),
            vocab(),
            Box::new(audio.clone()),
            Arc::new(clock.clone()),
        )
        .with_seed(11);
        Harness { quiz, clock, audio }
    }

    impl Harness {
        fn start(&mut self, form: SettingsForm) {
            self.quiz.new_quiz(&form).unwrap();
            assert_eq!(self.quiz.state(), GameState::Question);
        }

        fn advance(&mut self, ms: u64) {
            self.clock.advance(Duration::from_millis(ms));
            self.quiz.on_tick();
        }

        fn subwords(&self) -> Vec<String> {
            self.quiz.current_question().unwrap().subwords.clone()
        }

        fn fill(&mut self, words: &[String]) {
            for (i, word) in words.iter().enumerate() {
                assert!(self.quiz.set_fragment(i, word));
            }
        }

        fn answer_correctly(&mut self) -> Submission {
            let words = self.subwords();
            self.fill(&words);
            self.quiz.submit_answer()
        }

        fn answer_wrongly(&mut self) -> Submission {
            let wrong: Vec<String> = self
                .subwords()
                .iter()
                .map(|w| "z".repeat(w.chars().count()))
                .collect();
            self.fill(&wrong);
            self.quiz.submit_answer()
        }

        /// Let every clip finish and time pass until feedback settles.
        fn settle(&mut self) {
            for _ in 0..50 {
                self.audio.finish_all();
                self.advance(100);
                if self.quiz.is_idle() {
                    break;
                }
            }
            assert!(self.quiz.is_idle());
        }

        fn narration_clip(&self) -> AudioClip {
            let file = self.quiz.current_question().unwrap().media.audio.clone().unwrap();
            AudioClip::Narration(format!("media/audio/english/{file}"))
        }

        fn cues(&self) -> Vec<Cue> {
            self.audio
                .played()
                .into_iter()
                .filter_map(|clip| match clip {
                    AudioClip::Cue(cue) => Some(cue),
                    AudioClip::Narration(_) => None,
                })
                .collect()
        }
    }

    #[test]
    fn test_new_quiz_renders_first_question() {
        let mut h = harness();
        h.start(form(2, true, Some(3)));

        let q = h.quiz.current_question().unwrap();
        assert_eq!(q.attempts_remaining, 3);
        assert!(q.fragments.iter().all(String::is_empty));
        assert!(h.quiz.timer().is_running());
        assert_eq!(h.quiz.timer().remaining(), Duration::from_secs(20));
        assert_eq!(h.quiz.session().questions.len(), 2);
        assert_eq!(h.quiz.session().progress, vec![None, None]);
        assert_eq!(
            h.quiz.drain_events(),
            vec![
                QuizEvent::StateChanged {
                    from: GameState::Menu,
                    to: GameState::Question
                },
                QuizEvent::QuestionRendered { position: 0 },
            ]
        );
    }

    #[test]
    fn test_invalid_settings_stay_in_menu() {
        let mut h = harness();
        let err = h.quiz.new_quiz(&form(4, true, Some(3))).unwrap_err();
        assert_matches!(err, QuizError::InvalidSettingsInput { .. });
        assert_eq!(h.quiz.state(), GameState::Menu);

        let mut all = form(1, false, None);
        all.use_all_questions = true;
        h.quiz.set_vocabulary(Vec::new());
        assert_matches!(
            h.quiz.new_quiz(&all),
            Err(QuizError::InsufficientData { available: 0, .. })
        );
        assert_eq!(h.quiz.state(), GameState::Menu);
    }

    #[test]
    fn test_empty_submission_rejected_without_using_attempt() {
        let mut h = harness();
        h.start(form(1, false, Some(3)));

        let submission = h.quiz.submit_answer();
        assert_matches!(
            submission,
            Submission::Rejected(ValidationIssue {
                index: 0,
                issue: FieldIssue::EmptyField
            })
        );
        assert_eq!(h.quiz.state(), GameState::Question);
        assert_eq!(h.quiz.current_question().unwrap().attempts_remaining, 3);
        assert!(h.quiz.validation_issue().is_some());

        h.quiz.type_char('x');
        assert!(h.quiz.validation_issue().is_none());
    }

    #[test]
    fn test_wrong_answer_retries_and_clears_fields() {
        let mut h = harness();
        h.start(form(1, false, Some(3)));

        assert_eq!(h.answer_wrongly(), Submission::Retry { attempts_remaining: 2 });
        let q = h.quiz.current_question().unwrap();
        assert!(q.fragments.iter().all(String::is_empty));
        assert_eq!(h.quiz.state(), GameState::Question);
        assert_eq!(h.cues(), vec![Cue::Incorrect]);
    }

    #[test]
    fn test_last_attempt_scores_out_of_attempts() {
        let mut h = harness();
        h.start(form(2, false, Some(1)));

        assert_eq!(
            h.answer_wrongly(),
            Submission::Answered(AnswerOutcome::OutOfAttempts)
        );
        assert_eq!(h.quiz.state(), GameState::Answer);
        assert_eq!(h.quiz.stats().score.incorrect, 1);
        assert_eq!(
            h.quiz.session().progress[0],
            Some(AnswerOutcome::OutOfAttempts)
        );
        assert_eq!(h.cues(), vec![Cue::OutOfAttempts]);
    }

    #[test]
    fn test_unlimited_attempts_count_below_zero() {
        let mut h = harness();
        h.start(form(1, false, None));
        assert_eq!(h.quiz.current_question().unwrap().attempts_remaining, 0);

        assert_eq!(h.answer_wrongly(), Submission::Retry { attempts_remaining: -1 });
        assert_eq!(h.answer_wrongly(), Submission::Retry { attempts_remaining: -2 });
        assert_eq!(h.quiz.state(), GameState::Question);
    }

    #[test]
    fn test_timer_expiry_scores_out_of_time() {
        let mut h = harness();
        h.start(form(2, true, Some(3)));

        for _ in 0..200 {
            h.advance(100);
        }

        assert_eq!(h.quiz.state(), GameState::Answer);
        assert_eq!(h.quiz.stats().score.incorrect, 1);
        assert_eq!(h.quiz.stats().answer_times, vec![20.0]);
        assert_eq!(h.quiz.current_question().unwrap().attempts_remaining, 2);
        assert_eq!(h.cues(), vec![Cue::TimeWarning, Cue::OutOfTime]);

        let events = h.quiz.drain_events();
        assert_eq!(
            events.iter().filter(|e| **e == QuizEvent::TimeWarning).count(),
            1
        );
        assert!(events.contains(&QuizEvent::Answered(AnswerOutcome::OutOfTime)));
    }

    #[test]
    fn test_answer_time_recorded_when_timed() {
        let mut h = harness();
        h.start(form(2, true, Some(3)));

        h.advance(2500);
        assert_eq!(h.answer_correctly(), Submission::Answered(AnswerOutcome::Correct));
        assert_eq!(h.quiz.stats().answer_times, vec![2.5]);
        assert_eq!(h.quiz.stats().average_answer_time(), 2.5);
    }

    #[test]
    fn test_show_answer_records_no_time() {
        let mut h = harness();
        h.start(form(2, true, Some(3)));

        h.advance(1000);
        assert!(h.quiz.show_answer());
        assert_eq!(h.quiz.stats().score.shown, 1);
        assert!(h.quiz.stats().answer_times.is_empty());
        assert_eq!(h.cues(), vec![Cue::ShowAnswer]);
    }

    #[test]
    fn test_next_waits_for_feedback_then_resets_question() {
        let mut h = harness();
        h.start(form(2, true, Some(3)));
        h.answer_wrongly();
        h.advance(4000);
        h.answer_correctly();

        assert!(!h.quiz.next_enabled());
        assert!(!h.quiz.next_question());

        // outcome cue, then narration with its highlight
        h.audio.finish_all();
        h.advance(100);
        assert_eq!(h.audio.active(), vec![(h.narration_clip(), false)]);
        assert!(h.quiz.highlight_progress().is_some());
        h.audio.finish_all();
        h.advance(500);
        assert!(h.quiz.next_enabled());
        assert!(h.quiz.drain_events().contains(&QuizEvent::NextAvailable));

        assert!(h.quiz.next_question());
        assert_eq!(h.quiz.state(), GameState::Question);
        assert_eq!(h.quiz.session().questions.position(), 1);
        let q = h.quiz.current_question().unwrap();
        assert_eq!(q.attempts_remaining, 3);
        assert!(q.fragments.iter().all(String::is_empty));
        assert_eq!(h.quiz.timer().remaining(), Duration::from_secs(20));
        assert!(h.quiz.timer().is_running());
        assert!(!h.quiz.next_enabled());
    }

    #[test]
    fn test_pause_preserves_remaining_time() {
        let mut h = harness();
        h.start(form(1, true, Some(3)));

        h.advance(5000);
        assert!(h.quiz.pause());
        assert_eq!(h.quiz.previous_state(), Some(GameState::Question));
        assert!(!h.quiz.type_char('a'));

        h.advance(60_000);
        assert_eq!(h.quiz.state(), GameState::Paused);
        assert_eq!(h.quiz.timer().remaining(), Duration::from_millis(15_000));

        assert!(h.quiz.resume());
        assert_eq!(h.quiz.state(), GameState::Question);
        h.advance(1000);
        assert_eq!(h.quiz.timer().remaining(), Duration::from_millis(14_000));
    }

    #[test]
    fn test_pause_holds_feedback_pipeline() {
        let mut h = harness();
        h.start(form(2, false, None));
        h.answer_correctly();

        assert!(h.quiz.pause());
        assert_eq!(h.audio.finish_all(), 0);
        h.advance(5000);
        assert!(!h.quiz.next_enabled());

        assert!(h.quiz.resume());
        assert_eq!(h.quiz.state(), GameState::Answer);
        h.audio.finish_all();
        h.advance(100);
        h.audio.finish_all();
        h.advance(200);

        // highlight is 200ms in; pausing must not let it run on
        assert!(h.quiz.pause());
        h.advance(10_000);
        assert!(h.quiz.resume());
        assert!(!h.quiz.next_enabled());
        h.advance(300);
        assert!(h.quiz.next_enabled());
    }

    #[test]
    fn test_detached_narration_does_not_block() {
        let mut h = harness();
        h.start(form(1, false, None));
        h.answer_correctly();
        h.audio.finish_all();
        h.advance(100);

        let narration = h.narration_clip();
        assert!(h.audio.detach(&narration));
        h.quiz.drain_events();
        h.advance(100);
        assert!(h
            .quiz
            .drain_events()
            .iter()
            .any(|e| matches!(e, QuizEvent::MediaFailed(_))));

        // highlight still runs its full length, then the final delay
        h.advance(400);
        h.advance(1000);
        assert_eq!(h.quiz.state(), GameState::End);
        h.audio.finish_all();
        h.advance(100);
        assert!(h.quiz.review_enabled());
        assert_eq!(h.quiz.stats().score.correct, 1);
    }

    #[test]
    fn test_pause_during_final_delay_keeps_remaining() {
        let mut h = harness();
        h.start(form(1, false, None));
        h.answer_correctly();
        h.audio.finish_all();
        h.advance(100);
        h.audio.finish_all();
        // narration highlight ends, final delay starts
        h.advance(500);
        assert_eq!(h.quiz.state(), GameState::Answer);

        h.advance(400);
        assert!(h.quiz.pause());
        h.advance(30_000);
        assert!(h.quiz.resume());
        assert_eq!(h.quiz.state(), GameState::Answer);

        h.advance(500);
        assert_eq!(h.quiz.state(), GameState::Answer);
        h.advance(200);
        assert_eq!(h.quiz.state(), GameState::End);
        assert_eq!(h.quiz.stats().total_answered(), 1);
    }

    #[test]
    fn test_stop_during_final_delay_never_reaches_end() {
        let mut h = harness();
        h.start(form(1, false, None));
        h.answer_correctly();

        h.audio.finish_all();
        h.advance(100);
        h.audio.finish_all();
        h.advance(500);
        assert_eq!(h.quiz.state(), GameState::Answer);
        assert!(!h.quiz.is_idle());

        h.advance(500);
        assert!(h.quiz.stop());
        h.advance(2000);

        assert_eq!(h.quiz.state(), GameState::Menu);
        assert!(h.quiz.current_question().is_none());
        assert_eq!(h.quiz.stats().total_answered(), 0);
        assert!(!h
            .quiz
            .drain_events()
            .iter()
            .any(|e| matches!(e, QuizEvent::Completed { .. })));
        assert!(!h.cues().contains(&Cue::QuizCompleted));
    }

    #[test]
    fn test_three_question_session_and_review() {
        let mut h = harness();
        h.start(form(3, false, None));

        h.answer_correctly();
        h.settle();
        assert!(h.quiz.next_question());

        assert_eq!(h.answer_wrongly(), Submission::Retry { attempts_remaining: -1 });
        assert!(h.quiz.show_answer());
        h.settle();
        assert!(h.quiz.next_question());

        h.answer_correctly();
        h.settle();

        let stats = h.quiz.stats();
        assert_eq!(stats.score.correct, 2);
        assert_eq!(stats.score.shown, 1);
        assert_eq!(stats.score.incorrect, 0);
        assert_eq!(stats.streak.current, 1);
        assert_eq!(stats.total_answered(), 3);
        assert_eq!(stats.correct_ratio(), 2.0 / 3.0);

        assert_eq!(h.quiz.state(), GameState::End);
        assert_eq!(h.quiz.completion(), Some(CompletionTier::Average));
        assert!(h.quiz.celebrate());
        assert!(h.quiz.review_enabled());
        assert_eq!(h.cues().last(), Some(&Cue::QuizCompleted));
        assert_eq!(
            h.quiz.session().progress,
            vec![
                Some(AnswerOutcome::Correct),
                Some(AnswerOutcome::ShowAnswer),
                Some(AnswerOutcome::Correct)
            ]
        );

        assert!(h.quiz.review());
        assert_eq!(h.quiz.state(), GameState::Review);
        assert_eq!(h.quiz.session().questions.position(), 0);
        assert!(!h.quiz.change_question_index(-1));
        assert!(!h.quiz.change_question_index(3));
        assert_eq!(h.quiz.session().questions.position(), 0);
        assert!(h.quiz.change_question_index(2));
        assert_eq!(h.quiz.session().questions.position(), 2);
    }

    #[test]
    fn test_all_wrong_plays_failed_cue() {
        let mut h = harness();
        h.start(form(1, false, Some(1)));
        h.answer_wrongly();
        h.settle();

        assert_eq!(h.quiz.state(), GameState::End);
        assert_eq!(h.quiz.completion(), Some(CompletionTier::Zero));
        assert!(!h.quiz.celebrate());
        assert_eq!(h.cues().last(), Some(&Cue::QuizFailed));
    }

    #[test]
    fn test_review_navigation_cancels_narration() {
        let mut h = harness();
        h.start(form(2, false, None));
        h.answer_correctly();
        h.settle();
        h.quiz.next_question();
        h.answer_correctly();
        h.settle();
        assert!(h.quiz.review());

        let first = h.narration_clip();
        assert_eq!(h.audio.active(), vec![(first.clone(), false)]);

        assert!(h.quiz.change_question_index(1));
        let second = h.narration_clip();
        assert_ne!(first, second);
        assert_eq!(h.audio.active(), vec![(second, false)]);
    }

    #[test]
    fn test_narration_failure_does_not_block() {
        let mut h = harness();
        h.start(form(2, false, None));
        h.answer_correctly();

        h.audio.finish_all();
        h.advance(100);
        let clip = h.narration_clip();
        assert!(h.audio.fail(&clip, "file not found"));
        h.advance(500);

        assert!(h.quiz.next_enabled());
        assert!(h
            .quiz
            .drain_events()
            .iter()
            .any(|e| matches!(e, QuizEvent::MediaFailed(msg) if msg.contains("file not found"))));
    }

    #[test]
    fn test_replay_narration_after_feedback() {
        let mut h = harness();
        h.start(form(2, false, None));
        assert!(!h.quiz.replay_narration());
        h.answer_correctly();
        assert!(!h.quiz.replay_narration());
        h.settle();

        let before = h.audio.played().len();
        assert!(h.quiz.replay_narration());
        assert_eq!(h.audio.played().len(), before + 1);
        assert_eq!(h.audio.played().last(), Some(&h.narration_clip()));
    }

    #[test]
    fn test_typing_respects_field_limits() {
        let mut h = harness();
        h.start(form(3, false, None));
        let words = h.subwords();
        let total: usize = words.iter().map(|w| w.len()).sum();

        for _ in 0..total + 5 {
            h.quiz.type_char('a');
        }
        assert!(!h.quiz.type_char('-'));
        let q = h.quiz.current_question().unwrap();
        for (fragment, word) in q.fragments.iter().zip(&words) {
            assert_eq!(fragment.len(), word.len());
        }

        assert!(h.quiz.backspace());
        let q = h.quiz.current_question().unwrap();
        assert_eq!(q.fragments.last().unwrap().len(), words.last().unwrap().len() - 1);

        assert!(h.quiz.set_fragment(0, "a b-c!defghijklmnop"));
        assert_eq!(
            h.quiz.current_question().unwrap().fragments[0].len(),
            words[0].len()
        );
        assert!(!h.quiz.set_fragment(9, "x"));
    }

    #[test]
    fn test_actions_ignored_in_wrong_state() {
        let mut h = harness();
        assert_eq!(h.quiz.submit_answer(), Submission::Ignored);
        assert!(!h.quiz.show_answer());
        assert!(!h.quiz.next_question());
        assert!(!h.quiz.review());
        assert!(!h.quiz.pause());
        assert!(!h.quiz.resume());
        assert!(!h.quiz.stop());
        assert!(!h.quiz.change_question_index(0));

        h.start(form(2, false, None));
        assert!(!h.quiz.next_question());
        assert!(!h.quiz.review());
        assert!(!h.quiz.set_vocabulary(vocab()));
        assert!(h.quiz.new_quiz(&form(1, false, None)).is_ok());
        assert_eq!(h.quiz.session().questions.len(), 2);
    }
}
