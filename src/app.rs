use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::audio::{AudioPlayer, Cue};
use crate::celebration::Fireworks;
use crate::clock::TimeSource;
use crate::config::Config;
use crate::quiz::{Quiz, QuizEvent};
use crate::session::{GameState, SettingsForm};
use crate::stats::AnswerOutcome;
use crate::vocab::VocabData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChoice {
    pub name: String,
    pub count: usize,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum MenuField {
    #[strum(serialize = "category")]
    Category(usize),
    #[strum(serialize = "Questions")]
    QuestionCount,
    #[strum(serialize = "Use all questions")]
    UseAllQuestions,
    #[strum(serialize = "Timer")]
    UseTimer,
    #[strum(serialize = "Seconds per question")]
    AnswerSecs,
    #[strum(serialize = "Limit attempts")]
    LimitAttempts,
    #[strum(serialize = "Attempts per question")]
    Attempts,
    #[strum(serialize = "Allow repeats")]
    DuplicateQuestions,
    #[strum(serialize = "Start")]
    Start,
}

/// Category picks and raw settings while in the menu
#[derive(Debug, Clone)]
pub struct MenuState {
    pub categories: Vec<CategoryChoice>,
    pub form: SettingsForm,
    pub cursor: usize,
    pub error: Option<String>,
}

impl MenuState {
    /// Preselect the configured categories, or all of them when none are.
    pub fn new(data: &VocabData, cfg: &Config) -> Self {
        let categories = data
            .categories()
            .into_iter()
            .map(|(name, count)| CategoryChoice {
                selected: cfg.categories.is_empty() || cfg.categories.contains(&name),
                name,
                count,
            })
            .collect();
        Self {
            categories,
            form: SettingsForm::from_config(cfg),
            cursor: 0,
            error: None,
        }
    }

    pub fn fields(&self) -> Vec<MenuField> {
        let mut fields: Vec<MenuField> = (0..self.categories.len()).map(MenuField::Category).collect();
        fields.extend([
            MenuField::QuestionCount,
            MenuField::UseAllQuestions,
            MenuField::UseTimer,
            MenuField::AnswerSecs,
            MenuField::LimitAttempts,
            MenuField::Attempts,
            MenuField::DuplicateQuestions,
            MenuField::Start,
        ]);
        fields
    }

    pub fn current_field(&self) -> MenuField {
        self.fields()
            .get(self.cursor)
            .copied()
            .unwrap_or(MenuField::Start)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.fields().len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    pub fn selected_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| c.selected)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Entries the current category picks would draw from.
    pub fn available(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.selected)
            .map(|c| c.count)
            .sum()
    }

    pub fn toggle(&mut self) {
        let field = self.current_field();
        let form = &mut self.form;
        match field {
            MenuField::Category(i) => {
                if let Some(choice) = self.categories.get_mut(i) {
                    choice.selected = !choice.selected;
                }
            }
            MenuField::UseAllQuestions => form.use_all_questions = !form.use_all_questions,
            MenuField::UseTimer => form.use_timer = !form.use_timer,
            MenuField::LimitAttempts => form.limit_attempts = !form.limit_attempts,
            MenuField::DuplicateQuestions => form.duplicate_questions = !form.duplicate_questions,
            MenuField::QuestionCount | MenuField::AnswerSecs | MenuField::Attempts | MenuField::Start => {}
        }
    }

    pub fn toggle_all_categories(&mut self) {
        let select = self.categories.iter().any(|c| !c.selected);
        self.categories.iter_mut().for_each(|c| c.selected = select);
    }

    fn numeric_input(&mut self) -> Option<&mut String> {
        match self.current_field() {
            MenuField::QuestionCount => Some(&mut self.form.question_count),
            MenuField::AnswerSecs => Some(&mut self.form.answer_secs),
            MenuField::Attempts => Some(&mut self.form.attempts),
            _ => None,
        }
    }

    pub fn push_digit(&mut self, c: char) {
        if let Some(input) = self.numeric_input() {
            if c.is_ascii_digit() && input.len() < 4 {
                input.push(c);
            }
        }
    }

    pub fn pop_digit(&mut self) {
        if let Some(input) = self.numeric_input() {
            input.pop();
        }
    }
}

/// Application shell around the quiz: menu, key bindings, fireworks
pub struct App {
    pub quiz: Quiz,
    pub data: VocabData,
    pub menu: MenuState,
    pub fireworks: Fireworks,
    /// Feedback line under the answer fields
    pub status: Option<String>,
    pub viewport: (u16, u16),
    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        data: VocabData,
        audio: Box<dyn AudioPlayer>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let menu = MenuState::new(&data, &config);
        Self {
            quiz: Quiz::new(config, Vec::new(), audio, clock),
            data,
            menu,
            fireworks: Fireworks::new(),
            status: None,
            viewport: (80, 24),
            should_quit: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.quiz = self.quiz.with_seed(seed);
        self.fireworks = Fireworks::seeded(seed);
        self
    }

    pub fn state(&self) -> GameState {
        self.quiz.state()
    }

    pub fn start_quiz(&mut self) {
        let selected = self.menu.selected_categories();
        if let Err(e) = self.data.select_categories(&selected) {
            self.menu.error = Some(e.to_string());
            return;
        }
        self.quiz.set_vocabulary(self.data.subset().to_vec());
        self.quiz.play_cue(Cue::ButtonClick);
        match self.quiz.new_quiz(&self.menu.form) {
            Ok(()) => self.menu.error = None,
            Err(e) => {
                warn!("could not start quiz: {}", e);
                self.menu.error = Some(e.to_string());
            }
        }
        self.process_events();
    }

    pub fn on_tick(&mut self, dt: Duration) {
        self.quiz.on_tick();
        self.fireworks.update(dt);
        self.process_events();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if ctrl && key.code == KeyCode::Char('p') && self.quiz.state() != GameState::Paused {
            self.quiz.pause();
            self.process_events();
            return;
        }

        match self.quiz.state() {
            GameState::Menu => self.handle_menu_key(key),
            GameState::Question => match key.code {
                KeyCode::Enter => {
                    self.quiz.submit_answer();
                }
                KeyCode::Tab => {
                    self.quiz.show_answer();
                }
                KeyCode::Backspace => {
                    self.quiz.backspace();
                }
                KeyCode::Esc => {
                    self.quiz.stop();
                }
                KeyCode::Char(c) if !ctrl => {
                    self.quiz.type_char(c);
                }
                _ => {}
            },
            GameState::Answer => match key.code {
                KeyCode::Enter => {
                    self.quiz.next_question();
                }
                KeyCode::Char(' ') => {
                    self.quiz.replay_narration();
                }
                KeyCode::Esc => {
                    self.quiz.stop();
                }
                _ => {}
            },
            GameState::End => match key.code {
                KeyCode::Enter => {
                    self.quiz.review();
                }
                KeyCode::Esc => {
                    self.quiz.stop();
                }
                _ => {}
            },
            GameState::Review => {
                let position = self.quiz.session().questions.position() as isize;
                match key.code {
                    KeyCode::Left => self.navigate(position - 1),
                    KeyCode::Right => self.navigate(position + 1),
                    KeyCode::Char(' ') => {
                        self.quiz.replay_narration();
                    }
                    KeyCode::Esc => {
                        self.quiz.stop();
                    }
                    _ => {}
                }
            }
            GameState::Paused => {
                self.quiz.resume();
            }
        }
        self.process_events();
    }

    fn navigate(&mut self, index: isize) {
        if self.quiz.change_question_index(index) {
            self.quiz.play_cue(Cue::NavButtonClick);
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.menu.move_cursor(-1),
            KeyCode::Down | KeyCode::Tab => self.menu.move_cursor(1),
            KeyCode::Char(' ') => self.menu.toggle(),
            KeyCode::Char('a') => self.menu.toggle_all_categories(),
            KeyCode::Char(c) if c.is_ascii_digit() => self.menu.push_digit(c),
            KeyCode::Backspace => self.menu.pop_digit(),
            KeyCode::Enter => self.start_quiz(),
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn process_events(&mut self) {
        for event in self.quiz.drain_events() {
            match event {
                QuizEvent::StateChanged { to, .. } => {
                    if matches!(to, GameState::Menu | GameState::Review) {
                        self.fireworks.stop();
                    }
                    if to == GameState::Menu {
                        self.status = None;
                    }
                }
                QuizEvent::QuestionRendered { .. } => self.status = None,
                QuizEvent::ValidationFailed(issue) => {
                    self.status = Some(format!("Word {}: {}", issue.index + 1, issue.issue));
                }
                QuizEvent::AttemptFailed { attempts_remaining } => {
                    self.status = Some(if self.quiz.settings().limit_attempts {
                        format!("Not quite! {} attempts left", attempts_remaining)
                    } else {
                        "Not quite! Try again".to_string()
                    });
                }
                QuizEvent::Answered(outcome) => {
                    self.status = Some(outcome_message(outcome).to_string());
                }
                QuizEvent::Completed { celebrate, .. } => {
                    if celebrate {
                        self.fireworks.start(self.viewport.0, self.viewport.1);
                    }
                }
                QuizEvent::MediaFailed(reason) => debug!("media: {}", reason),
                QuizEvent::TimerTick { .. }
                | QuizEvent::TimeWarning
                | QuizEvent::NextAvailable
                | QuizEvent::ReviewAvailable => {}
            }
        }
    }
}

pub fn outcome_message(outcome: AnswerOutcome) -> &'static str {
    match outcome {
        AnswerOutcome::Correct => "Correct!",
        AnswerOutcome::OutOfAttempts => "Out of attempts",
        AnswerOutcome::OutOfTime => "Out of time",
        AnswerOutcome::ShowAnswer => "Here's the answer",
    }
}
