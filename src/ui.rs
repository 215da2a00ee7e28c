use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{outcome_message, App, MenuField};
use crate::celebration::Fireworks;
use crate::session::{CurrentQuestion, GameState};
use crate::stats::AnswerOutcome;
use crate::util::format_time;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn outcome_color(outcome: Option<AnswerOutcome>) -> Color {
    match outcome {
        Some(AnswerOutcome::Correct) => Color::Green,
        Some(AnswerOutcome::OutOfAttempts) | Some(AnswerOutcome::OutOfTime) => Color::Red,
        Some(AnswerOutcome::ShowAnswer) => Color::Yellow,
        None => Color::DarkGray,
    }
}

fn checkbox(on: bool) -> &'static str {
    if on {
        "[x]"
    } else {
        "[ ]"
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.quiz.state() {
            GameState::Menu => render_menu(self, area, buf),
            GameState::Question | GameState::Answer | GameState::Review => {
                render_question(self, area, buf)
            }
            GameState::End => render_end(self, area, buf),
            GameState::Paused => {
                let paused = Paragraph::new(Span::styled(
                    "PAUSED - press any key to resume",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::ITALIC),
                ))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
                let y = area.y + area.height / 2;
                paused.render(Rect::new(area.x, y, area.width, 1), buf);
            }
        }

        if self.fireworks.is_active() {
            render_fireworks(&self.fireworks, area, buf);
        }
    }
}

fn render_menu(app: &App, area: Rect, buf: &mut Buffer) {
    let menu = &app.menu;
    let form = &menu.form;
    let fields = menu.fields();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(fields.len() as u16),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Span::styled("tango", bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let lines: Vec<Line> = fields
        .iter()
        .enumerate()
        .map(|(row, field)| {
            let text = match field {
                MenuField::Category(i) => {
                    let choice = &menu.categories[*i];
                    format!("{} {} ({})", checkbox(choice.selected), choice.name, choice.count)
                }
                MenuField::QuestionCount => format!(
                    "{}: {} (max {})",
                    field,
                    if form.use_all_questions {
                        "all"
                    } else {
                        form.question_count.as_str()
                    },
                    menu.available()
                ),
                MenuField::UseAllQuestions => format!("{} {}", checkbox(form.use_all_questions), field),
                MenuField::UseTimer => format!("{} {}", checkbox(form.use_timer), field),
                MenuField::AnswerSecs => format!("{}: {}", field, form.answer_secs),
                MenuField::LimitAttempts => format!("{} {}", checkbox(form.limit_attempts), field),
                MenuField::Attempts => format!("{}: {}", field, form.attempts),
                MenuField::DuplicateQuestions => {
                    format!("{} {}", checkbox(form.duplicate_questions), field)
                }
                MenuField::Start => format!("> {} <", field),
            };

            let disabled = matches!(
                (field, form.use_timer, form.limit_attempts, form.use_all_questions),
                (MenuField::AnswerSecs, false, _, _)
                    | (MenuField::Attempts, _, false, _)
                    | (MenuField::QuestionCount, _, _, true)
            );
            let mut style = if disabled { dim() } else { Style::default() };
            if row == menu.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(Span::styled(text, style))
        })
        .collect();

    Paragraph::new(lines).render(chunks[1], buf);

    if let Some(error) = &menu.error {
        Paragraph::new(Span::styled(error.as_str(), bold().fg(Color::Red)))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }

    Paragraph::new(Span::styled(
        "(↑/↓) move / (space) toggle / (a)ll categories / (enter) start / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[3], buf);
}

/// Answer fields as typed, padded to each subword's length.
fn typed_line(question: &CurrentQuestion) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, subword) in question.subwords.iter().enumerate() {
        let typed = question.fragments.get(i).cloned().unwrap_or_default();
        let missing = subword.chars().count().saturating_sub(typed.chars().count());
        spans.push(Span::styled(typed, bold().fg(Color::Cyan)));
        spans.push(Span::styled("_".repeat(missing), dim()));
        if let Some(sep) = question.separators.get(i) {
            spans.push(Span::raw(sep.clone()));
        }
    }
    Line::from(spans)
}

/// Target text with the first `progress` share of characters lit.
fn karaoke_line(text: &str, progress: f64, color: Color) -> Line<'static> {
    let total = text.chars().count();
    let lit = ((progress.clamp(0.0, 1.0) * total as f64).round() as usize).min(total);
    let head: String = text.chars().take(lit).collect();
    let tail: String = text.chars().skip(lit).collect();
    Line::from(vec![
        Span::styled(head, bold().fg(color)),
        Span::styled(tail, dim()),
    ])
}

fn progress_line(app: &App) -> Line<'static> {
    let position = app.quiz.session().questions.position();
    let spans = app
        .quiz
        .session()
        .progress
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            let mut style = Style::default().fg(outcome_color(*outcome));
            if i == position {
                style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
            }
            Span::styled("■ ", style)
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn render_question(app: &App, area: Rect, buf: &mut Buffer) {
    let quiz = &app.quiz;
    let Some(question) = quiz.current_question() else {
        return;
    };
    let state = quiz.state();
    let session = quiz.session();
    let stats = quiz.stats();
    let position = session.questions.position();
    let outcome = session.progress.get(position).copied().flatten();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(1), // timer
            Constraint::Min(1),
            Constraint::Length(2), // prompt
            Constraint::Length(2), // answer
            Constraint::Length(1), // attempts
            Constraint::Length(1), // status
            Constraint::Min(1),
            Constraint::Length(1), // progress
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = format!(
        "{}  {}/{}   correct {}  streak {}",
        if state == GameState::Review { "review" } else { "question" },
        position + 1,
        session.questions.len(),
        stats.score.correct,
        stats.streak.current,
    );
    Paragraph::new(Span::styled(header, dim()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let timer = quiz.timer();
    if timer.is_enabled() && state != GameState::Review {
        let warning = timer.warning_fired();
        let remaining = timer.remaining();
        let label = format!(
            "{}.{}",
            format_time(remaining.as_secs()),
            remaining.subsec_millis() / 100
        );
        Gauge::default()
            .gauge_style(Style::default().fg(if warning { Color::Red } else { Color::Green }))
            .ratio(timer.fraction_remaining().clamp(0.0, 1.0))
            .label(label)
            .render(chunks[1], buf);
    }

    let mut prompt = vec![Line::from(Span::styled(
        question.source_text.clone(),
        bold().fg(Color::White),
    ))];
    if let Some(attr) = &question.media.attribution {
        prompt.push(Line::from(Span::styled(format!("image: {attr}"), dim())));
    }
    // long prompts read better left aligned once they wrap
    let prompt_alignment = if question.source_text.width() < chunks[3].width as usize {
        Alignment::Center
    } else {
        Alignment::Left
    };
    Paragraph::new(prompt)
        .alignment(prompt_alignment)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    let answer = match state {
        GameState::Question => typed_line(question),
        _ => {
            let progress = quiz.highlight_progress().unwrap_or(1.0);
            let color = if state == GameState::Review {
                outcome_color(outcome)
            } else {
                Color::Green
            };
            if !quiz.is_idle() && quiz.highlight_progress().is_none() {
                // outcome cue still playing
                Line::from(Span::styled(question.typed_text(), bold().fg(Color::Cyan)))
            } else {
                karaoke_line(&question.target_text, progress, color)
            }
        }
    };
    let answer_width = answer.width() as u16;
    Paragraph::new(answer)
        .alignment(if answer_width < chunks[4].width {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);

    if state == GameState::Question && session.settings.limit_attempts {
        Paragraph::new(Span::styled(
            format!("attempts left: {}", question.attempts_remaining.max(0)),
            dim(),
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    }

    let status = match state {
        GameState::Review => outcome.map(|o| outcome_message(o).to_string()),
        _ => app.status.clone(),
    };
    if let Some(status) = status {
        let color = match state {
            GameState::Question => Color::Red,
            _ => outcome_color(outcome),
        };
        Paragraph::new(Span::styled(status, bold().fg(color)))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }

    Paragraph::new(progress_line(app))
        .alignment(Alignment::Center)
        .render(chunks[8], buf);

    let legend = match state {
        GameState::Question => "(enter) submit / (tab) show answer / (ctrl+p) pause / (esc) menu",
        GameState::Answer if quiz.next_enabled() => "(enter) next / (space) replay / (esc) menu",
        GameState::Answer => "(ctrl+p) pause / (esc) menu",
        _ => "(←/→) browse / (space) replay / (esc) menu",
    };
    Paragraph::new(Span::styled(legend, Style::default().add_modifier(Modifier::ITALIC)))
        .render(chunks[9], buf);
}

fn render_end(app: &App, area: Rect, buf: &mut Buffer) {
    let quiz = &app.quiz;
    let stats = quiz.stats();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(2),
            Constraint::Length(7),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    if let Some(tier) = quiz.completion() {
        Paragraph::new(Span::styled(tier.message(), bold().fg(Color::Magenta)))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);
    }

    let mut lines = vec![
        Line::from(format!(
            "correct {}   incorrect {}   shown {}",
            stats.score.correct, stats.score.incorrect, stats.score.shown
        )),
        Line::from(format!(
            "{:.0}% of {} answered",
            stats.correct_ratio() * 100.0,
            stats.total_answered()
        )),
        Line::from(format!("longest streak {}", stats.streak.longest)),
    ];
    if quiz.settings().use_timer {
        lines.push(Line::from(format!(
            "average answer time {:.2}s",
            stats.average_answer_time()
        )));
    }
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("results"))
        .render(chunks[2], buf);

    Paragraph::new(progress_line(app))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    let legend = if quiz.review_enabled() {
        "(enter) review / (esc) menu"
    } else {
        "(esc) menu"
    };
    Paragraph::new(Span::styled(legend, Style::default().add_modifier(Modifier::ITALIC)))
        .render(chunks[5], buf);
}

/// Draw fireworks over whatever is already on screen
fn render_fireworks(fireworks: &Fireworks, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        Color::Blue,
        Color::LightYellow,
    ];

    for (x, y, particle) in fireworks.visible() {
        if x >= area.width || y >= area.height {
            continue;
        }
        let color = colors[particle.color_index % colors.len()];
        let fade = 1.0 - (particle.age / particle.max_age);
        let style = if fade > 0.6 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if fade > 0.25 {
            Style::default().fg(color)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };

        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_symbol(&particle.symbol.to_string());
            cell.set_style(style);
        }
    }
}
