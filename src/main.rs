use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File},
    io::{self, stdin, BufWriter},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tango::{
    app::App,
    app_dirs::AppDirs,
    audio::NullAudio,
    clock::MonotonicTimeSource,
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    vocab::{import::write_json, VocabData},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const TICK_RATE_MS: u64 = 100;

/// terminal vocabulary quiz
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal vocabulary quiz: timed questions, limited attempts, narration with a karaoke highlight, and a review mode once the quiz is over."
)]
pub struct Cli {
    /// vocabulary file to use instead of the built-in set (.json, or .csv to import)
    #[clap(long)]
    vocab: Option<PathBuf>,

    /// category to preselect in the menu (repeatable)
    #[clap(short = 'c', long = "category")]
    categories: Vec<String>,

    /// number of questions per quiz
    #[clap(short = 'n', long)]
    questions: Option<usize>,

    /// ask every entry in the selected categories
    #[clap(long)]
    all: bool,

    /// seconds allowed per question
    #[clap(short = 't', long)]
    time: Option<u32>,

    /// disable the answer timer
    #[clap(long)]
    no_timer: bool,

    /// attempts allowed per question
    #[clap(long)]
    attempts: Option<u32>,

    /// allow unlimited attempts
    #[clap(long, conflicts_with = "attempts")]
    unlimited: bool,

    /// allow the same entry to be asked more than once
    #[clap(long)]
    duplicates: bool,

    /// write the loaded vocabulary as JSON and exit
    #[clap(long, value_name = "PATH")]
    export_json: Option<PathBuf>,

    /// print the available categories and exit
    #[clap(long)]
    list_categories: bool,

    /// store the resulting settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Layer command line overrides on top of the stored config
    fn apply(&self, cfg: &mut Config) {
        if !self.categories.is_empty() {
            cfg.categories = self.categories.clone();
        }
        if let Some(n) = self.questions {
            cfg.default_question_count = n;
        }
        if self.all {
            cfg.use_all_questions = true;
        }
        if let Some(secs) = self.time {
            cfg.answer_secs = secs;
        }
        if self.no_timer {
            cfg.use_timer = false;
        }
        if let Some(attempts) = self.attempts {
            cfg.attempts_per_question = attempts;
            cfg.limit_attempts = true;
        }
        if self.unlimited {
            cfg.limit_attempts = false;
        }
        if self.duplicates {
            cfg.duplicate_questions = true;
        }
    }

    fn load_vocab(&self) -> Result<VocabData, tango::QuizError> {
        match &self.vocab {
            Some(path) => VocabData::load(path),
            None => VocabData::embedded(),
        }
    }
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = File::options().create(true).append(true).open(&path) else {
        return;
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "tango=info".into()))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    if cli.save_config {
        store.save(&config)?;
        tracing::info!("saved settings to {}", store.path().display());
    }

    let data = cli.load_vocab()?;

    if let Some(out) = &cli.export_json {
        write_json(data.all(), BufWriter::new(File::create(out)?))?;
        println!("wrote {} entries to {}", data.all().len(), out.display());
        return Ok(());
    }

    if cli.list_categories {
        for (name, count) in data.categories() {
            println!("{name}\t{count}");
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(
        config,
        data,
        Box::new(NullAudio),
        Arc::new(MonotonicTimeSource::new()),
    );
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut last_tick = Instant::now();

    loop {
        let size = terminal.size()?;
        app.viewport = (size.width, size.height);
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            AppEvent::Tick => {
                let now = Instant::now();
                app.on_tick(now - last_tick);
                last_tick = now;
            }
            AppEvent::Resize => {}
            AppEvent::Key(key) => app.handle_key(key),
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
