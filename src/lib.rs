pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod celebration;
pub mod clock;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod quiz;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod stats;
pub mod ui;
pub mod util;
pub mod vocab;

pub use error::QuizError;
pub use quiz::{Quiz, QuizEvent};
