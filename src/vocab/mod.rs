pub mod core;
pub mod import;
pub mod subwords;

pub use core::{VocabData, VocabEntry};
pub use subwords::{split_subwords, Subparts};
