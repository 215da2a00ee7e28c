use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::QuizError;

static DATA_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/data");

pub const DEFAULT_DATA_FILE: &str = "vocab_data.json";

/// One vocabulary item, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VocabEntry {
    /// Target-language text the user types
    pub eng: String,
    /// Native-language prompt
    pub jp: String,
    /// Prompt with reading hints, falls back to `jp` when empty
    #[serde(default)]
    pub jp_formatted: String,
    #[serde(default)]
    pub has_furigana: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "type")]
    pub entry_type: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub audio: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image: Option<String>,
    #[serde(default, rename = "attr", deserialize_with = "blank_as_none")]
    pub attribution: Option<String>,
    #[serde(default, deserialize_with = "number_or_blank")]
    pub effective_audio_duration: Option<f64>,
}

impl VocabEntry {
    pub fn new(eng: impl Into<String>, jp: impl Into<String>) -> Self {
        Self {
            eng: eng.into(),
            jp: jp.into(),
            jp_formatted: String::new(),
            has_furigana: false,
            category: String::new(),
            entry_type: String::new(),
            audio: None,
            image: None,
            attribution: None,
            effective_audio_duration: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    pub fn native_display(&self) -> &str {
        if self.jp_formatted.is_empty() {
            &self.jp
        } else {
            &self.jp_formatted
        }
    }

    fn is_complete(&self) -> bool {
        !self.eng.trim().is_empty() && !self.jp.trim().is_empty()
    }
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn number_or_blank<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<NumberOrText>::deserialize(d)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// The full data set plus the category subset the quiz draws from.
#[derive(Debug, Clone, Default)]
pub struct VocabData {
    all: Vec<VocabEntry>,
    subset: Vec<VocabEntry>,
}

impl VocabData {
    pub fn from_entries(entries: Vec<VocabEntry>) -> Self {
        let (all, skipped): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(VocabEntry::is_complete);
        if !skipped.is_empty() {
            tracing::warn!("skipped {} vocabulary entries with missing text", skipped.len());
        }
        Self {
            all,
            subset: Vec::new(),
        }
    }

    /// Data set compiled into the binary
    pub fn embedded() -> Result<Self, QuizError> {
        let file = DATA_DIR
            .get_file(DEFAULT_DATA_FILE)
            .ok_or_else(|| QuizError::VocabLoad(format!("{DEFAULT_DATA_FILE} not embedded")))?;
        let text = file
            .contents_utf8()
            .ok_or_else(|| QuizError::VocabLoad(format!("{DEFAULT_DATA_FILE} is not utf-8")))?;
        Self::from_json_str(text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, QuizError> {
        let entries: Vec<VocabEntry> = serde_json::from_str(text)?;
        Ok(Self::from_entries(entries))
    }

    /// Load a `.json` data set or import a `.csv` sheet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, QuizError> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        let data = if is_csv {
            let file = std::fs::File::open(path)?;
            Self::from_entries(super::import::read_csv(file)?)
        } else {
            Self::from_json_str(&std::fs::read_to_string(path)?)?
        };
        tracing::info!("loaded {} vocabulary entries from {}", data.all.len(), path.display());
        Ok(data)
    }

    pub fn all(&self) -> &[VocabEntry] {
        &self.all
    }

    pub fn subset(&self) -> &[VocabEntry] {
        &self.subset
    }

    pub fn max_question_count(&self) -> usize {
        self.subset.len()
    }

    /// Categories with their entry counts, most populated first.
    pub fn categories(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let order: Vec<&str> = self
            .all
            .iter()
            .map(|e| e.category.as_str())
            .inspect(|c| *counts.entry(*c).or_insert(0) += 1)
            .unique()
            .collect();

        order
            .into_iter()
            .map(|c| (c.to_string(), counts[c]))
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .collect()
    }

    /// Restrict the quiz to the given categories.
    pub fn select_categories<S: AsRef<str>>(&mut self, categories: &[S]) -> Result<usize, QuizError> {
        self.subset = self
            .all
            .iter()
            .filter(|e| categories.iter().any(|c| c.as_ref() == e.category))
            .cloned()
            .collect();

        if self.subset.is_empty() {
            return Err(QuizError::NoCategorySelected);
        }
        Ok(self.subset.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_data_loads() {
        let data = VocabData::embedded().unwrap();
        assert!(!data.all().is_empty());
        assert!(data.subset().is_empty());
        assert_eq!(data.max_question_count(), 0);
    }

    #[test]
    fn test_blank_fields_become_none() {
        let json = r#"[{"eng": "ice cream", "jp": "アイス", "audio": "", "image": "x.jpg",
                        "attr": " ", "effectiveAudioDuration": ""}]"#;
        let data = VocabData::from_json_str(json).unwrap();
        let entry = &data.all()[0];
        assert_eq!(entry.audio, None);
        assert_eq!(entry.image.as_deref(), Some("x.jpg"));
        assert_eq!(entry.attribution, None);
        assert_eq!(entry.effective_audio_duration, None);
        assert_eq!(entry.native_display(), "アイス");
    }

    #[test]
    fn test_duration_accepts_number_and_text() {
        let json = r#"[{"eng": "a", "jp": "b", "effectiveAudioDuration": 0.5},
                       {"eng": "c", "jp": "d", "effectiveAudioDuration": "0.75"}]"#;
        let data = VocabData::from_json_str(json).unwrap();
        assert_eq!(data.all()[0].effective_audio_duration, Some(0.5));
        assert_eq!(data.all()[1].effective_audio_duration, Some(0.75));
    }

    #[test]
    fn test_incomplete_entries_skipped() {
        let json = r#"[{"eng": "", "jp": "b"}, {"eng": "c", "jp": "d"}]"#;
        let data = VocabData::from_json_str(json).unwrap();
        assert_eq!(data.all().len(), 1);
    }

    #[test]
    fn test_categories_ordered_by_count() {
        let data = VocabData::from_entries(vec![
            VocabEntry::new("a", "1").with_category("food"),
            VocabEntry::new("b", "2").with_category("animals"),
            VocabEntry::new("c", "3").with_category("animals"),
            VocabEntry::new("d", "4").with_category("verbs"),
        ]);
        assert_eq!(
            data.categories(),
            vec![
                ("animals".to_string(), 2),
                ("food".to_string(), 1),
                ("verbs".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_select_categories() {
        let mut data = VocabData::from_entries(vec![
            VocabEntry::new("a", "1").with_category("food"),
            VocabEntry::new("b", "2").with_category("animals"),
        ]);
        assert_eq!(data.select_categories(&["animals"]), Ok(1));
        assert_eq!(data.subset()[0].eng, "b");

        assert_eq!(
            data.select_categories(&["missing"]),
            Err(QuizError::NoCategorySelected)
        );
        assert_eq!(data.max_question_count(), 0);
    }
}
