use std::io::{Read, Write};

use super::core::VocabEntry;
use crate::error::QuizError;

const MIN_COLS: usize = 7;
const LIST_DIVIDER: char = ';';
const EMPTY_PLACEHOLDER: &str = "_";

/// Media file stem derived from the sheet's filename column.
pub fn format_filename(text: &str) -> String {
    text.trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_punctuation() => None,
            c => Some(c),
        })
        .collect::<String>()
        .to_lowercase()
}

/// Join base text with its readings, e.g. `食(た)べる`.
///
/// Both columns are `;`-separated lists of equal length; a `_` reading means
/// the chunk needs no hint.
pub fn format_native_text(oyamoji: &str, furigana: &str) -> String {
    if furigana.trim().is_empty() {
        return oyamoji.to_string();
    }

    let readings: Vec<&str> = furigana.split(LIST_DIVIDER).map(str::trim).collect();
    oyamoji
        .split(LIST_DIVIDER)
        .map(str::trim)
        .enumerate()
        .map(|(i, base)| match readings.get(i) {
            Some(&reading) if reading != EMPTY_PLACEHOLDER && !reading.is_empty() => {
                format!("{base}({reading})")
            }
            _ => base.to_string(),
        })
        .collect()
}

/// Read vocabulary rows from a spreadsheet export.
///
/// Columns: english, japanese, base text, readings, filename, category, type,
/// then an optional image attribution and an optional narration length in
/// seconds. Short rows are skipped.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<VocabEntry>, QuizError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (row_number, record) in rdr.records().enumerate() {
        let record = record?;
        if record.len() < MIN_COLS {
            tracing::warn!(
                "row {} skipped, expected {} or more columns",
                row_number + 1,
                MIN_COLS
            );
            continue;
        }

        let furigana = &record[3];
        let stem = format_filename(&record[4]);

        entries.push(VocabEntry {
            eng: record[0].to_string(),
            jp: record[1].to_string(),
            jp_formatted: format_native_text(&record[2], furigana),
            has_furigana: !furigana.trim().is_empty(),
            category: record[5].to_string(),
            entry_type: record[6].to_string(),
            audio: Some(format!("{stem}.mp3")),
            image: Some(format!("{stem}.jpg")),
            attribution: record.get(7).map(str::trim).filter(|s| !s.is_empty()).map(String::from),
            effective_audio_duration: record.get(8).and_then(parse_duration),
        });
    }

    Ok(entries)
}

/// Narration length in seconds; blank, non-numeric or non-positive cells are dropped.
fn parse_duration(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    match cell.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Some(secs),
        _ => {
            tracing::warn!("ignoring narration length {:?}", cell);
            None
        }
    }
}

/// Write entries in the JSON layout `VocabData::load` reads.
pub fn write_json<W: Write>(entries: &[VocabEntry], writer: W) -> Result<(), QuizError> {
    serde_json::to_writer_pretty(writer, entries)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::VocabData;

    const SHEET: &str = "\
english,japanese,oyamoji,furigana,filename,category,type,attribution
eat,食べる,食;べる,た;_,Eat!,verbs,verb,
polar bear,白熊,白熊,しろくま,Polar Bear,animals,noun,Photo by A. Person
short,row
apple,りんご,りんご,,apple,food,noun
";

    #[test]
    fn test_format_filename() {
        assert_eq!(format_filename("  Polar Bear "), "polar_bear");
        assert_eq!(format_filename("T-shirt!"), "tshirt");
        assert_eq!(format_filename("see you tomorrow"), "see_you_tomorrow");
    }

    #[test]
    fn test_format_native_text() {
        assert_eq!(format_native_text("食;べる", "た;_"), "食(た)べる");
        assert_eq!(format_native_text("りんご", ""), "りんご");
    }

    #[test]
    fn test_read_csv_rows() {
        let entries = read_csv(SHEET.as_bytes()).unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].eng, "eat");
        assert_eq!(entries[0].jp_formatted, "食(た)べる");
        assert_eq!(entries[0].audio.as_deref(), Some("eat.mp3"));
        assert_eq!(entries[0].attribution, None);
        assert!(entries[0].has_furigana);

        assert_eq!(entries[1].image.as_deref(), Some("polar_bear.jpg"));
        assert_eq!(entries[1].attribution.as_deref(), Some("Photo by A. Person"));

        assert!(!entries[2].has_furigana);
        assert_eq!(entries[2].category, "food");
    }

    #[test]
    fn test_narration_length_column() {
        let sheet = "\
english,japanese,oyamoji,furigana,filename,category,type,attribution,duration
cat,猫,猫,ねこ,cat,animals,noun,,0.82
dog,犬,犬,いぬ,dog,animals,noun,,
fish,魚,魚,さかな,fish,animals,noun,,long
";
        let entries = read_csv(sheet.as_bytes()).unwrap();
        assert_eq!(entries[0].effective_audio_duration, Some(0.82));
        assert_eq!(entries[1].effective_audio_duration, None);
        assert_eq!(entries[2].effective_audio_duration, None);
        assert_eq!(entries[0].attribution, None);
    }

    #[test]
    fn test_json_export_reloads() {
        let entries = read_csv(SHEET.as_bytes()).unwrap();
        let mut out = Vec::new();
        write_json(&entries, &mut out).unwrap();

        let data = VocabData::from_json_str(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(data.all(), entries.as_slice());
    }
}
