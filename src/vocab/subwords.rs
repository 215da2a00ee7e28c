/// A target-language text broken into independently answered tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subparts {
    pub subwords: Vec<String>,
    pub separators: Vec<String>,
}

impl Subparts {
    /// Interleave subwords and separators back into display text.
    pub fn reconstruct(&self) -> String {
        let mut text = String::new();
        for (i, subword) in self.subwords.iter().enumerate() {
            text.push_str(subword);
            if let Some(sep) = self.separators.get(i) {
                text.push_str(sep);
            }
        }
        text
    }
}

fn is_separator(c: char) -> bool {
    c == ' ' || c == '-'
}

fn has_word_char(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Collapse whitespace runs to one space and hyphen runs to one hyphen.
fn normalise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;

    for c in text.trim().chars() {
        let c = if c.is_whitespace() { ' ' } else { c };
        if (c == ' ' || c == '-') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Split `text` on spaces and hyphens, keeping the separators in order.
pub fn split_subwords(text: &str) -> Subparts {
    let normalised = normalise(text);
    let mut parts = Subparts::default();
    let mut token = String::new();

    for c in normalised.chars() {
        if is_separator(c) {
            if has_word_char(&token) {
                parts.subwords.push(std::mem::take(&mut token));
            } else {
                token.clear();
            }
            parts.separators.push(c.to_string());
        } else {
            token.push(c);
        }
    }
    if has_word_char(&token) {
        parts.subwords.push(token);
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_word() {
        let parts = split_subwords("cat");
        assert_eq!(parts.subwords, vec!["cat"]);
        assert!(parts.separators.is_empty());
    }

    #[test]
    fn test_spaces_and_hyphens() {
        let parts = split_subwords("T-shirt and  jeans");
        assert_eq!(parts.subwords, vec!["T", "shirt", "and", "jeans"]);
        assert_eq!(parts.separators, vec!["-", " ", " "]);
        assert_eq!(parts.reconstruct(), "T-shirt and jeans");
    }

    #[test]
    fn test_collapses_runs_and_trims() {
        let parts = split_subwords("  ice \t cream--cone ");
        assert_eq!(parts.subwords, vec!["ice", "cream", "cone"]);
        assert_eq!(parts.separators, vec![" ", "-"]);
    }

    #[test]
    fn test_empty_text() {
        let parts = split_subwords("");
        assert!(parts.subwords.is_empty());
        assert!(parts.separators.is_empty());
    }
}
