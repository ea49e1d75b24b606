use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use crate::config::DEFAULT_VARIANTS_MARKER;

/// Variant number → assignment text, as listed in a lab README.
pub type VariantListing = BTreeMap<u32, String>;

/// An entry starts at a line opening with `<integer>.` followed by whitespace,
/// or right after the marker on its own line (`Variants: 1. ...`).
fn entry_start() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| {
        Regex::new(r"(?m)(?:\A[ \t]*:?|^)[ \t]*(\d+)\.\s+").expect("valid entry regex")
    })
}

/// Extracts the numbered variant listing that follows a marker phrase.
#[derive(Debug, Clone)]
pub struct VariantParser {
    marker: String,
}

impl Default for VariantParser {
    fn default() -> Self {
        Self::new(DEFAULT_VARIANTS_MARKER)
    }
}

impl VariantParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Parse README text into a listing.
    ///
    /// Only text after the first occurrence of the marker is scanned; with no
    /// marker the listing is empty. Each entry runs until the next numbered
    /// line or the end of input. A repeated number overwrites the earlier
    /// entry. Gaps in numbering are accepted as-is.
    pub fn parse(&self, readme: &str) -> VariantListing {
        let mut variants = VariantListing::new();
        let Some(section) = self.section(readme) else {
            debug!(marker = %self.marker, "variants marker not found");
            return variants;
        };

        let starts: Vec<_> = entry_start().captures_iter(section).collect();
        for (i, caps) in starts.iter().enumerate() {
            let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = starts
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(section.len(), |next| next.start());
            let text = section[whole.end()..end].trim();
            if text.is_empty() {
                continue;
            }
            // numbers too large for u32 cannot be assigned to anyone
            let Ok(number) = number.as_str().parse::<u32>() else {
                continue;
            };
            if variants.insert(number, text.to_string()).is_some() {
                debug!(variant = number, "duplicate variant number, keeping last");
            }
        }

        debug!(variants = variants.len(), "parsed variant listing");
        variants
    }

    fn section<'a>(&self, readme: &'a str) -> Option<&'a str> {
        if self.marker.is_empty() {
            return Some(readme);
        }
        readme
            .find(&self.marker)
            .map(|pos| &readme[pos + self.marker.len()..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = "# Lab 3: Data structures

Read the lecture notes first.

Варіанти завдань:

1. Implement a queue
   backed by a ring buffer.
2. Implement a binary heap
3. Implement a stack
";

    #[test]
    fn test_parse_contiguous_listing() {
        let variants = VariantParser::default().parse(README);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(variants[&3], "Implement a stack");
    }

    #[test]
    fn test_entry_spans_multiple_lines() {
        let variants = VariantParser::default().parse(README);
        assert_eq!(
            variants[&1],
            "Implement a queue\n   backed by a ring buffer."
        );
    }

    #[test]
    fn test_empty_and_unmarked_input() {
        let parser = VariantParser::default();
        assert!(parser.parse("").is_empty());
        assert!(parser.parse("1. Implement a stack\n2. Implement a queue").is_empty());
    }

    #[test]
    fn test_numbers_before_marker_are_ignored() {
        let readme = "Steps:\n1. Fork the repo\n\nВаріанти завдань\n1. Sort an array\n";
        let variants = VariantParser::default().parse(readme);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[&1], "Sort an array");
    }

    #[test]
    fn test_duplicate_number_last_wins() {
        let readme = "Variants\n1. First\n2. Second\n1. Replacement\n";
        let variants = VariantParser::new("Variants").parse(readme);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[&1], "Replacement");
    }

    #[test]
    fn test_gaps_are_accepted() {
        let readme = "Variants\n2. Two\n5. Five\n";
        let variants = VariantParser::new("Variants").parse(readme);
        assert_eq!(variants.keys().copied().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn test_decimal_inside_text_is_not_an_entry() {
        let readme = "Variants\n1. Round 2.5 to an integer\n2. Parse CSV\n";
        let variants = VariantParser::new("Variants").parse(readme);
        assert_eq!(variants[&1], "Round 2.5 to an integer");
        assert_eq!(variants[&2], "Parse CSV");
    }

    #[test]
    fn test_first_entry_on_marker_line() {
        let readme = "Варіанти завдань: 1. Implement a queue\n2. Implement a stack\n";
        let variants = VariantParser::default().parse(readme);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[&1], "Implement a queue");
        assert_eq!(variants[&2], "Implement a stack");
    }

    #[test]
    fn test_number_after_marker_needs_entry_syntax() {
        let readme = "Variants 2024\n1. Only entry\n";
        let variants = VariantParser::new("Variants").parse(readme);
        assert_eq!(variants.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_empty_entry_is_skipped() {
        let readme = "Variants\n1.   \n2. Two\n";
        let variants = VariantParser::new("Variants").parse(readme);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[&2], "Two");
    }
}
