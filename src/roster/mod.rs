pub mod types;

pub use types::{normalize_name, RosterEntry, VariantAssignment};

use tracing::{debug, warn};

use crate::config::ColumnConfig;
use crate::sheets::{cell_text, cell_u32, Record, Table};

/// Resolves a platform username to a student's display name and variant.
///
/// Built from the roster and variants sheets. Display names are normalized
/// on both sides of every comparison.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    assignments: Vec<VariantAssignment>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>, assignments: Vec<VariantAssignment>) -> Self {
        Self {
            entries,
            assignments,
        }
    }

    /// Build from the raw roster and variants sheets.
    ///
    /// Missing columns are tolerated: the affected lookups simply miss.
    pub fn from_tables(roster: &Table, variants: &Table, columns: &ColumnConfig) -> Self {
        for (table, column) in [
            (roster, &columns.roster_identity),
            (roster, &columns.roster_name),
            (variants, &columns.variants_name),
            (variants, &columns.variants_number),
        ] {
            if !table.columns.is_empty() && !table.has_column(column) {
                warn!(column = %column, "expected column missing from source sheet");
            }
        }

        // every data row is kept, even without a username, so that positions
        // follow the sheet's row order
        let text = |record: &Record, column: &str| {
            record.get(column).map(cell_text).unwrap_or_default()
        };
        let entries = roster
            .records
            .iter()
            .map(|record| RosterEntry {
                external_identity: text(record, columns.roster_identity.as_str()),
                display_name: text(record, columns.roster_name.as_str()),
            })
            .collect();

        let assignments = variants
            .records
            .iter()
            .filter_map(|record| {
                let name = cell_text(record.get(&columns.variants_name)?);
                if name.trim().is_empty() {
                    return None;
                }
                Some(VariantAssignment {
                    display_name: name,
                    variant_number: record.get(&columns.variants_number).and_then(cell_u32),
                })
            })
            .collect();

        Self::new(entries, assignments)
    }

    /// Exact-match lookup of a username; returns the normalized display name.
    pub fn resolve_display_name(&self, external_identity: &str) -> Option<String> {
        let found = self
            .entries
            .iter()
            .find(|e| !e.external_identity.is_empty() && e.external_identity == external_identity)
            .map(|e| normalize_name(&e.display_name));
        if found.is_none() {
            debug!(identity = external_identity, "identity not in roster");
        }
        found
    }

    /// Variant stored for a display name. A malformed number is a miss.
    pub fn resolve_variant(&self, display_name: &str) -> Option<u32> {
        let key = normalize_name(display_name);
        let assignment = self
            .assignments
            .iter()
            .find(|a| normalize_name(&a.display_name) == key)?;
        if assignment.variant_number.is_none() {
            warn!(student = %key, "variant number is not an integer");
        }
        assignment.variant_number
    }

    /// 0-based data-row position of a username in the roster sheet. Rows
    /// without a username still count.
    pub fn position(&self, external_identity: &str) -> Option<usize> {
        if external_identity.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.external_identity == external_identity)
    }
}

/// Lab name → instructor system prompt, from the prompts sheet.
#[derive(Debug, Clone, Default)]
pub struct PromptBook {
    prompts: Vec<(String, String)>,
}

impl PromptBook {
    pub fn from_table(table: &Table, columns: &ColumnConfig) -> Self {
        let prompts = table
            .records
            .iter()
            .filter_map(|record| {
                let lab = cell_text(record.get(&columns.prompts_lab)?);
                let prompt = cell_text(record.get(&columns.prompts_prompt)?);
                (!lab.trim().is_empty() && !prompt.trim().is_empty())
                    .then(|| (lab.trim().to_string(), prompt))
            })
            .collect();
        Self { prompts }
    }

    pub fn prompt_for(&self, lab: &str) -> Option<&str> {
        self.prompts
            .iter()
            .find(|(name, _)| name == lab)
            .map(|(_, prompt)| prompt.as_str())
    }
}
