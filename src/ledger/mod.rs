pub mod types;

pub use types::{columns, ReviewEntry, UpsertReport, TIMESTAMP_FORMAT};

use chrono::Local;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::roster::normalize_name;
use crate::sheets::{cell_text, cell_u32, Record, SheetError, TabularStore, Table};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger sheet access failed: {0}")]
    Sheet(#[from] SheetError),

    #[error("Ledger sheet {sheet} has no \"{column}\" column")]
    MissingColumn { sheet: String, column: String },
}

/// Per-lab grading history kept in one sheet per lab.
///
/// Every update is a read of the whole sheet followed by a single
/// whole-sheet write. Two writers on the same sheet race and the later write
/// wins, so callers must serialize runs.
pub struct Ledger<'a> {
    store: &'a dyn TabularStore,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        Self { store }
    }

    /// Record a review for a student in the lab's sheet.
    ///
    /// Creates the sheet from the template and the student's row as needed,
    /// bumps the attempt count and overwrites the review fields. Failures are
    /// logged here; nothing is written unless the whole update succeeds.
    #[instrument(skip(self, entry), fields(student = %entry.display_name))]
    pub async fn upsert_review(
        &self,
        lab: &str,
        entry: &ReviewEntry,
    ) -> Result<UpsertReport, LedgerError> {
        match self.try_upsert(lab, entry).await {
            Ok(report) => {
                info!(
                    row = report.row_number,
                    attempt = report.attempt,
                    created_sheet = report.created_sheet,
                    created_row = report.created_row,
                    "ledger updated"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "ledger update failed");
                Err(e)
            }
        }
    }

    async fn try_upsert(&self, lab: &str, entry: &ReviewEntry) -> Result<UpsertReport, LedgerError> {
        let (mut table, created_sheet) = match self.store.read_table_for_update(lab).await {
            Ok(table) => (table, false),
            Err(SheetError::NotFound(_)) => {
                info!("ledger sheet missing, cloning template");
                self.store.create_sheet_from_template(lab).await?;
                (self.store.read_table_for_update(lab).await?, true)
            }
            Err(e) => return Err(e.into()),
        };

        if table.columns.is_empty() {
            debug!("sheet has no header, writing default columns");
            table.columns = columns::ALL.iter().map(|c| c.to_string()).collect();
        }
        if let Some(missing) = columns::REQUIRED.iter().find(|c| !table.has_column(c)) {
            return Err(LedgerError::MissingColumn {
                sheet: lab.to_string(),
                column: missing.to_string(),
            });
        }

        let (index, created_row) = match find_row(&table, &entry.display_name) {
            Some(index) => (index, false),
            None => {
                debug!(rows = table.records.len(), "student row missing, inserting");
                table.records.push(new_row(entry));
                (table.records.len() - 1, true)
            }
        };

        let record = &mut table.records[index];
        let attempt = current_attempts(record).saturating_add(1);
        record.insert(columns::COMMENT.to_string(), json!(entry.review_text));
        record.insert(columns::ATTEMPTS.to_string(), json!(attempt));
        record.insert(
            columns::SUBMITTED_AT.to_string(),
            json!(Local::now().format(TIMESTAMP_FORMAT).to_string()),
        );
        record.insert(columns::PR_LINK.to_string(), json!(entry.pr_link));
        record.insert(columns::PROMPT.to_string(), json!(entry.prompt_used));
        record.insert(columns::SUMMARY.to_string(), json!(entry.summary));

        self.store.write_table(lab, &table).await?;

        Ok(UpsertReport {
            row_number: index + 2,
            attempt,
            created_sheet,
            created_row,
        })
    }
}

/// Index of the record whose name matches `display_name` after normalization.
fn find_row(table: &Table, display_name: &str) -> Option<usize> {
    let key = normalize_name(display_name);
    table.records.iter().position(|record| {
        record
            .get(columns::NAME)
            .is_some_and(|name| normalize_name(&cell_text(name)) == key)
    })
}

/// Fresh row with zero attempts and empty grading fields.
fn new_row(entry: &ReviewEntry) -> Record {
    let mut record = Record::new();
    record.insert(columns::VARIANT.to_string(), json!(entry.variant_number));
    record.insert(columns::NAME.to_string(), json!(normalize_name(&entry.display_name)));
    record.insert(columns::IDENTITY.to_string(), json!(entry.external_identity));
    record.insert(columns::ATTEMPTS.to_string(), json!(0));
    for column in [
        columns::COMMENT,
        columns::SUBMITTED_AT,
        columns::PR_LINK,
        columns::PROMPT,
        columns::SUMMARY,
    ] {
        record.insert(column.to_string(), Value::String(String::new()));
    }
    record
}

/// Stored attempt count; empty or non-numeric cells count as zero.
fn current_attempts(record: &Record) -> u32 {
    record.get(columns::ATTEMPTS).and_then(cell_u32).unwrap_or(0)
}
