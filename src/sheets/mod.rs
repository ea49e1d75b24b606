pub mod google;
#[cfg(test)]
pub mod memory;
pub mod types;

pub use types::{cell_text, cell_u32, Record, Table};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Sheets API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Sheet not found: {0}")]
    NotFound(String),

    #[error("Sheet {0} is still not queryable after creation")]
    NotSettled(String),

    #[error("Unexpected Sheets API response: {0}")]
    InvalidResponse(String),

    #[error("Sheets access token or spreadsheet id not configured")]
    MissingCredentials,
}

/// Tabular store backing the roster, variants, prompts and ledger sheets.
///
/// Writes replace the whole sheet; there is no per-row update.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read header and all data rows. `SheetError::NotFound` when the sheet is absent.
    async fn read_table(&self, sheet: &str) -> Result<Table, SheetError>;

    /// Read a sheet that is about to be written back. Formula cells come back
    /// as formulas so the write keeps them.
    async fn read_table_for_update(&self, sheet: &str) -> Result<Table, SheetError> {
        self.read_table(sheet).await
    }

    /// Replace the sheet's contents with `table`.
    async fn write_table(&self, sheet: &str, table: &Table) -> Result<(), SheetError>;

    /// Clone the template sheet under `name`. Returns only once the new sheet
    /// can be read.
    async fn create_sheet_from_template(&self, name: &str) -> Result<(), SheetError>;
}

/// Poll schedule used while a freshly created sheet becomes readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl SettlePolicy {
    /// Delay before poll `attempt` (0-based), doubling up to `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Poll `read_table` with exponential backoff until `sheet` is readable.
pub async fn wait_until_queryable<S: TabularStore + ?Sized>(
    store: &S,
    sheet: &str,
    policy: SettlePolicy,
) -> Result<(), SheetError> {
    for attempt in 0..policy.attempts {
        match store.read_table(sheet).await {
            Ok(_) => {
                debug!(sheet, attempt, "sheet is queryable");
                return Ok(());
            }
            Err(SheetError::NotFound(_)) => {
                let delay = policy.delay(attempt);
                debug!(sheet, attempt, delay_ms = delay.as_millis() as u64, "sheet not visible yet");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
    warn!(sheet, attempts = policy.attempts, "sheet did not settle");
    Err(SheetError::NotSettled(sheet.to_string()))
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    fn fast_policy(attempts: u32) -> SettlePolicy {
        SettlePolicy {
            attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_settle_delay_doubles_and_caps() {
        let policy = SettlePolicy {
            attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(500));
        assert_eq!(policy.delay(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_wait_until_queryable_after_delay() {
        let store = MemoryStore::new().with_settle_reads(2);
        store.insert("template", Table::new(vec!["a".to_string()], vec![]));
        store.clone_template("lab-1").unwrap();

        wait_until_queryable(&store, "lab-1", fast_policy(5))
            .await
            .unwrap();
        assert_eq!(store.read_count("lab-1"), 3);
    }

    #[tokio::test]
    async fn test_wait_until_queryable_gives_up() {
        let store = MemoryStore::new();
        let err = wait_until_queryable(&store, "missing", fast_policy(3))
            .await
            .unwrap_err();
        assert!(matches!(err, SheetError::NotSettled(name) if name == "missing"));
        assert_eq!(store.read_count("missing"), 3);
    }
}
