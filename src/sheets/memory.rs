//! In-process `TabularStore` used by tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{wait_until_queryable, SettlePolicy, SheetError, TabularStore, Table};

#[derive(Debug, Default)]
struct Inner {
    sheets: HashMap<String, Table>,
    /// Reads that still report NotFound for a freshly cloned sheet
    pending: HashMap<String, u32>,
    reads: HashMap<String, u32>,
    writes: Vec<(String, Table)>,
    created: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    settle_reads: u32,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloned sheets stay invisible for `reads` reads.
    pub fn with_settle_reads(mut self, reads: u32) -> Self {
        self.settle_reads = reads;
        self
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn insert(&self, name: &str, table: Table) {
        self.lock().sheets.insert(name.to_string(), table);
    }

    pub fn sheet(&self, name: &str) -> Option<Table> {
        self.lock().sheets.get(name).cloned()
    }

    pub fn read_count(&self, name: &str) -> u32 {
        self.lock().reads.get(name).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(String, Table)> {
        self.lock().writes.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.lock().created.clone()
    }

    /// Copy "template" (or an empty sheet) under `name` without waiting.
    pub fn clone_template(&self, name: &str) -> Result<(), SheetError> {
        let mut inner = self.lock();
        if inner.sheets.contains_key(name) {
            return Err(SheetError::InvalidResponse(format!("sheet {name} already exists")));
        }
        let table = inner.sheets.get("template").cloned().unwrap_or_default();
        inner.sheets.insert(name.to_string(), table);
        inner.pending.insert(name.to_string(), self.settle_reads);
        inner.created.push(name.to_string());
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_table(&self, sheet: &str) -> Result<Table, SheetError> {
        let mut inner = self.lock();
        *inner.reads.entry(sheet.to_string()).or_default() += 1;
        if let Some(pending) = inner.pending.get_mut(sheet) {
            if *pending > 0 {
                *pending -= 1;
                return Err(SheetError::NotFound(sheet.to_string()));
            }
        }
        inner
            .sheets
            .get(sheet)
            .cloned()
            .ok_or_else(|| SheetError::NotFound(sheet.to_string()))
    }

    async fn write_table(&self, sheet: &str, table: &Table) -> Result<(), SheetError> {
        if self.fail_writes {
            return Err(SheetError::InvalidResponse("write rejected".to_string()));
        }
        let mut inner = self.lock();
        if !inner.sheets.contains_key(sheet) {
            return Err(SheetError::NotFound(sheet.to_string()));
        }
        inner.sheets.insert(sheet.to_string(), table.clone());
        inner.writes.push((sheet.to_string(), table.clone()));
        Ok(())
    }

    async fn create_sheet_from_template(&self, name: &str) -> Result<(), SheetError> {
        self.clone_template(name)?;
        let policy = SettlePolicy {
            attempts: self.settle_reads + 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        wait_until_queryable(self, name, policy).await
    }
}
