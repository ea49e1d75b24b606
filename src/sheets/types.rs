use serde_json::{Map, Value};

/// One data row keyed by header label.
///
/// Cells under a repeated label, or beyond the end of the header, are keyed
/// by position (see `positional_key`) so that a round trip keeps them.
pub type Record = Map<String, Value>;

const POSITIONAL: &str = "\u{0}col:";

/// Key of a cell that has no usable header label of its own.
pub fn positional_key(index: usize) -> String {
    format!("{POSITIONAL}{index}")
}

fn positional_index(key: &str) -> Option<usize> {
    key.strip_prefix(POSITIONAL)?.parse().ok()
}

/// Contents of a sheet: the header row plus every data row below it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Header labels in sheet order
    pub columns: Vec<String>,
    /// Data rows; a record may lack keys for trailing empty cells
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Record key of cell `index`: the header label for the first column
    /// carrying it, a positional key otherwise.
    fn key(&self, index: usize) -> String {
        match self.columns.get(index) {
            Some(label) if !self.columns[..index].contains(label) => label.clone(),
            _ => positional_key(index),
        }
    }

    /// Number of cells per row needed to hold every record.
    pub fn width(&self) -> usize {
        self.records
            .iter()
            .flat_map(|record| record.keys())
            .filter_map(|key| positional_index(key))
            .map(|index| index + 1)
            .fold(self.columns.len(), usize::max)
    }

    /// Build a table from raw sheet rows where the first row is the header.
    ///
    /// Blank rows between data rows are kept so row positions match the
    /// sheet; trailing blank rows are dropped.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        let mut rows = rows.into_iter();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(cell_text).collect(),
            None => return Table::default(),
        };
        let mut table = Table::new(columns, Vec::new());

        let mut data: Vec<Vec<Value>> = rows.collect();
        while data
            .last()
            .is_some_and(|row| row.iter().all(|cell| cell_text(cell).is_empty()))
        {
            data.pop();
        }

        let records: Vec<Record> = data
            .into_iter()
            .map(|row| {
                let width = row.len().max(table.columns.len());
                let mut cells = row.into_iter();
                (0..width)
                    .map(|index| (table.key(index), cells.next().unwrap_or(Value::Null)))
                    .collect::<Record>()
            })
            .collect();
        table.records = records;
        table
    }

    /// Serialize back into rows (header first), filling absent cells with "".
    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        let width = self.width();
        let mut rows = Vec::with_capacity(self.records.len() + 1);
        rows.push(
            self.columns
                .iter()
                .map(|c| Value::String(c.clone()))
                .collect(),
        );
        for record in &self.records {
            rows.push(
                (0..width)
                    .map(|index| match record.get(&self.key(index)) {
                        None | Some(Value::Null) => Value::String(String::new()),
                        Some(v) => v.clone(),
                    })
                    .collect(),
            );
        }
        rows
    }
}

/// Render a cell as the text a spreadsheet user would see.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Interpret a cell as a non-negative integer.
///
/// Accepts integral numbers and numeric text ("3", " 3 ", "3.0"); anything
/// else is `None`.
pub fn cell_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u32)
            })
        }
        _ => None,
    }
}
