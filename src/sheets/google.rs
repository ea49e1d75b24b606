use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::{wait_until_queryable, SettlePolicy, SheetError, TabularStore, Table};
use crate::config::SheetsConfig;

/// Google Sheets v4 REST client scoped to one spreadsheet.
pub struct GoogleSheetsClient {
    client: Client,
    base: Url,
    token: String,
    template: String,
    settle: SettlePolicy,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// A1 reference to a whole sheet, quoted so names like `lab1` are not read
/// as cell references.
fn sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// Column letters for a 1-based column number (1 → A, 27 → AA).
fn column_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self, SheetError> {
        let (Some(id), Some(token)) = (&config.spreadsheet_id, &config.access_token) else {
            return Err(SheetError::MissingCredentials);
        };
        let base = Url::parse(&format!("{}/{}", config.api_url.trim_end_matches('/'), id))
            .map_err(|e| SheetError::InvalidResponse(format!("bad spreadsheet url: {e}")))?;
        Ok(Self {
            client: Client::new(),
            base,
            token: token.clone(),
            template: config.template.clone(),
            settle: config.settle_policy(),
        })
    }

    /// Spreadsheet URL with extra path segments appended (each percent-encoded).
    fn url(&self, segments: &[&str]) -> Result<Url, SheetError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetError::InvalidResponse("spreadsheet url cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    /// Read URL; `render` is a Sheets `valueRenderOption`.
    fn read_url(&self, sheet: &str, render: &str) -> Result<Url, SheetError> {
        let mut url = self.url(&["values", sheet_range(sheet).as_str()])?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", render)
            .append_pair("dateTimeRenderOption", "FORMATTED_STRING");
        Ok(url)
    }

    async fn fetch(&self, sheet: &str, render: &str) -> Result<Table, SheetError> {
        let response = self
            .client
            .get(self.read_url(sheet, render)?)
            .bearer_auth(&self.token)
            .send()
            .await?;
        // an unknown sheet name is reported as an unparsable range
        if response.status() == StatusCode::BAD_REQUEST || response.status() == StatusCode::NOT_FOUND {
            debug!(status = %response.status(), "sheet not readable");
            return Err(SheetError::NotFound(sheet.to_string()));
        }
        let range = response.error_for_status()?.json::<ValueRange>().await?;
        let table = Table::from_rows(range.values);
        debug!(columns = table.columns.len(), rows = table.records.len(), "read sheet");
        Ok(table)
    }

    /// Write URL; values are parsed as if typed in, so formulas stay formulas.
    fn write_url(&self, sheet: &str) -> Result<Url, SheetError> {
        let mut url = self.url(&["values", sheet_range(sheet).as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        Ok(url)
    }

    /// Clear URL for every row from `first_row` down, `width` columns wide.
    fn clear_below_url(&self, sheet: &str, first_row: usize, width: usize) -> Result<Url, SheetError> {
        let range = format!(
            "{}!A{first_row}:{}:clear",
            sheet_range(sheet),
            column_letters(width.max(1))
        );
        self.url(&["values", range.as_str()])
    }

    async fn sheet_id(&self, title: &str) -> Result<Option<i64>, SheetError> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let meta = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<SpreadsheetMeta>()
            .await?;
        Ok(meta
            .sheets
            .into_iter()
            .find(|s| s.properties.title == title)
            .map(|s| s.properties.sheet_id))
    }

    async fn batch_update(&self, request: Value) -> Result<(), SheetError> {
        let url = self.url(&[])?;
        // batchUpdate is addressed as "{id}:batchUpdate"
        let url = Url::parse(&format!("{}:batchUpdate", url.as_str().trim_end_matches('/')))
            .map_err(|e| SheetError::InvalidResponse(e.to_string()))?;
        self.client
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "requests": [request] }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl TabularStore for GoogleSheetsClient {
    #[instrument(skip(self))]
    async fn read_table(&self, sheet: &str) -> Result<Table, SheetError> {
        self.fetch(sheet, "UNFORMATTED_VALUE").await
    }

    #[instrument(skip(self))]
    async fn read_table_for_update(&self, sheet: &str) -> Result<Table, SheetError> {
        self.fetch(sheet, "FORMULA").await
    }

    /// Overwrite the sheet from A1, then clear whatever rows remain below.
    /// A failed overwrite leaves the previous contents in place.
    #[instrument(skip(self, table), fields(rows = table.records.len()))]
    async fn write_table(&self, sheet: &str, table: &Table) -> Result<(), SheetError> {
        let rows = table.to_rows();
        let first_stale_row = rows.len() + 1;
        let width = table.width();
        self.client
            .put(self.write_url(sheet)?)
            .bearer_auth(&self.token)
            .json(&json!({
                "range": sheet_range(sheet),
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await?
            .error_for_status()?;

        self.client
            .post(self.clear_below_url(sheet, first_stale_row, width)?)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()?;
        debug!("sheet replaced");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_sheet_from_template(&self, name: &str) -> Result<(), SheetError> {
        match self.sheet_id(&self.template).await? {
            Some(template_id) => {
                self.batch_update(json!({
                    "duplicateSheet": {
                        "sourceSheetId": template_id,
                        "newSheetName": name,
                    }
                }))
                .await?;
                info!(template = %self.template, "sheet duplicated from template");
            }
            None => {
                warn!(template = %self.template, "template sheet missing, creating blank sheet");
                self.batch_update(json!({
                    "addSheet": { "properties": { "title": name } }
                }))
                .await?;
            }
        }
        wait_until_queryable(self, name, self.settle).await
    }
}
