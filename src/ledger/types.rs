/// Header labels of a lab ledger sheet, spelled as in the shared spreadsheet.
pub mod columns {
    pub const VARIANT: &str = "Номер варіанту";
    pub const NAME: &str = "ПІБ";
    pub const IDENTITY: &str = "github nickname";
    pub const COMMENT: &str = "Коментар бота";
    pub const ATTEMPTS: &str = "№ Спроби";
    pub const SUBMITTED_AT: &str = "Час здачі";
    pub const PR_LINK: &str = "Лінк на останній PR";
    pub const PROMPT: &str = "Промт";
    pub const SUMMARY: &str = "Підсумок";
    /// Holds a sheet-side button; never written by the ledger
    pub const RETRY: &str = "Кнопка перевірки ще раз";

    /// Columns every ledger sheet must carry.
    pub const REQUIRED: [&str; 9] = [
        VARIANT,
        NAME,
        IDENTITY,
        COMMENT,
        ATTEMPTS,
        SUBMITTED_AT,
        PR_LINK,
        PROMPT,
        SUMMARY,
    ];

    /// Header written into a sheet that has none.
    pub const ALL: [&str; 10] = [
        VARIANT,
        NAME,
        IDENTITY,
        COMMENT,
        ATTEMPTS,
        SUBMITTED_AT,
        PR_LINK,
        PROMPT,
        SUMMARY,
        RETRY,
    ];
}

/// Format of the submission time cell.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of one review, to be recorded against a student's ledger row.
#[derive(Debug, Clone)]
pub struct ReviewEntry {
    pub display_name: String,
    pub external_identity: String,
    pub variant_number: u32,
    /// Comment posted to the pull request
    pub review_text: String,
    pub pr_link: String,
    /// System prompt the model was given
    pub prompt_used: String,
    /// Short verdict, e.g. the rating
    pub summary: String,
}

/// What `Ledger::upsert_review` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReport {
    /// 1-based spreadsheet row of the student, counting the header row
    pub row_number: usize,
    /// Attempt count after this review
    pub attempt: u32,
    pub created_sheet: bool,
    pub created_row: bool,
}
