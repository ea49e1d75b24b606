use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::assignment::{bind, variant_by_position};
use crate::config::Config;
use crate::ledger::{Ledger, LedgerError, ReviewEntry};
use crate::pr::{PrError, PrUrl, PullRequestSource};
use crate::review::{build_conversation, ReviewError, ReviewModel};
use crate::roster::{PromptBook, Roster};
use crate::sheets::{SheetError, TabularStore, Table};
use crate::variants::VariantParser;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    PullRequest(#[from] PrError),

    #[error("Reading {sheet} sheet failed: {source}")]
    Sheet { sheet: String, source: SheetError },

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// How a grading run ended when nothing went wrong externally.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Reviewed(ReviewedRun),
    /// The PR's username is not in the roster; the student was asked to link it
    UnlinkedStudent { lab: String, identity: String },
    /// No variant could be determined; nothing was posted or recorded
    NoAssignment { lab: String, student: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewedRun {
    pub lab: String,
    pub student: String,
    pub variant: u32,
    pub attempt: u32,
    pub rating: f64,
    pub pr_link: String,
    /// Comment posted to the pull request
    pub comment: String,
}

/// Comment left on a PR whose author is missing from the roster.
pub fn unlinked_comment(identity: &str) -> String {
    format!(
        "GitHub account `{identity}` is not linked to any student in the course roster.\n\n\
         Please register your GitHub username with your instructor, then push a new commit \
         or reopen this pull request to be graded."
    )
}

/// Grades one pull request at a time against the shared spreadsheet.
///
/// Runs must not overlap: the ledger write replaces the whole lab sheet.
pub struct Runner<'a> {
    source: &'a dyn PullRequestSource,
    store: &'a dyn TabularStore,
    model: &'a dyn ReviewModel,
    config: &'a Config,
}

impl<'a> Runner<'a> {
    pub fn new(
        source: &'a dyn PullRequestSource,
        store: &'a dyn TabularStore,
        model: &'a dyn ReviewModel,
        config: &'a Config,
    ) -> Self {
        Self {
            source,
            store,
            model,
            config,
        }
    }

    /// Fetch → bind assignment → review → comment → record.
    #[instrument(skip(self), fields(owner = %url.owner, repo = %url.repo, pr = url.pr_number))]
    pub async fn run(&self, url: &PrUrl) -> Result<RunOutcome, RunError> {
        let pr = self.source.fetch_pull_request(url).await?;
        let files = self.source.get_changed_files(&pr).await?;
        info!(title = %pr.title, files = files.len(), "fetched submission");

        let (lab, identity) = self.source.get_student_identity(&pr, &self.config.lab.names);
        debug!(lab = %lab, identity = %identity, "derived lab identity");

        let sheets = &self.config.sheets;
        let columns = &self.config.columns;
        let roster_table = self.read(&sheets.roster).await?;
        let variants_table = self.read(&sheets.variants).await?;
        let roster = Roster::from_tables(&roster_table, &variants_table, columns);

        let Some(student) = roster.resolve_display_name(&identity) else {
            warn!(identity = %identity, "student not in roster, asking to link account");
            self.source
                .post_comment(&pr, &unlinked_comment(&identity))
                .await?;
            return Ok(RunOutcome::UnlinkedStudent { lab, identity });
        };

        let readme = self.source.get_readme(&pr).await?.unwrap_or_default();
        let variants = VariantParser::new(self.config.lab.variants_marker.as_str()).parse(&readme);

        let mut variant = roster.resolve_variant(&student);
        if variant.is_none() && self.config.lab.roster_position_fallback {
            variant = roster
                .position(&identity)
                .and_then(|position| variant_by_position(position, variants.len()));
            debug!(?variant, "variant derived from roster position");
        }
        let (Some(variant), Some(assignment)) = (variant, bind(&variants, variant)) else {
            warn!(student = %student, ?variant, listed = variants.len(), "no assignment determined");
            return Ok(RunOutcome::NoAssignment { lab, student });
        };
        info!(student = %student, variant, "assignment bound");

        let prompts = match self.store.read_table(&sheets.prompts).await {
            Ok(table) => PromptBook::from_table(&table, columns),
            Err(SheetError::NotFound(_)) => {
                warn!(sheet = %sheets.prompts, "prompts sheet missing, using default prompt");
                PromptBook::default()
            }
            Err(source) => {
                return Err(RunError::Sheet {
                    sheet: sheets.prompts.clone(),
                    source,
                })
            }
        };
        let prompt = prompts
            .prompt_for(&lab)
            .unwrap_or(self.config.model.default_prompt.as_str())
            .to_string();

        let conversation = build_conversation(&prompt, Some(assignment), &files);
        let verdict = self.model.review(&conversation).await?;
        let comment = verdict.message();
        self.source.post_comment(&pr, &comment).await?;

        let entry = ReviewEntry {
            display_name: student.clone(),
            external_identity: identity,
            variant_number: variant,
            review_text: comment.clone(),
            pr_link: pr.html_url.clone(),
            prompt_used: prompt,
            summary: verdict.summary(),
        };
        let report = Ledger::new(self.store).upsert_review(&lab, &entry).await?;

        Ok(RunOutcome::Reviewed(ReviewedRun {
            lab,
            student,
            variant,
            attempt: report.attempt,
            rating: verdict.score(),
            pr_link: entry.pr_link,
            comment,
        }))
    }

    async fn read(&self, sheet: &str) -> Result<Table, RunError> {
        self.store
            .read_table(sheet)
            .await
            .map_err(|source| RunError::Sheet {
                sheet: sheet.to_string(),
                source,
            })
    }
}
