use crate::runner::{RunError, RunOutcome};

/// Final state of one graded target, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Reviewed,
    Skipped,
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Reviewed => write!(f, "REVIEWED"),
            Status::Skipped => write!(f, "SKIPPED"),
            Status::Failed => write!(f, "FAILED"),
        }
    }
}

/// One line of the summary: a PR target and what happened to it.
#[derive(Debug, Clone)]
pub struct GradeLine {
    /// PR URL or repository slug as given on the command line
    pub target: String,
    pub status: Status,
    /// Human-readable detail (student, attempt, rating and PR link, or failure reason)
    pub detail: String,
    /// Comment posted to the pull request, if any
    pub comment: Option<String>,
}

impl GradeLine {
    pub fn from_result(target: impl Into<String>, result: &Result<RunOutcome, RunError>) -> Self {
        let target = target.into();
        match result {
            Ok(RunOutcome::Reviewed(run)) => GradeLine {
                target,
                status: Status::Reviewed,
                detail: format!(
                    "{} ({}), variant {}, attempt {}, rating {}: {}",
                    run.student, run.lab, run.variant, run.attempt, run.rating, run.pr_link
                ),
                comment: Some(run.comment.clone()),
            },
            Ok(RunOutcome::UnlinkedStudent { lab, identity }) => GradeLine {
                target,
                status: Status::Skipped,
                detail: format!("{identity} is not in the roster ({lab}); asked to link account"),
                comment: None,
            },
            Ok(RunOutcome::NoAssignment { lab, student }) => GradeLine {
                target,
                status: Status::Skipped,
                detail: format!("no assignment determined for {student} ({lab})"),
                comment: None,
            },
            Err(e) => GradeLine {
                target,
                status: Status::Failed,
                detail: e.to_string(),
                comment: None,
            },
        }
    }
}

/// Summary of a batch of grading runs.
#[derive(Debug)]
pub struct Report {
    pub lines: Vec<GradeLine>,
    /// Worst status across all lines
    pub overall: Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::PrError;
    use crate::runner::ReviewedRun;

    #[test]
    fn test_status_ordering() {
        assert!(Status::Reviewed < Status::Skipped);
        assert!(Status::Skipped < Status::Failed);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Reviewed.to_string(), "REVIEWED");
        assert_eq!(Status::Failed.to_string(), "FAILED");
    }

    #[test]
    fn test_line_from_reviewed_run() {
        let result = Ok(RunOutcome::Reviewed(ReviewedRun {
            lab: "lab-1".to_string(),
            student: "Jane Doe".to_string(),
            variant: 3,
            attempt: 2,
            rating: 4.5,
            pr_link: "https://github.com/org/lab-1-octocat/pull/1".to_string(),
            comment: "# Comment\nGood".to_string(),
        }));
        let line = GradeLine::from_result("org/lab-1-octocat", &result);
        assert_eq!(line.status, Status::Reviewed);
        assert_eq!(
            line.detail,
            "Jane Doe (lab-1), variant 3, attempt 2, rating 4.5: https://github.com/org/lab-1-octocat/pull/1"
        );
        assert_eq!(line.comment.as_deref(), Some("# Comment\nGood"));
    }

    #[test]
    fn test_line_from_error() {
        let result = Err(RunError::PullRequest(PrError::MissingToken));
        let line = GradeLine::from_result("x", &result);
        assert_eq!(line.status, Status::Failed);
        assert!(line.detail.contains("GitHub token"));
    }
}
