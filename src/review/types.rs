use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One message of the conversation sent to the review model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Structured verdict returned by the review model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewVerdict {
    /// Comment to the student's code
    pub comment: String,
    /// Suggestions for improving the code
    #[serde(default)]
    pub suggestions: String,
    /// Rating on a scale from 1 to 5
    pub rating: f64,
}

impl ReviewVerdict {
    /// Rating clamped to 1..=5 for display and the ledger summary.
    pub fn score(&self) -> f64 {
        if self.rating.is_finite() {
            self.rating.clamp(1.0, 5.0)
        } else {
            1.0
        }
    }

    /// Markdown body of the pull request comment.
    pub fn message(&self) -> String {
        let mut body = format!("# Comment\n{}\n\n", self.comment.trim());
        if !self.suggestions.trim().is_empty() {
            body.push_str(&format!("# Suggestions\n{}\n\n", self.suggestions.trim()));
        }
        body.push_str(&format!("# Rating: {}", self.summary()));
        body
    }

    /// Short form stored in the ledger.
    pub fn summary(&self) -> String {
        let score = self.score();
        if score.fract() == 0.0 {
            format!("{score:.0}")
        } else {
            format!("{score:.1}")
        }
    }
}
