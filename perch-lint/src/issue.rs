//! Lint issue types

use serde::Serialize;

/// Category of a lint issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Linter,
    Deprecation,
    BadHabit,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Linter => "linter",
            IssueKind::Deprecation => "deprecation",
            IssueKind::BadHabit => "bad_habit",
        }
    }
}

/// Where an issue was found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueData {
    pub file: String,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// A single finding reported by the linter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintIssue {
    pub message: String,
    pub is_warning: bool,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<IssueData>,
}

impl LintIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_warning: false,
            kind: IssueKind::Linter,
            data: None,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_warning: true,
            kind,
            data: None,
        }
    }

    /// Attach the file and field the issue refers to
    pub fn at(mut self, file: impl Into<String>, field: impl Into<String>) -> Self {
        self.data = Some(IssueData {
            file: file.into(),
            field: field.into(),
            docs: None,
        });
        self
    }

    /// Attach a documentation link; ignored until a location is attached
    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        if let Some(data) = self.data.as_mut() {
            data.docs = Some(docs.into());
        }
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.file.as_str())
    }

    pub fn field(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.field.as_str())
    }

    pub fn docs(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.docs.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_serializes_type_tag() {
        let issue = LintIssue::warning(IssueKind::BadHabit, "set an event filter")
            .at(".woodpecker.yaml", "when")
            .with_docs("https://woodpecker-ci.org/docs/usage/linter");

        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "bad_habit");
        assert_eq!(json["data"]["field"], "when");
        assert_eq!(issue.docs(), Some("https://woodpecker-ci.org/docs/usage/linter"));
    }

    #[test]
    fn test_docs_require_location() {
        let issue = LintIssue::error("boom").with_docs("https://example.com");
        assert!(issue.data.is_none());
        assert_eq!(issue.file(), None);
    }
}
