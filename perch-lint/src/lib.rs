//! Perch Workflow Linter
//!
//! Parses Woodpecker workflow documents and reports structured issues.
//! It includes:
//! - A loose YAML parser that keeps malformed sections inspectable
//! - Rule checks for structure, deprecated keys and trust-gated directives
//! - Issue types tagged as linter errors, deprecations or bad habits

pub mod error;
pub mod issue;
pub mod linter;
pub mod parser;

pub use error::ParseError;
pub use issue::{IssueData, IssueKind, LintIssue};
pub use linter::{Linter, TrustedConfiguration, WorkflowConfig};
pub use parser::{Container, StepsSection, Workflow, parse};
