//! Workflow lint rules

use serde_yaml::Mapping;
use tracing::debug;

use crate::issue::{IssueKind, LintIssue};
use crate::parser::{Container, StepsSection, Workflow, constraint_events};

const TOP_LEVEL_KEYS: &[&str] = &[
    "when",
    "skip_clone",
    "steps",
    "services",
    "workspace",
    "clone",
    "labels",
    "depends_on",
    "runs_on",
    "matrix",
    "variables",
    // deprecated, reported separately
    "pipeline",
    "platform",
    "branches",
];

const EVENTS: &[&str] = &[
    "push",
    "pull_request",
    "pull_request_closed",
    "tag",
    "release",
    "deployment",
    "cron",
    "manual",
];

const DOCS_SECRETS: &str = "https://woodpecker-ci.org/docs/usage/secrets#usage";
const DOCS_EVENT_FILTER: &str =
    "https://woodpecker-ci.org/docs/usage/linter#event-filter-for-all-steps";

/// Which trust-gated directives a workflow may use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustedConfiguration {
    pub network: bool,
    pub volumes: bool,
    pub security: bool,
}

impl TrustedConfiguration {
    /// Everything permitted
    pub fn all() -> Self {
        Self {
            network: true,
            volumes: true,
            security: true,
        }
    }
}

/// A workflow document together with the file it came from
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub file: String,
    pub workflow: Workflow,
}

/// Runs every rule over a set of workflows
#[derive(Debug, Clone, Default)]
pub struct Linter {
    trusted: TrustedConfiguration,
}

impl Linter {
    /// A linter that trusts nothing
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trusted(mut self, trusted: TrustedConfiguration) -> Self {
        self.trusted = trusted;
        self
    }

    /// Lint each workflow and return the issues in rule order
    pub fn lint(&self, configs: &[WorkflowConfig]) -> Vec<LintIssue> {
        let mut issues = Vec::new();

        for config in configs {
            let before = issues.len();
            self.lint_workflow(config, &mut issues);
            debug!(file = %config.file, count = issues.len() - before, "Linted workflow");
        }

        issues
    }

    fn lint_workflow(&self, config: &WorkflowConfig, issues: &mut Vec<LintIssue>) {
        let file = config.file.as_str();
        let workflow = &config.workflow;

        for key in workflow.keys() {
            if !TOP_LEVEL_KEYS.contains(&key) {
                issues.push(
                    LintIssue::error(format!("Additional property {} is not allowed", key))
                        .at(file, key),
                );
            }
        }

        check_deprecations(file, workflow, issues);

        for constraint in workflow.when() {
            check_events(file, "when.event", constraint_events(constraint), issues);
        }

        let steps = match workflow.steps() {
            StepsSection::Missing => {
                issues.push(LintIssue::error("Missing steps section").at(file, "steps"));
                Vec::new()
            }
            StepsSection::Invalid => {
                issues.push(LintIssue::error("Invalid or missing steps section").at(file, "steps"));
                Vec::new()
            }
            StepsSection::Containers(steps) => steps,
        };

        for step in &steps {
            self.check_container(file, "steps", step, issues);

            if step.has("commands") && step.has("settings") {
                issues.push(
                    LintIssue::error("Cannot configure both commands and settings")
                        .at(file, format!("steps.{}", step.name)),
                );
            }

            if step.has("secrets") {
                issues.push(
                    LintIssue::warning(
                        IssueKind::Deprecation,
                        "Usage of `secrets` is deprecated, use `environment` with `from_secret`",
                    )
                    .at(file, format!("steps.{}.secrets", step.name))
                    .with_docs(DOCS_SECRETS),
                );
            }
        }

        for service in workflow.services() {
            self.check_container(file, "services", &service, issues);
        }

        if !steps.is_empty() && !has_event_filter(workflow, &steps) {
            issues.push(
                LintIssue::warning(
                    IssueKind::BadHabit,
                    "Set an event filter for all steps or the entire workflow on all items of the `when` block",
                )
                .at(file, "when")
                .with_docs(DOCS_EVENT_FILTER),
            );
        }
    }

    /// Rules shared by steps and services
    fn check_container(
        &self,
        file: &str,
        section: &str,
        container: &Container,
        issues: &mut Vec<LintIssue>,
    ) {
        let field = format!("{}.{}", section, container.name);

        if container.image().is_none() {
            issues.push(
                LintIssue::error("Invalid or missing image").at(file, format!("{}.image", field)),
            );
        }

        for constraint in container.when() {
            check_events(
                file,
                &format!("{}.when.event", field),
                constraint_events(constraint),
                issues,
            );
        }

        if !self.trusted.security && container.flag("privileged") {
            issues.push(
                LintIssue::error("Insufficient trust level to use `privileged` mode")
                    .at(file, format!("{}.privileged", field)),
            );
        }
        if !self.trusted.volumes && container.has("volumes") {
            issues.push(
                LintIssue::error("Insufficient trust level to use `volumes`")
                    .at(file, format!("{}.volumes", field)),
            );
        }
        if !self.trusted.network && container.has("network_mode") {
            issues.push(
                LintIssue::error("Insufficient trust level to use `network_mode`")
                    .at(file, format!("{}.network_mode", field)),
            );
        }
    }
}

fn check_deprecations(file: &str, workflow: &Workflow, issues: &mut Vec<LintIssue>) {
    let deprecated = [
        ("pipeline", "Please use `steps` instead of the deprecated `pipeline` section"),
        ("platform", "Please use `labels` instead of the deprecated `platform` key"),
        ("branches", "Please use `when.branch` instead of the deprecated `branches` key"),
    ];

    for (key, message) in deprecated {
        if workflow.has_key(key) {
            issues.push(LintIssue::warning(IssueKind::Deprecation, message).at(file, key));
        }
    }
}

fn check_events(file: &str, field: &str, events: Vec<&str>, issues: &mut Vec<LintIssue>) {
    for event in events {
        if !EVENTS.contains(&event) {
            issues.push(LintIssue::error(format!("Invalid event '{}'", event)).at(file, field));
        }
    }
}

/// A workflow is filtered when every item of its `when` block names an
/// event, or failing that, when every step's `when` block does
fn has_event_filter(workflow: &Workflow, steps: &[Container]) -> bool {
    all_filtered(&workflow.when()) || steps.iter().all(|step| all_filtered(&step.when()))
}

fn all_filtered(items: &[&Mapping]) -> bool {
    !items.is_empty() && items.iter().all(|item| !constraint_events(item).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lint_with(raw: &str, trusted: TrustedConfiguration) -> Vec<LintIssue> {
        let config = WorkflowConfig {
            file: ".woodpecker.yaml".to_string(),
            workflow: parse(raw).unwrap(),
        };
        Linter::new().with_trusted(trusted).lint(&[config])
    }

    fn lint(raw: &str) -> Vec<LintIssue> {
        lint_with(raw, TrustedConfiguration::all())
    }

    #[test]
    fn test_clean_workflow_has_no_issues() {
        let issues = lint(
            r#"
when:
  - event: push
steps:
  build:
    image: rust
    commands: [cargo build]
"#,
        );
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_missing_event_filter_is_bad_habit() {
        let issues = lint("steps:\n  build:\n    image: rust\n");

        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_warning);
        assert_eq!(issues[0].kind, IssueKind::BadHabit);
        assert_eq!(issues[0].field(), Some("when"));
    }

    #[test]
    fn test_step_level_event_filters_suffice() {
        let issues = lint(
            r#"
steps:
  build:
    image: rust
    when:
      event: [push, pull_request]
  deploy:
    image: alpine
    when:
      - event: tag
"#,
        );
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_structural_errors() {
        let issues = lint(
            r#"
when: {event: pushh}
steps:
  build:
    commands: [make]
    settings: {foo: bar}
bogus: true
"#,
        );
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();

        assert!(messages.contains(&"Additional property bogus is not allowed"));
        assert!(messages.contains(&"Invalid event 'pushh'"));
        assert!(messages.contains(&"Invalid or missing image"));
        assert!(messages.contains(&"Cannot configure both commands and settings"));
        assert!(issues.iter().all(|i| !i.is_warning));
    }

    #[test]
    fn test_missing_steps() {
        let issues = lint("when: {event: push}\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Missing steps section");
    }

    #[test]
    fn test_deprecations_are_warnings() {
        let issues = lint(
            r#"
when: {event: push}
platform: linux/amd64
pipeline:
  build:
    image: rust
    secrets: [token]
"#,
        );

        let deprecations: Vec<_> = issues
            .iter()
            .filter(|i| i.kind == IssueKind::Deprecation)
            .collect();
        assert_eq!(deprecations.len(), 3);
        assert!(deprecations.iter().all(|i| i.is_warning));
        assert!(issues.iter().any(|i| i.docs() == Some(DOCS_SECRETS)));
    }

    #[test]
    fn test_trust_gates() {
        let raw = r#"
when: {event: push}
steps:
  build:
    image: docker
    privileged: true
    volumes: [/var/run/docker.sock:/var/run/docker.sock]
services:
  db:
    image: postgres
    network_mode: host
"#;

        let untrusted = lint_with(raw, TrustedConfiguration::default());
        let fields: Vec<_> = untrusted.iter().filter_map(|i| i.field()).collect();
        assert_eq!(
            fields,
            vec!["steps.build.privileged", "steps.build.volumes", "services.db.network_mode"]
        );

        assert!(lint(raw).is_empty());
    }
}
