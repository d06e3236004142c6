//! Workflow document parser
//!
//! This module parses a Woodpecker workflow document into a loose structure.
//! Only the YAML syntax and the root shape are enforced here; every other
//! problem is left in place for the linter to report with a field path.

use serde_yaml::{Mapping, Value};

use crate::error::ParseError;

/// A parsed workflow document
#[derive(Debug, Clone)]
pub struct Workflow {
    root: Mapping,
}

/// A step or service definition
#[derive(Debug, Clone)]
pub struct Container {
    pub name: String,
    pub fields: Mapping,
}

/// Shape of the `steps` section as found in the document
#[derive(Debug, Clone)]
pub enum StepsSection {
    Missing,
    Invalid,
    Containers(Vec<Container>),
}

/// Parse a workflow document
///
/// # Errors
/// Returns an error if the YAML is malformed or the root is not a mapping.
///
/// # Example
/// ```
/// use perch_lint::parser::parse;
///
/// let workflow = parse("steps:\n  build:\n    image: rust\n")?;
/// assert!(workflow.has_key("steps"));
/// # Ok::<(), perch_lint::ParseError>(())
/// ```
pub fn parse(raw: &str) -> Result<Workflow, ParseError> {
    let value: Value = serde_yaml::from_str(raw)?;

    match value {
        Value::Mapping(root) => Ok(Workflow { root }),
        _ => Err(ParseError::NotAMapping),
    }
}

impl Workflow {
    /// Top-level keys in document order; non-string keys are skipped
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().filter_map(Value::as_str)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// The `steps` section
    ///
    /// Falls back to the deprecated `pipeline` section when `steps` is absent.
    pub fn steps(&self) -> StepsSection {
        match self.get("steps").or_else(|| self.get("pipeline")) {
            None | Some(Value::Null) => StepsSection::Missing,
            Some(value) => match parse_containers(value) {
                Some(containers) if !containers.is_empty() => StepsSection::Containers(containers),
                _ => StepsSection::Invalid,
            },
        }
    }

    /// The `services` section; a malformed section yields no services
    pub fn services(&self) -> Vec<Container> {
        self.get("services")
            .and_then(parse_containers)
            .unwrap_or_default()
    }

    /// Items of the workflow-level `when` block
    pub fn when(&self) -> Vec<&Mapping> {
        self.get("when").map(constraint_items).unwrap_or_default()
    }
}

impl Container {
    /// The image reference, if it is a non-empty string
    pub fn image(&self) -> Option<&str> {
        self.fields
            .get("image")
            .and_then(Value::as_str)
            .filter(|image| !image.trim().is_empty())
    }

    pub fn has(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(value) if !value.is_null())
    }

    /// Whether a boolean field is set to true
    pub fn flag(&self, key: &str) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Items of the container's `when` block
    pub fn when(&self) -> Vec<&Mapping> {
        self.fields.get("when").map(constraint_items).unwrap_or_default()
    }
}

/// Parse a section written either as a map of name to definition or as a
/// list of definitions carrying a `name` field
///
/// Returns `None` when the section has neither shape.
fn parse_containers(value: &Value) -> Option<Vec<Container>> {
    match value {
        Value::Mapping(map) => map
            .iter()
            .map(|(key, fields)| {
                Some(Container {
                    name: key.as_str()?.to_string(),
                    fields: fields.as_mapping().cloned().unwrap_or_default(),
                })
            })
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let fields = item.as_mapping()?.clone();
                let name = fields
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| index.to_string());
                Some(Container { name, fields })
            })
            .collect(),
        _ => None,
    }
}

/// A `when` block is either a single constraint map or a list of them
fn constraint_items(value: &Value) -> Vec<&Mapping> {
    match value {
        Value::Mapping(map) => vec![map],
        Value::Sequence(items) => items.iter().filter_map(Value::as_mapping).collect(),
        _ => Vec::new(),
    }
}

/// Event names listed by a constraint's `event` field
///
/// Accepts a single string or a list of strings.
pub fn constraint_events(constraint: &Mapping) -> Vec<&str> {
    match constraint.get("event") {
        Some(Value::String(event)) => vec![event.as_str()],
        Some(Value::Sequence(events)) => events.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}
