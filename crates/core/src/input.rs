//! Typed parse boundary for operation arguments
//!
//! Every operation receives its arguments as an optional JSON object. The
//! functions here turn that into a validated value or a single
//! `InvalidInput` error listing every problem found, so no untyped data
//! reaches the engines.

use crate::catalog::{Category, Dimension};
use crate::error::ScoutError;
use crate::recommend::{ProjectType, RecommendRequest, Scale, MAX_STACK_SIZE};
use crate::scoring::Context;
use serde_json::{Map, Value};
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListArgs {
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeArgs {
    pub id: String,
    pub context: Context,
}

/// Shared by compare_techs and score_stack
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionArgs {
    pub ids: Vec<String>,
    pub context: Context,
}

pub fn parse_list_args(arguments: Option<Value>) -> Result<ListArgs, ScoutError> {
    let mut reader = ArgReader::new(arguments, &["category"])?;
    let category = reader.optional_parse::<Category>("category");
    reader.finish(ListArgs { category })
}

pub fn parse_analyze_args(arguments: Option<Value>) -> Result<AnalyzeArgs, ScoutError> {
    let mut reader = ArgReader::new(arguments, &["id", "context"])?;
    let id = reader.required_str("id");
    let context = reader.optional_parse::<Context>("context");
    let args = id.map(|id| AnalyzeArgs {
        id,
        context: context.unwrap_or_default(),
    });
    reader.finish_with(args)
}

/// Only the shape is checked here; count and duplicate rules belong to the
/// comparison engine so that every caller gets the same messages.
pub fn parse_compare_args(arguments: Option<Value>) -> Result<SelectionArgs, ScoutError> {
    let mut reader = ArgReader::new(arguments, &["ids", "context"])?;
    let ids = reader.string_list("ids", true);
    let context = reader.optional_parse::<Context>("context");
    let args = ids.map(|ids| SelectionArgs {
        ids,
        context: context.unwrap_or_default(),
    });
    reader.finish_with(args)
}

pub fn parse_score_args(arguments: Option<Value>) -> Result<SelectionArgs, ScoutError> {
    let mut reader = ArgReader::new(arguments, &["ids", "context"])?;
    let ids = reader.string_list("ids", true);
    let context = reader.optional_parse::<Context>("context");
    if let Some(ids) = &ids {
        if ids.is_empty() || ids.len() > MAX_STACK_SIZE {
            reader.issue(format!("ids accepts between 1 and {MAX_STACK_SIZE} entries"));
        }
    }
    let args = ids.map(|ids| SelectionArgs {
        ids,
        context: context.unwrap_or_default(),
    });
    reader.finish_with(args)
}

pub fn parse_recommend_args(arguments: Option<Value>) -> Result<RecommendRequest, ScoutError> {
    let mut reader = ArgReader::new(
        arguments,
        &["project_type", "scale", "priorities", "constraints", "demo"],
    )?;
    let project_type = reader.required_parse::<ProjectType>("project_type");
    let scale = reader.required_parse::<Scale>("scale");
    let priorities = reader
        .string_list("priorities", false)
        .unwrap_or_default()
        .iter()
        .filter_map(|raw| match Dimension::from_str(raw) {
            Ok(dimension) => Some(dimension),
            Err(message) => {
                reader.issue(format!("priorities: {message}"));
                None
            }
        })
        .collect::<Vec<_>>();
    let constraints = reader.string_list("constraints", false).unwrap_or_default();
    let demo = reader.optional_bool("demo").unwrap_or(false);

    let request = match (project_type, scale) {
        (Some(project_type), Some(scale)) => Some(RecommendRequest {
            project_type,
            scale,
            priorities,
            constraints,
            demo,
        }),
        _ => None,
    };

    let request = reader.finish_with(request)?;
    request.validate()?;
    Ok(request)
}

/// Collects issues while reading fields from an argument object
struct ArgReader {
    args: Map<String, Value>,
    issues: Vec<String>,
}

impl ArgReader {
    fn new(arguments: Option<Value>, allowed: &[&str]) -> Result<Self, ScoutError> {
        let args = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ScoutError::invalid_input(format!(
                    "arguments must be an object, got {}",
                    type_name(&other)
                )))
            }
        };

        let issues = args
            .keys()
            .filter(|key| !allowed.contains(&key.as_str()))
            .map(|key| format!("unknown argument: {key}"))
            .collect();

        Ok(Self { args, issues })
    }

    fn issue(&mut self, message: String) {
        self.issues.push(message);
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.args.get(key).filter(|v| !v.is_null())
    }

    fn optional_str(&mut self, key: &str) -> Option<String> {
        match self.present(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            other => {
                let message = format!("{key} must be a string, got {}", type_name(other));
                self.issue(message);
                None
            }
        }
    }

    fn required_str(&mut self, key: &str) -> Option<String> {
        if self.present(key).is_none() {
            self.issue(format!("{key} is required"));
            return None;
        }
        let value = self.optional_str(key)?;
        if value.is_empty() {
            self.issue(format!("{key} must not be empty"));
            return None;
        }
        Some(value)
    }

    fn optional_parse<T: FromStr<Err = String>>(&mut self, key: &str) -> Option<T> {
        let raw = self.optional_str(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(message) => {
                self.issue(format!("{key}: {message}"));
                None
            }
        }
    }

    fn required_parse<T: FromStr<Err = String>>(&mut self, key: &str) -> Option<T> {
        if self.present(key).is_none() {
            self.issue(format!("{key} is required"));
            return None;
        }
        self.optional_parse(key)
    }

    fn optional_bool(&mut self, key: &str) -> Option<bool> {
        match self.present(key)? {
            Value::Bool(b) => Some(*b),
            other => {
                let message = format!("{key} must be a boolean, got {}", type_name(other));
                self.issue(message);
                None
            }
        }
    }

    fn string_list(&mut self, key: &str, required: bool) -> Option<Vec<String>> {
        let Some(value) = self.present(key) else {
            if required {
                self.issue(format!("{key} is required"));
            }
            return None;
        };

        let Value::Array(items) = value else {
            let message = format!("{key} must be an array of strings, got {}", type_name(value));
            self.issue(message);
            return None;
        };

        let mut list = Vec::with_capacity(items.len());
        let mut bad = Vec::new();
        for (i, item) in items.iter().enumerate() {
            match item.as_str().map(str::trim) {
                Some(s) if !s.is_empty() => list.push(s.to_string()),
                _ => bad.push(i),
            }
        }

        if bad.is_empty() {
            Some(list)
        } else {
            for i in bad {
                self.issue(format!("{key}[{i}] must be a non-empty string"));
            }
            None
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ScoutError> {
        if self.issues.is_empty() {
            Ok(value)
        } else {
            Err(ScoutError::InvalidInput {
                issues: self.issues,
            })
        }
    }

    fn finish_with<T>(self, value: Option<T>) -> Result<T, ScoutError> {
        match value {
            Some(value) => self.finish(value),
            None if self.issues.is_empty() => {
                Err(ScoutError::invalid_input("arguments could not be parsed"))
            }
            None => Err(ScoutError::InvalidInput {
                issues: self.issues,
            }),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
