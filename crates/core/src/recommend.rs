//! Stack recommendation requests and the blueprints they produce
//!
//! Blueprints are generated server-side. This module builds the submission
//! body (including a locally ranked shortlist as hints) and parses what comes
//! back.

use crate::catalog::{Catalog, Category, Dimension};
use crate::error::ScoutError;
use crate::scoring::{self, Context};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const MAX_PRIORITIES: usize = Dimension::ALL.len();
pub const MAX_CONSTRAINTS: usize = 10;
pub const MAX_CONSTRAINT_LEN: usize = 200;
pub const SHORTLIST_PER_CATEGORY: usize = 3;

/// Most technologies a single score_stack request may carry
pub const MAX_STACK_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    Saas,
    Ecommerce,
    Blog,
    Dashboard,
    Api,
    MobileBackend,
    Marketplace,
}

impl ProjectType {
    pub const ALL: [ProjectType; 7] = [
        ProjectType::Saas,
        ProjectType::Ecommerce,
        ProjectType::Blog,
        ProjectType::Dashboard,
        ProjectType::Api,
        ProjectType::MobileBackend,
        ProjectType::Marketplace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Saas => "saas",
            ProjectType::Ecommerce => "ecommerce",
            ProjectType::Blog => "blog",
            ProjectType::Dashboard => "dashboard",
            ProjectType::Api => "api",
            ProjectType::MobileBackend => "mobile-backend",
            ProjectType::Marketplace => "marketplace",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectType::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid project type: {}. Valid types: {}",
                    s,
                    ProjectType::ALL.map(|p| p.as_str()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Hobby,
    Startup,
    Growth,
    Enterprise,
}

impl Scale {
    pub const ALL: [Scale; 4] = [Scale::Hobby, Scale::Startup, Scale::Growth, Scale::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Hobby => "hobby",
            Scale::Startup => "startup",
            Scale::Growth => "growth",
            Scale::Enterprise => "enterprise",
        }
    }

    /// Scoring context used for the local shortlist
    pub fn context(&self) -> Context {
        match self {
            Scale::Hobby | Scale::Startup => Context::Mvp,
            Scale::Growth => Context::Default,
            Scale::Enterprise => Context::Enterprise,
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scale::ALL
            .iter()
            .copied()
            .find(|scale| scale.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid scale: {}. Valid scales: hobby, startup, growth, enterprise",
                    s
                )
            })
    }
}

/// Validated input for recommend_stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendRequest {
    pub project_type: ProjectType,
    pub scale: Scale,
    pub priorities: Vec<Dimension>,
    pub constraints: Vec<String>,
    pub demo: bool,
}

impl RecommendRequest {
    pub fn context(&self) -> Context {
        self.scale.context()
    }

    pub fn validate(&self) -> Result<(), ScoutError> {
        let mut issues = Vec::new();

        if self.priorities.len() > MAX_PRIORITIES {
            issues.push(format!("priorities accepts at most {MAX_PRIORITIES} entries"));
        }
        let mut seen = HashSet::new();
        for priority in &self.priorities {
            if !seen.insert(priority) {
                issues.push(format!("priorities contains {priority} more than once"));
            }
        }

        if self.constraints.len() > MAX_CONSTRAINTS {
            issues.push(format!("constraints accepts at most {MAX_CONSTRAINTS} entries"));
        }
        for constraint in &self.constraints {
            if constraint.trim().is_empty() {
                issues.push("constraints must not contain empty entries".to_string());
            } else if constraint.chars().count() > MAX_CONSTRAINT_LEN {
                issues.push(format!(
                    "constraint exceeds {MAX_CONSTRAINT_LEN} characters: {}...",
                    constraint.chars().take(20).collect::<String>()
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ScoutError::InvalidInput { issues })
        }
    }

    /// Submission body for the blueprint endpoint
    pub fn to_body(&self, catalog: &Catalog) -> Value {
        json!({
            "project_type": self.project_type,
            "scale": self.scale,
            "priorities": self.priorities,
            "constraints": self.constraints,
            "context": self.context(),
            "mode": if self.demo { "demo" } else { "full" },
            "shortlist": shortlist(catalog, self.context(), SHORTLIST_PER_CATEGORY),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortlistEntry {
    pub id: String,
    pub score: u8,
}

/// Top technologies per category under a context, best first
pub fn shortlist(
    catalog: &Catalog,
    context: Context,
    per_category: usize,
) -> BTreeMap<Category, Vec<ShortlistEntry>> {
    catalog
        .all_grouped_by_category()
        .into_iter()
        .map(|(category, techs)| {
            let mut entries: Vec<ShortlistEntry> = techs
                .iter()
                .map(|t| ShortlistEntry {
                    id: t.id.clone(),
                    score: scoring::score(t, context),
                })
                .collect();
            entries.sort_by(|a, b| b.score.cmp(&a.score));
            entries.truncate(per_category);
            (category, entries)
        })
        .collect()
}

/// Body for the direct scoring endpoint
pub fn score_request_body(ids: &[String], context: Context) -> Value {
    json!({
        "technologies": ids,
        "context": context,
    })
}

/// Validate a stack for the scoring endpoint: known ids, no duplicates
pub fn validate_stack(catalog: &Catalog, ids: &[String]) -> Result<(), ScoutError> {
    if ids.is_empty() {
        return Err(ScoutError::invalid_input("Provide at least one technology id"));
    }
    if ids.len() > MAX_STACK_SIZE {
        return Err(ScoutError::invalid_input(format!(
            "A stack may contain at most {MAX_STACK_SIZE} technologies (got {})",
            ids.len()
        )));
    }

    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(ScoutError::invalid_input(format!(
                "Duplicate technology id: {id}. Each technology may appear only once"
            )));
        }
        if catalog.get(id).is_none() {
            return Err(ScoutError::unknown_technology(
                id,
                crate::fuzzy::suggest(id, catalog.ids(), crate::fuzzy::DEFAULT_SUGGESTION_LIMIT),
            ));
        }
    }

    Ok(())
}

/// Response of the scoring endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackScore {
    #[serde(alias = "score")]
    pub overall: f64,
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl StackScore {
    pub fn from_value(value: Value) -> Result<Self, ScoutError> {
        serde_json::from_value(value).map_err(|e| ScoutError::Upstream {
            status: None,
            message: format!("Malformed score payload: {e}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintPick {
    pub category: String,
    #[serde(alias = "id", alias = "tech")]
    pub technology: String,
    #[serde(default)]
    pub rationale: String,
}

/// A generated stack recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub summary: String,
    #[serde(alias = "picks")]
    pub stack: Vec<BlueprintPick>,
    #[serde(default, alias = "estimatedMonthlyCost")]
    pub estimated_monthly_cost: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Blueprint {
    /// Parse a job result, unwrapping a top-level `blueprint` field if present.
    /// Returns `None` when the payload does not look like a blueprint.
    pub fn from_result(value: &Value) -> Option<Self> {
        let inner = value.get("blueprint").unwrap_or(value);
        serde_json::from_value(inner.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request() -> RecommendRequest {
        RecommendRequest {
            project_type: ProjectType::Saas,
            scale: Scale::Startup,
            priorities: vec![Dimension::DeveloperExperience, Dimension::Cost],
            constraints: vec!["Team knows TypeScript".to_string()],
            demo: false,
        }
    }

    #[test]
    fn test_scale_maps_to_context() {
        assert_eq!(Scale::Hobby.context(), Context::Mvp);
        assert_eq!(Scale::Startup.context(), Context::Mvp);
        assert_eq!(Scale::Growth.context(), Context::Default);
        assert_eq!(Scale::Enterprise.context(), Context::Enterprise);
    }

    #[test]
    fn test_project_type_parse() {
        assert_eq!(
            "mobile-backend".parse::<ProjectType>().unwrap(),
            ProjectType::MobileBackend
        );
        assert!("game".parse::<ProjectType>().is_err());
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_duplicate_priorities_rejected() {
        let mut req = request();
        req.priorities.push(Dimension::Cost);
        let err = req.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("cost more than once"));
    }

    #[test]
    fn test_constraint_limits() {
        let mut req = request();
        req.constraints = vec!["x".repeat(MAX_CONSTRAINT_LEN + 1), "  ".to_string()];
        match req.validate().unwrap_err() {
            ScoutError::InvalidInput { issues } => assert_eq!(issues.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_body_contains_shortlist_and_mode() {
        let catalog = Catalog::builtin().unwrap();
        let mut req = request();
        req.demo = true;
        let body = req.to_body(&catalog);
        assert_eq!(body["project_type"], "saas");
        assert_eq!(body["scale"], "startup");
        assert_eq!(body["context"], "mvp");
        assert_eq!(body["mode"], "demo");
        assert_eq!(body["priorities"][0], "developer-experience");
        let frontends = body["shortlist"]["frontend"].as_array().unwrap();
        assert_eq!(frontends.len(), SHORTLIST_PER_CATEGORY);
    }

    #[test]
    fn test_shortlist_sorted_best_first() {
        let catalog = Catalog::builtin().unwrap();
        let list = shortlist(&catalog, Context::Enterprise, 2);
        for entries in list.values() {
            assert!(entries.len() <= 2);
            assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_validate_stack() {
        let catalog = Catalog::builtin().unwrap();
        let ok = vec!["nextjs".to_string(), "postgresql".to_string()];
        assert!(validate_stack(&catalog, &ok).is_ok());

        let dup = vec!["nextjs".to_string(), "nextjs".to_string()];
        assert_eq!(
            validate_stack(&catalog, &dup).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let unknown = vec!["postgres".to_string()];
        let err = validate_stack(&catalog, &unknown).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.suggestions().contains(&"postgresql".to_string()));

        assert!(validate_stack(&catalog, &[]).is_err());
    }

    #[test]
    fn test_blueprint_from_wrapped_result() {
        let value = json!({
            "blueprint": {
                "summary": "Lean SaaS stack",
                "picks": [
                    {"category": "meta-framework", "id": "nextjs", "rationale": "Ecosystem"}
                ],
                "estimatedMonthlyCost": "$40"
            }
        });
        let blueprint = Blueprint::from_result(&value).unwrap();
        assert_eq!(blueprint.stack[0].technology, "nextjs");
        assert_eq!(blueprint.estimated_monthly_cost.as_deref(), Some("$40"));
        assert!(blueprint.warnings.is_empty());
    }

    #[test]
    fn test_blueprint_rejects_other_shapes() {
        assert!(Blueprint::from_result(&json!({"text": "free-form"})).is_none());
    }

    #[test]
    fn test_stack_score_accepts_score_alias() {
        let score = StackScore::from_value(json!({"score": 81.5, "notes": ["solid"]})).unwrap();
        assert_eq!(score.overall, 81.5);
        assert_eq!(score.notes, vec!["solid".to_string()]);
        assert!(StackScore::from_value(json!({"nope": 1})).is_err());
    }
}
