//! Technology catalog
//!
//! Read-only registry of technology records, loaded once from the embedded
//! JSON data and never mutated afterwards. Lookups are exact and
//! case-sensitive; fuzzy matching only ever enriches a failed lookup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// Fixed set of technology categories, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Frontend,
    Backend,
    MetaFramework,
    Database,
    Orm,
    Auth,
    Hosting,
    Payments,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Frontend,
        Category::Backend,
        Category::MetaFramework,
        Category::Database,
        Category::Orm,
        Category::Auth,
        Category::Hosting,
        Category::Payments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Frontend => "frontend",
            Category::Backend => "backend",
            Category::MetaFramework => "meta-framework",
            Category::Database => "database",
            Category::Orm => "orm",
            Category::Auth => "auth",
            Category::Hosting => "hosting",
            Category::Payments => "payments",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid category: {}. Valid categories: {}",
                    s,
                    Category::ALL.map(|c| c.as_str()).join(", ")
                )
            })
    }
}

/// A named axis of quality, scored 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    Performance,
    DeveloperExperience,
    Ecosystem,
    Scalability,
    Security,
    Cost,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Performance,
        Dimension::DeveloperExperience,
        Dimension::Ecosystem,
        Dimension::Scalability,
        Dimension::Security,
        Dimension::Cost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Performance => "performance",
            Dimension::DeveloperExperience => "developer-experience",
            Dimension::Ecosystem => "ecosystem",
            Dimension::Scalability => "scalability",
            Dimension::Security => "security",
            Dimension::Cost => "cost",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid dimension: {}. Valid dimensions: {}",
                    s,
                    Dimension::ALL.map(|d| d.as_str()).join(", ")
                )
            })
    }
}

/// A single catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technology {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    pub scores: BTreeMap<Dimension, u8>,
    /// Declared compatibility. Not guaranteed to be mirrored by the other record.
    #[serde(default)]
    pub compatible: Vec<String>,
}

impl Technology {
    /// Raw score for a dimension; a missing dimension counts as zero.
    pub fn dimension_score(&self, dimension: Dimension) -> u8 {
        self.scores.get(&dimension).copied().unwrap_or(0)
    }

    pub fn declares_compatible(&self, other_id: &str) -> bool {
        self.compatible.iter().any(|id| id == other_id)
    }
}

/// Errors raised while loading a catalog. All of them are fatal at start-up.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate technology id in catalog: {0}")]
    DuplicateId(String),

    #[error("Technology {id} has a {dimension} score of {score}, expected 0-100")]
    ScoreOutOfRange {
        id: String,
        dimension: Dimension,
        score: u8,
    },
}

/// Immutable, registration-ordered technology registry
#[derive(Debug, Clone)]
pub struct Catalog {
    technologies: Vec<Technology>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids and out-of-range scores
    pub fn new(technologies: Vec<Technology>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(technologies.len());

        for (position, tech) in technologies.iter().enumerate() {
            if let Some((dimension, score)) = tech.scores.iter().find(|(_, s)| **s > 100) {
                return Err(CatalogError::ScoreOutOfRange {
                    id: tech.id.clone(),
                    dimension: *dimension,
                    score: *score,
                });
            }

            if index.insert(tech.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(tech.id.clone()));
            }
        }

        Ok(Self {
            technologies,
            index,
        })
    }

    /// Parse a catalog from its JSON representation (an array of technologies)
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let technologies: Vec<Technology> = serde_json::from_str(json)?;
        Self::new(technologies)
    }

    /// The catalog shipped with the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn get(&self, id: &str) -> Option<&Technology> {
        self.index.get(id).map(|&i| &self.technologies[i])
    }

    /// Technologies in a category, in registration order
    pub fn by_category(&self, category: Category) -> Vec<&Technology> {
        self.technologies
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    /// Every non-empty category mapped to its technologies
    pub fn all_grouped_by_category(&self) -> BTreeMap<Category, Vec<&Technology>> {
        let mut grouped: BTreeMap<Category, Vec<&Technology>> = BTreeMap::new();
        for tech in &self.technologies {
            grouped.entry(tech.category).or_default().push(tech);
        }
        grouped
    }

    /// All ids, in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.technologies.iter().map(|t| t.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Technology> {
        self.technologies.iter()
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }

    /// Display name for an id, falling back to the id itself
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|t| t.name.as_str()).unwrap_or(id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture_tech(
        id: &str,
        category: Category,
        scores: &[(Dimension, u8)],
        compatible: &[&str],
    ) -> Technology {
        Technology {
            id: id.to_string(),
            name: id.to_uppercase(),
            category,
            description: String::new(),
            scores: scores.iter().copied().collect(),
            compatible: compatible.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.is_empty());
        assert_eq!(
            catalog.get("nextjs").unwrap().category,
            Category::MetaFramework
        );
    }

    #[test]
    fn test_builtin_catalog_covers_every_category() {
        let catalog = Catalog::builtin().unwrap();
        let grouped = catalog.all_grouped_by_category();
        for category in Category::ALL {
            assert!(
                grouped.contains_key(&category),
                "missing category {category}"
            );
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.get("nextjs").is_some());
        assert!(catalog.get("NextJS").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let techs = vec![
            fixture_tech("a", Category::Frontend, &[], &[]),
            fixture_tech("a", Category::Backend, &[], &[]),
        ];
        let err = Catalog::new(techs).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let techs = vec![fixture_tech(
            "a",
            Category::Frontend,
            &[(Dimension::Cost, 101)],
            &[],
        )];
        assert!(matches!(
            Catalog::new(techs),
            Err(CatalogError::ScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_by_category_preserves_registration_order() {
        let techs = vec![
            fixture_tech("zeta", Category::Database, &[], &[]),
            fixture_tech("alpha", Category::Frontend, &[], &[]),
            fixture_tech("beta", Category::Database, &[], &[]),
        ];
        let catalog = Catalog::new(techs).unwrap();
        let ids: Vec<&str> = catalog
            .by_category(Category::Database)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["zeta", "beta"]);
    }

    #[test]
    fn test_grouped_skips_empty_categories() {
        let techs = vec![fixture_tech("a", Category::Orm, &[], &[])];
        let catalog = Catalog::new(techs).unwrap();
        let grouped = catalog.all_grouped_by_category();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[&Category::Orm].len(), 1);
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("mainframe".parse::<Category>().is_err());
    }

    #[test]
    fn test_missing_dimension_scores_zero() {
        let tech = fixture_tech("a", Category::Auth, &[(Dimension::Security, 90)], &[]);
        assert_eq!(tech.dimension_score(Dimension::Security), 90);
        assert_eq!(tech.dimension_score(Dimension::Cost), 0);
    }
}
