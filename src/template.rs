//! Template records and their mutation inputs.

use crate::params::ParameterSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Closed set of template categories. Each category persists to its own
/// file in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Character,
    Landscape,
    Style,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Character, Category::Landscape, Category::Style];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Character => "character",
            Category::Landscape => "landscape",
            Category::Style => "style",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, versioned set of default prompt parameters.
///
/// The id is immutable for the record's lifetime and the version
/// increases by exactly 1 on every mutating update. Records are owned and
/// mutated exclusively by the store; everything downstream treats them as
/// read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub parameters: ParameterSet,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// One-line view of a record, returned by list operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&TemplateRecord> for TemplateSummary {
    fn from(record: &TemplateRecord) -> Self {
        TemplateSummary {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            category: record.category,
            version: record.version,
            updated_at: record.updated_at,
            is_active: record.is_active,
        }
    }
}

/// Provenance of the template a generation resolved against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProvenance {
    pub id: String,
    pub name: String,
    pub version: u32,
}

impl From<&TemplateRecord> for TemplateProvenance {
    fn from(record: &TemplateRecord) -> Self {
        TemplateProvenance {
            id: record.id.clone(),
            name: record.name.clone(),
            version: record.version,
        }
    }
}

/// Input for creating a template. The parameters must include a subject.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplate {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub parameters: ParameterSet,
}

/// Input for updating a template; every field is optional and absent
/// fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub parameters: Option<ParameterSet>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_serde() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(serde_json::from_str::<Category>("\"portrait\"").is_err());
    }

    #[test]
    fn summary_and_provenance_reflect_the_record() {
        let now = Utc::now();
        let record = TemplateRecord {
            id: "t-1".into(),
            name: "misty woods".into(),
            description: "fog-heavy landscapes".into(),
            category: Category::Landscape,
            parameters: ParameterSet {
                subject: Some("a forest".into()),
                ..Default::default()
            },
            version: 3,
            created_at: now,
            updated_at: now,
            is_active: true,
        };

        let summary = TemplateSummary::from(&record);
        assert_eq!(summary.id, "t-1");
        assert_eq!(summary.version, 3);

        let provenance = TemplateProvenance::from(&record);
        assert_eq!(provenance.name, "misty woods");
        assert_eq!(provenance.version, 3);
    }
}
