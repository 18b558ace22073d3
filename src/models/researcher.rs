//! Researcher-side records shared by both endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::project::Project;

/// Placeholder full name when a researcher record carries no name parts
pub const UNKNOWN_NAME: &str = "Unknown";

/// A person's name with optional phonetic readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Phonetic reading (yomi) of the family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name_reading: Option<String>,
    /// Phonetic reading (yomi) of the given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name_reading: Option<String>,
}

impl PersonName {
    /// `"family given"` when both exist, else whichever exists
    pub fn join_parts(family: Option<&str>, given: Option<&str>) -> Option<String> {
        match (family, given) {
            (Some(family), Some(given)) => Some(format!("{} {}", family, given)),
            (Some(part), None) | (None, Some(part)) => Some(part.to_string()),
            (None, None) => None,
        }
    }
}

/// Institution, department or job title inside an [`Affiliation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliationUnit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participate: Option<String>,
}

impl AffiliationUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            kind: None,
            participate: None,
        }
    }
}

/// One tenure at an institution.
///
/// Never constructed with institution, department and job title all absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affiliation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<AffiliationUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<AffiliationUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<AffiliationUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Affiliation {
    /// Build an affiliation, or `None` when every unit is absent
    pub fn from_units(
        institution: Option<AffiliationUnit>,
        department: Option<AffiliationUnit>,
        job_title: Option<AffiliationUnit>,
    ) -> Option<Self> {
        if institution.is_none() && department.is_none() && job_title.is_none() {
            return None;
        }
        Some(Self {
            institution,
            department,
            job_title,
            sequence: None,
            start_date: None,
            end_date: None,
        })
    }
}

/// Identifier attached to a research product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// Research output embedded in a researcher record.
///
/// Researcher search fills only `id`, `kind`, `title` and `raw_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<Vec<ProductIdentifier>>,
    pub raw_data: serde_json::Value,
}

/// A researcher from the researcher search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Researcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PersonName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_affiliations: Option<Vec<Affiliation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_affiliations: Option<Vec<Affiliation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erad_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jglobal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub researchmap_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    pub raw_data: serde_json::Value,
}

/// A project member: role plus whatever name/affiliations the project lists.
///
/// Not a [`Researcher`]: a project never nests a researcher that nests projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearcherRole {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub researcher_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erad_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PersonName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliations: Option<Vec<Affiliation>>,
}
