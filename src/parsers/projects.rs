//! Project search (XML) normalizer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::locale::{select_exact, select_preferred, EN, JA};
use super::xml_tree;
use super::{
    as_array, attr, attr_number, attr_or_child, child_text, first_object, non_empty, number,
    TextNode,
};
use crate::error::KakenError;
use crate::models::{
    Affiliation, AffiliationUnit, Allocation, AwardAmount, Category, CurrencyUnit, Field,
    Institution, Keyword, PeriodOfAward, PersonName, Project, ProjectIdentifier, ProjectStatus,
    ResearcherRole, SearchResponse,
};

/// Elements that are always lists, even with a single occurrence
pub const ALWAYS_ARRAY_ELEMENTS: &[&str] = &[
    "grantAward",
    "identifier",
    "summary",
    "field",
    "keyword",
    "member",
    "category",
    "institution",
    "allocation",
    "affiliation",
    "overallAwardAmount",
];

const AWARD: &str = "grantAward";
const LANG_ATTR: &str = "xml:lang";

/// Parse a project search response body
pub fn parse_projects(body: &str) -> Result<SearchResponse<Project>, KakenError> {
    let document = xml_tree::parse(body, ALWAYS_ARRAY_ELEMENTS)?;
    let root = document_root(&document)?;

    let items: Vec<Project> = as_array(root.get(AWARD))
        .iter()
        .filter_map(Value::as_object)
        .map(parse_award)
        .collect();

    tracing::debug!("Parsed {} projects", items.len());

    Ok(SearchResponse {
        raw_data: Value::String(body.to_string()),
        total_results: number(root.get("totalResults")),
        start_index: number(root.get("startIndex")),
        items_per_page: number(root.get("itemsPerPage")),
        items,
    })
}

fn document_root(document: &Map<String, Value>) -> Result<&Map<String, Value>, KakenError> {
    let (name, root) = document
        .iter()
        .find(|(key, _)| !key.starts_with('?'))
        .ok_or_else(|| KakenError::response("XML document has no root element"))?;

    root.as_object()
        .ok_or_else(|| KakenError::response(format!("Root element <{}> has no content", name)))
}

fn parse_award(award: &Map<String, Value>) -> Project {
    let summaries: Vec<&Map<String, Value>> = as_array(award.get("summary"))
        .iter()
        .filter_map(Value::as_object)
        .collect();
    let summary = select_preferred(&summaries, JA, |s| lang_of(s)).copied();
    let english = select_exact(&summaries, EN, |s| lang_of(s)).copied();

    let mut project = Project {
        id: attr(award, "id"),
        award_number: attr(award, "awardNumber"),
        project_type: attr(award, "projectType"),
        record_set: attr(award, "recordSet"),
        created: attr(award, "created").as_deref().and_then(parse_instant),
        modified: attr(award, "modified").as_deref().and_then(parse_instant),
        identifiers: non_empty(
            as_array(award.get("identifier"))
                .iter()
                .filter_map(|v| parse_identifier(Some(v)))
                .collect(),
        ),
        title_en: english.and_then(|s| child_text(s, "title")),
        raw_data: Value::Object(award.clone()),
        ..Default::default()
    };

    if let Some(summary) = summary {
        project.title = child_text(summary, "title");
        project.title_abbreviated = child_text(summary, "titleAbbreviated");
        project.categories = collect(summary, "category", parse_category);
        project.fields = collect(summary, "field", parse_field);
        project.institutions = collect(summary, "institution", parse_institution);
        project.allocations = collect(summary, "allocation", parse_allocation);
        project.members = collect(summary, "member", parse_member);
        project.award_amounts = collect(summary, "overallAwardAmount", parse_award_amount);
        project.keywords = first_object(summary.get("keywordList"))
            .and_then(|list| collect(list, "keyword", parse_keyword));
        project.period_of_award =
            first_object(summary.get("periodOfAward")).and_then(parse_period_of_award);
        project.project_status =
            first_object(summary.get("projectStatus")).and_then(parse_project_status);
    }

    project
}

fn lang_of(node: &Map<String, Value>) -> Option<&str> {
    node.get(&format!("{}{}", xml_tree::ATTR_PREFIX, LANG_ATTR))
        .and_then(Value::as_str)
}

fn collect<T>(
    node: &Map<String, Value>,
    name: &str,
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<Vec<T>> {
    non_empty(as_array(node.get(name)).iter().filter_map(parse).collect())
}

/// ISO-8601 instant; offset-less values are read as UTC
fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    parse_date(value).and_then(|date| date.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc())
}

/// `YYYY-MM-DD`, ignoring any time part
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn parse_identifier(value: Option<&Value>) -> Option<ProjectIdentifier> {
    let node = TextNode::from_value(value)?;
    let kind = node.attr("type")?;
    let value = node
        .text()?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(ProjectIdentifier { kind, value })
}

fn parse_category(value: &Value) -> Option<Category> {
    let node = TextNode::from_value(Some(value))?;
    Some(Category {
        name: node.text()?,
        path: node.attr("path"),
        code: node.attr("code"),
    })
}

fn parse_field(value: &Value) -> Option<Field> {
    let node = TextNode::from_value(Some(value))?;
    Some(Field {
        name: node.text()?,
        path: node.attr("path"),
        code: node.attr("code"),
        field_table: node.attr("fieldTable"),
        sequence: node.attr_number("sequence"),
    })
}

fn parse_institution(value: &Value) -> Option<Institution> {
    let node = TextNode::from_value(Some(value))?;
    Some(Institution {
        name: node.text()?,
        code: node.attr("code"),
        kind: node.attr("type"),
        participate: node.attr("participate"),
        sequence: node.attr_number("sequence"),
    })
}

fn parse_allocation(value: &Value) -> Option<Allocation> {
    let node = TextNode::from_value(Some(value))?;
    Some(Allocation {
        name: node.text()?,
        code: node.attr("code"),
        sequence: node.attr_number("sequence"),
    })
}

fn parse_keyword(value: &Value) -> Option<Keyword> {
    let node = TextNode::from_value(Some(value))?;
    Some(Keyword {
        text: node.text()?,
        language: node.attr("language"),
    })
}

fn parse_period_of_award(node: &Map<String, Value>) -> Option<PeriodOfAward> {
    let year = |name: &str| attr_or_child(node, name).and_then(|v| v.parse().ok());
    let period = PeriodOfAward {
        start_date: attr_or_child(node, "startDate").as_deref().and_then(parse_date),
        end_date: attr_or_child(node, "endDate").as_deref().and_then(parse_date),
        search_start_fiscal_year: year("searchStartFiscalYear"),
        search_end_fiscal_year: year("searchEndFiscalYear"),
        start_fiscal_year: year("startFiscalYear"),
        end_fiscal_year: year("endFiscalYear"),
    };
    (!period.is_empty()).then_some(period)
}

fn parse_project_status(node: &Map<String, Value>) -> Option<ProjectStatus> {
    Some(ProjectStatus {
        status_code: attr(node, "statusCode")?,
        fiscal_year: attr_number(node, "fiscalYear"),
        date: child_text(node, "date").as_deref().and_then(parse_date),
        note: child_text(node, "note"),
    })
}

fn parse_award_amount(value: &Value) -> Option<AwardAmount> {
    let node = value.as_object()?;
    Some(AwardAmount {
        planned: attr(node, "planned").as_deref() == Some("true"),
        total_cost: number(node.get("totalCost")),
        direct_cost: number(node.get("directCost")),
        indirect_cost: number(node.get("indirectCost")),
        unit: first_object(node.get("unit")).and_then(parse_currency_unit),
    })
}

fn parse_currency_unit(node: &Map<String, Value>) -> Option<CurrencyUnit> {
    Some(CurrencyUnit {
        original_value: child_text(node, "originalValue")?,
        normalized_value: child_text(node, "normalizedValue"),
    })
}

fn parse_member(value: &Value) -> Option<ResearcherRole> {
    let node = value.as_object()?;
    Some(ResearcherRole {
        role: attr(node, "role")?,
        sequence: attr_number(node, "sequence"),
        participate: attr(node, "participate"),
        researcher_number: attr(node, "researcherNumber"),
        erad_code: attr(node, "eradCode"),
        name: first_object(node.get("personalName")).and_then(parse_personal_name),
        affiliations: collect(node, "affiliation", parse_affiliation),
    })
}

fn parse_personal_name(node: &Map<String, Value>) -> Option<PersonName> {
    let full_name = child_text(node, "fullName")?;
    let family = TextNode::from_value(node.get("familyName"));
    let given = TextNode::from_value(node.get("givenName"));

    Some(PersonName {
        full_name,
        family_name: family.and_then(|n| n.text()),
        given_name: given.and_then(|n| n.text()),
        family_name_reading: family.and_then(|n| n.attr("yomi")),
        given_name_reading: given.and_then(|n| n.attr("yomi")),
    })
}

fn parse_affiliation(value: &Value) -> Option<Affiliation> {
    let node = value.as_object()?;
    let unit = |name: &str| {
        let part = TextNode::from_value(node.get(name))?;
        Some(AffiliationUnit {
            name: part.text()?,
            code: part.attr("code"),
            kind: part.attr("type"),
            participate: part.attr("participate"),
        })
    };

    let mut affiliation =
        Affiliation::from_units(unit("institution"), unit("department"), unit("jobTitle"))?;
    affiliation.sequence = attr_number(node, "sequence");
    Some(affiliation)
}
