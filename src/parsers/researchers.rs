//! Researcher search (JSON) normalizer.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::locale::{resolve_exact_text, resolve_text, EN, JA, JA_KANA};
use super::{as_array, first_object, non_empty};
use crate::error::KakenError;
use crate::models::{
    Affiliation, AffiliationUnit, PersonName, Product, Project, Researcher, SearchResponse,
    UNKNOWN_NAME,
};

const INSTITUTION_KEYS: &[&str] = &[
    "id:institution:erad",
    "id:institution:kakenhi",
    "id:institution:mext",
    "id:institution:jsps",
    "id:institution:jst",
];

const DEPARTMENT_KEYS: &[&str] = &[
    "id:department:erad",
    "id:department:mext",
    "id:department:jsps",
    "id:department:jst",
];

const JOB_TITLE_KEYS: &[&str] = &[
    "id:jobTitle:erad",
    "id:jobTitle:mext",
    "id:jobTitle:jsps",
    "id:jobTitle:jst",
];

/// Parse a researcher search response body
pub fn parse_researchers(body: &str) -> Result<SearchResponse<Researcher>, KakenError> {
    let document: Value = serde_json::from_str(body)?;
    let root = document
        .as_object()
        .ok_or_else(|| KakenError::response("Researcher response is not a JSON object"))?;

    let items: Vec<Researcher> = as_array(root.get("researchers"))
        .iter()
        .filter_map(Value::as_object)
        .map(parse_researcher)
        .collect();

    tracing::debug!("Parsed {} researchers", items.len());

    Ok(SearchResponse {
        total_results: whole_number(root.get("totalResults")),
        start_index: whole_number(root.get("startIndex")),
        items_per_page: whole_number(root.get("itemsPerPage")),
        items,
        raw_data: document,
    })
}

fn parse_researcher(record: &Map<String, Value>) -> Researcher {
    Researcher {
        id: first_string(record.get("accn")),
        name: Some(parse_person_name(first_object(record.get("name")))),
        current_affiliations: parse_affiliations(record.get("affiliations:current")),
        historical_affiliations: parse_affiliations(record.get("affiliations:history")),
        erad_id: leading_string(record.get("id:person:erad")),
        jglobal_id: leading_string(record.get("id:person:jglobal")),
        researchmap_id: leading_string(record.get("id:person:researchmap")),
        orcid: leading_string(record.get("id:person:orcid")),
        projects: non_empty(
            as_array(record.get("work:project"))
                .iter()
                .filter_map(Value::as_object)
                .map(parse_embedded_project)
                .collect(),
        ),
        products: non_empty(
            as_array(record.get("work:product"))
                .iter()
                .filter_map(Value::as_object)
                .map(parse_embedded_product)
                .collect(),
        ),
        raw_data: Value::Object(record.clone()),
    }
}

/// Index 0 of an array, only when it is a string
fn leading_string(value: Option<&Value>) -> Option<String> {
    value?.as_array()?.first()?.as_str().map(str::to_string)
}

/// First string item of an array (or a bare string)
fn first_string(value: Option<&Value>) -> Option<String> {
    as_array(value)
        .iter()
        .find_map(Value::as_str)
        .map(str::to_string)
}

fn parse_person_name(name: Option<&Map<String, Value>>) -> PersonName {
    let part = |key: &str, lang: &str| name.and_then(|n| resolve_text(n.get(key), lang));

    let family_name = part("name:familyName", JA);
    let given_name = part("name:givenName", JA);
    let full_name = PersonName::join_parts(family_name.as_deref(), given_name.as_deref())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    PersonName {
        full_name,
        family_name,
        given_name,
        family_name_reading: part("name:familyName", JA_KANA),
        given_name_reading: part("name:givenName", JA_KANA),
    }
}

/// Value of the first key in `keys` that holds a string
fn first_present_key(node: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| node.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn parse_unit(value: Option<&Value>, keys: &[&str]) -> Option<AffiliationUnit> {
    let node = first_object(value)?;
    let mut unit = AffiliationUnit::new(resolve_text(node.get("humanReadableValue"), JA)?);
    unit.code = first_present_key(node, keys);
    Some(unit)
}

fn parse_affiliations(value: Option<&Value>) -> Option<Vec<Affiliation>> {
    non_empty(
        as_array(value)
            .iter()
            .filter_map(Value::as_object)
            .filter_map(parse_affiliation)
            .collect(),
    )
}

fn parse_affiliation(node: &Map<String, Value>) -> Option<Affiliation> {
    let mut affiliation = Affiliation::from_units(
        parse_unit(node.get("affiliation:institution"), INSTITUTION_KEYS),
        parse_unit(node.get("affiliation:department"), DEPARTMENT_KEYS),
        parse_unit(node.get("affiliation:jobTitle"), JOB_TITLE_KEYS),
    )?;
    affiliation.sequence = node
        .get("sequence")
        .and_then(|s| whole_number(Some(s)))
        .and_then(|s| u32::try_from(s).ok());
    affiliation.start_date = era_date(node.get("since"));
    affiliation.end_date = era_date(node.get("until"));
    Some(affiliation)
}

/// Non-negative integer from a JSON number, accepting integral floats like `20.0`
fn whole_number(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// Calendar date from a `commonEra:*` object; month and day default to 1
fn era_date(value: Option<&Value>) -> Option<NaiveDate> {
    let era = first_object(value)?;
    let component = |key: &str| whole_number(era.get(key));

    let year = i32::try_from(component("commonEra:year")?).ok()?;
    let month = u32::try_from(component("commonEra:month").unwrap_or(1)).ok()?;
    let day = u32::try_from(component("commonEra:day").unwrap_or(1)).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_embedded_project(node: &Map<String, Value>) -> Project {
    Project {
        id: first_string(node.get("id:project:kakenhi")),
        title: resolve_text(node.get("title"), JA),
        title_en: resolve_exact_text(node.get("title"), EN),
        raw_data: Value::Object(node.clone()),
        ..Default::default()
    }
}

fn parse_embedded_product(node: &Map<String, Value>) -> Product {
    let text = |key: &str| {
        node.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Product {
        id: first_string(node.get("accn")),
        kind: text("resourceType"),
        title: text("title"),
        identifiers: None,
        raw_data: Value::Object(node.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(researchers: Value) -> String {
        json!({
            "totalResults": 1,
            "startIndex": "1",
            "itemsPerPage": 20,
            "researchers": researchers
        })
        .to_string()
    }

    fn institution(ids: Value) -> Value {
        let mut unit = ids;
        unit["humanReadableValue"] = json!([
            {"lang": "en", "text": "The University of Tokyo"},
            {"lang": "ja", "text": "東京大学"}
        ]);
        json!([{"affiliation:institution": unit}])
    }

    #[test]
    fn test_institution_code_priority() {
        let body = response(json!([{
            "affiliations:current": institution(json!({
                "id:institution:mext": "M1",
                "id:institution:erad": "E1"
            }))
        }]));
        let parsed = parse_researchers(&body).unwrap();
        let unit = parsed.items[0].current_affiliations.as_ref().unwrap()[0]
            .institution
            .clone()
            .unwrap();
        assert_eq!(unit.code.as_deref(), Some("E1"));
        assert_eq!(unit.name, "東京大学");

        let body = response(json!([{
            "affiliations:current": institution(json!({"id:institution:mext": "M1"}))
        }]));
        let parsed = parse_researchers(&body).unwrap();
        let unit = parsed.items[0].current_affiliations.as_ref().unwrap()[0]
            .institution
            .clone()
            .unwrap();
        assert_eq!(unit.code.as_deref(), Some("M1"));
    }

    #[test]
    fn test_non_string_key_is_skipped() {
        let node = json!({"id:department:erad": 42, "id:department:jsps": "J1"});
        assert_eq!(
            first_present_key(node.as_object().unwrap(), DEPARTMENT_KEYS).as_deref(),
            Some("J1")
        );
        assert_eq!(first_present_key(&Map::new(), DEPARTMENT_KEYS), None);
    }

    #[test]
    fn test_full_record() {
        let body = response(json!([{
            "accn": "50123456",
            "name": {
                "name:familyName": [
                    {"lang": "ja", "text": "山田"},
                    {"lang": "ja-Kana", "text": "ヤマダ"},
                    {"lang": "en", "text": "Yamada"}
                ],
                "name:givenName": [{"lang": "ja", "text": "太郎"}]
            },
            "id:person:erad": ["50123456", "ignored"],
            "id:person:jglobal": [12345],
            "id:person:researchmap": "not-an-array",
            "id:person:orcid": ["0000-0002-1825-0097"],
            "affiliations:current": [{
                "sequence": 1,
                "affiliation:institution": {
                    "id:institution:kakenhi": "12601",
                    "humanReadableValue": [{"lang": "ja", "text": "東京大学"}]
                },
                "affiliation:jobTitle": {
                    "id:jobTitle:mext": "110",
                    "humanReadableValue": [{"lang": "ja", "text": "教授"}]
                },
                "since": {"commonEra:year": 2020, "commonEra:month": 4, "commonEra:day": 1}
            }],
            "affiliations:history": [
                {
                    "sequence": "2",
                    "affiliation:department": {
                        "humanReadableValue": [{"lang": "en", "text": "Faculty of Science"}]
                    },
                    "since": {"commonEra:year": 2010},
                    "until": {"commonEra:year": 2019, "commonEra:month": 3, "commonEra:day": 31}
                },
                {"affiliation:institution": {"id:institution:erad": "orphan"}}
            ]
        }]));

        let parsed = parse_researchers(&body).unwrap();
        assert_eq!(parsed.len(), 1);
        let researcher = &parsed.items[0];

        assert_eq!(researcher.id.as_deref(), Some("50123456"));
        let name = researcher.name.as_ref().unwrap();
        assert_eq!(name.full_name, "山田 太郎");
        assert_eq!(name.family_name_reading.as_deref(), Some("ヤマダ"));

        assert_eq!(researcher.erad_id.as_deref(), Some("50123456"));
        assert_eq!(researcher.jglobal_id, None);
        assert_eq!(researcher.researchmap_id, None);
        assert_eq!(researcher.orcid.as_deref(), Some("0000-0002-1825-0097"));

        let current = researcher.current_affiliations.as_ref().unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].sequence, Some(1));
        assert_eq!(current[0].institution.as_ref().unwrap().code.as_deref(), Some("12601"));
        assert_eq!(current[0].job_title.as_ref().unwrap().code.as_deref(), Some("110"));
        assert_eq!(current[0].department, None);
        assert_eq!(current[0].start_date, NaiveDate::from_ymd_opt(2020, 4, 1));
        assert_eq!(current[0].end_date, None);

        let history = researcher.historical_affiliations.as_ref().unwrap();
        assert_eq!(history.len(), 1, "affiliation with no named unit is dropped");
        assert_eq!(history[0].sequence, None, "textual sequence is not numeric");
        assert_eq!(history[0].department.as_ref().unwrap().name, "Faculty of Science");
        assert_eq!(history[0].department.as_ref().unwrap().code, None);
        assert_eq!(history[0].start_date, NaiveDate::from_ymd_opt(2010, 1, 1));
        assert_eq!(history[0].end_date, NaiveDate::from_ymd_opt(2019, 3, 31));
    }

    #[test]
    fn test_envelope() {
        let body = response(json!([{"accn": "1"}, "not a record", {"accn": "2"}]));
        let parsed = parse_researchers(&body).unwrap();

        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.total_results, Some(1));
        assert_eq!(parsed.start_index, None, "textual totals are not copied");
        assert_eq!(parsed.items_per_page, Some(20));
        assert_eq!(parsed.raw_data["researchers"][0]["accn"], "1");
    }

    #[test]
    fn test_unknown_name_placeholder() {
        let body = response(json!([{"accn": "1"}, {"name": {"name:givenName": [{"text": "Hanako"}]}}]));
        let parsed = parse_researchers(&body).unwrap();

        assert_eq!(parsed.items[0].name.as_ref().unwrap().full_name, UNKNOWN_NAME);
        let partial = parsed.items[1].name.as_ref().unwrap();
        assert_eq!(partial.full_name, "Hanako");
        assert_eq!(partial.family_name, None);
    }

    #[test]
    fn test_era_date_rules() {
        assert_eq!(era_date(Some(&json!({"commonEra:month": 4}))), None);
        assert_eq!(era_date(Some(&json!({"commonEra:year": "2020"}))), None);
        assert_eq!(
            era_date(Some(&json!({"commonEra:year": 2021, "commonEra:month": 12}))),
            NaiveDate::from_ymd_opt(2021, 12, 1)
        );
        assert_eq!(
            era_date(Some(&json!({"commonEra:year": 2021, "commonEra:month": 2, "commonEra:day": 30}))),
            None
        );
        assert_eq!(era_date(None), None);
    }

    #[test]
    fn test_integral_floats_count_as_numbers() {
        let body = json!({
            "totalResults": 3.0,
            "startIndex": 1,
            "itemsPerPage": 20.5,
            "researchers": [{
                "affiliations:history": [{
                    "affiliation:institution": {
                        "humanReadableValue": [{"lang": "ja", "text": "東京大学"}]
                    },
                    "sequence": 2.0,
                    "since": {"commonEra:year": 2020.0, "commonEra:month": 4.0}
                }]
            }]
        })
        .to_string();
        let parsed = parse_researchers(&body).unwrap();

        assert_eq!(parsed.total_results, Some(3));
        assert_eq!(parsed.start_index, Some(1));
        assert_eq!(parsed.items_per_page, None, "fractional counts are dropped");
        let history = parsed.items[0].historical_affiliations.as_ref().unwrap();
        assert_eq!(history[0].sequence, Some(2));
        assert_eq!(history[0].start_date, NaiveDate::from_ymd_opt(2020, 4, 1));

        assert_eq!(whole_number(Some(&json!(-1))), None);
        assert_eq!(whole_number(Some(&json!(-2.0))), None);
        assert_eq!(whole_number(Some(&json!("7"))), None);
    }

    #[test]
    fn test_embedded_projects_and_products() {
        let body = response(json!([{
            "work:project": [{
                "id:project:kakenhi": ["23K01234"],
                "title": [{"lang": "en", "text": "English"}, {"lang": "ja", "text": "日本語"}],
                "periodOfAward": {"startFiscalYear": 2023}
            }, {
                "title": [{"lang": "ja", "text": "日本語のみ"}]
            }],
            "work:product": [{
                "accn": [7, "P-1"],
                "resourceType": "journal article",
                "title": "A Paper"
            }]
        }]));

        let parsed = parse_researchers(&body).unwrap();
        let researcher = &parsed.items[0];

        let projects = researcher.projects.as_ref().unwrap();
        assert_eq!(projects[0].id.as_deref(), Some("23K01234"));
        assert_eq!(projects[0].title.as_deref(), Some("日本語"));
        assert_eq!(projects[0].title_en.as_deref(), Some("English"));
        assert_eq!(projects[0].period_of_award, None);
        assert_eq!(projects[0].raw_data["periodOfAward"]["startFiscalYear"], 2023);
        assert_eq!(projects[1].id, None);
        assert_eq!(projects[1].title_en, None);

        let products = researcher.products.as_ref().unwrap();
        assert_eq!(products[0].id.as_deref(), Some("P-1"));
        assert_eq!(products[0].kind.as_deref(), Some("journal article"));
        assert_eq!(products[0].title.as_deref(), Some("A Paper"));
    }

    #[test]
    fn test_absent_collections_are_omitted() {
        let body = response(json!([{"accn": "1", "affiliations:current": [], "work:project": []}]));
        let researcher = &parse_researchers(&body).unwrap().items[0];
        assert_eq!(researcher.current_affiliations, None);
        assert_eq!(researcher.projects, None);
        assert_eq!(researcher.products, None);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(parse_researchers("{not json").unwrap_err().is_response_error());
        assert!(parse_researchers("[1, 2]").unwrap_err().is_response_error());
        let empty = parse_researchers("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let body = response(json!([{"accn": "1", "name": {"name:familyName": [{"lang": "ja", "text": "山田"}]}}]));
        assert_eq!(parse_researchers(&body).unwrap(), parse_researchers(&body).unwrap());
    }
}
