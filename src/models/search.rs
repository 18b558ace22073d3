//! Search parameters and the response envelope.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::KakenError;

/// Largest page size the endpoints accept
pub const MAX_RESULTS_PER_PAGE: u32 = 500;

/// Display language requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }
}

/// Project (grant award) search parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSearchParams {
    /// Free-text keyword (`kw`)
    pub keyword: Option<String>,
    /// Project title (`qa`)
    pub title: Option<String>,
    /// Award number (`qb`)
    pub award_number: Option<String>,
    /// Institution name (`qe`)
    pub institution: Option<String>,
    /// Researcher name (`qg`)
    pub researcher_name: Option<String>,
    /// Results per page (`rw`)
    pub results_per_page: Option<u32>,
    /// 1-based start index (`st`)
    pub start_index: Option<u32>,
    /// Sort order code (`od`)
    pub sort_order: Option<String>,
    /// Display language (`lang`)
    pub language: Option<Language>,
}

impl ProjectSearchParams {
    /// Search by keyword
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    /// Set title filter
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set award number filter
    pub fn award_number(mut self, number: impl Into<String>) -> Self {
        self.award_number = Some(number.into());
        self
    }

    /// Set institution filter
    pub fn institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    /// Set researcher name filter
    pub fn researcher_name(mut self, name: impl Into<String>) -> Self {
        self.researcher_name = Some(name.into());
        self
    }

    /// Set page size
    pub fn results_per_page(mut self, count: u32) -> Self {
        self.results_per_page = Some(count);
        self
    }

    /// Set start index
    pub fn start_index(mut self, index: u32) -> Self {
        self.start_index = Some(index);
        self
    }

    /// Set sort order (`od`)
    pub fn sort_order(mut self, order: impl Into<String>) -> Self {
        self.sort_order = Some(order.into());
        self
    }

    /// Set display language
    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Build the request URL (`format=xml`)
    pub fn build_url(&self, endpoint: &str, app_id: Option<&str>) -> Result<Url, KakenError> {
        let criteria = [
            ("kw", &self.keyword),
            ("qa", &self.title),
            ("qb", &self.award_number),
            ("qe", &self.institution),
            ("qg", &self.researcher_name),
        ];
        build_url(
            endpoint,
            app_id,
            "xml",
            &criteria,
            &Paging {
                results_per_page: self.results_per_page,
                start_index: self.start_index,
                sort_order: self.sort_order.as_deref(),
                language: self.language,
            },
        )
    }
}

/// Researcher search parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearcherSearchParams {
    /// Free-text keyword (`kw`)
    pub keyword: Option<String>,
    /// Researcher name (`qg`)
    pub name: Option<String>,
    /// Affiliated institution (`qh`)
    pub institution: Option<String>,
    /// Researcher number (`qm`)
    pub researcher_number: Option<String>,
    /// Results per page (`rw`)
    pub results_per_page: Option<u32>,
    /// 1-based start index (`st`)
    pub start_index: Option<u32>,
    /// Sort order code (`od`)
    pub sort_order: Option<String>,
    /// Display language (`lang`)
    pub language: Option<Language>,
}

impl ResearcherSearchParams {
    /// Search by keyword
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    /// Set name filter
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set institution filter
    pub fn institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    /// Set researcher number filter
    pub fn researcher_number(mut self, number: impl Into<String>) -> Self {
        self.researcher_number = Some(number.into());
        self
    }

    /// Set page size
    pub fn results_per_page(mut self, count: u32) -> Self {
        self.results_per_page = Some(count);
        self
    }

    /// Set start index
    pub fn start_index(mut self, index: u32) -> Self {
        self.start_index = Some(index);
        self
    }

    pub fn sort_order(mut self, order: impl Into<String>) -> Self {
        self.sort_order = Some(order.into());
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Build the request URL (`format=json`)
    pub fn build_url(&self, endpoint: &str, app_id: Option<&str>) -> Result<Url, KakenError> {
        let criteria = [
            ("kw", &self.keyword),
            ("qg", &self.name),
            ("qh", &self.institution),
            ("qm", &self.researcher_number),
        ];
        build_url(
            endpoint,
            app_id,
            "json",
            &criteria,
            &Paging {
                results_per_page: self.results_per_page,
                start_index: self.start_index,
                sort_order: self.sort_order.as_deref(),
                language: self.language,
            },
        )
    }
}

struct Paging<'a> {
    results_per_page: Option<u32>,
    start_index: Option<u32>,
    sort_order: Option<&'a str>,
    language: Option<Language>,
}

fn build_url(
    endpoint: &str,
    app_id: Option<&str>,
    format: &str,
    criteria: &[(&str, &Option<String>)],
    paging: &Paging<'_>,
) -> Result<Url, KakenError> {
    let app_id = app_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| KakenError::request("Missing application id (appid)"))?;

    let criteria: Vec<(&str, &str)> = criteria
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (*key, v))
        })
        .collect();
    if criteria.is_empty() {
        return Err(KakenError::request("At least one search criterion is required"));
    }

    if let Some(rw) = paging.results_per_page {
        if rw == 0 || rw > MAX_RESULTS_PER_PAGE {
            return Err(KakenError::request(format!(
                "Results per page must be between 1 and {}, got {}",
                MAX_RESULTS_PER_PAGE, rw
            )));
        }
    }
    if paging.start_index == Some(0) {
        return Err(KakenError::request("Start index is 1-based"));
    }

    let mut url = Url::parse(endpoint)
        .map_err(|e| KakenError::request(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("appid", app_id);
        query.append_pair("format", format);
        for (key, value) in &criteria {
            query.append_pair(key, value);
        }
        if let Some(rw) = paging.results_per_page {
            query.append_pair("rw", &rw.to_string());
        }
        if let Some(st) = paging.start_index {
            query.append_pair("st", &st.to_string());
        }
        if let Some(od) = paging.sort_order {
            query.append_pair("od", od);
        }
        if let Some(lang) = paging.language {
            query.append_pair("lang", lang.as_str());
        }
    }
    Ok(url)
}

/// Parsed search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse<T> {
    /// Original payload: the body text for XML, the parsed document for JSON
    pub raw_data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u64>,
    pub items: Vec<T>,
}

impl<T> SearchResponse<T> {
    /// Number of parsed items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items were parsed
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KAKEN: &str = "https://kaken.nii.ac.jp/opensearch/";

    #[test]
    fn test_project_url() {
        let url = ProjectSearchParams::new("graphene")
            .institution("東京大学")
            .results_per_page(50)
            .start_index(51)
            .language(Language::En)
            .build_url(KAKEN, Some("APP"))
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("appid".into(), "APP".into()),
                ("format".into(), "xml".into()),
                ("kw".into(), "graphene".into()),
                ("qe".into(), "東京大学".into()),
                ("rw".into(), "50".into()),
                ("st".into(), "51".into()),
                ("lang".into(), "en".into()),
            ]
        );
    }

    #[test]
    fn test_sort_order_and_language_setters() {
        let url = ResearcherSearchParams::new("spin")
            .sort_order("1")
            .language(Language::Ja)
            .build_url(KAKEN, Some("APP"))
            .unwrap();
        let query = url.query().unwrap_or_default();
        assert!(query.ends_with("kw=spin&od=1&lang=ja"), "{}", query);

        let url = ProjectSearchParams::new("spin")
            .sort_order("2")
            .build_url(KAKEN, Some("APP"))
            .unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "od" && v == "2"));
    }

    #[test]
    fn test_url_is_stable() {
        let params = ResearcherSearchParams::new("spin").name("Tanaka");
        let a = params.build_url(KAKEN, Some("APP")).unwrap();
        let b = params.build_url(KAKEN, Some("APP")).unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().contains("format=json"));
    }

    #[test]
    fn test_missing_app_id() {
        let err = ProjectSearchParams::new("x")
            .build_url(KAKEN, Some("  "))
            .unwrap_err();
        assert!(matches!(err, KakenError::Request { .. }));
        assert!(ProjectSearchParams::new("x").build_url(KAKEN, None).is_err());
    }

    #[test]
    fn test_invalid_paging() {
        assert!(ProjectSearchParams::new("x")
            .results_per_page(0)
            .build_url(KAKEN, Some("APP"))
            .is_err());
        assert!(ProjectSearchParams::new("x")
            .results_per_page(501)
            .build_url(KAKEN, Some("APP"))
            .is_err());
        assert!(ResearcherSearchParams::new("x")
            .start_index(0)
            .build_url(KAKEN, Some("APP"))
            .is_err());
    }

    #[test]
    fn test_requires_a_criterion() {
        let err = ResearcherSearchParams::default()
            .results_per_page(20)
            .build_url(KAKEN, Some("APP"))
            .unwrap_err();
        assert!(err.to_string().contains("criterion"));

        // blank strings do not count
        assert!(ProjectSearchParams::new("   ")
            .build_url(KAKEN, Some("APP"))
            .is_err());
    }
}
