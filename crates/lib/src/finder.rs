//! Scheme/programme discovery over a static dataset.
//!
//! Filtering is entirely client-side: free-text search across the bilingual
//! name/description fields, plus exact category/department matches and a
//! service-type filter. Many dataset rows carry no explicit `type`, so the
//! type is normalized with keyword heuristics over the hi+en text.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

static BUNDLED_DATASET: &str = include_str!("../data/schemes.json");

/// One dataset row. Every field is optional; real rows are uneven.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheme {
    #[serde(default)]
    pub name_hi: Option<String>,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description_hi: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Scheme,
    Programme,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Scheme => "scheme",
            ServiceType::Programme => "programme",
        }
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheme" | "schemes" => Ok(ServiceType::Scheme),
            s if s.starts_with("program") => Ok(ServiceType::Programme),
            other => Err(format!("unknown service type: {}", other)),
        }
    }
}

const PROGRAMME_HINTS: [&str; 14] = [
    "programme",
    "program ",
    " training",
    "campaign",
    "awareness",
    "workshop",
    "skill",
    "कार्यक्रम",
    "प्रशिक्षण",
    "अभियान",
    "जागरूकता",
    "कौशल",
    "प्रोत्साहन कार्यक्रम",
    "शिविर",
];

const SCHEME_HINTS: [&str; 19] = [
    "scheme",
    "yojana",
    "mission",
    "plan",
    "assistance",
    "subsidy",
    "pension",
    "insurance",
    "housing",
    "employment",
    "loan",
    "योजना",
    "आवास",
    "पेंशन",
    "वृद्धावस्था",
    "कल्याण",
    "लाभ",
    "अनुदान",
    "बीमा",
];

/// Resolve a row's type: an explicit `type` field wins, then programme
/// keyword hints, then scheme hints; the default leans scheme.
pub fn normalize_type(scheme: &Scheme) -> ServiceType {
    if let Some(raw) = &scheme.service_type {
        if let Ok(t) = raw.trim().parse() {
            return t;
        }
    }

    let blob = [
        scheme.name_en.as_deref(),
        scheme.description_en.as_deref(),
        scheme.name_hi.as_deref(),
        scheme.description_hi.as_deref(),
        scheme.category.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    if PROGRAMME_HINTS.iter().any(|k| blob.contains(k)) {
        return ServiceType::Programme;
    }
    if SCHEME_HINTS.iter().any(|k| blob.contains(k)) {
        return ServiceType::Scheme;
    }
    ServiceType::Scheme
}

/// Conjunction of the four finder filters; empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Case-insensitive substring over names and descriptions (hi + en).
    pub query: Option<String>,
    /// Exact (trimmed) category match.
    pub category: Option<String>,
    /// Exact (trimmed) department match.
    pub department: Option<String>,
    pub service_type: Option<ServiceType>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.category.is_none()
            && self.department.is_none()
            && self.service_type.is_none()
    }

    pub fn apply<'a>(&self, schemes: &'a [Scheme]) -> Vec<&'a Scheme> {
        let query = self
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        schemes
            .iter()
            .filter(|s| {
                let match_query = match &query {
                    None => true,
                    Some(q) => [
                        s.name_hi.as_deref(),
                        s.name_en.as_deref(),
                        s.description_hi.as_deref(),
                        s.description_en.as_deref(),
                    ]
                    .into_iter()
                    .flatten()
                    .any(|t| t.to_lowercase().contains(q)),
                };
                let match_category = self
                    .category
                    .as_deref()
                    .map_or(true, |c| s.category.as_deref().map(str::trim) == Some(c));
                let match_department = self
                    .department
                    .as_deref()
                    .map_or(true, |d| s.department.as_deref().map(str::trim) == Some(d));
                let match_type = self
                    .service_type
                    .map_or(true, |t| normalize_type(s) == t);
                match_query && match_category && match_department && match_type
            })
            .collect()
    }
}

/// Sorted distinct categories, for the filter dropdown/listing.
pub fn categories(schemes: &[Scheme]) -> Vec<String> {
    distinct(schemes.iter().filter_map(|s| s.category.as_deref()))
}

/// Sorted distinct departments.
pub fn departments(schemes: &[Scheme]) -> Vec<String> {
    distinct(schemes.iter().filter_map(|s| s.department.as_deref()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The dataset compiled into the binary.
pub fn bundled() -> Result<Vec<Scheme>> {
    serde_json::from_str(BUNDLED_DATASET).context("parsing bundled scheme dataset")
}

/// Load a dataset from a JSON file (same row shape as the bundled one).
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<Scheme>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scheme dataset from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing scheme dataset from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme(name_en: &str, category: &str, department: &str, typ: Option<&str>) -> Scheme {
        Scheme {
            name_en: Some(name_en.to_string()),
            category: Some(category.to_string()),
            department: Some(department.to_string()),
            service_type: typ.map(String::from),
            ..Scheme::default()
        }
    }

    #[test]
    fn explicit_type_field_wins() {
        let s = scheme("Skill Training Drive", "Employment", "X", Some("scheme"));
        assert_eq!(normalize_type(&s), ServiceType::Scheme);
        let p = scheme("Pension Top-up", "Pension", "X", Some("programmes"));
        assert_eq!(normalize_type(&p), ServiceType::Programme);
    }

    #[test]
    fn programme_hints_beat_scheme_hints() {
        let s = scheme("Pension Awareness Campaign", "Pension", "X", None);
        assert_eq!(normalize_type(&s), ServiceType::Programme);
    }

    #[test]
    fn hindi_hints_are_detected() {
        let s = Scheme {
            name_hi: Some("कौशल प्रशिक्षण".to_string()),
            ..Scheme::default()
        };
        assert_eq!(normalize_type(&s), ServiceType::Programme);
        let s = Scheme {
            name_hi: Some("वृद्धावस्था पेंशन योजना".to_string()),
            ..Scheme::default()
        };
        assert_eq!(normalize_type(&s), ServiceType::Scheme);
    }

    #[test]
    fn unhinted_rows_default_to_scheme() {
        let s = scheme("Gram Sachiv Directory", "Misc", "X", None);
        assert_eq!(normalize_type(&s), ServiceType::Scheme);
    }

    #[test]
    fn filters_are_conjunctive() {
        let data = vec![
            scheme("Old Age Pension Scheme", "Pension", "Samaj Kalyan", Some("scheme")),
            scheme("Widow Pension Scheme", "Pension", "Mahila Kalyan", Some("scheme")),
            scheme("Sanitation Awareness Programme", "Health", "Panchayati Raj", None),
        ];

        let filter = Filter {
            query: Some("pension".to_string()),
            department: Some("Mahila Kalyan".to_string()),
            ..Filter::default()
        };
        let hits = filter.apply(&data);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name_en.as_deref(), Some("Widow Pension Scheme"));

        let filter = Filter {
            service_type: Some(ServiceType::Programme),
            ..Filter::default()
        };
        assert_eq!(filter.apply(&data).len(), 1);

        assert_eq!(Filter::default().apply(&data).len(), 3);
    }

    #[test]
    fn query_matches_hindi_fields() {
        let data = vec![Scheme {
            name_hi: Some("विधवा पेंशन योजना".to_string()),
            ..Scheme::default()
        }];
        let filter = Filter {
            query: Some("विधवा".to_string()),
            ..Filter::default()
        };
        assert_eq!(filter.apply(&data).len(), 1);
    }

    #[test]
    fn distinct_values_are_sorted_and_trimmed() {
        let data = vec![
            scheme("A", "Pension ", "Z Dept", None),
            scheme("B", "Education", "A Dept", None),
            scheme("C", "Pension", "Z Dept", None),
        ];
        assert_eq!(categories(&data), vec!["Education", "Pension"]);
        assert_eq!(departments(&data), vec!["A Dept", "Z Dept"]);
    }

    #[test]
    fn bundled_dataset_parses() {
        let data = bundled().unwrap();
        assert!(data.len() >= 10);
        assert!(!categories(&data).is_empty());
        assert!(!departments(&data).is_empty());
    }
}
