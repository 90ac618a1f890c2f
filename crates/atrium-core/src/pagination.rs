//! Page-based pagination for list endpoints.
//!
//! List endpoints accept `page`, `limit` and an optional `search` text and answer
//! with a [`Paginated`] envelope:
//!
//! ```json
//! {
//!   "items": [...],
//!   "total": 42,
//!   "page": 2,
//!   "limit": 10,
//!   "pageCount": 5
//! }
//! ```
//!
//! - `limit` is clamped to [1, 100] and defaults to 10
//! - `page` is 1-indexed and clamped to a minimum of 1; pages past the end are
//!   empty
//! - a blank `search` is treated as absent

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Deserializes an optional string into an optional i64.
///
/// Handles the case where query parameters may be empty strings,
/// which should be treated as `None`.
fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Query parameters shared by every list endpoint.
#[derive(Debug, Clone, Default, Hash, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed, default: 1)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    /// Items per page (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
    /// Case-insensitive substring matched against name and description
    #[serde(default)]
    pub search: Option<String>,
}

impl PaginationParams {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Returns the effective limit, clamped to [1, 100].
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Rows to skip. Saturates at `i64::MAX` for page numbers past any real
    /// result set.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// The trimmed search text, or `None` when blank.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Total number of matching items across all pages
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub page_count: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PaginationParams) -> Self {
        let limit = params.limit();
        Self {
            items,
            total,
            page: params.page(),
            limit,
            page_count: page_count(total, limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            page_count: self.page_count,
        }
    }
}

fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 10);
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.search(), None);
    }

    #[test]
    fn test_limit_boundary_cases() {
        let test_cases = vec![
            (Some(1), 1),
            (Some(50), 50),
            (Some(100), 100),
            (Some(101), 100),
            (Some(0), 1),
            (Some(-1), 1),
            (None, 10),
        ];

        for (input, expected) in test_cases {
            let params = PaginationParams {
                limit: input,
                ..Default::default()
            };
            assert_eq!(params.limit(), expected);
        }
    }

    #[test]
    fn test_offset_from_page() {
        let params = PaginationParams::new(3, 20);
        assert_eq!(params.offset(), 40);

        let params = PaginationParams::new(0, 20);
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let params = PaginationParams::new(i64::MAX, 100);
        assert_eq!(params.page(), i64::MAX);
        assert_eq!(params.offset(), i64::MAX);

        let params = PaginationParams::new(i64::MAX, 1);
        assert_eq!(params.offset(), i64::MAX - 1);

        let params = PaginationParams::new(i64::MIN, 10);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_blank_search_is_none() {
        let params = PaginationParams::default().with_search("   ");
        assert_eq!(params.search(), None);

        let params = PaginationParams::default().with_search(" blog ");
        assert_eq!(params.search(), Some("blog"));
    }

    #[test]
    fn test_deserialize_empty_strings() {
        let json = r#"{"limit":"","page":""}"#;
        let params: PaginationParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.limit(), 10);
        assert_eq!(params.page(), 1);
    }

    #[test]
    fn test_deserialize_with_values() {
        let json = r#"{"limit":"25","page":"2","search":"edit"}"#;
        let params: PaginationParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.limit(), 25);
        assert_eq!(params.offset(), 25);
        assert_eq!(params.search(), Some("edit"));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(100, 1), 100);
    }

    #[test]
    fn test_paginated_serializes_camel_case() {
        let page = Paginated::new(vec!["a", "b"], 12, &PaginationParams::new(2, 5));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["total"], 12);
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 5);
        assert_eq!(json["pageCount"], 3);
        assert_eq!(json["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_paginated_map_keeps_meta() {
        let page = Paginated::new(vec![1, 2], 2, &PaginationParams::default()).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.page_count, 1);
    }
}
