// Pagination - defaults and sort parsing for collection queries

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 30;
pub const DEFAULT_SORT: &str = "id";

/// Marks a descending sort when it prefixes the field name, e.g. `-store`.
pub const DESCENDING_MARKER: char = '-';

/// A partially specified pagination request, as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRequest {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
    #[serde(default)]
    pub sort: Option<String>,
}

impl PaginationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: i64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `1` or `-1`, as the store expects it.
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parse `field` or `-field`.
    pub fn parse(sort: &str) -> Self {
        match sort.strip_prefix(DESCENDING_MARKER) {
            Some(rest) => SortSpec::descending(rest.trim_start_matches(DESCENDING_MARKER)),
            None => SortSpec::ascending(sort),
        }
    }

    /// `{field: ±1}`
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(self.field.clone(), self.direction.as_i32().into());
        serde_json::Value::Object(map)
    }
}

/// Fully resolved pagination. Values are not bounds-checked; a zero or
/// negative `per_page` is left for the store to interpret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub sort: SortSpec,
}

impl Pagination {
    /// Number of documents to skip: `per_page * (page - 1)`.
    pub fn skip(&self) -> i64 {
        self.per_page.saturating_mul(self.page.saturating_sub(1))
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        validate_pagination(&PaginationRequest::default())
    }
}

/// Fill in the missing parts of a pagination request.
///
/// Defaults: page 1, 30 per page, ascending on `id`. An empty sort string is
/// treated as missing.
pub fn validate_pagination(request: &PaginationRequest) -> Pagination {
    let sort = request
        .sort
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SORT);

    Pagination {
        page: request.page.unwrap_or(DEFAULT_PAGE),
        per_page: request.per_page.unwrap_or(DEFAULT_PER_PAGE),
        sort: SortSpec::parse(sort),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let pagination = validate_pagination(&PaginationRequest::new());
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.per_page, 30);
        assert_eq!(pagination.sort, SortSpec::ascending("id"));
    }

    #[test]
    fn test_descending_sort() {
        let pagination = validate_pagination(&PaginationRequest::new().sort("-store"));
        assert_eq!(pagination.sort, SortSpec::descending("store"));
        assert_eq!(pagination.page, DEFAULT_PAGE);
        assert_eq!(pagination.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_explicit_values_pass_through() {
        let pagination = validate_pagination(
            &PaginationRequest::new().page(2).per_page(10).sort("store"),
        );
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.per_page, 10);
        assert_eq!(pagination.sort, SortSpec::ascending("store"));
        assert_eq!(pagination.skip(), 10);
        assert_eq!(pagination.limit(), 10);
    }

    #[test]
    fn test_no_bounds_checking() {
        let pagination = validate_pagination(&PaginationRequest::new().page(0).per_page(-5));
        assert_eq!(pagination.page, 0);
        assert_eq!(pagination.per_page, -5);
        assert_eq!(pagination.skip(), 5);
    }

    #[test]
    fn test_empty_sort_uses_default() {
        let pagination = validate_pagination(&PaginationRequest::new().sort(""));
        assert_eq!(pagination.sort, SortSpec::ascending("id"));
    }

    #[test]
    fn test_repeated_descending_markers() {
        assert_eq!(SortSpec::parse("--store"), SortSpec::descending("store"));
    }

    #[test]
    fn test_sort_json() {
        assert_eq!(
            SortSpec::descending("store").to_json(),
            serde_json::json!({ "store": -1 })
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: PaginationRequest =
            serde_json::from_str(r#"{"page": 2, "sort": "-store"}"#).unwrap();
        assert_eq!(request.page, Some(2));
        assert_eq!(request.per_page, None);
    }
}
