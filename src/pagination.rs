//! Pagination query parameters and paged responses.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::request::Request;

/// Upper bound for [`PaginationParams::limit`].
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the query carries no `itemsPerPage`.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub const PAGE_KEY: &str = "pageNumber";
pub const LIMIT_KEY: &str = "itemsPerPage";
pub const SEARCH_KEY: &str = "search";
pub const SORT_BY_KEY: &str = "sortBy";
pub const SORT_ORDER_KEY: &str = "sortOrder";

/// Paging, sorting and filtering parameters read from a query string.
///
/// Keys other than the five reserved ones are collected into
/// [`filters`](Self::filters), e.g. `?isActive=true&tag=a&tag=b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaginationParams {
    /// 1-based page number; never below 1.
    pub page: u32,
    /// Items per page, `0..=MAX_PAGE_SIZE`.
    pub limit: u32,
    pub search: String,
    pub sort_by: String,
    pub sort_order: String,
    pub filters: BTreeMap<String, Vec<String>>,
}

impl PaginationParams {
    /// Reads the parameters from `req`'s query string.
    ///
    /// An unparsable `pageNumber` becomes page 1. An unparsable
    /// `itemsPerPage` becomes 0; an absent one becomes
    /// [`DEFAULT_PAGE_SIZE`]. For repeated reserved keys the first value wins.
    pub fn from_request(req: &Request, default_sort_by: &str, default_sort_order: &str) -> Self {
        Self::from_query(req.query().unwrap_or_default(), default_sort_by, default_sort_order)
    }

    pub fn from_query(query: &str, default_sort_by: &str, default_sort_order: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_else(|e| {
            tracing::debug!(query, error = %e, "unparsable pagination query");
            Vec::new()
        });

        let mut params = Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: String::new(),
            sort_by: default_sort_by.to_owned(),
            sort_order: default_sort_order.to_owned(),
            filters: BTreeMap::new(),
        };

        let first = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

        if let Some(page) = first(PAGE_KEY) {
            params.page = page.trim().parse::<i64>().unwrap_or(0).clamp(1, i64::from(u32::MAX)) as u32;
        }
        if let Some(limit) = first(LIMIT_KEY) {
            params.limit = limit.trim().parse::<i64>().unwrap_or(0).clamp(0, i64::from(MAX_PAGE_SIZE)) as u32;
        }
        if let Some(search) = first(SEARCH_KEY) {
            params.search = search.to_owned();
        }
        if let Some(sort_by) = first(SORT_BY_KEY) {
            params.sort_by = sort_by.to_owned();
        }
        if let Some(sort_order) = first(SORT_ORDER_KEY) {
            params.sort_order = sort_order.to_owned();
        }

        for (key, value) in pairs.iter() {
            if [PAGE_KEY, LIMIT_KEY, SEARCH_KEY, SORT_BY_KEY, SORT_ORDER_KEY].contains(&key.as_str()) {
                continue;
            }
            params.filters.entry(key.clone()).or_default().push(value.clone());
        }

        params
    }

    /// Number of items to skip for the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Pages needed to show `total_items` at `limit` per page.
/// A limit of 0 counts as 1.
pub fn count_total_pages(limit: u32, total_items: u64) -> u64 {
    total_items.div_ceil(u64::from(limit.max(1)))
}

/// The `data` of a paginated response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub items_per_page: u32,
    pub page_number: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Builds a page for `params`, deriving the page count from `total_items`.
    pub fn new(items: Vec<T>, params: &PaginationParams, total_items: u64) -> Self {
        Self {
            items,
            items_per_page: params.limit,
            page_number: params.page,
            total_items,
            total_pages: count_total_pages(params.limit, total_items),
        }
    }
}
