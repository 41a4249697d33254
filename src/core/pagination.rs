//! Pagination link generation
//!
//! Computes first/previous/next/last navigation links for a list
//! response by rewriting the `page` parameter of the request URL.

use crate::core::query::Pagination;
use url::Url;

/// Navigation links; a key is present only when it applies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub first: Option<Url>,
    pub previous: Option<Url>,
    pub next: Option<Url>,
    pub last: Option<Url>,
}

impl PageLinks {
    /// Whether no link applies
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Present links in `first, previous, next, last` order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Url)> {
        [
            ("first", &self.first),
            ("previous", &self.previous),
            ("next", &self.next),
            ("last", &self.last),
        ]
        .into_iter()
        .filter_map(|(rel, url)| url.as_ref().map(|u| (rel, u)))
    }

    /// Render as an HTTP `Link` header value
    ///
    /// `<url>; rel="first", <url>; rel="previous", ...`
    pub fn to_header_value(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(
            self.iter()
                .map(|(rel, url)| format!("<{}>; rel=\"{}\"", url, rel))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Builds [`PageLinks`]
pub struct Paginator;

impl Paginator {
    /// Number of pages for `all_count` documents
    pub fn last_page(all_count: usize, size: usize) -> usize {
        all_count.div_ceil(size.max(1))
    }

    /// Compute the links for the current page
    ///
    /// - `first`/`previous` when `page > 1`
    /// - `next`/`last` when `page < lastPage`
    pub fn links(all_count: usize, pagination: Pagination, current: &Url) -> PageLinks {
        let page = pagination.page.max(1);
        let last_page = Self::last_page(all_count, pagination.size);

        let mut links = PageLinks::default();
        if page > 1 {
            links.first = Some(with_page(current, 1));
            links.previous = Some(with_page(current, page - 1));
        }
        if page < last_page {
            links.next = Some(with_page(current, page + 1));
            links.last = Some(with_page(current, last_page));
        }
        links
    }
}

/// Rewrite (or append) the `page` parameter, preserving every other
/// parameter and its position
fn with_page(current: &Url, page: usize) -> Url {
    let mut pairs: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let position = current
        .query_pairs()
        .position(|(key, _)| key == "page")
        .unwrap_or(pairs.len())
        .min(pairs.len());
    pairs.insert(position, ("page".to_string(), page.to_string()));

    let mut url = current.clone();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}
