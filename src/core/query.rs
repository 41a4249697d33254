//! Query string parsing
//!
//! Turns the raw query parameters of a list/read request into a typed
//! [`ResourceQuery`]. The canonical wire encoding is:
//!
//! ```text
//! GET /roles?fields=name,description
//!           &sort=name,-createdAt
//!           &filters=name!=root,permissions[users:read,users:write]
//!           &embed=permissions
//!           &page=2&size=10
//! ```
//!
//! Alternate shapes (`sort[name]=desc`, repeated `filters=`,
//! `filters[name]=A`, repeated `fields=`) are normalized to the same value.

use crate::core::error::ValidationError;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Fields rendered when a request does not ask for specific ones
pub const DEFAULT_FIELDS: &[&str] = &["id", "name", "createdAt", "updatedAt", "href"];

/// Default page size
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// Default upper bound for `size`
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

// =============================================================================
// Raw query
// =============================================================================

/// A single raw query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// `key=value`
    Single(String),
    /// `key=a&key=b`
    List(Vec<String>),
    /// `key[sub]=value`
    Map(IndexMap<String, String>),
}

impl RawValue {
    fn items(&self) -> Vec<&str> {
        match self {
            RawValue::Single(s) => vec![s.as_str()],
            RawValue::List(items) => items.iter().map(String::as_str).collect(),
            RawValue::Map(_) => Vec::new(),
        }
    }
}

/// Raw query parameters as sent by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
    params: IndexMap<String, RawValue>,
}

impl RawQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an URL query string (without the leading `?`)
    pub fn from_query_str(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Add one `key=value` pair, folding repeats and bracketed keys
    pub fn push(&mut self, key: &str, value: &str) {
        if let Some((base, sub)) = split_bracket_key(key) {
            let entry = self
                .params
                .entry(base.to_string())
                .or_insert_with(|| RawValue::Map(IndexMap::new()));
            if !matches!(entry, RawValue::Map(_)) {
                *entry = RawValue::Map(IndexMap::new());
            }
            if let RawValue::Map(map) = entry {
                map.insert(sub.to_string(), value.to_string());
            }
            return;
        }

        let Some(entry) = self.params.get_mut(key) else {
            self.params
                .insert(key.to_string(), RawValue::Single(value.to_string()));
            return;
        };

        match entry {
            RawValue::Single(existing) => {
                let first = std::mem::take(existing);
                *entry = RawValue::List(vec![first, value.to_string()]);
            }
            RawValue::List(items) => items.push(value.to_string()),
            // a plain value does not override a bracketed mapping
            RawValue::Map(_) => {}
        }
    }

    /// Insert a value, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, value: RawValue) {
        self.params.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.params.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl FromIterator<(String, String)> for RawQuery {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut raw = RawQuery::new();
        for (key, value) in iter {
            raw.push(&key, &value);
        }
        raw
    }
}

fn split_bracket_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let inner = key[open + 1..].strip_suffix(']')?;
    if open == 0 || inner.is_empty() {
        return None;
    }
    Some((&key[..open], inner))
}

// =============================================================================
// Typed query
// =============================================================================

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `field==value`
    Equals,
    /// `field!=value`
    NotEquals,
    /// `field~value`
    Contains,
    /// `field!~value`
    NotContains,
    /// `field[a,b]`
    In,
    /// `field]a,b[`
    NotIn,
}

/// One `field <op> value` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    /// One value for scalar operators, the whole set for `In`/`NotIn`
    pub values: Vec<String>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (starts at 1)
    pub page: usize,
    /// Number of items per page
    pub size: usize,
}

impl Pagination {
    /// Number of documents to skip
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A typed, immutable query for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub filters: Vec<FilterClause>,
    pub sort: Vec<SortKey>,
    pub fields: BTreeSet<String>,
    /// Flattened dotted paths (`role.name`), sorted and deduplicated
    pub embed: BTreeSet<String>,
    pub pagination: Pagination,
    /// The client sent `fields`
    pub fields_requested: bool,
    /// The client sent `embed`
    pub embed_requested: bool,
}

impl ResourceQuery {
    /// Root segments of the embed paths (`role` for `role.name`)
    pub fn embed_roots(&self) -> BTreeSet<&str> {
        self.embed
            .iter()
            .map(|path| path.split('.').next().unwrap_or(path))
            .collect()
    }

    /// Sub-fields requested for one embed root
    pub fn embed_fields(&self, root: &str) -> BTreeSet<String> {
        self.embed
            .iter()
            .filter_map(|path| path.strip_prefix(root)?.strip_prefix('.'))
            .map(str::to_string)
            .collect()
    }
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: Vec::new(),
            fields: default_fields(),
            embed: BTreeSet::new(),
            pagination: Pagination::default(),
            fields_requested: false,
            embed_requested: false,
        }
    }
}

/// The default field set
pub fn default_fields() -> BTreeSet<String> {
    DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
}

// =============================================================================
// Parser
// =============================================================================

/// Turns a [`RawQuery`] into a [`ResourceQuery`]
#[derive(Debug, Clone)]
pub struct QueryParser {
    default_page_size: usize,
    max_page_size: usize,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_MAX_PAGE_SIZE)
    }
}

impl QueryParser {
    pub fn new(default_page_size: usize, max_page_size: usize) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            default_page_size: default_page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    /// Parse the raw parameters
    pub fn parse(&self, raw: &RawQuery) -> Result<ResourceQuery, ValidationError> {
        let mut query = ResourceQuery {
            pagination: Pagination {
                page: 1,
                size: self.default_page_size,
            },
            ..ResourceQuery::default()
        };

        if let Some(value) = raw.get("fields") {
            query.fields = parse_fields(value)?;
            query.fields_requested = true;
        }
        if let Some(value) = raw.get("filters") {
            query.filters = parse_filters_value(value)?;
        }
        if let Some(value) = raw.get("sort") {
            query.sort = parse_sort(value)?;
        }
        if let Some(value) = raw.get("embed") {
            query.embed = parse_embed(value)?;
            query.embed_requested = true;
            let roots: Vec<String> = query.embed_roots().into_iter().map(String::from).collect();
            query.fields.extend(roots);
        }

        if let Some(page) = raw.get("page").and_then(positive_int) {
            query.pagination.page = page;
        }
        if let Some(size) = raw.get("size").and_then(positive_int) {
            query.pagination.size = size.min(self.max_page_size);
        }

        tracing::debug!(?query, "parsed resource query");
        Ok(query)
    }
}

fn positive_int(value: &RawValue) -> Option<usize> {
    match value {
        RawValue::Single(s) => s.trim().parse::<usize>().ok().filter(|n| *n >= 1),
        _ => None,
    }
}

fn comma_items(value: &RawValue) -> Vec<String> {
    value
        .items()
        .into_iter()
        .flat_map(|item| item.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty() && *item != "-")
        .map(str::to_string)
        .collect()
}

fn parse_fields(value: &RawValue) -> Result<BTreeSet<String>, ValidationError> {
    if let RawValue::Map(_) = value {
        return Err(ValidationError::query(
            "fields",
            "",
            "fields must be a comma-separated list of field names",
        ));
    }
    Ok(comma_items(value).into_iter().collect())
}

fn parse_embed(value: &RawValue) -> Result<BTreeSet<String>, ValidationError> {
    if let RawValue::Map(_) = value {
        return Err(ValidationError::query(
            "embed",
            "",
            "embed must be a comma-separated list of paths",
        ));
    }

    let mut paths = BTreeSet::new();
    for path in comma_items(value) {
        if path.split('.').any(str::is_empty) {
            return Err(ValidationError::query(
                "embed",
                &path,
                format!("'{}' is not a valid embed path", path),
            ));
        }
        if path.contains('.') {
            paths.insert(path);
        } else {
            paths.extend(DEFAULT_FIELDS.iter().map(|f| format!("{}.{}", path, f)));
        }
    }
    Ok(paths)
}

fn parse_sort(value: &RawValue) -> Result<Vec<SortKey>, ValidationError> {
    if let RawValue::Map(map) = value {
        return map
            .iter()
            .map(|(field, direction)| {
                let direction = match direction.trim().to_ascii_lowercase().as_str() {
                    "asc" | "1" => SortDirection::Asc,
                    "desc" | "-1" => SortDirection::Desc,
                    other => {
                        return Err(ValidationError::query(
                            "sort",
                            other,
                            format!("Sort direction for '{}' must be asc or desc", field),
                        ));
                    }
                };
                Ok(SortKey {
                    field: field.clone(),
                    direction,
                })
            })
            .collect();
    }

    Ok(comma_items(value)
        .into_iter()
        .map(|item| match item.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                direction: SortDirection::Desc,
            },
            None => SortKey {
                field: item.strip_prefix('+').unwrap_or(&item).to_string(),
                direction: SortDirection::Asc,
            },
        })
        .collect())
}

fn parse_filters_value(value: &RawValue) -> Result<Vec<FilterClause>, ValidationError> {
    match value {
        RawValue::Map(map) => Ok(map
            .iter()
            .map(|(field, value)| FilterClause {
                field: field.clone(),
                op: FilterOp::Equals,
                values: vec![value.clone()],
            })
            .collect()),
        other => {
            let mut clauses = Vec::new();
            for expr in other.items() {
                clauses.extend(parse_filters(expr)?);
            }
            Ok(clauses)
        }
    }
}

/// Parse `field<op>value[,field<op>value...]`
pub fn parse_filters(expr: &str) -> Result<Vec<FilterClause>, ValidationError> {
    let chars: Vec<char> = expr.chars().collect();
    let malformed = |message: String| ValidationError::query("filters", expr, message);

    let mut clauses = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let start = pos;
        while pos < chars.len() && !matches!(chars[pos], '=' | '!' | '~' | '[' | ']' | ',') {
            pos += 1;
        }
        let field: String = chars[start..pos].iter().collect::<String>().trim().to_string();
        if field.is_empty() {
            return Err(malformed(format!("Missing field name at position {}", start)));
        }
        if pos >= chars.len() || chars[pos] == ',' {
            return Err(malformed(format!("Missing operator after '{}'", field)));
        }

        let (op, values) = match (chars[pos], chars.get(pos + 1)) {
            ('=', Some('=')) => {
                pos += 2;
                (FilterOp::Equals, vec![take_scalar(&chars, &mut pos)])
            }
            ('!', Some('=')) => {
                pos += 2;
                (FilterOp::NotEquals, vec![take_scalar(&chars, &mut pos)])
            }
            ('!', Some('~')) => {
                pos += 2;
                (FilterOp::NotContains, vec![take_scalar(&chars, &mut pos)])
            }
            ('~', _) => {
                pos += 1;
                (FilterOp::Contains, vec![take_scalar(&chars, &mut pos)])
            }
            ('[', _) => (FilterOp::In, take_set(&chars, &mut pos, ']', &field, expr)?),
            (']', _) => (FilterOp::NotIn, take_set(&chars, &mut pos, '[', &field, expr)?),
            (c, _) => {
                return Err(malformed(format!(
                    "Unknown operator starting with '{}' after '{}'",
                    c, field
                )));
            }
        };

        clauses.push(FilterClause { field, op, values });

        if pos < chars.len() {
            if chars[pos] != ',' {
                return Err(malformed(format!("Unexpected '{}' at position {}", chars[pos], pos)));
            }
            pos += 1;
            if pos == chars.len() {
                return Err(malformed("Trailing comma".to_string()));
            }
        }
    }

    Ok(clauses)
}

fn take_scalar(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && chars[*pos] != ',' {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn take_set(
    chars: &[char],
    pos: &mut usize,
    close: char,
    field: &str,
    expr: &str,
) -> Result<Vec<String>, ValidationError> {
    let open = *pos;
    let Some(offset) = chars[open + 1..].iter().position(|c| *c == close) else {
        return Err(ValidationError::query(
            "filters",
            expr,
            format!("Unterminated value set for '{}'", field),
        ));
    };
    let end = open + 1 + offset;
    let inner: String = chars[open + 1..end].iter().collect();
    *pos = end + 1;

    let values: Vec<String> = inner
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        return Err(ValidationError::query(
            "filters",
            expr,
            format!("Empty value set for '{}'", field),
        ));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> ResourceQuery {
        QueryParser::default()
            .parse(&RawQuery::from_query_str(query))
            .unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let query = parse("");
        assert_eq!(query.fields, set(DEFAULT_FIELDS));
        assert_eq!(query.pagination, Pagination { page: 1, size: 30 });
        assert!(query.filters.is_empty());
        assert!(query.sort.is_empty());
        assert!(!query.fields_requested);
    }

    #[test]
    fn test_fields_replace_defaults() {
        let query = parse("fields=name,description");
        assert_eq!(query.fields, set(&["name", "description"]));
        assert!(query.fields_requested);

        let repeated = parse("fields=name&fields=builtIn");
        assert_eq!(repeated.fields, set(&["name", "builtIn"]));
    }

    #[test]
    fn test_invalid_pagination_falls_back_to_defaults() {
        let query = parse("page=0&size=abc");
        assert_eq!(query.pagination, Pagination { page: 1, size: 30 });

        let query = parse("page=3&size=5");
        assert_eq!(query.pagination, Pagination { page: 3, size: 5 });
        assert_eq!(query.pagination.offset(), 10);
    }

    #[test]
    fn test_size_is_capped() {
        let query = QueryParser::new(30, 50)
            .parse(&RawQuery::from_query_str("size=500"))
            .unwrap();
        assert_eq!(query.pagination.size, 50);
    }

    #[test]
    fn test_filter_operators() {
        let clauses =
            parse_filters("name==A,name!=B,description~adm,description!~x,name[A,B],name]C,D[")
                .unwrap();
        let ops: Vec<FilterOp> = clauses.iter().map(|c| c.op).collect();
        assert_eq!(
            ops,
            vec![
                FilterOp::Equals,
                FilterOp::NotEquals,
                FilterOp::Contains,
                FilterOp::NotContains,
                FilterOp::In,
                FilterOp::NotIn,
            ]
        );
        assert_eq!(clauses[4].values, vec!["A", "B"]);
        assert_eq!(clauses[5].values, vec!["C", "D"]);
        assert_eq!(clauses[2].values, vec!["adm"]);
    }

    #[test]
    fn test_malformed_filters() {
        for expr in [
            "name",
            "==A",
            "name=A",
            "name[A,B",
            "name[]",
            "name==A,",
            "name[A]x",
            "name>3",
        ] {
            let err = parse_filters(expr).unwrap_err();
            assert_eq!(err.errors[0].field, "filters", "{}", expr);
        }
    }

    #[test]
    fn test_filters_map_shape_means_equality() {
        let query = parse("filters[name]=A");
        assert_eq!(
            query.filters,
            vec![FilterClause {
                field: "name".to_string(),
                op: FilterOp::Equals,
                values: vec!["A".to_string()],
            }]
        );
    }

    #[test]
    fn test_sort_list_and_map_shapes() {
        let query = parse("sort=name,-createdAt");
        assert_eq!(query.sort[0].direction, SortDirection::Asc);
        assert_eq!(query.sort[1].field, "createdAt");
        assert_eq!(query.sort[1].direction, SortDirection::Desc);

        let query = parse("sort[name]=desc&sort[createdAt]=asc");
        assert_eq!(query.sort[0].field, "name");
        assert_eq!(query.sort[0].direction, SortDirection::Desc);
        assert_eq!(query.sort[1].direction, SortDirection::Asc);

        let raw = RawQuery::from_query_str("sort[name]=sideways");
        assert!(QueryParser::default().parse(&raw).is_err());
    }

    #[test]
    fn test_embed_expands_default_fields_and_keeps_root() {
        let query = parse("embed=role&fields=username");
        assert!(query.embed.contains("role.name"));
        assert!(query.embed.contains("role.href"));
        assert_eq!(query.embed.len(), DEFAULT_FIELDS.len());
        assert_eq!(query.fields, set(&["username", "role"]));
        assert_eq!(query.embed_roots(), BTreeSet::from(["role"]));
        assert_eq!(
            query.embed_fields("role"),
            set(&["id", "name", "createdAt", "updatedAt", "href"])
        );
    }

    #[test]
    fn test_embed_paths_sorted_and_deduplicated() {
        let query = parse("embed=permissions.name,permissions.name,permissions.id");
        let paths: Vec<&str> = query.embed.iter().map(String::as_str).collect();
        assert_eq!(paths, vec!["permissions.id", "permissions.name"]);
        assert!(query.fields.contains("permissions"));
    }

    #[test]
    fn test_raw_input_is_not_mutated() {
        let raw = RawQuery::from_query_str("embed=role");
        let before = raw.clone();
        QueryParser::default().parse(&raw).unwrap();
        assert_eq!(raw, before);
    }
}
