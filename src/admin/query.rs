//! Turns list request parameters into SQL.
//!
//! A [`ListQuery`] renders one page of rows, while its [`FilteredQuery`]
//! renders unbounded queries (count, sum, export) over the very same
//! [`Predicate`]. Both render it through the same `push_from_where`, so what
//! is listed and what is aggregated cannot drift apart.

use sqlx::{Postgres, QueryBuilder};
use url::form_urlencoded;

use crate::admin::schema::{ColumnKind, ListSchema};

const FILTER_PREFIX: &str = "flt_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
}

impl FilterOp {
    pub fn parse(s: &str) -> Option<FilterOp> {
        match s {
            "eq" => Some(FilterOp::Eq),
            "ne" => Some(FilterOp::Ne),
            "gt" => Some(FilterOp::Gt),
            "lt" => Some(FilterOp::Lt),
            "ge" => Some(FilterOp::Ge),
            "le" => Some(FilterOp::Le),
            "contains" => Some(FilterOp::Contains),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Gt => "gt",
            FilterOp::Lt => "lt",
            FilterOp::Ge => "ge",
            FilterOp::Le => "le",
            FilterOp::Contains => "contains",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterOp::Eq => "equals",
            FilterOp::Ne => "not equal",
            FilterOp::Gt => "greater than",
            FilterOp::Lt => "smaller than",
            FilterOp::Ge => "at least",
            FilterOp::Le => "at most",
            FilterOp::Contains => "contains",
        }
    }

    /// Operators offered for a column of the given kind.
    pub fn for_kind(kind: ColumnKind) -> &'static [FilterOp] {
        match kind {
            ColumnKind::Integer => &[
                FilterOp::Eq,
                FilterOp::Ne,
                FilterOp::Gt,
                FilterOp::Lt,
                FilterOp::Ge,
                FilterOp::Le,
            ],
            ColumnKind::Text => &[FilterOp::Eq, FilterOp::Ne, FilterOp::Contains],
            ColumnKind::Boolean => &[FilterOp::Eq],
            ColumnKind::Timestamp | ColumnKind::TextList => &[],
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => " = ",
            FilterOp::Ne => " <> ",
            FilterOp::Gt => " > ",
            FilterOp::Lt => " < ",
            FilterOp::Ge => " >= ",
            FilterOp::Le => " <= ",
            FilterOp::Contains => " ILIKE ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Integer(i64),
    Text(String),
    Boolean(bool),
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Integer(v) => v.fmt(f),
            FilterValue::Text(v) => v.fmt(f),
            FilterValue::Boolean(v) => v.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    fn query_key(&self) -> String {
        format!("{}{}_{}", FILTER_PREFIX, self.column, self.op.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ListParamsError {
    #[error("{0} is not a valid page number")]
    InvalidPage(String),
    #[error("{value} is not a valid value for the {column} filter")]
    InvalidFilterValue { column: &'static str, value: String },
}

/// Search, filters, sort and page of a list request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub page: u32,
    pub search: Option<String>,
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
}

impl ListParams {
    /// Reads list parameters out of a query string's key/value pairs.
    ///
    /// Filters on undeclared columns, or with operators that do not apply to
    /// the column, are ignored. Empty values mean "no filter".
    pub fn parse(
        pairs: &[(String, String)],
        schema: &ListSchema,
    ) -> Result<ListParams, ListParamsError> {
        let mut params = ListParams::default();
        let mut sort_column = None;
        let mut descending = false;

        for (key, value) in pairs {
            match key.as_str() {
                "page" => {
                    params.page = value
                        .trim()
                        .parse()
                        .map_err(|_| ListParamsError::InvalidPage(value.clone()))?;
                }
                "search" => {
                    let value = value.trim();
                    if !value.is_empty() {
                        params.search = Some(value.to_string());
                    }
                }
                "sort" => {
                    sort_column = schema
                        .sortable
                        .iter()
                        .find(|c| **c == value.as_str())
                        .copied();
                }
                "desc" => descending = value == "1",
                key => {
                    if let Some(filter_key) = key.strip_prefix(FILTER_PREFIX) {
                        if let Some(filter) = parse_filter(filter_key, value, schema)? {
                            params.filters.push(filter);
                        }
                    }
                }
            }
        }

        params.sort = sort_column.map(|column| Sort { column, descending });

        Ok(params)
    }

    /// Query string reproducing these parameters on another page.
    pub fn to_query_string(&self, page: u32) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        serializer.append_pair("page", &page.to_string());
        if let Some(search) = &self.search {
            serializer.append_pair("search", search);
        }
        for filter in &self.filters {
            serializer.append_pair(&filter.query_key(), &filter.value.to_string());
        }
        if let Some(sort) = &self.sort {
            serializer.append_pair("sort", sort.column);
            if sort.descending {
                serializer.append_pair("desc", "1");
            }
        }

        serializer.finish()
    }

    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn parse_filter(
    filter_key: &str,
    value: &str,
    schema: &ListSchema,
) -> Result<Option<Filter>, ListParamsError> {
    let Some((column_name, op)) = filter_key.rsplit_once('_') else {
        tracing::warn!(filter = filter_key, "Ignoring malformed filter");
        return Ok(None);
    };

    let column = schema
        .filterable
        .iter()
        .find(|c| **c == column_name)
        .and_then(|c| schema.column(c));
    let op = FilterOp::parse(op);

    let (Some(column), Some(op)) = (column, op) else {
        tracing::warn!(filter = filter_key, "Ignoring unknown filter");
        return Ok(None);
    };
    if !FilterOp::for_kind(column.kind).contains(&op) {
        tracing::warn!(filter = filter_key, "Ignoring filter operator not valid for its column");
        return Ok(None);
    }

    let raw = value.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let invalid = || ListParamsError::InvalidFilterValue {
        column: column.name,
        value: value.to_string(),
    };
    let value = match column.kind {
        ColumnKind::Integer => FilterValue::Integer(raw.parse().map_err(|_| invalid())?),
        ColumnKind::Boolean => match raw {
            "1" | "true" | "yes" => FilterValue::Boolean(true),
            "0" | "false" | "no" => FilterValue::Boolean(false),
            _ => return Err(invalid()),
        },
        _ => FilterValue::Text(raw.to_string()),
    };

    Ok(Some(Filter {
        column: column.name,
        op,
        value,
    }))
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// The combined search + filter condition of a list request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    search_columns: Vec<&'static str>,
    search_terms: Vec<String>,
    filters: Vec<Filter>,
}

impl Predicate {
    pub fn new(schema: &ListSchema, params: &ListParams) -> Self {
        Self {
            search_columns: schema.searchable.to_vec(),
            search_terms: params.search_terms(),
            filters: params.filters.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        (self.search_terms.is_empty() || self.search_columns.is_empty()) && self.filters.is_empty()
    }

    /// Appends ` WHERE ...` when there is anything to restrict.
    pub fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if self.is_empty() {
            return;
        }

        qb.push(" WHERE ");
        let mut first = true;
        let mut and = |qb: &mut QueryBuilder<'static, Postgres>| {
            if !first {
                qb.push(" AND ");
            }
            first = false;
        };

        if !self.search_columns.is_empty() {
            // Every term must hit at least one searchable column.
            for term in &self.search_terms {
                and(qb);
                qb.push("(");
                let pattern = like_pattern(term);
                for (i, column) in self.search_columns.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
                }
                qb.push(")");
            }
        }

        for filter in &self.filters {
            and(qb);
            qb.push(filter.column).push(filter.op.sql());
            match (&filter.value, filter.op) {
                (FilterValue::Text(v), FilterOp::Contains) => qb.push_bind(like_pattern(v)),
                (FilterValue::Text(v), _) => qb.push_bind(v.clone()),
                (FilterValue::Integer(v), _) => qb.push_bind(*v),
                (FilterValue::Boolean(v), _) => qb.push_bind(*v),
            };
        }
    }
}

/// All rows of a table matching a predicate, without pagination.
#[derive(Debug, Clone)]
pub struct FilteredQuery {
    table: String,
    select: &'static str,
    predicate: Predicate,
}

impl FilteredQuery {
    pub fn new(schema: &ListSchema, predicate: Predicate) -> Self {
        Self {
            table: schema.quoted_table(),
            select: schema.select,
            predicate,
        }
    }

    fn push_from_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" FROM ").push(&self.table);
        self.predicate.push_where(qb);
    }

    /// Every matching row, ordered by primary key.
    pub fn rows(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.select);
        self.push_from_where(&mut qb);
        qb.push(" ORDER BY id");
        qb
    }

    pub fn ids(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT id");
        self.push_from_where(&mut qb);
        qb.push(" ORDER BY id");
        qb
    }

    pub fn count(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*)");
        self.push_from_where(&mut qb);
        qb
    }

    /// `SUM(column)` over the matching rows; an empty match sums to 0.
    pub fn sum(&self, column: &'static str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COALESCE(SUM(");
        qb.push(column).push("), 0)::BIGINT");
        self.push_from_where(&mut qb);
        qb
    }
}

/// A single row by primary key, with the listing's select list.
pub fn by_id(schema: &ListSchema, id: i32) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(schema.select)
        .push(" FROM ")
        .push(schema.quoted_table())
        .push(" WHERE id = ")
        .push_bind(id);
    qb
}

pub fn delete_by_id(schema: &ListSchema, id: i32) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("DELETE FROM ");
    qb.push(schema.quoted_table()).push(" WHERE id = ").push_bind(id);
    qb
}

/// One page of a filtered, sorted listing.
#[derive(Debug, Clone)]
pub struct ListQuery {
    filtered: FilteredQuery,
    sort: Option<Sort>,
    page: u32,
    page_size: u32,
}

impl ListQuery {
    pub fn new(schema: &ListSchema, params: &ListParams, page_size: u32) -> Self {
        Self {
            filtered: FilteredQuery::new(schema, Predicate::new(schema, params)),
            sort: params.sort,
            page: params.page,
            page_size: page_size.max(1),
        }
    }

    pub fn filtered(&self) -> &FilteredQuery {
        &self.filtered
    }

    pub fn page_count(&self, row_count: i64) -> u32 {
        let page_size = i64::from(self.page_size);
        u32::try_from((row_count.max(0) + page_size - 1) / page_size).unwrap_or(u32::MAX)
    }

    pub fn page_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.filtered.select);
        self.filtered.push_from_where(&mut qb);

        // The primary key always closes the ordering so pages never overlap.
        qb.push(" ORDER BY ");
        if let Some(sort) = &self.sort {
            qb.push(sort.column)
                .push(if sort.descending { " DESC" } else { " ASC" });
            if sort.column != "id" {
                qb.push(", id");
            }
        } else {
            qb.push("id");
        }

        let offset = u64::from(self.page) * u64::from(self.page_size);
        qb.push(" LIMIT ")
            .push(self.page_size)
            .push(" OFFSET ")
            .push(offset);
        qb
    }
}
