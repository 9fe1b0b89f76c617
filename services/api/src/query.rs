//! Query feature builder
//!
//! Translates an untrusted query-string map into the filter, sort,
//! projection, and pagination directives of a `ListQuery`. Purely a
//! translation layer; no I/O happens here and no schema knowledge is
//! applied, so unrecognized field names pass through as literal equality
//! filters.

use std::collections::HashMap;

use common::store::{FilterClause, FilterOp, FilterValue, ListQuery, SortKey};

/// Keys consumed by the builder itself rather than treated as filters
const RESERVED_KEYS: [&str; 4] = ["sort", "limit", "page", "select"];

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

/// Build a fully configured list query from raw request parameters
pub fn build_list_query(params: &HashMap<String, String>) -> ListQuery {
    let (offset, limit) = paginate(params);
    ListQuery {
        filters: filters(params),
        sort: sort(params),
        select: select(params),
        offset,
        limit,
    }
}

/// Split a `field[op]` key into its field and comparison operator. Keys
/// without a recognized operator token stay whole and compare by equality.
fn parse_key(key: &str) -> (String, FilterOp) {
    if let Some(start) = key.find('[') {
        if key.ends_with(']') {
            let field = &key[..start];
            let op = match &key[start + 1..key.len() - 1] {
                "gt" => FilterOp::Gt,
                "gte" => FilterOp::Gte,
                "lt" => FilterOp::Lt,
                "lte" => FilterOp::Lte,
                "in" => FilterOp::In,
                _ => return (key.to_string(), FilterOp::Eq),
            };
            return (field.to_string(), op);
        }
    }
    (key.to_string(), FilterOp::Eq)
}

fn filters(params: &HashMap<String, String>) -> Vec<FilterClause> {
    let mut clauses: Vec<FilterClause> = params
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, raw)| {
            let (field, op) = parse_key(key);
            let value = match op {
                FilterOp::In => {
                    FilterValue::List(raw.split(',').map(|s| s.trim().to_string()).collect())
                }
                // Bare equality stays textual: a numeric-looking phone or
                // zipcode must compare as the literal string the client sent
                FilterOp::Eq => FilterValue::Text(raw.clone()),
                _ => raw
                    .parse::<f64>()
                    .map(FilterValue::Number)
                    .unwrap_or_else(|_| FilterValue::Text(raw.clone())),
            };
            FilterClause { field, op, value }
        })
        .collect();

    // Map iteration order is arbitrary; keep the rendered SQL stable
    clauses.sort_by(|a, b| a.field.cmp(&b.field));
    clauses
}

fn sort(params: &HashMap<String, String>) -> Vec<SortKey> {
    let Some(raw) = params.get("sort") else {
        return default_sort();
    };

    let keys: Vec<SortKey> = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && *token != "-")
        .map(|token| match token.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                descending: true,
            },
            None => SortKey {
                field: token.to_string(),
                descending: false,
            },
        })
        .collect();

    if keys.is_empty() { default_sort() } else { keys }
}

fn default_sort() -> Vec<SortKey> {
    vec![SortKey {
        field: "createdAt".to_string(),
        descending: true,
    }]
}

fn select(params: &HashMap<String, String>) -> Option<Vec<String>> {
    let raw = params.get("select")?;
    let fields: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    if fields.is_empty() { None } else { Some(fields) }
}

/// Non-numeric or non-positive `page`/`limit` values fall back to the
/// defaults, so the computed offset can never go negative.
fn paginate(params: &HashMap<String, String>) -> (i64, i64) {
    let page = positive(params, "page", DEFAULT_PAGE);
    let limit = positive(params, "limit", DEFAULT_LIMIT);
    ((page - 1) * limit, limit)
}

fn positive(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reserved_keys_are_stripped_from_filters() {
        let query = build_list_query(&params(&[
            ("sort", "-price"),
            ("limit", "2"),
            ("page", "1"),
            ("select", "name"),
            ("housing", "true"),
        ]));
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].field, "housing");
        assert_eq!(query.filters[0].op, FilterOp::Eq);
    }

    #[test]
    fn comparison_tokens_rewrite_to_operators() {
        let query = build_list_query(&params(&[("price[gte]", "100")]));
        assert_eq!(
            query.filters,
            vec![FilterClause {
                field: "price".to_string(),
                op: FilterOp::Gte,
                value: FilterValue::Number(100.0),
            }]
        );
    }

    #[test]
    fn in_token_splits_comma_separated_values() {
        let query = build_list_query(&params(&[("careers[in]", "Business, Other")]));
        assert_eq!(
            query.filters[0].value,
            FilterValue::List(vec!["Business".to_string(), "Other".to_string()])
        );
        assert_eq!(query.filters[0].op, FilterOp::In);
    }

    #[test]
    fn bare_equality_keeps_numeric_looking_values_textual() {
        let query = build_list_query(&params(&[
            ("phone", "1112223333"),
            ("zipcode", "02215"),
        ]));
        assert_eq!(
            query.filters,
            vec![
                FilterClause {
                    field: "phone".to_string(),
                    op: FilterOp::Eq,
                    value: FilterValue::Text("1112223333".to_string()),
                },
                FilterClause {
                    field: "zipcode".to_string(),
                    op: FilterOp::Eq,
                    value: FilterValue::Text("02215".to_string()),
                },
            ]
        );
    }

    #[test]
    fn unrecognized_op_tokens_pass_through_as_equality() {
        let query = build_list_query(&params(&[("price[weird]", "100")]));
        assert_eq!(query.filters[0].field, "price[weird]");
        assert_eq!(query.filters[0].op, FilterOp::Eq);
    }

    #[test]
    fn sort_parses_direction_and_defaults_to_creation_time() {
        let query = build_list_query(&params(&[("sort", "-price,name")]));
        assert_eq!(
            query.sort,
            vec![
                SortKey {
                    field: "price".to_string(),
                    descending: true
                },
                SortKey {
                    field: "name".to_string(),
                    descending: false
                },
            ]
        );

        let query = build_list_query(&params(&[]));
        assert_eq!(
            query.sort,
            vec![SortKey {
                field: "createdAt".to_string(),
                descending: true
            }]
        );
    }

    #[test]
    fn select_splits_fields() {
        let query = build_list_query(&params(&[("select", "name,description")]));
        assert_eq!(
            query.select,
            Some(vec!["name".to_string(), "description".to_string()])
        );
        assert_eq!(build_list_query(&params(&[])).select, None);
    }

    #[test]
    fn pagination_computes_offset_and_cap() {
        let query = build_list_query(&params(&[("page", "3"), ("limit", "5")]));
        assert_eq!(query.offset, 10);
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn pagination_defaults_apply() {
        let query = build_list_query(&params(&[]));
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn invalid_pagination_values_fall_back_to_defaults() {
        for bad in ["abc", "-2", "0", "1.5"] {
            let query = build_list_query(&params(&[("page", bad), ("limit", bad)]));
            assert_eq!(query.offset, 0, "page={bad}");
            assert_eq!(query.limit, 10, "limit={bad}");
        }
    }

    #[test]
    fn filter_sort_and_pagination_compose() {
        let query = build_list_query(&params(&[
            ("price[gte]", "100"),
            ("sort", "-price"),
            ("limit", "2"),
            ("page", "1"),
        ]));
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].op, FilterOp::Gte);
        assert_eq!(query.sort[0].field, "price");
        assert!(query.sort[0].descending);
        assert_eq!(query.limit, 2);
        assert_eq!(query.offset, 0);
    }
}
