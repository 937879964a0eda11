//! Pagination Adapter (spec.md §4.7): applies filtering, sorting,
//! windowing, and attribute projection to a set of resources fetched from
//! upstream, which has no native filtering of its own.

use std::cmp::Ordering;

use serde_json::Value;

use crate::context::{ListQuery, SortOrder};
use crate::error::ProxyResult;
use crate::filter::ast::AttrPath;
use crate::filter::{self, path};

/// Attributes that attribute projection (`attributes=`/`excludedAttributes=`)
/// never drops, since SCIM clients rely on them for resource identity.
const ALWAYS_KEPT: [&str; 3] = ["id", "schemas", "meta"];

/// How many upstream records to request for a filtered list request: more
/// than the requested page size, since the upstream can't pre-filter, but
/// bounded so a narrow filter over a huge collection doesn't pull
/// everything.
pub fn fetch_size(count: usize, multiplier: usize, max_fetch_size: usize) -> usize {
    if count == 0 {
        return max_fetch_size;
    }
    count.saturating_mul(multiplier).min(max_fetch_size)
}

/// The outcome of applying a [`ListQuery`] to a fetched resource set.
#[derive(Debug, Clone)]
pub struct PagedResult {
    pub resources: Vec<Value>,
    /// Number of resources in the fetched set that matched the filter.
    pub total_results: usize,
    /// True when `total_results` is a lower bound: the filter matched
    /// every fetched record's worth checked, but the fetch was bounded by
    /// [`fetch_size`] and may not have covered the entire upstream
    /// collection.
    pub total_is_lower_bound: bool,
    pub start_index: usize,
    pub items_per_page: usize,
}

/// Apply a list query's filter, sort, window, and attribute projection to
/// an already-fetched resource set.
///
/// `fetch_exhausted` tells whether `resources` is the upstream's complete
/// collection (a plain, unfiltered list request, or a filtered fetch that
/// happened to retrieve everything) or a fetch-enough-bounded prefix.
pub fn apply_query(
    resources: Vec<Value>,
    query: &ListQuery,
    fetch_exhausted: bool,
    max_filter_complexity: usize,
) -> ProxyResult<PagedResult> {
    let mut matched = filter_resources(resources, query.filter.as_deref(), max_filter_complexity)?;

    if let Some(sort_by) = &query.sort_by {
        sort_resources(&mut matched, sort_by, query.sort_order);
    }

    let total_results = matched.len();
    let start = query.start_index.saturating_sub(1).min(matched.len());
    let requested = if query.count == 0 {
        matched.len() - start
    } else {
        query.count
    };
    let end = (start + requested).min(matched.len());

    let mut page: Vec<Value> = matched[start..end].to_vec();
    project_attributes(&mut page, &query.attributes, &query.excluded_attributes);

    Ok(PagedResult {
        resources: page,
        total_results,
        total_is_lower_bound: query.filter.is_some() && !fetch_exhausted,
        start_index: query.start_index,
        items_per_page: end - start,
    })
}

fn filter_resources(
    resources: Vec<Value>,
    filter_expr: Option<&str>,
    max_complexity: usize,
) -> ProxyResult<Vec<Value>> {
    let Some(expr) = filter_expr else {
        return Ok(resources);
    };
    let node = filter::parse(expr, max_complexity)?;
    Ok(resources
        .into_iter()
        .filter(|resource| filter::evaluate(&node, resource))
        .collect())
}

fn sort_resources(resources: &mut [Value], sort_by: &str, order: SortOrder) {
    let attr_path = AttrPath::simple(sort_by.split('.'));
    resources.sort_by(|a, b| {
        let value_a = path::resolve_raw(a, &attr_path).into_iter().next();
        let value_b = path::resolve_raw(b, &attr_path).into_iter().next();
        compare_sort_key(value_a, value_b, order)
    });
}

/// Resources missing the sort attribute sort after every resource that has
/// it, in both ascending and descending order.
fn compare_sort_key(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let base = compare_json_values(x, y);
            match order {
                SortOrder::Ascending => base,
                SortOrder::Descending => base.reverse(),
            }
        }
    }
}

fn compare_json_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn project_attributes(resources: &mut [Value], include: &[String], exclude: &[String]) {
    if include.is_empty() && exclude.is_empty() {
        return;
    }
    for resource in resources.iter_mut() {
        let Some(object) = resource.as_object_mut() else {
            continue;
        };
        if !include.is_empty() {
            object.retain(|key, _| {
                ALWAYS_KEPT.iter().any(|kept| kept.eq_ignore_ascii_case(key))
                    || include.iter().any(|wanted| wanted.eq_ignore_ascii_case(key))
            });
        } else {
            object.retain(|key, _| {
                ALWAYS_KEPT.iter().any(|kept| kept.eq_ignore_ascii_case(key))
                    || !exclude.iter().any(|dropped| dropped.eq_ignore_ascii_case(key))
            });
        }
    }
}
