//! Listing engine: equality filters, single-column ordering and paging over
//! the base records of one kind.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use cartograph_core::{
    Api, CatalogResult, Component, EntityRef, Filter, FilterKey, Group, Kind, ListPage, OrderBy,
    Ordering, Pagination, StorageStep, User, ValidationError,
};

use crate::entity::at;
use crate::spec::SpecTable;

/// Spec table holding the rows of `kind`.
fn spec_table(kind: Kind) -> Result<&'static str, ValidationError> {
    match kind {
        Kind::Component => Ok(Component::TABLE),
        Kind::Api => Ok(Api::TABLE),
        Kind::User => Ok(User::TABLE),
        Kind::Group => Ok(Group::TABLE),
        Kind::System | Kind::Resource => Err(ValidationError::UnsupportedKind {
            kind: kind.to_string(),
        }),
    }
}

fn filter_column(key: FilterKey) -> &'static str {
    match key {
        FilterKey::Namespace => "e.namespace",
        FilterKey::Name => "e.name",
    }
}

fn order_column(order_by: OrderBy) -> &'static str {
    match order_by {
        OrderBy::Namespace => "e.namespace",
        OrderBy::Name => "e.name",
    }
}

/// Build the listing statement and its bound values.
///
/// Base rows are joined to the kind's spec table, so a base row without its
/// spec row is not listed. Only fixed table and column names are spliced into
/// the SQL; every caller-supplied value is bound.
fn build_query(
    kind: Kind,
    filters: &[Filter],
    ordering: Ordering,
    pagination: Pagination,
) -> Result<(String, Vec<Value>), ValidationError> {
    let mut sql = format!(
        "SELECT e.namespace, e.name FROM entity e JOIN \"{}\" s ON s.entity_id = e.id WHERE e.kind = ?1",
        spec_table(kind)?
    );
    let mut values = vec![Value::Text(kind.as_db_str().to_string())];

    for filter in filters {
        values.push(Value::Text(filter.value.clone()));
        sql.push_str(&format!(
            " AND {} = ?{}",
            filter_column(filter.key),
            values.len()
        ));
    }

    if let Some(order_by) = ordering.order_by {
        let direction = if ordering.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}", order_column(order_by), direction));
    }

    // SQLite treats a negative LIMIT as unbounded.
    let limit = if pagination.is_unbounded() { -1 } else { pagination.limit };
    values.push(Value::Integer(limit));
    sql.push_str(&format!(" LIMIT ?{}", values.len()));
    values.push(Value::Integer(pagination.offset.max(0)));
    sql.push_str(&format!(" OFFSET ?{}", values.len()));

    Ok((sql, values))
}

/// List references of `kind` matching every filter.
///
/// The returned window continues where this page stopped:
/// `next.offset = offset + rows returned`, `next.limit = limit`.
pub fn list_refs(
    conn: &Connection,
    kind: Kind,
    filters: &[Filter],
    ordering: Ordering,
    pagination: Pagination,
    operation: &str,
) -> CatalogResult<ListPage> {
    let (sql, values) = build_query(kind, filters, ordering, pagination)?;
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(at(operation, StorageStep::Listing))?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok(EntityRef::new(
                kind.as_db_str(),
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })
        .map_err(at(operation, StorageStep::Listing))?;
    let refs = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(at(operation, StorageStep::Listing))?;

    let next = Pagination {
        limit: pagination.limit,
        offset: pagination.offset.max(0) + refs.len() as i64,
    };
    Ok(ListPage { refs, next })
}
