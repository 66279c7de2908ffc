//! Typed spec tables.
//!
//! Each stored kind has one spec table keyed by the base row's id. The
//! statements for a kind hang off its [`SpecTable`] impl, so the kind picks
//! the table. Columns are bound and read positionally after `entity_id`.

use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use cartograph_core::{
    Api, ApiSpec, CatalogResult, Component, ComponentSpec, Document, Entity, EntityId, EntityRef,
    Group, GroupSpec, Profile, StorageError, StorageStep, User, UserSpec, ValidationError,
};

use crate::codec;
use crate::entity::at;

/// Persistence of one document kind's spec row.
pub trait SpecTable: Document {
    /// Spec table name.
    const TABLE: &'static str;
    /// `INSERT` binding `entity_id` as `?1` then the spec columns.
    const INSERT: &'static str;
    /// `UPDATE ... WHERE entity_id = ?1` binding the spec columns as `?2..`.
    const UPDATE: &'static str;
    /// `SELECT` of the spec columns for `entity_id = ?1`.
    const SELECT: &'static str;

    /// Spec column values in statement order.
    fn spec_values(&self) -> Result<Vec<Value>, ValidationError>;

    /// Rebuild the document from its envelope and spec row.
    fn from_spec_row(entity: Entity, row: &SpecRow) -> Result<Self, ValidationError>;
}

/// A fetched spec row, addressed by column name.
#[derive(Debug)]
pub struct SpecRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl SpecRow {
    /// Value of a selected column. A column the statement did not select is
    /// an error, never NULL.
    fn value(&self, column: &str) -> Result<ValueRef<'_>, ValidationError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .map(ValueRef::from)
            .ok_or_else(|| ValidationError::UnknownColumn {
                column: column.to_string(),
            })
    }

    /// Text column; NULL reads as empty.
    pub fn text(&self, column: &str) -> Result<String, ValidationError> {
        Ok(self.opt_text(column)?.unwrap_or_default())
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>, ValidationError> {
        Ok(codec::text(column, self.value(column)?)?.map(str::to_string))
    }

    pub fn entity_ref(&self, column: &str) -> Result<Option<EntityRef>, ValidationError> {
        codec::decode_ref(column, self.value(column)?)
    }

    pub fn entity_refs(&self, column: &str) -> Result<Vec<EntityRef>, ValidationError> {
        codec::decode_refs(column, self.value(column)?)
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_text(s: &Option<String>) -> Value {
    Value::from(s.clone())
}

fn reference(r: Option<&EntityRef>) -> Value {
    Value::from(codec::encode_ref(r))
}

fn references(refs: &[EntityRef]) -> Result<Value, ValidationError> {
    Ok(Value::from(codec::encode_refs(refs)?))
}

// ============================================================================
// GENERIC ROW I/O
// ============================================================================

fn write_spec<D: SpecTable>(
    conn: &Connection,
    sql: &str,
    doc: &D,
    id: EntityId,
    operation: &str,
) -> CatalogResult<usize> {
    let values = doc.spec_values()?;
    let bound = std::iter::once(Value::Integer(id)).chain(values);
    let written = conn
        .prepare_cached(sql)
        .map_err(at(operation, StorageStep::SpecRow))?
        .execute(params_from_iter(bound))
        .map_err(at(operation, StorageStep::SpecRow))?;
    Ok(written)
}

/// Insert the spec row for a freshly created base row.
pub fn insert_spec<D: SpecTable>(
    conn: &Connection,
    doc: &D,
    id: EntityId,
    operation: &str,
) -> CatalogResult<()> {
    write_spec(conn, D::INSERT, doc, id, operation)?;
    Ok(())
}

/// Overwrite every spec column. A missing spec row is an inconsistency.
pub fn update_spec<D: SpecTable>(
    conn: &Connection,
    doc: &D,
    id: EntityId,
    operation: &str,
) -> CatalogResult<()> {
    if write_spec(conn, D::UPDATE, doc, id, operation)? == 0 {
        return Err(StorageError::InconsistentState {
            entity_ref: doc.entity().entity_ref(),
            table: D::TABLE,
        }
        .into());
    }
    Ok(())
}

/// Read the spec row for `entity` and assemble the typed document.
pub fn read_spec<D: SpecTable>(
    conn: &Connection,
    id: EntityId,
    entity: Entity,
    operation: &str,
) -> CatalogResult<D> {
    let mut stmt = conn
        .prepare_cached(D::SELECT)
        .map_err(at(operation, StorageStep::SpecRow))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let values = stmt
        .query_row(params![id], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<Value>>>()
        })
        .optional()
        .map_err(at(operation, StorageStep::SpecRow))?;

    let Some(values) = values else {
        return Err(StorageError::InconsistentState {
            entity_ref: entity.entity_ref(),
            table: D::TABLE,
        }
        .into());
    };

    Ok(D::from_spec_row(entity, &SpecRow { columns, values })?)
}

// ============================================================================
// KINDS
// ============================================================================

impl SpecTable for Component {
    const TABLE: &'static str = "component";
    const INSERT: &'static str = "INSERT INTO component (entity_id, type, lifecycle, owner, system, \
         subcomponent_of, provides_apis, consumes_apis, depends_on, dependency_of) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";
    const UPDATE: &'static str = "UPDATE component SET type = ?2, lifecycle = ?3, owner = ?4, \
         system = ?5, subcomponent_of = ?6, provides_apis = ?7, consumes_apis = ?8, \
         depends_on = ?9, dependency_of = ?10 WHERE entity_id = ?1";
    const SELECT: &'static str = "SELECT type, lifecycle, owner, system, subcomponent_of, \
         provides_apis, consumes_apis, depends_on, dependency_of FROM component WHERE entity_id = ?1";

    fn spec_values(&self) -> Result<Vec<Value>, ValidationError> {
        let s = &self.spec;
        Ok(vec![
            text(&s.component_type),
            text(&s.lifecycle),
            reference(Some(&s.owner)),
            reference(s.system.as_ref()),
            reference(s.subcomponent_of.as_ref()),
            references(&s.provides_apis)?,
            references(&s.consumes_apis)?,
            references(&s.depends_on)?,
            references(&s.dependency_of)?,
        ])
    }

    fn from_spec_row(entity: Entity, row: &SpecRow) -> Result<Self, ValidationError> {
        Ok(Component {
            entity,
            spec: ComponentSpec {
                component_type: row.text("type")?,
                lifecycle: row.text("lifecycle")?,
                owner: row.entity_ref("owner")?.unwrap_or_default(),
                system: row.entity_ref("system")?,
                subcomponent_of: row.entity_ref("subcomponent_of")?,
                provides_apis: row.entity_refs("provides_apis")?,
                consumes_apis: row.entity_refs("consumes_apis")?,
                depends_on: row.entity_refs("depends_on")?,
                dependency_of: row.entity_refs("dependency_of")?,
            },
        })
    }
}

impl SpecTable for Api {
    const TABLE: &'static str = "api";
    const INSERT: &'static str = "INSERT INTO api (entity_id, type, lifecycle, owner, system, definition) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
    const UPDATE: &'static str = "UPDATE api SET type = ?2, lifecycle = ?3, owner = ?4, system = ?5, \
         definition = ?6 WHERE entity_id = ?1";
    const SELECT: &'static str =
        "SELECT type, lifecycle, owner, system, definition FROM api WHERE entity_id = ?1";

    fn spec_values(&self) -> Result<Vec<Value>, ValidationError> {
        let s = &self.spec;
        Ok(vec![
            text(&s.api_type),
            text(&s.lifecycle),
            reference(Some(&s.owner)),
            reference(s.system.as_ref()),
            text(&s.definition),
        ])
    }

    fn from_spec_row(entity: Entity, row: &SpecRow) -> Result<Self, ValidationError> {
        Ok(Api {
            entity,
            spec: ApiSpec {
                api_type: row.text("type")?,
                lifecycle: row.text("lifecycle")?,
                owner: row.entity_ref("owner")?.unwrap_or_default(),
                system: row.entity_ref("system")?,
                definition: row.text("definition")?,
            },
        })
    }
}

fn profile(row: &SpecRow) -> Result<Profile, ValidationError> {
    Ok(Profile {
        display_name: row.opt_text("display_name")?,
        email: row.opt_text("email")?,
        picture: row.opt_text("picture")?,
    })
}

impl SpecTable for User {
    const TABLE: &'static str = "user";
    const INSERT: &'static str = "INSERT INTO \"user\" (entity_id, display_name, email, picture, member_of) \
         VALUES (?1, ?2, ?3, ?4, ?5)";
    const UPDATE: &'static str = "UPDATE \"user\" SET display_name = ?2, email = ?3, picture = ?4, \
         member_of = ?5 WHERE entity_id = ?1";
    const SELECT: &'static str =
        "SELECT display_name, email, picture, member_of FROM \"user\" WHERE entity_id = ?1";

    fn spec_values(&self) -> Result<Vec<Value>, ValidationError> {
        let s = &self.spec;
        Ok(vec![
            opt_text(&s.profile.display_name),
            opt_text(&s.profile.email),
            opt_text(&s.profile.picture),
            references(&s.member_of)?,
        ])
    }

    fn from_spec_row(entity: Entity, row: &SpecRow) -> Result<Self, ValidationError> {
        Ok(User {
            entity,
            spec: UserSpec {
                profile: profile(row)?,
                member_of: row.entity_refs("member_of")?,
            },
        })
    }
}

impl SpecTable for Group {
    const TABLE: &'static str = "group";
    const INSERT: &'static str = "INSERT INTO \"group\" (entity_id, type, display_name, email, picture, \
         parent, children, members) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
    const UPDATE: &'static str = "UPDATE \"group\" SET type = ?2, display_name = ?3, email = ?4, \
         picture = ?5, parent = ?6, children = ?7, members = ?8 WHERE entity_id = ?1";
    const SELECT: &'static str = "SELECT type, display_name, email, picture, parent, children, members \
         FROM \"group\" WHERE entity_id = ?1";

    fn spec_values(&self) -> Result<Vec<Value>, ValidationError> {
        let s = &self.spec;
        Ok(vec![
            text(&s.group_type),
            opt_text(&s.profile.display_name),
            opt_text(&s.profile.email),
            opt_text(&s.profile.picture),
            reference(s.parent.as_ref()),
            references(&s.children)?,
            references(&s.members)?,
        ])
    }

    fn from_spec_row(entity: Entity, row: &SpecRow) -> Result<Self, ValidationError> {
        Ok(Group {
            entity,
            spec: GroupSpec {
                group_type: row.text("type")?,
                profile: profile(row)?,
                parent: row.entity_ref("parent")?,
                children: row.entity_refs("children")?,
                members: row.entity_refs("members")?,
            },
        })
    }
}
