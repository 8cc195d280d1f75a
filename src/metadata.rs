//! Metadata lookups against the procedure catalog.
//!
//! A procedure is reachable through the broker only when an `api` property
//! is attached to it. The property's value doubles as the procedure's help
//! text. Lookup failures are errors, never "not exposed".

use libsql::Connection;

/// Name of the property that marks an object as exposed.
pub const API_PROPERTY: &str = "api";

const EXPOSED_SQL: &str = "
SELECT COUNT(*) FROM sys_extended_properties e
WHERE e.name = ?1 AND e.schema_name = ?2 AND e.object_name = ?3
    AND EXISTS (SELECT 1 FROM sys_procedures p
                WHERE p.schema_name = e.schema_name AND p.object_name = e.object_name)";

const HELP_SQL: &str = "
SELECT e.value FROM sys_extended_properties e
WHERE e.name = ?1 AND e.schema_name = ?2 AND e.object_name = ?3
    AND EXISTS (SELECT 1 FROM sys_procedures p
                WHERE p.schema_name = e.schema_name AND p.object_name = e.object_name)";

/// Whether `schema.object` exists and carries the `api` property.
pub async fn is_exposed(conn: &Connection, schema: &str, object: &str) -> crate::Result<bool> {
    let mut rows = conn
        .query(EXPOSED_SQL, libsql::params![API_PROPERTY, schema, object])
        .await?;
    let count = match rows.next().await? {
        Some(row) => row.get::<i64>(0)?,
        None => 0,
    };
    Ok(count > 0)
}

/// The value of the `api` property on `schema.object`, if any.
pub async fn help_text(
    conn: &Connection,
    schema: &str,
    object: &str,
) -> crate::Result<Option<String>> {
    let mut rows = conn
        .query(HELP_SQL, libsql::params![API_PROPERTY, schema, object])
        .await?;
    let Some(row) = rows.next().await? else {
        return Ok(None);
    };
    match row.get_value(0)? {
        libsql::Value::Text(text) => Ok(Some(text)),
        libsql::Value::Null => Ok(None),
        libsql::Value::Integer(i) => Ok(Some(i.to_string())),
        libsql::Value::Real(f) => Ok(Some(f.to_string())),
        libsql::Value::Blob(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
    }
}
