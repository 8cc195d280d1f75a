//! Database connection and procedure catalog.
//!
//! Supports multiple backends:
//! - Local SQLite file: `path/to/db.sqlite` or `file:path` or `sqlite://path`
//! - In-memory: `:memory:`
//! - Remote Turso: `libsql://...` or `https://...` (requires TURSO_AUTH_TOKEN env var)
//!
//! SQLite has no stored procedures, so procedures live in a catalog table as
//! an ordered list of statements, and metadata tags live beside them:
//!
//! - `sys_procedures(schema_name, object_name, statement_no, body)`
//! - `sys_extended_properties(schema_name, object_name, name, value)`
//!
//! Names compare case-insensitively.

use std::sync::Arc;

use libsql::{Builder, Connection, Database};

/// Shared database handle. Connections are opened per operation from it.
pub type Handle = Arc<Database>;

const CATALOG: &str = "
CREATE TABLE IF NOT EXISTS sys_procedures (
    schema_name TEXT NOT NULL COLLATE NOCASE,
    object_name TEXT NOT NULL COLLATE NOCASE,
    statement_no INTEGER NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (schema_name, object_name, statement_no)
);
CREATE TABLE IF NOT EXISTS sys_extended_properties (
    schema_name TEXT NOT NULL COLLATE NOCASE,
    object_name TEXT NOT NULL COLLATE NOCASE,
    name TEXT NOT NULL COLLATE NOCASE,
    value TEXT,
    PRIMARY KEY (schema_name, object_name, name)
);
";

/// Connect to the database.
///
/// # URL formats
/// - Local file: `mydata.db`, `file:path/to/db.sqlite`, `sqlite://path`
/// - In-memory: `:memory:`
/// - Remote Turso: `libsql://your-db.turso.io` (requires `TURSO_AUTH_TOKEN` env var)
pub async fn connect(url: &str) -> crate::Result<Database> {
    let db = if url.starts_with("libsql://") || url.starts_with("https://") {
        let token = std::env::var("TURSO_AUTH_TOKEN").map_err(|_| {
            crate::Error::Config("TURSO_AUTH_TOKEN not set for remote database".into())
        })?;
        Builder::new_remote(url.to_string(), token).build().await?
    } else if url == ":memory:" {
        Builder::new_local(":memory:").build().await?
    } else {
        // Local file - strip sqlite:// or file: prefix if present
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);
        Builder::new_local(path).build().await?
    };

    Ok(db)
}

/// Open a connection. It is closed when dropped, so holding it in a local
/// scopes it to the operation that opened it.
pub fn connection(db: &Database) -> crate::Result<Connection> {
    Ok(db.connect()?)
}

/// Create the catalog tables if they do not exist.
pub async fn install_catalog(conn: &Connection) -> crate::Result<()> {
    conn.execute_batch(CATALOG).await?;
    Ok(())
}

/// Define (or replace) `schema.object` as the given statements, executed in
/// order on invocation.
pub async fn define_procedure(
    conn: &Connection,
    schema: &str,
    object: &str,
    statements: &[&str],
) -> crate::Result<()> {
    let tx = conn.transaction().await?;
    tx.execute(
        "DELETE FROM sys_procedures WHERE schema_name = ?1 AND object_name = ?2",
        libsql::params![schema, object],
    )
    .await?;
    for (no, body) in statements.iter().enumerate() {
        tx.execute(
            "INSERT INTO sys_procedures (schema_name, object_name, statement_no, body)
             VALUES (?1, ?2, ?3, ?4)",
            libsql::params![schema, object, no as i64, *body],
        )
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Attach (or replace) a metadata tag on `schema.object`.
pub async fn set_property(
    conn: &Connection,
    schema: &str,
    object: &str,
    name: &str,
    value: Option<&str>,
) -> crate::Result<()> {
    let value = value.map_or(libsql::Value::Null, |v| libsql::Value::Text(v.to_string()));
    conn.execute(
        "INSERT INTO sys_extended_properties (schema_name, object_name, name, value)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (schema_name, object_name, name) DO UPDATE SET value = excluded.value",
        libsql::params![schema, object, name, value],
    )
    .await?;
    Ok(())
}

/// Remove a metadata tag from `schema.object`.
pub async fn remove_property(
    conn: &Connection,
    schema: &str,
    object: &str,
    name: &str,
) -> crate::Result<()> {
    conn.execute(
        "DELETE FROM sys_extended_properties
         WHERE schema_name = ?1 AND object_name = ?2 AND name = ?3",
        libsql::params![schema, object, name],
    )
    .await?;
    Ok(())
}
