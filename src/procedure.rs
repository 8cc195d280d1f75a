//! Procedure invocation.
//!
//! A request's discriminator picks a [`Strategy`], which decides how the
//! result sets a procedure produces are shaped into the JSON response. The
//! procedure itself always runs to completion unless its command timeout
//! fires; strategies only differ in what they keep.
//!
//! SQLite does its work synchronously inside the libsql futures, so the
//! statements run on the blocking pool. On timeout the connection is
//! interrupted, which aborts the statement in flight.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use libsql::Connection;
use libsql::params::Params;
use serde_json::Value;

use crate::coerce::{Scalar, coerce};
use crate::error::{Error, Result};
use crate::request::DataRequest;

/// Reserved parameter carrying the caller's name.
pub const USER_PARAMETER: &str = "_user";

/// Reserved parameter carrying the caller's claims as JSON.
pub const CLAIMS_PARAMETER: &str = "_claims";

const STATEMENTS_SQL: &str = "
SELECT body FROM sys_procedures
WHERE schema_name = ?1 AND object_name = ?2
ORDER BY statement_no";

/// How procedure output is shaped into a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every result set, as an array of arrays.
    Multiple,
    /// The first row of the first result set, or null.
    Record,
    /// The first column of the first row of the first result set, or null.
    Scalar,
    /// All rows of the first result set.
    Rows,
}

impl Strategy {
    /// Select a strategy from a request discriminator. Unknown and empty
    /// discriminators select [`Strategy::Rows`].
    pub fn from_context(context: &str) -> Self {
        match context.to_ascii_lowercase().as_str() {
            "multiple" => Strategy::Multiple,
            "record" => Strategy::Record,
            "scalar" => Strategy::Scalar,
            _ => Strategy::Rows,
        }
    }

    fn shape(self, sets: Vec<ResultSet>) -> Value {
        match self {
            Strategy::Multiple => Value::Array(sets.into_iter().map(ResultSet::into_json).collect()),
            Strategy::Record => sets
                .into_iter()
                .next()
                .and_then(ResultSet::into_first_row)
                .unwrap_or(Value::Null),
            Strategy::Scalar => sets
                .into_iter()
                .next()
                .and_then(ResultSet::into_first_value)
                .unwrap_or(Value::Null),
            Strategy::Rows => sets
                .into_iter()
                .next()
                .map(ResultSet::into_json)
                .unwrap_or_else(|| Value::Array(Vec::new())),
        }
    }
}

/// Bracketed `[schema].[object]` rendering of a procedure name.
#[derive(Debug, Clone, Copy)]
pub struct ProcedureName<'a> {
    pub schema: &'a str,
    pub object: &'a str,
}

impl<'a> ProcedureName<'a> {
    pub fn of(request: &'a DataRequest) -> Self {
        Self {
            schema: &request.schema,
            object: &request.object,
        }
    }
}

impl fmt::Display for ProcedureName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}].[{}]",
            self.schema.replace(']', "]]"),
            self.object.replace(']', "]]")
        )
    }
}

/// Coerced parameters for one invocation, in request order.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: Vec<(String, Scalar)>,
}

impl Parameters {
    /// Coerce the request's parameters and add the reserved identity
    /// parameters, which replace any caller-supplied value of the same name.
    pub fn from_request(request: &DataRequest) -> Result<Self> {
        let mut values: Vec<(String, Scalar)> = request
            .parameters
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .map(|(name, value)| (name.clone(), coerce(value)))
            .collect();

        let user = match &request.user {
            Some(user) => Scalar::Text(user.clone()),
            None => Scalar::Null,
        };
        values.push((USER_PARAMETER.to_string(), user));
        values.push((
            CLAIMS_PARAMETER.to_string(),
            Scalar::Text(serde_json::to_string(&request.claims)?),
        ));

        Ok(Self { values })
    }

    /// Look up a parameter by its declared name. Sigils (`:`, `@`, `$`) are
    /// ignored on both sides and names compare case-insensitively.
    pub fn get(&self, declared: &str) -> Option<&Scalar> {
        let wanted = strip_sigil(declared);
        self.values
            .iter()
            .find(|(name, _)| strip_sigil(name).eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

fn strip_sigil(name: &str) -> &str {
    name.strip_prefix([':', '@', '$']).unwrap_or(name)
}

fn is_reserved(name: &str) -> bool {
    let name = strip_sigil(name);
    name.eq_ignore_ascii_case(USER_PARAMETER) || name.eq_ignore_ascii_case(CLAIMS_PARAMETER)
}

/// Rows produced by one statement.
#[derive(Debug, Clone, Default)]
struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    fn row_json(columns: &[String], row: Vec<Value>) -> Value {
        Value::Object(columns.iter().cloned().zip(row).collect())
    }

    fn into_json(self) -> Value {
        let columns = self.columns;
        Value::Array(
            self.rows
                .into_iter()
                .map(|row| Self::row_json(&columns, row))
                .collect(),
        )
    }

    fn into_first_row(self) -> Option<Value> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .next()
            .map(|row| Self::row_json(&columns, row))
    }

    fn into_first_value(self) -> Option<Value> {
        self.rows.into_iter().next()?.into_iter().next()
    }
}

/// Invoke the procedure named by `request` and shape its output.
///
/// The invocation is bounded by the request's command timeout; zero means
/// no limit.
pub async fn invoke(conn: &Connection, request: &DataRequest, strategy: Strategy) -> Result<Value> {
    let parameters = Parameters::from_request(request)?;
    let (schema, object) = (request.schema.clone(), request.object.clone());
    let worker = conn.clone();
    let runtime = tokio::runtime::Handle::current();
    let run = tokio::task::spawn_blocking(move || {
        let name = ProcedureName {
            schema: &schema,
            object: &object,
        };
        runtime.block_on(execute(&worker, name, &parameters))
    });

    let joined = if request.command_timeout == 0 {
        run.await
    } else {
        let limit = Duration::from_secs(request.command_timeout);
        match tokio::time::timeout(limit, run).await {
            Ok(joined) => joined,
            Err(_) => {
                let procedure = ProcedureName::of(request).to_string();
                if let Err(e) = conn.interrupt() {
                    tracing::warn!(%procedure, "Failed to interrupt timed out procedure: {e}");
                }
                return Err(Error::Timeout {
                    procedure,
                    seconds: request.command_timeout,
                });
            }
        }
    };
    let sets = joined.map_err(|e| Error::Internal(format!("Procedure task failed: {e}")))??;

    Ok(strategy.shape(sets))
}

async fn execute(
    conn: &Connection,
    name: ProcedureName<'_>,
    parameters: &Parameters,
) -> Result<Vec<ResultSet>> {
    let statements = load_statements(conn, name).await?;
    if statements.is_empty() {
        return Err(Error::ProcedureNotFound(name.to_string()));
    }

    let mut sets = Vec::new();
    for body in &statements {
        let stmt = conn.prepare(body).await?;
        let bound: Vec<libsql::Value> = (1..=stmt.parameter_count())
            .map(|idx| {
                stmt.parameter_name(idx as i32)
                    .and_then(|declared| parameters.get(declared))
                    .cloned()
                    .map_or(libsql::Value::Null, libsql::Value::from)
            })
            .collect();

        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        if columns.is_empty() {
            stmt.execute(Params::Positional(bound)).await?;
            continue;
        }

        let mut rows = stmt.query(Params::Positional(bound)).await?;
        let mut set = ResultSet {
            columns,
            rows: Vec::new(),
        };
        while let Some(row) = rows.next().await? {
            let mut values = Vec::with_capacity(set.columns.len());
            for idx in 0..set.columns.len() {
                values.push(to_json(row.get_value(idx as i32)?));
            }
            set.rows.push(values);
        }
        sets.push(set);
    }
    Ok(sets)
}

async fn load_statements(conn: &Connection, name: ProcedureName<'_>) -> Result<Vec<String>> {
    let mut rows = conn
        .query(STATEMENTS_SQL, libsql::params![name.schema, name.object])
        .await?;
    let mut statements = Vec::new();
    while let Some(row) = rows.next().await? {
        statements.push(row.get::<String>(0)?);
    }
    Ok(statements)
}

fn to_json(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(i) => Value::from(i),
        libsql::Value::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        libsql::Value::Text(s) => Value::String(s),
        libsql::Value::Blob(bytes) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
    }
}
