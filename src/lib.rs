//! spapi - expose database procedures over a single HTTP endpoint.
//!
//! A POST to the broker endpoint names a procedure and its parameters; the
//! broker checks that the procedure is tagged for exposure, invokes it and
//! returns its output as JSON, shaped by the request's `context`:
//!
//! - `multiple`: every result set
//! - `record`: the first row, or `null`
//! - `scalar`: the first value, or `null`
//! - anything else: the rows of the first result set
//!
//! With help enabled, `context: "help"` returns the procedure's documentation
//! instead.
//!
//! - **Config**: Layered configuration (file → env → CLI)
//! - **Database**: libsql/Turso connection plus the procedure catalog
//! - **Auth**: JWT verification producing the caller's [`Principal`]
//! - **Broker**: validation, decoding and the ordered handler chain
//! - **Server**: Hyper-based HTTP server hosting the broker
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use spapi::{Broker, Settings, config::{Loader, Overrides}};
//!
//! #[tokio::main]
//! async fn main() -> spapi::Result<()> {
//!     let config = Loader::new("MYAPP").load(None, &Overrides::default())?;
//!
//!     let db = spapi::db::connect(&config.database.url).await?;
//!     let conn = spapi::db::connection(&db)?;
//!     spapi::db::install_catalog(&conn).await?;
//!     spapi::db::define_procedure(&conn, "dbo", "GetUsers", &["SELECT id, name FROM users"]).await?;
//!     spapi::db::set_property(&conn, "dbo", "GetUsers", "api", Some("Lists users")).await?;
//!
//!     let broker = Broker::new(Settings::from(&config.broker), Arc::new(db));
//!     spapi::server::run(config, Arc::new(broker)).await
//! }
//! ```

pub mod auth;
pub mod broker;
pub mod coerce;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod metadata;
pub mod procedure;
pub mod request;
pub mod response;
pub mod server;
pub mod settings;

// Re-export main types at crate root
pub use auth::Principal;
pub use broker::Broker;
pub use config::{Config, Loader};
pub use db::Handle as DbHandle;
pub use error::{Error, Result};
pub use handler::{Handler, HelpHandler, ProcedureHandler};
pub use procedure::Strategy;
pub use request::DataRequest;
pub use settings::Settings;

// Re-export commonly used dependencies for convenience
pub use hyper::Method;
pub use serde_json::json;
