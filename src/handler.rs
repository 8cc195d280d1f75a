//! Request handlers.
//!
//! Handlers form a closed set. The broker consults them in registration
//! order and the first one whose [`Handler::can_handle`] returns `true`
//! processes the request.
//!
//! Every database touch opens its own connection and drops it before
//! returning, so no connection outlives a single handler call.

use std::sync::Arc;

use hyper::StatusCode;
use hyper::http::{HeaderMap, HeaderValue};

use crate::db;
use crate::error::Result;
use crate::metadata;
use crate::procedure::{self, ProcedureName, Strategy};
use crate::request::DataRequest;
use crate::response::{self, HttpResponse};
use crate::settings::{HELP_KEY_HEADER, Settings};

/// Discriminator routing a request to [`HelpHandler`].
pub const HELP_CONTEXT: &str = "help";

/// Body written when an exposed object has no help text.
pub const HELP_NOT_FOUND: &str = "not found";

#[derive(Clone)]
pub enum Handler {
    Help(HelpHandler),
    Procedure(ProcedureHandler),
}

impl Handler {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Handler::Help(_) => "help",
            Handler::Procedure(_) => "procedure",
        }
    }

    pub async fn can_handle(&self, request: &DataRequest, headers: &HeaderMap) -> Result<bool> {
        match self {
            Handler::Help(help) => Ok(help.can_handle(request, headers)),
            Handler::Procedure(procedure) => procedure.can_handle(request).await,
        }
    }

    pub async fn process(&self, request: &DataRequest) -> Result<HttpResponse> {
        match self {
            Handler::Help(help) => help.process(request).await,
            Handler::Procedure(procedure) => procedure.process(request).await,
        }
    }
}

/// Serves the `api` property of an object as plain-text documentation.
#[derive(Clone)]
pub struct HelpHandler {
    settings: Arc<Settings>,
    db: db::Handle,
}

impl HelpHandler {
    pub fn new(settings: Arc<Settings>, db: db::Handle) -> Self {
        Self { settings, db }
    }

    pub fn can_handle(&self, request: &DataRequest, headers: &HeaderMap) -> bool {
        self.is_help_enabled(headers) && request.context().eq_ignore_ascii_case(HELP_CONTEXT)
    }

    /// Whether help is switched on and, if a key is configured, the caller
    /// presented it. Repeated key headers are compared as their
    /// comma-joined values.
    pub fn is_help_enabled(&self, headers: &HeaderMap) -> bool {
        if !self.settings.enable_help {
            return false;
        }
        match &self.settings.help_key {
            None => true,
            Some(key) => {
                let presented: Vec<&[u8]> = headers
                    .get_all(HELP_KEY_HEADER)
                    .iter()
                    .map(HeaderValue::as_bytes)
                    .collect();
                presented.join(&b","[..]) == key.as_bytes()
            }
        }
    }

    pub async fn process(&self, request: &DataRequest) -> Result<HttpResponse> {
        let conn = db::connection(&self.db)?;
        let help = metadata::help_text(&conn, &request.schema, &request.object).await?;
        Ok(response::text(
            StatusCode::OK,
            help.unwrap_or_else(|| HELP_NOT_FOUND.to_string()),
        ))
    }
}

/// Invokes exposed procedures.
#[derive(Clone)]
pub struct ProcedureHandler {
    db: db::Handle,
}

impl ProcedureHandler {
    pub fn new(db: db::Handle) -> Self {
        Self { db }
    }

    pub async fn can_handle(&self, request: &DataRequest) -> Result<bool> {
        let conn = db::connection(&self.db)?;
        metadata::is_exposed(&conn, &request.schema, &request.object).await
    }

    pub async fn process(&self, request: &DataRequest) -> Result<HttpResponse> {
        let strategy = Strategy::from_context(request.context());
        tracing::debug!(
            procedure = %ProcedureName::of(request),
            ?strategy,
            "Invoking procedure"
        );
        let conn = db::connection(&self.db)?;
        let result = procedure::invoke(&conn, request, strategy).await?;
        response::ok(&result)
    }
}
