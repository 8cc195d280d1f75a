//! Immutable broker settings.
//!
//! Built once at startup from [`config::Broker`](crate::config::Broker) and
//! shared read-only by every request. The not-found and error callbacks can
//! be replaced before the broker is constructed.

use std::fmt;
use std::sync::Arc;

use hyper::StatusCode;

use crate::config;
use crate::error::Error;
use crate::request::DataRequest;
use crate::response::{self, HttpResponse};

/// Header carrying the help key.
pub const HELP_KEY_HEADER: &str = "x-spapi-key";

/// Callback producing the response when no handler accepts a request.
pub type NotFoundHook = Arc<dyn Fn(&DataRequest) -> HttpResponse + Send + Sync>;

/// Callback producing the response for any error raised while dispatching.
pub type ErrorHook = Arc<dyn Fn(&Error) -> HttpResponse + Send + Sync>;

#[derive(Clone)]
pub struct Settings {
    pub endpoint: String,
    pub require_https: bool,
    pub enable_help: bool,
    pub help_key: Option<String>,
    not_found: NotFoundHook,
    error: ErrorHook,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&config::Broker::default())
    }
}

impl From<&config::Broker> for Settings {
    fn from(broker: &config::Broker) -> Self {
        Self {
            endpoint: broker.endpoint.clone(),
            require_https: broker.require_https,
            enable_help: broker.enable_help,
            help_key: broker.help_key.clone().filter(|key| !key.is_empty()),
            not_found: Arc::new(show_not_found),
            error: Arc::new(show_error),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("require_https", &self.require_https)
            .field("enable_help", &self.enable_help)
            .field("help_key", &self.help_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Replace the not-found callback.
    pub fn on_not_found<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DataRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.not_found = Arc::new(hook);
        self
    }

    /// Replace the error callback.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) -> HttpResponse + Send + Sync + 'static,
    {
        self.error = Arc::new(hook);
        self
    }

    pub(crate) fn not_found(&self, request: &DataRequest) -> HttpResponse {
        (self.not_found)(request)
    }

    pub(crate) fn error(&self, err: &Error) -> HttpResponse {
        (self.error)(err)
    }
}

/// Default not-found callback: 404 with an empty body.
pub fn show_not_found(request: &DataRequest) -> HttpResponse {
    tracing::debug!(
        schema = %request.schema,
        object = %request.object,
        "No handler accepted request"
    );
    response::empty(StatusCode::NOT_FOUND)
}

/// Default error callback: logs the error and answers 500 with a generic
/// body.
pub fn show_error(err: &Error) -> HttpResponse {
    if err.is_client_error() {
        tracing::warn!("Rejected request: {err}");
    } else {
        tracing::error!("Application error: {err}");
    }
    response::application_error()
}
