//! The request broker.
//!
//! For every inbound request the broker:
//!
//! 1. Checks method, scheme and path. Requests that are not ours go to the
//!    `next` collaborator untouched and nothing is decoded.
//! 2. Decodes the body into a [`DataRequest`] stamped with the caller's
//!    [`Principal`].
//! 3. Walks the handler list in order. The first handler that accepts the
//!    request processes it and dispatch stops.
//! 4. Falls back to the not-found callback when no handler accepts.
//!
//! Any error from steps 2-4 is caught here, once, and turned into a response
//! by the error callback.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use hyper::http::uri::Scheme;
use hyper::{Method, Request};

use crate::auth::Principal;
use crate::db;
use crate::error::Result;
use crate::handler::{Handler, HelpHandler, ProcedureHandler};
use crate::request::{self, DataRequest};
use crate::response::HttpResponse;
use crate::settings::Settings;

pub struct Broker {
    settings: Arc<Settings>,
    handlers: Vec<Handler>,
}

impl Broker {
    /// Build a broker with the standard chain: help first, then procedures.
    pub fn new(settings: Settings, db: db::Handle) -> Self {
        let settings = Arc::new(settings);
        let handlers = vec![
            Handler::Help(HelpHandler::new(Arc::clone(&settings), Arc::clone(&db))),
            Handler::Procedure(ProcedureHandler::new(db)),
        ];
        Self { settings, handlers }
    }

    /// Build a broker with an explicit handler chain, consulted in order.
    pub fn with_handlers(settings: Arc<Settings>, handlers: Vec<Handler>) -> Self {
        Self { settings, handlers }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Whether a request is addressed to the broker.
    pub fn validate(&self, method: &Method, is_https: bool, path: &str) -> bool {
        method.as_str().eq_ignore_ascii_case("POST")
            && (is_https || !self.settings.require_https)
            && path.eq_ignore_ascii_case(&self.settings.endpoint)
    }

    /// Process a request, or hand it to `next` if it is not addressed to the
    /// broker.
    pub async fn process<N, Fut>(&self, req: Request<Bytes>, next: N) -> HttpResponse
    where
        N: FnOnce(Request<Bytes>) -> Fut,
        Fut: Future<Output = HttpResponse>,
    {
        if !self.validate(req.method(), is_https(&req), req.uri().path()) {
            tracing::debug!(method = %req.method(), path = req.uri().path(), "Passing request through");
            return next(req).await;
        }

        match self.dispatch(&req).await {
            Ok(response) => response,
            Err(e) => self.settings.error(&e),
        }
    }

    async fn dispatch(&self, req: &Request<Bytes>) -> Result<HttpResponse> {
        let anonymous = Principal::Anonymous;
        let principal = req.extensions().get::<Principal>().unwrap_or(&anonymous);
        let request = request::decode(req.body(), principal)?;

        for handler in &self.handlers {
            if handler.can_handle(&request, req.headers()).await? {
                tracing::debug!(
                    handler = handler.name(),
                    schema = %request.schema,
                    object = %request.object,
                    "Dispatching request"
                );
                return handler.process(&request).await;
            }
        }

        Ok(self.not_found(&request))
    }

    fn not_found(&self, request: &DataRequest) -> HttpResponse {
        self.settings.not_found(request)
    }
}

/// Whether the request arrived over HTTPS, either by its URI scheme or by a
/// [`Scheme`] extension set by the transport.
pub fn is_https(req: &Request<Bytes>) -> bool {
    req.extensions()
        .get::<Scheme>()
        .or_else(|| req.uri().scheme())
        .is_some_and(|scheme| *scheme == Scheme::HTTPS)
}
