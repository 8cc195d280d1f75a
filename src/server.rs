//! HTTP server implementation using hyper.
//!
//! The server hosts a single [`Broker`]. Each request is read, stamped with
//! the caller's principal and (when trusted) its forwarded scheme, and handed
//! to the broker. Requests the broker does not claim fall through to a plain
//! 404.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::http::uri::Scheme;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::auth;
use crate::broker::Broker;
use crate::config::Config;
use crate::response::{self, HttpResponse};

/// Maximum request body size in bytes (1 MB).
const MAX_BODY_SIZE: usize = 1_048_576;

/// Maximum number of concurrent connections.
const MAX_CONNECTIONS: usize = 128;

/// Timeout for reading request headers (slowloris protection).
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared server state.
pub struct State {
    pub config: Config,
    pub broker: Arc<Broker>,
}

/// Handle to a running server instance.
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<crate::Result<()>>,
}

impl Server {
    /// The address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the accept loop and wait for it to finish.
    pub async fn shutdown(self) -> crate::Result<()> {
        let _ = self.shutdown_tx.send(());
        self.task.await.unwrap_or(Ok(()))
    }
}

/// Add security headers to a response.
fn add_standard_headers(response: &mut HttpResponse) {
    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
}

/// Fallback for requests the broker does not claim.
async fn pass_through(_req: Request<Bytes>) -> HttpResponse {
    response::not_found("Not found")
}

/// Whether a trusted proxy reported the original request as HTTPS.
fn forwarded_https(req: &Request<Bytes>) -> bool {
    req.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<State>,
) -> Result<HttpResponse, std::convert::Infallible> {
    let (parts, body) = req.into_parts();

    // Reject oversized bodies early via Content-Length header
    if let Some(cl) = parts.headers.get(hyper::header::CONTENT_LENGTH)
        && let Ok(len) = cl.to_str().unwrap_or("0").parse::<usize>()
        && len > MAX_BODY_SIZE
    {
        let mut response = response::error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
        add_standard_headers(&mut response);
        return Ok(response);
    }

    // Read body with size limit (fallback for chunked encoding)
    let body_bytes = match BodyExt::collect(Limited::new(body, MAX_BODY_SIZE)).await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            let mut response = response::error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
            add_standard_headers(&mut response);
            return Ok(response);
        }
    };

    let mut req = Request::from_parts(parts, body_bytes);

    let principal = auth::authenticate(req.headers(), &state.config.auth);
    req.extensions_mut().insert(principal);
    if state.config.server.trust_forwarded_proto && forwarded_https(&req) {
        req.extensions_mut().insert(Scheme::HTTPS);
    }

    let mut response = state.broker.process(req, pass_through).await;
    add_standard_headers(&mut response);
    Ok(response)
}

/// Bind, start accepting connections, and return a handle.
///
/// The returned [`Server`] exposes the bound address and a
/// [`shutdown`](Server::shutdown) method for graceful termination.
pub async fn start(config: Config, broker: Arc<Broker>) -> crate::Result<Server> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    info!(
        endpoint = %broker.settings().endpoint,
        require_https = broker.settings().require_https,
        "Broker listening on http://{}",
        addr
    );

    let state = Arc::new(State { config, broker });

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let semaphore = Arc::new(Semaphore::new(MAX_CONNECTIONS));

    let task = tokio::spawn(async move {
        tokio::pin!(shutdown_rx);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = result?;
                    let io = TokioIo::new(stream);

                    match semaphore.clone().try_acquire_owned() {
                        Ok(permit) => {
                            let state = Arc::clone(&state);
                            tokio::spawn(async move {
                                let service = service_fn(move |req| {
                                    let state = Arc::clone(&state);
                                    handle_request(req, state)
                                });

                                let mut builder = auto::Builder::new(TokioExecutor::new());
                                builder.http1()
                                    .timer(TokioTimer::new())
                                    .header_read_timeout(HEADER_READ_TIMEOUT);

                                if let Err(e) = builder.serve_connection(io, service).await {
                                    error!("Error serving connection from {}: {}", remote_addr, e);
                                }

                                drop(permit);
                            });
                        }
                        Err(_) => {
                            warn!("Connection limit reached, rejecting {}", remote_addr);
                            tokio::spawn(async move {
                                let service = service_fn(|_req: Request<Incoming>| async {
                                    Ok::<_, std::convert::Infallible>(response::error(
                                        StatusCode::SERVICE_UNAVAILABLE,
                                        "Service unavailable",
                                    ))
                                });

                                let mut builder = auto::Builder::new(TokioExecutor::new());
                                builder.http1()
                                    .timer(TokioTimer::new())
                                    .header_read_timeout(HEADER_READ_TIMEOUT);

                                let _ = builder.serve_connection(io, service).await;
                            });
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    break;
                }
            }
        }

        Ok(())
    });

    Ok(Server {
        addr,
        shutdown_tx,
        task,
    })
}

/// Run the HTTP server until the accept loop ends.
pub async fn run(config: Config, broker: Arc<Broker>) -> crate::Result<()> {
    let server = start(config, broker).await?;
    server.task.await.unwrap_or(Ok(()))
}
