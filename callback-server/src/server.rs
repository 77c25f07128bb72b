//! HTTP server for receiving hub verification and notification requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::error::ServerError;
use crate::router::{HookRouter, NotificationPayload, VerificationRequest, SIGNATURE_HEADER};

/// Default upper bound for notification bodies (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

/// PEM-encoded certificate material for terminating TLS in-process.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM certificate chain
    pub cert: Vec<u8>,
    /// PEM private key
    pub key: Vec<u8>,
}

impl TlsConfig {
    /// Create TLS material from PEM certificate and key bytes.
    pub fn new(cert: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert", &format_args!("{} bytes", self.cert.len()))
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Bind settings for a [`CallbackServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub bind_addr: SocketAddr,
    /// Terminate TLS in-process when set
    pub tls: Option<TlsConfig>,
    /// Upper bound for notification bodies
    pub max_body_bytes: u64,
}

impl ServerConfig {
    /// Plain HTTP on `bind_addr` with the default body limit.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            tls: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_tls(mut self, tls: Option<TlsConfig>) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// HTTP callback server for hub verification and notification requests.
///
/// The server exposes two routes:
///
/// - `GET /{id}`: verification, answered from [`HookRouter::verify`]
/// - `POST /{id}`: notification, answered from [`HookRouter::notify`]
///
/// It owns no subscription state; every decision is delegated to the router.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use callback_server::{
///     CallbackServer, HookRouter, NotificationPayload, NotificationReply, ServerConfig,
///     VerificationReply, VerificationRequest,
/// };
///
/// struct RejectAll;
///
/// #[async_trait]
/// impl HookRouter for RejectAll {
///     async fn verify(&self, _id: &str, _request: VerificationRequest) -> VerificationReply {
///         VerificationReply::Gone
///     }
///     async fn notify(&self, _payload: NotificationPayload) -> NotificationReply {
///         NotificationReply::Gone
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let config = ServerConfig::new("0.0.0.0:8080".parse().unwrap());
///     let server = CallbackServer::start(config, Arc::new(RejectAll))
///         .await
///         .expect("Failed to start callback server");
///
///     println!("Listening on {}", server.local_addr());
///     server.shutdown().await;
/// }
/// ```
pub struct CallbackServer {
    /// The address the server is bound to
    local_addr: SocketAddr,
    /// Whether TLS is terminated by this server
    tls: bool,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind and start the server.
    ///
    /// Returns once the server accepts connections. Fails if the address can
    /// not be bound or the TLS material is rejected.
    pub async fn start(
        config: ServerConfig,
        router: Arc<dyn HookRouter>,
    ) -> Result<Self, ServerError> {
        let ServerConfig {
            bind_addr,
            tls,
            max_body_bytes,
        } = config;

        // The TLS builder panics instead of returning bind errors
        if tls.is_some() && bind_addr.port() != 0 && !crate::discovery::is_addr_available(bind_addr) {
            return Err(ServerError::AddressUnavailable(bind_addr));
        }

        let is_tls = tls.is_some();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let (ready_tx, mut ready_rx) = mpsc::channel::<Result<SocketAddr, ServerError>>(1);

        let server_handle = Self::spawn_server(
            bind_addr,
            tls,
            router,
            max_body_bytes,
            shutdown_rx,
            ready_tx,
        );

        let local_addr = match ready_rx.recv().await {
            Some(Ok(addr)) => addr,
            Some(Err(e)) => {
                let _ = server_handle.await;
                return Err(e);
            }
            None => {
                let message = match server_handle.await {
                    Err(join_error) if join_error.is_panic() => {
                        "server task panicked while binding (invalid TLS material?)".to_string()
                    }
                    _ => "server task exited before becoming ready".to_string(),
                };
                return Err(ServerError::StartupFailed(message));
            }
        };

        Ok(Self {
            local_addr,
            tls: is_tls,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Get the address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the port the server is bound to.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Whether this server terminates TLS itself.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Shutdown the server gracefully.
    ///
    /// Sends the shutdown signal and waits for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.server_handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "callback server task ended abnormally");
            }
        }

        info!(addr = %self.local_addr, "callback server stopped");
    }

    /// Start the HTTP server task and report the bound address on `ready_tx`.
    fn spawn_server(
        bind_addr: SocketAddr,
        tls: Option<TlsConfig>,
        router: Arc<dyn HookRouter>,
        max_body_bytes: u64,
        mut shutdown_rx: mpsc::Receiver<()>,
        ready_tx: mpsc::Sender<Result<SocketAddr, ServerError>>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let routes = routes(router, max_body_bytes);
            let shutdown = async move {
                shutdown_rx.recv().await;
            };

            match tls {
                Some(tls) => {
                    let (addr, server) = warp::serve(routes)
                        .tls()
                        .cert(tls.cert)
                        .key(tls.key)
                        .bind_with_graceful_shutdown(bind_addr, shutdown);

                    info!(%addr, "callback server listening (tls)");
                    let _ = ready_tx.send(Ok(addr)).await;
                    server.await;
                }
                None => match warp::serve(routes).try_bind_with_graceful_shutdown(bind_addr, shutdown) {
                    Ok((addr, server)) => {
                        info!(%addr, "callback server listening");
                        let _ = ready_tx.send(Ok(addr)).await;
                        server.await;
                    }
                    Err(e) => {
                        let _ = ready_tx
                            .send(Err(ServerError::Bind {
                                addr: bind_addr,
                                message: e.to_string(),
                            }))
                            .await;
                    }
                },
            }
        })
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}

/// Build the verification and notification routes.
fn routes(
    router: Arc<dyn HookRouter>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone + Send + Sync + 'static
{
    // Path filters come first so unknown paths reject as 404, not 405
    let verification = warp::path::param::<String>()
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_router(router.clone()))
        .and_then(handle_verification);

    let notification = warp::path::param::<String>()
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::header::optional::<String>(SIGNATURE_HEADER))
        .and(capped_body(max_body_bytes))
        .and(with_router(router))
        .and_then(handle_notification);

    verification.or(notification).recover(handle_rejection)
}

fn with_router(
    router: Arc<dyn HookRouter>,
) -> impl Filter<Extract = (Arc<dyn HookRouter>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || router.clone())
}

/// Notification body over the configured limit
#[derive(Debug)]
struct BodyTooLarge;

impl warp::reject::Reject for BodyTooLarge {}

/// The connection failed while the body was being read
#[derive(Debug)]
struct BodyReadFailed;

impl warp::reject::Reject for BodyReadFailed {}

/// Collect the request body, fixed-length or chunked, up to `limit` bytes.
///
/// A declared `content-length` over the limit is refused before reading.
fn capped_body(limit: u64) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and(warp::body::stream())
        .and_then(move |declared: Option<u64>, body| read_capped(body, declared, limit))
}

async fn read_capped<S, B>(body: S, declared: Option<u64>, limit: u64) -> Result<Bytes, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>> + Send,
    B: Buf + Send,
{
    if declared.is_some_and(|len| len > limit) {
        return Err(warp::reject::custom(BodyTooLarge));
    }

    futures::pin_mut!(body);
    let mut collected = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            debug!(error = %e, "failed to read notification body");
            warp::reject::custom(BodyReadFailed)
        })?;
        if (collected.len() + chunk.remaining()) as u64 > limit {
            return Err(warp::reject::custom(BodyTooLarge));
        }
        collected.put(chunk);
    }
    Ok(collected.freeze())
}

async fn handle_verification(
    subscription_id: String,
    query: HashMap<String, String>,
    router: Arc<dyn HookRouter>,
) -> Result<warp::reply::Response, Rejection> {
    let request = VerificationRequest::from_query(&query);
    debug!(
        subscription_id = %subscription_id,
        mode = ?request.mode,
        topic = ?request.topic,
        "verification request"
    );

    let reply = router.verify(&subscription_id, request).await;
    let status = reply.status();
    debug!(subscription_id = %subscription_id, status = %status, "verification reply");

    Ok(warp::reply::with_status(reply.into_body(), status).into_response())
}

async fn handle_notification(
    subscription_id: String,
    signature: Option<String>,
    body: Bytes,
    router: Arc<dyn HookRouter>,
) -> Result<warp::reply::Response, Rejection> {
    debug!(
        subscription_id = %subscription_id,
        body_len = body.len(),
        signed = signature.is_some(),
        "notification request"
    );

    let payload = NotificationPayload {
        subscription_id,
        body,
        signature,
    };

    let reply = router.notify(payload).await;
    Ok(warp::reply::with_status(warp::reply(), reply.status()).into_response())
}

/// Handle rejections and convert them to HTTP responses.
async fn handle_rejection(err: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not found";
    } else if err.find::<BodyTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large";
    } else if err.find::<BodyReadFailed>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Unreadable body";
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Invalid query string";
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        // Checked last: the other route's method filter always adds one
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed";
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error";
    }

    Ok(warp::reply::with_status(message, code))
}
