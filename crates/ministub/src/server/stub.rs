//! The stub HTTP server: reserved routes, dispatch, stats and the accept loop.

use super::router::resolve;
use super::selector::select;
use super::stats::{StatsLedger, StatsSnapshot};
use super::types::{build_response, collect_request, decode_path, error_response, json_response};
use super::validator::validate_request;
use crate::actions::ActionExecutor;
use crate::definition::Definition;
use crate::error::DispatchError;
use crate::metrics;
use crate::requester::HttpRequester;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::HOST;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Serves the endpoints of one definition.
pub struct StubServer {
    definition: Arc<Definition>,
    stats: StatsLedger,
    actions: ActionExecutor,
    shutdown_tx: broadcast::Sender<()>,
}

impl StubServer {
    pub fn new(definition: Arc<Definition>, actions: ActionExecutor) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            definition,
            stats: StatsLedger::new(),
            actions,
            shutdown_tx,
        }
    }

    /// Current request counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Ask the accept loop to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Answer one fully-buffered request.
    pub fn handle(&self, req: Request<Bytes>) -> Response<Full<Bytes>> {
        let host = req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let path = decode_path(req.uri().path());

        let response = match self.reserved_route(req.method(), &path) {
            Some(response) => {
                info!("{} | {} | {}", host, path, response.status().as_u16());
                response
            }
            None => match self.dispatch(&req, &path) {
                Ok(response) => {
                    info!("{} | {} | {}", host, path, response.status().as_u16());
                    response
                }
                Err(e) => {
                    error!("{} | {} | {} - {}", host, path, e.status_code().as_u16(), e);
                    error_response(&e)
                }
            },
        };

        metrics::record_request(req.method().as_str(), response.status().as_u16());
        response
    }

    /// `GET /stats` and `/exit` shadow any declared endpoint.
    fn reserved_route(&self, method: &Method, path: &str) -> Option<Response<Full<Bytes>>> {
        match (method, path) {
            (&Method::GET, "/stats") => Some(json_response(StatusCode::OK, &self.stats())),
            (_, "/exit") => {
                info!("Exit Requested, Shutting Down...");
                self.shutdown();
                Some(json_response(
                    StatusCode::OK,
                    &serde_json::json!({ "status": "exiting" }),
                ))
            }
            _ => None,
        }
    }

    fn dispatch(
        &self,
        req: &Request<Bytes>,
        path: &str,
    ) -> Result<Response<Full<Bytes>>, DispatchError> {
        let matched = resolve(&self.definition.endpoints, req.method().as_str(), path)?;
        let endpoint = matched.endpoint;
        self.stats
            .ensure_route(matched.key(), endpoint.reply.status_codes());

        validate_request(endpoint, req.uri().query(), req.headers(), req.body())?;

        let selection = select(&endpoint.reply, &mut rand::thread_rng());
        let response = selection.render(matched.key())?;
        self.stats.increment(matched.key(), selection.status);

        if !endpoint.actions.is_empty() {
            self.actions.spawn_actions(endpoint.actions.clone(), path);
        }
        if !selection.actions().is_empty() {
            self.actions
                .spawn_actions(selection.actions().to_vec(), path);
        }

        Ok(response)
    }

    /// Accept connections until `/exit` is requested or [`StubServer::shutdown`] is called.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), anyhow::Error> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let local_addr = listener.local_addr()?;
        info!("Beginning Listening For HTTP Requests On {}", local_addr);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let server = Arc::clone(&server);
                                    async move {
                                        let req = collect_request(req).await?;
                                        Ok::<_, hyper::Error>(server.handle(req))
                                    }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection error on {}: {}", local_addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", local_addr, e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Stub server on {} shutting down", local_addr);
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Bind `bind:port`, run the startup actions and serve `definition` until exit.
///
/// Failing to bind is returned as an error; everything after that is request-scoped.
pub async fn start(bind: &str, port: u16, definition: Definition) -> Result<(), anyhow::Error> {
    let definition = Arc::new(definition);
    let requester = HttpRequester::new().context("Unable to build outbound HTTP client")?;
    let actions = ActionExecutor::new(Arc::clone(&definition), Arc::new(requester));

    let listener = TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("Unable to bind {bind}:{port}"))?;

    if !definition.startup_actions.is_empty() {
        actions.spawn_actions(definition.startup_actions.clone(), "startup");
    }

    let server = Arc::new(StubServer::new(definition, actions));
    server.serve(listener).await
}

/// Standalone text-format Prometheus listener, kept off the stub port.
pub async fn serve_metrics(listener: TcpListener) -> Result<(), anyhow::Error> {
    info!("Metrics available on http://{}/metrics", listener.local_addr()?);

    loop {
        let (stream, _) = listener.accept().await?;
        tokio::spawn(async move {
            let service = service_fn(|req: Request<hyper::body::Incoming>| async move {
                let response = match (req.method(), req.uri().path()) {
                    (&Method::GET, "/metrics") => build_response(StatusCode::OK, metrics::collect_metrics()),
                    _ => build_response(StatusCode::NOT_FOUND, "Not Found"),
                };
                Ok::<_, hyper::Error>(response)
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Metrics connection error: {}", e);
            }
        });
    }
}
