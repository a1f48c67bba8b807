//! Listener set: one accept loop per mapping.
//!
//! Every mapping binds its own socket (plain or TLS) and serves HTTP/1.1 with
//! its own [`MappingHandler`]. Mappings share nothing but the transcript
//! writer and the backend client.

use super::forwarding::Forwarder;
use super::handler::MappingHandler;
use super::network::create_listener;
use super::tls::create_tls_acceptor;
use crate::config::Mapping;
use crate::error::BindError;
use crate::transcript::TranscriptWriter;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

/// What to do when one mapping cannot start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindPolicy {
    /// Log the failure and keep starting the other mappings
    #[default]
    Isolate,
    /// Stop everything already started and fail
    AbortAll,
}

/// A started mapping listener.
#[derive(Debug)]
pub struct RunningListener {
    pub name: String,
    pub local_addr: SocketAddr,
    pub tls: bool,
    handle: JoinHandle<()>,
}

/// All running mapping listeners.
pub struct ListenerSet {
    listeners: Vec<RunningListener>,
    failures: Vec<BindError>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ListenerSet {
    /// Bind and start every mapping.
    ///
    /// Fails when no mapping could start, or on the first failure under
    /// [`BindPolicy::AbortAll`].
    pub async fn start(
        mappings: Vec<Mapping>,
        writer: Arc<TranscriptWriter>,
        forwarder: Arc<dyn Forwarder>,
        policy: BindPolicy,
    ) -> Result<Self, BindError> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut set = Self {
            listeners: Vec::with_capacity(mappings.len()),
            failures: Vec::new(),
            shutdown_tx,
        };

        for mapping in mappings {
            let handler = Arc::new(MappingHandler::new(
                Arc::new(mapping),
                Arc::clone(&forwarder),
                Arc::clone(&writer),
            ));

            match set.start_one(handler).await {
                Ok(listener) => set.listeners.push(listener),
                Err(e) if policy == BindPolicy::AbortAll => {
                    set.shutdown().await;
                    return Err(e);
                }
                Err(e) => {
                    error!("{}", e);
                    set.failures.push(e);
                }
            }
        }

        if set.listeners.is_empty() {
            return Err(set.failures.pop().unwrap_or(BindError::NothingStarted));
        }

        Ok(set)
    }

    pub fn listeners(&self) -> &[RunningListener] {
        &self.listeners
    }

    /// Mappings that failed to start under [`BindPolicy::Isolate`].
    pub fn failures(&self) -> &[BindError] {
        &self.failures
    }

    /// Bound address of the first started mapping with this name.
    /// Names need not be unique; use [`listeners`](Self::listeners) to see all.
    pub fn local_addr(&self, name: &str) -> Option<SocketAddr> {
        self.listeners
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.local_addr)
    }

    /// Stop accepting on every listener. In-flight connections finish on their own.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(());
        for listener in self.listeners.drain(..) {
            if let Err(e) = listener.handle.await {
                debug!("Listener task for {} ended abnormally: {}", listener.name, e);
            }
        }
    }

    async fn start_one(&self, handler: Arc<MappingHandler>) -> Result<RunningListener, BindError> {
        let mapping = handler.mapping();
        let name = mapping.name.clone();
        let spec = &mapping.listen;

        let addr = tokio::net::lookup_host((spec.interface.as_str(), spec.port))
            .await
            .map_err(|e| e.to_string())
            .and_then(|mut addrs| addrs.next().ok_or_else(|| "no address".to_string()))
            .map_err(|reason| BindError::Resolve {
                mapping: name.clone(),
                interface: spec.interface.clone(),
                port: spec.port,
                reason,
            })?;

        let tls_acceptor = match &spec.tls {
            Some(tls) => Some(create_tls_acceptor(&tls.cert, &tls.key).map_err(|e| {
                BindError::Tls {
                    mapping: name.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let listener = create_listener(addr).map_err(|source| BindError::Bind {
            mapping: name.clone(),
            addr,
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| BindError::Bind {
            mapping: name.clone(),
            addr,
            source,
        })?;

        info!(
            "Proxy [{}] listening on {} -> Targeting {}",
            name,
            local_addr.port(),
            mapping.target
        );

        let tls = tls_acceptor.is_some();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(accept_loop(listener, tls_acceptor, handler, shutdown_rx));

        Ok(RunningListener {
            name,
            local_addr,
            tls,
            handle,
        })
    }
}

async fn accept_loop(
    listener: TcpListener,
    tls_acceptor: Option<TlsAcceptor>,
    handler: Arc<MappingHandler>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, remote_addr)) => {
                        let handler = Arc::clone(&handler);
                        let tls_acceptor = tls_acceptor.clone();
                        tokio::spawn(async move {
                            match tls_acceptor {
                                Some(acceptor) => match acceptor.accept(stream).await {
                                    Ok(tls_stream) => {
                                        serve_connection(tls_stream, handler, remote_addr).await
                                    }
                                    Err(err) => {
                                        error!(
                                            "[{}] TLS handshake failed from {}: {}",
                                            handler.mapping().name, remote_addr, err
                                        );
                                    }
                                },
                                None => serve_connection(stream, handler, remote_addr).await,
                            }
                        });
                    }
                    Err(e) => {
                        error!("[{}] Accept error: {}", handler.mapping().name, e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Proxy [{}] shutting down", handler.mapping().name);
                break;
            }
        }
    }
}

async fn serve_connection<I>(io: I, handler: Arc<MappingHandler>, remote_addr: SocketAddr)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let name = handler.mapping().name.clone();
    let service = service_fn(move |req: Request<Incoming>| {
        let handler = Arc::clone(&handler);
        async move { Ok::<_, Infallible>(handler.handle(req).await) }
    });

    if let Err(err) = http1::Builder::new()
        .serve_connection(TokioIo::new(io), service)
        .await
    {
        debug!("[{}] Error serving connection from {}: {}", name, remote_addr, err);
    }
}
