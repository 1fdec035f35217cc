use std::{fs::File, io::BufReader, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_rustls::{
    rustls::{self, ServerConfig},
    server::TlsStream,
    TlsAcceptor,
};
use tracing::{debug, warn};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const PENDING_CONNECTIONS: usize = 16;

type Accepted = (TlsStream<TcpStream>, SocketAddr);

pub fn load_server_config(cert_path: &str, key_path: &str) -> anyhow::Result<Arc<ServerConfig>> {
    let cert_file =
        File::open(cert_path).with_context(|| format!("failed to open certificate {cert_path}"))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid certificate in {cert_path}"))?;

    let key_file =
        File::open(key_path).with_context(|| format!("failed to open private key {key_path}"))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .with_context(|| format!("invalid private key in {key_path}"))?
        .with_context(|| format!("no private key found in {key_path}"))?;

    let config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .context("unsupported tls protocol versions")?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .context("certificate and key do not match")?;

    Ok(Arc::new(config))
}

/// Hands out connections that completed a TLS handshake. Each handshake runs
/// in its own task, so a slow or silent client never holds up the others.
/// Failed handshakes are dropped.
pub struct TlsListener {
    local_addr: SocketAddr,
    ready: mpsc::Receiver<Accepted>,
}

impl TlsListener {
    /// Starts accepting on `inner` right away. Must be called inside a tokio
    /// runtime.
    pub fn new(inner: TcpListener, config: Arc<ServerConfig>) -> std::io::Result<Self> {
        let local_addr = inner.local_addr()?;
        let (sender, ready) = mpsc::channel(PENDING_CONNECTIONS);
        tokio::spawn(accept_loop(inner, TlsAcceptor::from(config), sender));
        Ok(Self { local_addr, ready })
    }
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    ready: mpsc::Sender<Accepted>,
) {
    while !ready.is_closed() {
        let (stream, addr) = match listener.accept().await {
            Ok(connection) => connection,
            Err(err) => {
                warn!("status server accept failed: {err}");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let ready = ready.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                Ok(Ok(tls)) => {
                    if ready.send((tls, addr)).await.is_err() {
                        debug!("status server gone before {addr} was served");
                    }
                }
                Ok(Err(err)) => debug!("tls handshake with {addr} failed: {err}"),
                Err(_) => debug!("tls handshake with {addr} timed out"),
            }
        });
    }
}

impl axum::serve::Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        match self.ready.recv().await {
            Some(accepted) => accepted,
            // The accept task only stops once this receiver is gone.
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use axum::serve::Listener;

    use ambience_common::{ApiConfig, Request, TlsTransport, Transport};

    use super::*;

    fn fixture(name: &str) -> String {
        format!("{}/../common/testdata/{name}", env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn missing_certificate_is_reported() {
        let err = load_server_config("/nonexistent/cert.pem", "/nonexistent/key.pem").unwrap_err();

        assert!(format!("{err:#}").contains("/nonexistent/cert.pem"));
    }

    #[test]
    fn loads_pem_certificate_and_key() {
        assert!(load_server_config(&fixture("localhost.crt"), &fixture("localhost.key")).is_ok());
    }

    #[tokio::test]
    async fn idle_client_does_not_hold_up_others() {
        let config = load_server_config(&fixture("localhost.crt"), &fixture("localhost.key")).unwrap();
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut listener = TlsListener::new(tcp, config).unwrap();
        let addr = listener.local_addr().unwrap();

        // Connects and never starts a handshake.
        let _idle = TcpStream::connect(addr).await.unwrap();

        let api = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
            accept_invalid_certs: true,
            ..ApiConfig::default()
        };
        let mut transport = TlsTransport::new(&api).unwrap();
        let client = tokio::spawn(async move { transport.send(&Request::get("/index")).await });

        let accepted = tokio::time::timeout(Duration::from_secs(3), listener.accept()).await;

        assert!(accepted.is_ok());
        client.abort();
    }
}
