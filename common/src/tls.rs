use std::{sync::Arc, time::Duration};

use tokio::{net::TcpStream, time::timeout};
use tokio_rustls::{
    rustls::{
        self,
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider},
        pki_types::{CertificateDer, ServerName, UnixTime},
        ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
    },
    TlsConnector,
};
use tracing::{debug, info, warn};

use crate::{
    config::ApiConfig,
    error::ClientError,
    http::{exchange, Request, Response, Transport},
};

/// Opens a fresh TLS connection per request against the configured API host.
#[derive(Clone)]
pub struct TlsTransport {
    host: String,
    port: u16,
    user_agent: String,
    server_name: ServerName<'static>,
    connector: TlsConnector,
    connect_timeout: Duration,
    response_timeout: Duration,
    max_body_bytes: usize,
}

impl TlsTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let server_name = ServerName::try_from(config.host.clone())
            .map_err(|err| ClientError::Tls(format!("invalid host {}: {err}", config.host)))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|err| ClientError::Tls(err.to_string()))?;

        let tls_config = if config.accept_invalid_certs {
            warn!(
                "certificate validation disabled for {}; any server certificate is accepted",
                config.host
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
                .with_no_client_auth()
        } else {
            builder
                .with_root_certificates(native_roots())
                .with_no_client_auth()
        };

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            user_agent: config.user_agent.clone(),
            server_name,
            connector: TlsConnector::from(Arc::new(tls_config)),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            response_timeout: Duration::from_millis(config.response_timeout_ms),
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn round_trip(&self, request: &Request) -> Result<Response, ClientError> {
        let connect = async {
            let tcp = TcpStream::connect((self.host.as_str(), self.port)).await?;
            self.connector
                .connect(self.server_name.clone(), tcp)
                .await
                .map_err(ClientError::Connection)
        };
        let mut stream = timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| ClientError::Timeout)??;

        timeout(
            self.response_timeout,
            exchange(
                &mut stream,
                &self.host,
                &self.user_agent,
                request,
                self.max_body_bytes,
            ),
        )
        .await
        .map_err(|_| ClientError::Timeout)?
    }
}

impl Transport for TlsTransport {
    async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        info!("{} {}", request.method.as_str(), request.path);

        let response = self.round_trip(request).await;
        match &response {
            Ok(response) => debug!(
                "{} {} -> {:?} ({} bytes)",
                request.method.as_str(),
                request.path,
                response.status,
                response.body.len()
            ),
            Err(err) => warn!("{} {} failed: {err}", request.method.as_str(), request.path),
        }
        response
    }
}

fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        warn!("failed to load a platform root certificate: {err}");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!("loaded {added} platform root certificates ({ignored} ignored)");
    roots
}

/// Trusts whatever certificate the server presents. Handshake signatures are
/// still checked so the session keys belong to that certificate.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
