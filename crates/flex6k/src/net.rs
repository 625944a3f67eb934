//! Socket plumbing shared by the session and the smartlink listener.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use flex6k_core::{Error, Result};

/// A byte stream a session can run over: plain TCP for LAN radios, TLS for
/// relay-tunnelled ones and the relay itself.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

/// A boxed connection, so connect paths with different stream types share
/// one reader/writer shape.
pub type BoxedConnection = Box<dyn Connection>;

/// Open a plain TCP connection with Nagle disabled.
pub(crate) async fn tcp_connect(host: &str, port: u16) -> Result<TcpStream> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::Transport(format!("TCP connect to {host}:{port} failed: {e}")))?;
    let _ = stream.set_nodelay(true);
    Ok(stream)
}

/// Open a TLS connection using the webpki root store.
pub(crate) async fn tls_connect(
    host: &str,
    port: u16,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let tcp = tcp_connect(host, port).await?;
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::Transport(format!("invalid TLS server name: {host}")))?;

    connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| Error::Transport(format!("TLS handshake with {host}:{port} failed: {e}")))
}
