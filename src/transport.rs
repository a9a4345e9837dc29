//! TCP/TLS connector for the session driver.
//!
//! The session lifecycle is the only component that touches the
//! connection; everything produced here is handed straight to the line
//! codec. TLS uses the platform trust roots.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::warn;

/// One established connection, plain or TLS.
pub enum Conn {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Conn {
    /// Whether the connection is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        matches!(self, Conn::Tls(_))
    }
}

/// Connect to a server, optionally binding a local address and wrapping
/// the stream in TLS.
pub async fn connect(
    host: &str,
    port: u16,
    tls: bool,
    local_address: Option<IpAddr>,
) -> Result<Conn> {
    let stream = connect_tcp(host, port, local_address).await?;
    if let Err(e) = enable_keepalive(&stream) {
        warn!("failed to enable TCP keepalive: {}", e);
    }

    if !tls {
        return Ok(Conn::Tcp(stream));
    }

    let connector = tls_connector()?;
    let name =
        ServerName::try_from(host.to_string()).context("invalid TLS server name")?;
    let stream = connector
        .connect(name, stream)
        .await
        .context("TLS handshake failed")?;
    Ok(Conn::Tls(Box::new(stream)))
}

async fn connect_tcp(host: &str, port: u16, local_address: Option<IpAddr>) -> Result<TcpStream> {
    let mut last_err: Option<io::Error> = None;
    for addr in lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}"))?
    {
        // A bound local address restricts us to its address family.
        if let Some(local) = local_address {
            if local.is_ipv4() != addr.is_ipv4() {
                continue;
            }
        }
        let attempt = async {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            if let Some(local) = local_address {
                socket.bind(SocketAddr::new(local, 0))?;
            }
            socket.connect(addr).await
        };
        match attempt.await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(e) => anyhow::Error::from(e).context(format!("failed to connect to {host}:{port}")),
        None => anyhow!("no usable addresses for {host}:{port}"),
    })
}

fn enable_keepalive(stream: &TcpStream) -> Result<()> {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)?;
    Ok(())
}

fn tls_connector() -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        let _ = roots.add(cert);
    }
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

impl AsyncRead for Conn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Conn::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Conn::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Conn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Conn::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Conn::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Conn::Tcp(s) => Pin::new(s).poll_flush(cx),
            Conn::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Conn::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Conn::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
