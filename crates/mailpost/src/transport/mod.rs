//! Connection establishment and STARTTLS.
//!
//! The [`Connector`] trait is the seam between the mailer and the network.
//! [`TcpConnector`] is the production implementation: tokio TCP plus
//! tokio-rustls.

mod stream;
mod tls;

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

pub use stream::MailStream;
pub use tls::tls_connector;

use crate::Result;
use crate::config::MailerConfig;

/// Opens connections to SMTP servers and upgrades them to TLS.
pub trait Connector: Send + Sync + 'static {
    /// The byte stream a session runs over.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Opens a plaintext connection.
    fn connect(&self, addr: SocketAddr) -> impl Future<Output = io::Result<Self::Stream>> + Send;

    /// Runs the TLS handshake on an open connection after `STARTTLS`.
    fn upgrade(
        &self,
        stream: Self::Stream,
        host: &str,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Production connector: TCP with rustls for the upgrade.
#[derive(Clone)]
pub struct TcpConnector {
    tls: TlsConnector,
}

impl TcpConnector {
    /// Creates a connector following the configuration's TLS policy.
    #[must_use]
    pub fn new(config: &MailerConfig) -> Self {
        Self {
            tls: tls_connector(config.accept_invalid_certs),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = MailStream;

    async fn connect(&self, addr: SocketAddr) -> io::Result<MailStream> {
        let tcp = TcpStream::connect(addr).await?;
        tcp.set_nodelay(true)?;
        Ok(MailStream::Plain(tcp))
    }

    async fn upgrade(&self, stream: MailStream, host: &str) -> Result<MailStream> {
        stream.upgrade(&self.tls, host).await
    }
}

impl fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConnector").finish_non_exhaustive()
    }
}
