//! Host name resolution.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

/// Turns a server host and port into a socket address.
pub trait Resolver: Send + Sync + 'static {
    /// Resolves `host:port` to one address to connect to.
    fn resolve(&self, host: &str, port: u16) -> impl Future<Output = io::Result<SocketAddr>> + Send;
}

/// Resolver backed by the operating system, through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<SocketAddr> {
        tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no address for {host}")))
    }
}
