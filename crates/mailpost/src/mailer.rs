//! Session lifecycle: validation, spawning, and the per-session driver.

use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::BytesMut;
use mailpost_smtp::{Action, Completion, Session, State, Transmit};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{self, Instant};

use crate::config::MailerConfig;
use crate::delivery::{Delivery, Outcome, Receipt};
use crate::error::{DeliveryError, Error, Result};
use crate::registry::{Registry, SessionId};
use crate::request::MailRequest;
use crate::resolver::{Resolver, SystemResolver};
use crate::transport::{Connector, TcpConnector};

const READ_BUFFER_SIZE: usize = 4096;

/// Starts SMTP submissions and tracks them until they finish.
///
/// Each call to [`Mailer::initiate`] spawns one task that owns the
/// connection; the mailer keeps the session state in its registry until the
/// outcome is reported. Cloning a `Mailer` shares the registry.
pub struct Mailer<C = TcpConnector, R = SystemResolver> {
    inner: Arc<Inner<C, R>>,
    runtime: Option<Handle>,
}

struct Inner<C, R> {
    config: MailerConfig,
    registry: Registry,
    connector: C,
    resolver: R,
}

impl Mailer {
    /// Creates a mailer with the system resolver and the TCP/rustls
    /// connector.
    ///
    /// Sessions are spawned on the tokio runtime that is current when the
    /// mailer is created, or when `initiate` is called if there is none yet.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(config: MailerConfig) -> Result<Self> {
        let connector = TcpConnector::new(&config);
        Self::with_parts(config, connector, SystemResolver)
    }
}

impl<C: Connector, R: Resolver> Mailer<C, R> {
    /// Creates a mailer with custom network collaborators.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn with_parts(config: MailerConfig, connector: C, resolver: R) -> Result<Self> {
        config.validate()?;
        tracing::info!(client_name = %config.client_name, "mailer initialized");
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                registry: Registry::default(),
                connector,
                resolver,
            }),
            runtime: Handle::try_current().ok(),
        })
    }

    /// Spawns sessions on `runtime` instead of the ambient one.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MailerConfig {
        &self.inner.config
    }

    /// Validates `request` and starts submitting it in the background.
    ///
    /// The session is registered before its task is spawned, so the
    /// returned [`Delivery`] id is immediately in flight.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invalid` if a field fails validation and
    /// `Error::NoRuntime` if there is no tokio runtime to run on. Neither
    /// touches the network nor the registry.
    pub fn initiate(&self, request: MailRequest) -> Result<Delivery> {
        let (message, credentials) = request.validate().inspect_err(|err| {
            tracing::warn!(field = err.field(), error = %err, "rejected mail request");
        })?;

        let runtime = match &self.runtime {
            Some(runtime) => runtime.clone(),
            None => Handle::try_current().map_err(|_| {
                tracing::warn!("no tokio runtime available; mail not sent");
                Error::NoRuntime
            })?,
        };

        let id = SessionId::new();
        let (notify, outcome) = oneshot::channel();
        let session = Session::new(self.inner.config.client_name.as_str(), message, credentials);
        self.inner.registry.insert(id, session, notify);

        let MailRequest { host, port, .. } = request;
        tracing::debug!(%id, %host, port, "starting submission");
        let guard = SessionGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        let task = runtime.spawn(drive(guard, host, port));
        self.inner.registry.attach_task(&id, task.abort_handle());

        Ok(Delivery::new(id, outcome))
    }

    /// Returns the number of sessions that have not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns true while the session has not reported its outcome.
    #[must_use]
    pub fn is_in_flight(&self, id: &SessionId) -> bool {
        self.inner.registry.contains(id)
    }

    /// Returns the dialog state of an in-flight session.
    #[must_use]
    pub fn state_of(&self, id: &SessionId) -> Option<State> {
        self.inner.registry.state(id)
    }

    /// Aborts every in-flight session; each completes as
    /// [`DeliveryError::Cancelled`].
    pub fn shutdown(&self) {
        let cancelled = self.inner.registry.cancel_all();
        tracing::info!(cancelled, "mailer shut down");
    }
}

impl<C, R> Clone for Mailer<C, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            runtime: self.runtime.clone(),
        }
    }
}

impl<C, R> fmt::Debug for Mailer<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

/// Completes the session as cancelled if its task is dropped before
/// reporting, whether it never ran, panicked or was aborted.
struct SessionGuard<C, R> {
    inner: Arc<Inner<C, R>>,
    id: SessionId,
}

impl<C, R> Drop for SessionGuard<C, R> {
    fn drop(&mut self) {
        self.inner.registry.finish(&self.id, Err(DeliveryError::Cancelled));
    }
}

/// Runs one session to completion under its deadline.
async fn drive<C: Connector, R: Resolver>(guard: SessionGuard<C, R>, host: String, port: u16) {
    let inner = &guard.inner;
    let id = guard.id;
    let deadline = Instant::now() + inner.config.session_timeout;
    let failure = match time::timeout_at(deadline, converse(inner, id, &host, port)).await {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err,
        Err(_) => DeliveryError::TimedOut,
    };
    inner.registry.finish(&id, Err(failure));
}

/// Resolves, connects and runs the SMTP dialog.
///
/// Returns `Ok` once the outcome has been reported through the registry, or
/// when the session vanished underneath; transport failures are returned for
/// the caller to report.
async fn converse<C: Connector, R: Resolver>(
    inner: &Inner<C, R>,
    id: SessionId,
    host: &str,
    port: u16,
) -> std::result::Result<(), DeliveryError> {
    let addr = inner
        .resolver
        .resolve(host, port)
        .await
        .map_err(|source| DeliveryError::Resolve {
            host: host.to_string(),
            source,
        })?;

    let mut stream = time::timeout(inner.config.connect_timeout, inner.connector.connect(addr))
        .await
        .map_err(|_| DeliveryError::Connect(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")))?
        .map_err(DeliveryError::Connect)?;

    if !inner.registry.contains(&id) {
        tracing::trace!(%id, "session gone before connect completed");
        return Ok(());
    }
    tracing::debug!(%id, %addr, "connected");

    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        buf.clear();
        let n = stream.read_buf(&mut buf).await.map_err(DeliveryError::Io)?;

        if n == 0 {
            if let Some(completion) = inner.registry.with_session(&id, Session::handle_disconnect).flatten() {
                tracing::debug!(%id, "server closed the connection");
                inner.registry.finish(&id, outcome(id, completion));
            }
            return Ok(());
        }

        tracing::trace!(%id, data = %String::from_utf8_lossy(&buf).trim_end(), "received");
        let Some(actions) = inner.registry.with_session(&id, |session| session.handle_input(&buf)) else {
            tracing::trace!(%id, "session gone, dropping input");
            return Ok(());
        };

        for action in actions {
            match action {
                Action::Send(transmit) => send(&mut stream, id, &transmit).await?,
                Action::StartTls => {
                    stream = inner
                        .connector
                        .upgrade(stream, host)
                        .await
                        .map_err(DeliveryError::Transport)?;
                    tracing::debug!(%id, "TLS established");
                    match inner.registry.with_session(&id, Session::handle_tls_established) {
                        Some(Some(ehlo)) => send(&mut stream, id, &ehlo).await?,
                        Some(None) => {}
                        None => return Ok(()),
                    }
                }
                Action::Complete(completion) => {
                    inner.registry.finish(&id, outcome(id, completion));
                    if let Err(err) = stream.shutdown().await {
                        tracing::trace!(%id, error = %err, "shutdown after completion failed");
                    }
                    return Ok(());
                }
            }
        }
    }
}

async fn send<S: AsyncWrite + Unpin>(
    stream: &mut S,
    id: SessionId,
    transmit: &Transmit,
) -> std::result::Result<(), DeliveryError> {
    tracing::trace!(%id, data = ?transmit, "sending");
    stream.write_all(&transmit.data).await.map_err(DeliveryError::Io)?;
    stream.flush().await.map_err(DeliveryError::Io)
}

fn outcome(id: SessionId, completion: Completion) -> Outcome {
    match completion {
        Completion::Delivered => Ok(Receipt { id }),
        Completion::Rejected { state, reply } => Err(DeliveryError::Rejected { state, reply }),
        Completion::ConnectionLost { state } => Err(DeliveryError::ConnectionClosed { state }),
    }
}
