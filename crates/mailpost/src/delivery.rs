//! Delivery handles and outcomes.

use std::fmt;

use tokio::sync::oneshot;

use crate::error::DeliveryError;
use crate::registry::SessionId;

/// Final result of one submission attempt.
pub type Outcome = std::result::Result<Receipt, DeliveryError>;

/// Proof that the server accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// The session that delivered the message.
    pub id: SessionId,
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "email sent, id: {}", self.id)
    }
}

/// Handle to a submission started by [`crate::Mailer::initiate`].
///
/// Dropping the handle does not cancel the submission; its outcome is then
/// only logged.
#[derive(Debug)]
pub struct Delivery {
    id: SessionId,
    outcome: oneshot::Receiver<Outcome>,
}

impl Delivery {
    pub(crate) const fn new(id: SessionId, outcome: oneshot::Receiver<Outcome>) -> Self {
        Self { id, outcome }
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Waits for the submission to finish.
    ///
    /// # Errors
    ///
    /// Returns the [`DeliveryError`] that ended the session. If the mailer
    /// goes away without reporting, the delivery counts as cancelled.
    pub async fn outcome(self) -> Outcome {
        self.outcome.await.unwrap_or(Err(DeliveryError::Cancelled))
    }
}
