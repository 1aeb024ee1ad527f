//! Outbound mail
//!
//! Reminders are composed during evaluation, cached in an [`Outbox`], and
//! flushed through a [`MailTransport`] once the pass has finished.

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// One outbound email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to_name: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

impl MailMessage {
    pub fn html(
        to_name: impl Into<String>,
        to_address: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to_name: to_name.into(),
            to_address: to_address.into(),
            subject: subject.into(),
            body: body.into(),
            is_html: true,
        }
    }

    pub fn plain(
        to_address: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let to_address = to_address.into();
        Self {
            to_name: to_address.clone(),
            to_address,
            subject: subject.into(),
            body: body.into(),
            is_html: false,
        }
    }
}

/// Delivers email
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError>;
}

/// Queue of composed messages in front of a transport
pub struct Outbox {
    transport: Arc<dyn MailTransport>,
    cached: Mutex<Vec<MailMessage>>,
}

impl Outbox {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport,
            cached: Mutex::new(Vec::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Vec<MailMessage>> {
        self.cached.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a message for the next flush
    pub fn cache_email(&self, message: MailMessage) {
        debug!(to = %message.to_address, subject = %message.subject, "Email cached");
        self.cache().push(message);
    }

    /// Number of queued messages
    pub fn pending(&self) -> usize {
        self.cache().len()
    }

    /// Drop every queued message
    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    /// Send every queued message
    ///
    /// Stops at the first failure; that message and the ones after it stay
    /// queued. Returns the number of messages sent.
    pub async fn send_cached(&self) -> Result<usize, TransportError> {
        let queued: Vec<MailMessage> = std::mem::take(&mut *self.cache());
        let mut sent = 0;

        for (index, message) in queued.iter().enumerate() {
            if let Err(e) = self.transport.send(message).await {
                warn!(to = %message.to_address, error = %e, "Email delivery failed");
                let mut cache = self.cache();
                let mut remaining = queued[index..].to_vec();
                remaining.append(&mut cache);
                *cache = remaining;
                return Err(e);
            }
            sent += 1;
        }

        Ok(sent)
    }

    /// Send one message immediately, bypassing the queue
    pub async fn send_now(&self, message: &MailMessage) -> Result<(), TransportError> {
        self.transport.send(message).await
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("pending", &self.pending())
            .finish()
    }
}
