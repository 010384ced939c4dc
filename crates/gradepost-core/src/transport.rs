//! Outbound mail session.
//!
//! [`Transport`] is what the dispatch loop talks to; [`SmtpTransport`] is the
//! real implementation on top of `gradepost-smtp`, holding one authenticated
//! session for the whole run.

use crate::config::{SenderData, Security, SmtpConfig};
use crate::error::{Error, Result};
use crate::mailer::MailMessage;
use gradepost_smtp::connection::{connect, connect_tls};
use gradepost_smtp::{Address, Authenticated, Client};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Sends composed messages over an open session.
///
/// The runtime is single-threaded, so the futures need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Sends one message to its single recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] after [`Transport::close`], [`Error::Rejected`]
    /// if the server refuses the message, or [`Error::Network`] if the
    /// session breaks.
    async fn send(&mut self, message: &MailMessage) -> Result<()>;

    /// Ends the session. Closing an already closed transport does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the server does not acknowledge QUIT.
    async fn close(&mut self) -> Result<()>;
}

enum Session {
    Open(Client<Authenticated>),
    Closed,
}

/// SMTP session authenticated as the sender.
pub struct SmtpTransport {
    session: Session,
    sender: Address,
    timeout: Duration,
}

impl fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("sender", &self.sender.as_str())
            .field("open", &self.is_open())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SmtpTransport {
    /// Connects, secures and authenticates a session.
    ///
    /// The whole handshake is bounded by `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the server refuses the credentials or
    /// offers no usable mechanism, [`Error::Network`] if the server cannot be
    /// reached, does not speak SMTP, or times out, and [`Error::Config`] if
    /// the sender is not a valid address.
    pub async fn open(smtp: &SmtpConfig, sender: &SenderData, limit: Duration) -> Result<Self> {
        let address = Address::new(sender.mail.as_str())
            .map_err(|e| Error::Config(format!("sender address: {e}")))?;

        let client = with_timeout(limit, "connecting", handshake(smtp, sender))
            .await
            .and_then(|result| result)?;

        info!(
            host = %smtp.host,
            port = smtp.port,
            encrypted = client.is_encrypted(),
            "Mail session open"
        );
        Ok(Self {
            session: Session::Open(client),
            sender: address,
            timeout: limit,
        })
    }

    /// Returns true until the session is closed or has broken down.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.session, Session::Open(_))
    }
}

async fn handshake(smtp: &SmtpConfig, sender: &SenderData) -> Result<Client<Authenticated>> {
    let network = |e: gradepost_smtp::Error| {
        Error::Network(format!("{}:{}: {e}", smtp.host, smtp.port))
    };

    let stream = match smtp.security {
        Security::Tls => connect_tls(&smtp.host, smtp.port).await,
        Security::StartTls | Security::None => connect(&smtp.host, smtp.port).await,
    }
    .map_err(network)?;

    let client = Client::from_stream(stream)
        .await
        .map_err(network)?
        .ehlo(&smtp.helo_name)
        .await
        .map_err(network)?;

    let client = if smtp.security == Security::StartTls {
        client.starttls(&smtp.host).await.map_err(network)?
    } else {
        client
    };

    debug!(user = %sender.mail, "Authenticating");
    client
        .authenticate(&sender.mail, &sender.password)
        .await
        .map_err(|e| match e {
            gradepost_smtp::Error::SmtpError { .. } | gradepost_smtp::Error::NotSupported(_) => {
                Error::Auth(e.to_string())
            }
            other => network(other),
        })
}

async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    future: impl Future<Output = T>,
) -> Result<T> {
    timeout(limit, future)
        .await
        .map_err(|_| Error::Network(format!("timed out after {}s {what}", limit.as_secs())))
}

impl Transport for SmtpTransport {
    async fn send(&mut self, message: &MailMessage) -> Result<()> {
        let Session::Open(client) = &mut self.session else {
            return Err(Error::State("mail session is closed".to_string()));
        };

        let to = Address::new(message.receiver.as_str())
            .map_err(|e| Error::Rejected(format!("recipient {:?}: {e}", message.receiver)))?;
        let bytes = message.render()?;

        let sending = format!("sending to {to}");
        let outcome = with_timeout(
            self.timeout,
            &sending,
            client.send_mail(&self.sender, &to, &bytes),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {
                debug!(%to, size = bytes.len(), "Sent");
                Ok(())
            }
            Ok(Err(e @ (gradepost_smtp::Error::SmtpError { .. }
            | gradepost_smtp::Error::MessageTooLarge { .. }
            | gradepost_smtp::Error::InvalidAddress(_)))) => {
                let hint = if e.is_transient() { " (temporary)" } else { "" };
                Err(Error::Rejected(format!("{to}: {e}{hint}")))
            }
            Ok(Err(e)) => {
                // Position in the dialogue is unknown after a broken exchange.
                self.session = Session::Closed;
                Err(Error::Network(e.to_string()))
            }
            Err(timed_out) => {
                self.session = Session::Closed;
                warn!(%to, "Send timed out, session dropped");
                Err(timed_out)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Open(client) => {
                with_timeout(self.timeout, "closing", client.quit())
                    .await?
                    .map_err(|e| Error::Network(e.to_string()))?;
                debug!("Mail session closed");
                Ok(())
            }
            Session::Closed => Ok(()),
        }
    }
}
