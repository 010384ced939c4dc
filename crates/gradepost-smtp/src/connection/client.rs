//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::marker::PhantomData;
use tracing::debug;

/// Type-state marker: greeted by the server, not yet authenticated.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: authenticated, ready to send mail.
#[derive(Debug)]
pub struct Authenticated;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server
    /// refuses service.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream)
            .await?
            .require(|code| code == ReplyCode::SERVICE_READY)?;

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(%hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        self.hello(client_hostname).await?;
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or if the upgrade fails.
    pub async fn starttls(mut self, server_hostname: &str) -> Result<Self> {
        if !self.server_info.supports(&Extension::StartTls) {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.command(Command::StartTls)
            .await?
            .require(|code| code == ReplyCode::SERVICE_READY)?;

        let Self {
            stream,
            server_info,
            ..
        } = self;
        let mut upgraded = Self {
            stream: stream.upgrade_to_tls(server_hostname).await?,
            server_info,
            _state: PhantomData,
        };
        debug!(server_hostname, "STARTTLS negotiated");

        // Capabilities announced before the upgrade are void (RFC 3207).
        let helo_name = upgraded.server_info.helo_name.clone();
        upgraded.hello(&helo_name).await?;
        Ok(upgraded)
    }

    /// Authenticates with the best mechanism the server offers.
    ///
    /// PLAIN is preferred; LOGIN is used when it is the only supported
    /// choice. A server that advertises no AUTH extension is tried with
    /// PLAIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] when neither mechanism is offered, or
    /// the server's rejection (usually 535).
    pub async fn authenticate(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let offered = self.server_info.auth_mechanisms();
        let use_plain = offered.is_empty() || offered.contains(&AuthMechanism::Plain);
        let use_login = offered.contains(&AuthMechanism::Login);
        if use_plain {
            self.auth_plain(username, password).await
        } else if use_login {
            self.auth_login(username, password).await
        } else {
            Err(Error::NotSupported("AUTH PLAIN or LOGIN".into()))
        }
    }

    /// Authenticates using the PLAIN mechanism with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let credentials = format!("\0{username}\0{password}");
        self.command(Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(credentials)),
        })
        .await?
        .require(ReplyCode::is_success)?;

        debug!(mechanism = "PLAIN", "Authenticated");
        Ok(self.into_state())
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not prompt as expected or
    /// rejects the credentials.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        self.command(Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        })
        .await?
        .require(|code| code == ReplyCode::AUTH_CONTINUE)?;

        self.command(Command::AuthResponse(STANDARD.encode(username)))
            .await?
            .require(|code| code == ReplyCode::AUTH_CONTINUE)?;

        self.command(Command::AuthResponse(STANDARD.encode(password)))
            .await?
            .require(ReplyCode::is_success)?;

        debug!(mechanism = "LOGIN", "Authenticated");
        Ok(self.into_state())
    }
}

impl Client<Authenticated> {
    /// Sends one message to one recipient in a single transaction.
    ///
    /// On a rejected MAIL, RCPT, or DATA reply the transaction is reset
    /// with RSET so the session can carry the next message, and the
    /// rejection is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] before any command when the server
    /// advertised a smaller SIZE, the server's rejection, or an I/O error.
    pub async fn send_mail(
        &mut self,
        from: &Address,
        to: &Address,
        message: &[u8],
    ) -> Result<()> {
        let size = self.server_info.max_message_size();
        if let Some(limit) = size.filter(|&limit| limit > 0 && message.len() > limit) {
            return Err(Error::MessageTooLarge {
                size: message.len(),
                limit,
            });
        }

        let declared_size = size.map(|_| message.len());
        match self.transaction(from, to, message, declared_size).await {
            Err(err @ Error::SmtpError { .. }) => {
                debug!(%to, error = %err, "Transaction rejected, resetting");
                self.command(Command::Rset)
                    .await?
                    .require(ReplyCode::is_success)?;
                Err(err)
            }
            other => other,
        }
    }

    async fn transaction(
        &mut self,
        from: &Address,
        to: &Address,
        message: &[u8],
        size: Option<usize>,
    ) -> Result<()> {
        self.command(Command::MailFrom {
            from: from.clone(),
            size,
        })
        .await?
        .require(ReplyCode::is_success)?;

        self.command(Command::RcptTo { to: to.clone() })
            .await?
            .require(ReplyCode::is_success)?;

        self.command(Command::Data)
            .await?
            .require(|code| code == ReplyCode::START_DATA)?;

        self.stream.write_all(&encode_data(message)).await?;
        let accepted = read_reply(&mut self.stream)
            .await?
            .require(ReplyCode::is_success)?;

        debug!(%to, reply = %accepted.message_text(), "Message accepted");
        Ok(())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    /// Returns true once the session runs over TLS.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        self.command(Command::Quit)
            .await?
            .require(|code| code.is_success())?;
        Ok(())
    }

    async fn hello(&mut self, client_hostname: &str) -> Result<()> {
        let reply = self
            .command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?
            .require(ReplyCode::is_success)?;

        // First line echoes the server name, the rest are extensions.
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        self.server_info.helo_name = client_hostname.to_string();
        Ok(())
    }

    async fn command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = %cmd.redacted(), "C:");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        debug!(code = %reply.code, "S:");
        Ok(reply)
    }

    fn into_state<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            return parse_reply(&lines);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    const GREETING: &[u8] = b"220 mail.example.com ESMTP ready\r\n";

    fn mock(builder: &mut Builder) -> SmtpStream {
        SmtpStream::Mock(BufReader::new(builder.build()))
    }

    fn address(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[tokio::test]
    async fn greeting_and_ehlo_discover_extensions() {
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250-mail.example.com\r\n250-SIZE 1000\r\n250-STARTTLS\r\n250 AUTH LOGIN\r\n")
                .write(b"QUIT\r\n")
                .read(b"221 Bye\r\n"),
        );

        let client = Client::from_stream(stream).await.unwrap();
        assert_eq!(client.server_info.hostname, "mail.example.com");

        let client = client.ehlo("localhost").await.unwrap();
        let info = &client.server_info;
        assert!(info.supports(&Extension::StartTls));
        assert_eq!(info.max_message_size(), Some(1000));
        assert_eq!(info.auth_mechanisms(), [AuthMechanism::Login]);
        assert!(!client.is_encrypted());

        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn refused_greeting_is_an_error() {
        let stream = mock(Builder::new().read(b"554 No service\r\n"));
        let err = Client::from_stream(stream).await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 554, .. }));
    }

    #[tokio::test]
    async fn starttls_requires_advertisement() {
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250 mail.example.com\r\n"),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let err = client.starttls("mail.example.com").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn authenticate_prefers_plain() {
        // base64("\0tutor@tum.de\0secret")
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250-mail.example.com\r\n250 AUTH LOGIN PLAIN\r\n")
                .write(b"AUTH PLAIN AHR1dG9yQHR1bS5kZQBzZWNyZXQ=\r\n")
                .read(b"235 2.7.0 Authentication successful\r\n"),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        client.authenticate("tutor@tum.de", "secret").await.unwrap();
    }

    #[tokio::test]
    async fn authenticate_falls_back_to_login() {
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250-mail.example.com\r\n250 AUTH LOGIN\r\n")
                .write(b"AUTH LOGIN\r\n")
                .read(b"334 VXNlcm5hbWU6\r\n")
                .write(b"dHV0b3I=\r\n")
                .read(b"334 UGFzc3dvcmQ6\r\n")
                .write(b"c2VjcmV0\r\n")
                .read(b"235 OK\r\n"),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        client.authenticate("tutor", "secret").await.unwrap();
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected() {
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250-mail.example.com\r\n250 AUTH PLAIN\r\n")
                .write(b"AUTH PLAIN AHR1dG9yAHdyb25n\r\n")
                .read(b"535 5.7.8 Authentication credentials invalid\r\n"),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let err = client.authenticate("tutor", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code, .. } if code == ReplyCode::AUTH_FAILED.as_u16()));
    }

    #[tokio::test]
    async fn send_mail_runs_one_transaction() {
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250-mail.example.com\r\n250-SIZE 100000\r\n250 AUTH PLAIN\r\n")
                .write(b"AUTH PLAIN AHR1dG9yAHNlY3JldA==\r\n")
                .read(b"235 OK\r\n")
                .write(b"MAIL FROM:<tutor@tum.de> SIZE=21\r\n")
                .read(b"250 OK\r\n")
                .write(b"RCPT TO:<jane@x.com>\r\n")
                .read(b"250 OK\r\n")
                .write(b"DATA\r\n")
                .read(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                .write(b"Subject: Hi\r\n\r\n..dot\r\n.\r\n")
                .read(b"250 Queued as 1234\r\n"),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let mut client = client.authenticate("tutor", "secret").await.unwrap();

        client
            .send_mail(
                &address("tutor@tum.de"),
                &address("jane@x.com"),
                b"Subject: Hi\r\n\r\n.dot\r\n",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_recipient_resets_transaction() {
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250 mail.example.com\r\n")
                .write(b"AUTH PLAIN AHR1dG9yAHNlY3JldA==\r\n")
                .read(b"235 OK\r\n")
                .write(b"MAIL FROM:<tutor@tum.de>\r\n")
                .read(b"250 OK\r\n")
                .write(b"RCPT TO:<ghost@x.com>\r\n")
                .read(b"550 5.1.1 No such user\r\n")
                .write(b"RSET\r\n")
                .read(b"250 Flushed\r\n"),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let mut client = client.authenticate("tutor", "secret").await.unwrap();

        let err = client
            .send_mail(&address("tutor@tum.de"), &address("ghost@x.com"), b"Hi\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 550, .. }));
        assert!(err.to_string().contains("No such user"));
    }

    #[tokio::test]
    async fn oversized_message_is_refused_locally() {
        let stream = mock(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(b"250-mail.example.com\r\n250 SIZE 4\r\n")
                .write(b"AUTH PLAIN AHR1dG9yAHNlY3JldA==\r\n")
                .read(b"235 OK\r\n"),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let mut client = client.authenticate("tutor", "secret").await.unwrap();

        let err = client
            .send_mail(&address("tutor@tum.de"), &address("jane@x.com"), b"too long")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge { size: 8, limit: 4 }));
    }

    #[tokio::test]
    async fn closed_connection_surfaces() {
        let stream = mock(&mut Builder::new());
        let err = Client::from_stream(stream).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
