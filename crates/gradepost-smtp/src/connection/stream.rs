//! Byte stream under the SMTP client: plain TCP, TLS, or a test script.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

/// Buffered reads plus writes, whatever the transport.
trait Duplex: AsyncBufRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncBufRead + AsyncWrite + Unpin + Send> Duplex for T {}

/// Connection to the mail server.
#[derive(Debug)]
pub enum SmtpStream {
    /// Unencrypted, before STARTTLS or with security disabled.
    Tcp(BufReader<TcpStream>),
    /// Encrypted, either implicitly or after STARTTLS.
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
    /// Scripted stream for unit tests.
    #[cfg(test)]
    Mock(BufReader<tokio_test::io::Mock>),
}

impl SmtpStream {
    /// Returns true once the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    fn duplex(&mut self) -> &mut dyn Duplex {
        match self {
            Self::Tcp(inner) => inner,
            Self::Tls(inner) => &mut **inner,
            #[cfg(test)]
            Self::Mock(inner) => inner,
        }
    }

    /// Reads one line, without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] at end of stream, or an I/O error.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.duplex().read_line(&mut line).await? == 0 {
            return Err(Error::ConnectionClosed);
        }
        line.truncate(line.trim_end_matches(['\r', '\n']).len());
        Ok(line)
    }

    /// Writes `data` and flushes it to the socket.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the peer is gone.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let io = self.duplex();
        io.write_all(data).await?;
        io.flush().await?;
        Ok(())
    }

    /// Runs the TLS handshake on a plain stream after `STARTTLS` was accepted.
    ///
    /// # Errors
    ///
    /// Fails on a stream that is not plain TCP, when the server sent bytes
    /// ahead of the handshake, or when the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let plain = match self {
            Self::Tcp(plain) => plain,
            Self::Tls(_) => return Err(Error::Protocol("STARTTLS on an encrypted stream".into())),
            #[cfg(test)]
            Self::Mock(_) => return Err(Error::NotSupported("TLS on a mock stream".into())),
        };

        // Plaintext buffered past the 220 reply would be a command injection.
        if !plain.buffer().is_empty() {
            return Err(Error::Protocol("Server sent data before the TLS handshake".into()));
        }

        let encrypted = handshake(hostname, plain.into_inner()).await?;
        Ok(Self::Tls(Box::new(BufReader::new(encrypted))))
    }
}

/// Opens a plain TCP connection.
///
/// # Errors
///
/// Returns an I/O error if the host cannot be reached.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((hostname, port)).await?;
    tracing::debug!(hostname, port, "Connected over TCP");
    Ok(SmtpStream::Tcp(BufReader::new(tcp)))
}

/// Opens a connection that is encrypted from the first byte (port 465).
///
/// # Errors
///
/// Returns an error if the host cannot be reached or the handshake fails.
pub async fn connect_tls(hostname: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((hostname, port)).await?;
    let encrypted = handshake(hostname, tcp).await?;
    tracing::debug!(hostname, port, "Connected over TLS");
    Ok(SmtpStream::Tls(Box::new(BufReader::new(encrypted))))
}

async fn handshake(hostname: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_owned())
        .map_err(|_| Error::Protocol(format!("Not a valid TLS server name: {hostname}")))?;
    Ok(connector().connect(server_name, tcp).await?)
}

/// Client config trusting the bundled Mozilla roots.
fn connector() -> TlsConnector {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
