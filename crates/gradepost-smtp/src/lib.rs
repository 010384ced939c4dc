//! # gradepost-smtp
//!
//! A small SMTP submission client implementing the parts of RFC 5321 needed
//! to hand finished messages to a relay.
//!
//! ## What it does
//!
//! - **Type-state sessions**: a [`Client<Connected>`] must authenticate before
//!   it can become a [`Client<Authenticated>`] that sends mail
//! - **TLS**: implicit TLS (port 465) and STARTTLS upgrade (port 587)
//! - **Authentication**: PLAIN, with LOGIN as fallback
//! - **Transactions**: MAIL FROM / RCPT TO / DATA with dot-stuffing, RSET after
//!   a rejected transaction so the session stays usable
//!
//! ## Example
//!
//! ```ignore
//! use gradepost_smtp::{Address, Client};
//! use gradepost_smtp::connection::connect;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> gradepost_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.ehlo("localhost").await?;
//!     let client = client.starttls("smtp.example.com").await?;
//!     let mut client = client.authenticate("user@example.com", "password").await?;
//!
//!     let from = Address::new("user@example.com")?;
//!     let to = Address::new("student@example.com")?;
//!     client.send_mail(&from, &to, b"Subject: Hi\r\n\r\nHello\r\n").await?;
//!
//!     client.quit().await
//! }
//! ```
//!
//! ## Session states
//!
//! ```text
//! ┌──────────────┐  authenticate()  ┌───────────────┐
//! │  Connected   │ ───────────────→ │ Authenticated │ ──┐ send_mail()
//! └──────────────┘                  └───────────────┘ ←─┘
//!        │                                  │
//!        └────────────── quit() ────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{Authenticated, Client, Connected, ServerInfo, SmtpStream};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
