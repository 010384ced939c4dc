//! EHLO capabilities.

/// A capability line from the EHLO reply.
///
/// Only the extensions the client acts on get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Connection can be upgraded with STARTTLS.
    StartTls,
    /// SASL mechanisms the server accepts.
    Auth(Vec<AuthMechanism>),
    /// Largest message accepted, if the server names one.
    Size(Option<usize>),
    /// Anything else, kept verbatim.
    Other(String),
}

impl Extension {
    /// Parses one capability line (keyword plus parameters).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let keyword = words.next().map(str::to_ascii_uppercase);

        match keyword.as_deref() {
            Some("STARTTLS") => Self::StartTls,
            Some("AUTH") => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            Some("SIZE") => Self::Size(words.next().and_then(|s| s.parse().ok())),
            _ => Self::Other(line.to_string()),
        }
    }
}

/// Password-based SASL mechanisms this client can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// RFC 4616 PLAIN.
    Plain,
    /// The non-standard LOGIN exchange.
    Login,
}

impl AuthMechanism {
    /// Parses a mechanism name; unsupported names give `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if name.eq_ignore_ascii_case("LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }

    /// Name as sent in the AUTH command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}
