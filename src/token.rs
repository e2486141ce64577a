/// An opaque identifier correlating a registration with its I/O source.
///
/// Tokens are supplied by the caller at registration time and echoed
/// back inside every [`Event`](crate::Event) the poller produces. The
/// library never generates tokens on its own; keeping them unique is
/// the caller's responsibility.
///
/// # Examples
///
/// ```rust,ignore
/// const SERVER: Token = Token(0);
///
/// poll.register(&listener, SERVER, Interest::READABLE, TriggerMode::Level)?;
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub usize);

impl From<Token> for usize {
    fn from(token: Token) -> usize {
        token.0
    }
}

/// Token permanently occupied by the internal wake source.
///
/// Registering a source under this token is rejected with
/// [`Error::AlreadyRegistered`](crate::Error::AlreadyRegistered).
pub(crate) const WAKE_TOKEN: Token = Token(usize::MAX);
