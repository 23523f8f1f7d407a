use hugye_proto::codec::CodecError;
use std::fmt::Display;
use std::time::Duration;

/// Receipt for a forwarded query, carrying the transaction id used on the
/// wire. Responses are correlated back to their query through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: u16,
}

#[derive(Debug)]
pub enum ResolverError {
    Io(std::io::Error),
    Codec(CodecError),
    ShortWrite { sent: usize, expected: usize },
    Timeout,
}

impl Display for ResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(inner) => write!(f, "socket error: {inner}"),
            Self::Codec(inner) => write!(f, "malformed datagram: {inner}"),
            Self::ShortWrite { sent, expected } => {
                write!(f, "sent {sent} of {expected} bytes")
            }
            Self::Timeout => write!(f, "timed out waiting for a datagram"),
        }
    }
}

impl std::error::Error for ResolverError {}

impl From<std::io::Error> for ResolverError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CodecError> for ResolverError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

#[async_trait::async_trait]
pub trait Resolver: std::fmt::Debug + Send + Sync {
    /// Allocate the next wire transaction id, never zero.
    fn next_id(&self) -> u16;

    /// Forward the query in `buffer` to the upstream matching `qname`,
    /// using `id` on the wire. The caller's buffer is left unchanged once
    /// the call returns.
    async fn send(&self, qname: &str, buffer: &mut [u8], id: u16)
        -> Result<Ticket, ResolverError>;

    /// Wait up to `timeout` for one upstream datagram.
    async fn receive(&self, timeout: Duration) -> Result<Vec<u8>, ResolverError>;
}
