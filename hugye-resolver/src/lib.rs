#[cfg(feature = "mock")]
pub mod mock;
pub mod prelude;

use hugye_proto::codec;
use hugye_proto::packet::MAX_MESSAGE_SIZE;
use hugye_rules::tree::DomainTree;
use prelude::{Resolver, ResolverError, Ticket};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;

/// One external DNS server queries can be forwarded to. An upstream
/// without a target tree is the default destination, one with a tree only
/// receives the queries its tree matches.
#[derive(Debug)]
pub struct Upstream {
    address: SocketAddr,
    name: String,
    targets: Option<DomainTree>,
}

impl Upstream {
    pub fn new<N: Into<String>>(address: SocketAddr, name: N) -> Self {
        Self {
            address,
            name: name.into(),
            targets: None,
        }
    }

    pub fn with_targets(mut self, targets: DomainTree) -> Self {
        self.targets = Some(targets);
        self
    }

    fn is_default(&self) -> bool {
        self.targets.is_none()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum BuilderError {
    NoDefault,
    ManyDefaults,
}

impl Display for BuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDefault => write!(f, "no default upstream configured"),
            Self::ManyDefaults => write!(f, "more than one default upstream configured"),
        }
    }
}

impl std::error::Error for BuilderError {}

#[derive(Debug)]
pub enum BuildError {
    Builder(BuilderError),
    Io(std::io::Error),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builder(inner) => inner.fmt(f),
            Self::Io(inner) => write!(f, "unable to bind upstream socket: {inner}"),
        }
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Default)]
pub struct UpstreamResolverBuilder {
    upstreams: Vec<Upstream>,
}

impl UpstreamResolverBuilder {
    pub fn add_upstream(&mut self, value: Upstream) {
        self.upstreams.push(value);
    }

    pub fn with_upstream(mut self, value: Upstream) -> Self {
        self.upstreams.push(value);
        self
    }

    pub async fn build(self) -> Result<UpstreamResolver, BuildError> {
        let mut defaults = self.upstreams.iter().filter(|item| item.is_default());
        if defaults.next().is_none() {
            return Err(BuildError::Builder(BuilderError::NoDefault));
        }
        if defaults.next().is_some() {
            return Err(BuildError::Builder(BuilderError::ManyDefaults));
        }
        let default = self
            .upstreams
            .iter()
            .position(Upstream::is_default)
            .unwrap_or(0);

        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(BuildError::Io)?;
        Ok(UpstreamResolver {
            socket,
            upstreams: self.upstreams,
            default,
            next_id: AtomicU16::new(0),
        })
    }
}

/// Multiplexes every upstream exchange over a single ephemeral UDP
/// socket. Queries are stamped with a locally allocated transaction id so
/// concurrent in-flight exchanges can be told apart when their responses
/// come back in arbitrary order.
#[derive(Debug)]
pub struct UpstreamResolver {
    socket: UdpSocket,
    upstreams: Vec<Upstream>,
    default: usize,
    next_id: AtomicU16,
}

impl UpstreamResolver {
    /// Upstreams are tried in configuration order, first target match
    /// wins, the default takes the rest.
    fn route(&self, qname: &str) -> &Upstream {
        self.upstreams
            .iter()
            .find(|item| {
                item.targets
                    .as_ref()
                    .is_some_and(|targets| targets.matches(qname))
            })
            .unwrap_or(&self.upstreams[self.default])
    }
}

#[async_trait::async_trait]
impl Resolver for UpstreamResolver {
    fn next_id(&self) -> u16 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
            if id != 0 {
                return id;
            }
        }
    }

    async fn send(
        &self,
        qname: &str,
        buffer: &mut [u8],
        id: u16,
    ) -> Result<Ticket, ResolverError> {
        let (original_id, _) = codec::read_u16(buffer, 0)?;
        codec::write_u16(buffer, 0, id)?;

        let upstream = self.route(qname);
        let result = self.socket.send_to(buffer, upstream.address).await;

        // the caller keeps its bytes as they were, whatever the outcome
        codec::write_u16(buffer, 0, original_id)?;

        let sent = result?;
        if sent != buffer.len() {
            return Err(ResolverError::ShortWrite {
                sent,
                expected: buffer.len(),
            });
        }
        tracing::debug!("forwarded {qname} to {} as #{id}", upstream.name);
        Ok(Ticket { id })
    }

    async fn receive(&self, timeout: Duration) -> Result<Vec<u8>, ResolverError> {
        let mut buffer = [0u8; MAX_MESSAGE_SIZE];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buffer)).await {
            Ok(Ok((size, _))) => Ok(buffer[..size].to_vec()),
            Ok(Err(error)) => Err(ResolverError::Io(error)),
            Err(_) => Err(ResolverError::Timeout),
        }
    }
}
