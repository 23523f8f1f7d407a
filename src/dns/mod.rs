pub(crate) mod config;
mod job;
mod worker;

use crate::repository::cache::CacheService;
use hugye_resolver::prelude::Resolver;
use hugye_resolver::BuildError;
use hugye_server::receiver::Receiver;
use hugye_server::sender::Sender;
use job::Job;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use worker::Worker;

use futures::StreamExt;

#[derive(Debug)]
pub enum ServerError {
    Address(std::net::AddrParseError),
    Resolver(BuildError),
    Io(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(inner) => write!(f, "invalid upstream address: {inner}"),
            Self::Resolver(inner) => write!(f, "unable to build resolver: {inner}"),
            Self::Io(inner) => write!(f, "unable to bind server socket: {inner}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::net::AddrParseError> for ServerError {
    fn from(value: std::net::AddrParseError) -> Self {
        Self::Address(value)
    }
}

impl From<BuildError> for ServerError {
    fn from(value: BuildError) -> Self {
        Self::Resolver(value)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub struct DnsServer {
    socket: Arc<UdpSocket>,
    input: mpsc::Sender<Job>,
    worker: Worker,
}

impl DnsServer {
    pub async fn new(config: crate::config::Config) -> Result<Self, ServerError> {
        tracing::info!("preparing dns server");
        let blocked = config.blocked();
        let monitored = config.monitored();
        let cache: Arc<dyn CacheService> = Arc::new(config.cache.build());
        if !config.whitelist.is_empty() {
            tracing::warn!("whitelist rules are configured but not applied yet");
        }

        let mut builder = hugye_resolver::UpstreamResolverBuilder::default();
        for upstream in config.external_dns.iter() {
            builder.add_upstream(upstream.build()?);
        }
        let resolver: Arc<dyn Resolver> = Arc::new(builder.build().await?);

        let binding = config.binding.binding();
        tracing::info!("starting dns server on {binding:?}");
        let socket = Arc::new(UdpSocket::bind(binding).await?);

        let (input, output) = mpsc::channel(config.binding.queue_size);
        let worker = Worker::new(
            output,
            resolver,
            cache,
            blocked,
            monitored,
            Sender::new(socket.clone()),
            config.binding.job_deadline(),
        );

        Ok(Self {
            socket,
            input,
            worker,
        })
    }

    /// Address the server socket ended up bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run the listener and its worker until shutdown is requested.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let Self {
            socket,
            input,
            worker,
        } = self;

        let handle = tokio::spawn(worker.run(shutdown.clone()));

        let stream = Receiver::new(socket).into_stream();
        tokio::pin!(stream);
        let mut shutdown = shutdown;
        loop {
            let message = tokio::select! {
                found = stream.next() => match found {
                    Some(message) => message,
                    None => break,
                },
                _ = shutdown.changed() => break,
            };
            let job = match Job::parse(&message) {
                Ok(job) => job,
                Err(error) => {
                    tracing::debug!(
                        "dropping malformed datagram from {:?}: {error}",
                        message.address
                    );
                    continue;
                }
            };
            tracing::debug!(
                "[{}] {} {}",
                job.origin_id,
                job.question.qtype,
                job.question.name
            );
            match input.try_send(job) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(job)) => {
                    tracing::warn!(
                        "input queue full, dropping query for {}",
                        job.question.name
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }

        drop(input);
        if let Err(error) = handle.await {
            tracing::error!("worker task failed: {error:?}");
        }
        tracing::info!("dns server stopped");
    }
}
