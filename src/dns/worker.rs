use super::job::Job;
use crate::repository::cache::CacheService;
use hugye_proto::codec;
use hugye_resolver::prelude::{Resolver, ResolverError};
use hugye_rules::tree::DomainTree;
use hugye_server::sender::Sender;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Accept timeout when nothing is in flight.
const ACCEPT_IDLE_TIMEOUT: Duration = Duration::from_millis(500);
/// Accept timeout while responses are pending, short enough to keep the
/// drain and retire steps turning.
const ACCEPT_BUSY_TIMEOUT: Duration = Duration::from_millis(5);
/// Per-datagram deadline while draining upstream responses.
const RECEIVE_TIMEOUT: Duration = Duration::from_millis(1);

/// The single task that moves every query along. It is the only owner of
/// the wait list, so accepting, correlating and retiring jobs never
/// contend with anything.
pub struct Worker {
    input: mpsc::Receiver<Job>,
    resolver: Arc<dyn Resolver>,
    cache: Arc<dyn CacheService>,
    blocked: DomainTree,
    monitored: DomainTree,
    sender: Sender,
    wait_list: HashMap<u16, Job>,
    job_deadline: Duration,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input: mpsc::Receiver<Job>,
        resolver: Arc<dyn Resolver>,
        cache: Arc<dyn CacheService>,
        blocked: DomainTree,
        monitored: DomainTree,
        sender: Sender,
        job_deadline: Duration,
    ) -> Self {
        Self {
            input,
            resolver,
            cache,
            blocked,
            monitored,
            sender,
            wait_list: HashMap::new(),
            job_deadline,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("worker started");
        while !*shutdown.borrow() {
            self.accept(&mut shutdown).await;
            self.drain().await;
            self.retire().await;
        }
        tracing::info!("worker stopped");
    }

    /// Wait for the next job, or for a little while when none shows up.
    async fn accept(&mut self, shutdown: &mut watch::Receiver<bool>) {
        let timeout = if self.wait_list.is_empty() {
            ACCEPT_IDLE_TIMEOUT
        } else {
            ACCEPT_BUSY_TIMEOUT
        };
        tokio::select! {
            found = self.input.recv() => {
                if let Some(job) = found {
                    self.accept_job(job).await;
                }
            }
            _ = tokio::time::sleep(timeout) => {}
            _ = shutdown.changed() => {}
        }
    }

    async fn accept_job(&mut self, mut job: Job) {
        if self.monitored.matches(&job.question.name) {
            tracing::info!(
                "monitored query {} {} from {:?}",
                job.question.qtype,
                job.question.name,
                job.address
            );
        }
        if self.blocked.matches(&job.question.name) {
            tracing::debug!(
                "{} is blocked, dropping query from {:?}",
                job.question.name,
                job.address
            );
            return;
        }

        if let Some(response) = self
            .cache
            .request(&job.question.name, job.question.qtype)
            .await
        {
            job.response = response;
            job.done = true;
            job.ticket = self.resolver.next_id();
            self.wait_list.insert(job.ticket, job);
            return;
        }

        let id = self.resolver.next_id();
        match self
            .resolver
            .send(&job.question.name, &mut job.request, id)
            .await
        {
            Ok(ticket) => {
                job.ticket = ticket.id;
                self.wait_list.insert(ticket.id, job);
            }
            Err(error) => {
                tracing::error!(
                    "unable to forward query for {}: {error}",
                    job.question.name
                );
            }
        }
    }

    /// Pull upstream datagrams while some job still waits for its answer.
    /// Each datagram is correlated through its leading transaction id,
    /// unknown ids are discarded.
    async fn drain(&mut self) {
        while self.wait_list.values().any(|job| !job.done) {
            let buffer = match self.resolver.receive(RECEIVE_TIMEOUT).await {
                Ok(found) => found,
                Err(ResolverError::Timeout) => break,
                Err(error) => {
                    tracing::error!("unable to read upstream response: {error}");
                    break;
                }
            };
            let Ok((id, _)) = codec::read_u16(&buffer, 0) else {
                continue;
            };
            let Some(job) = self.wait_list.get_mut(&id) else {
                tracing::debug!("discarding upstream response with unknown id {id}");
                continue;
            };
            if job.done {
                continue;
            }
            job.response = buffer;
            job.done = true;
            self.cache
                .persist(&job.question.name, job.question.qtype, &job.response)
                .await;
        }
    }

    /// Answer every finished job with the client's original transaction
    /// id restored, and give up on jobs past their deadline.
    async fn retire(&mut self) {
        let now = Instant::now();
        let mut finished = Vec::new();
        for (id, job) in self.wait_list.iter_mut() {
            if job.done {
                match codec::write_u16(&mut job.response, 0, job.origin_id) {
                    Ok(_) => {
                        match self.sender.send(job.address, &job.response).await {
                            Ok(sent) if sent != job.response.len() => tracing::error!(
                                "short write answering {:?}: {sent} of {} bytes",
                                job.address,
                                job.response.len()
                            ),
                            Ok(_) => {}
                            Err(error) => {
                                tracing::error!("unable to answer {:?}: {error}", job.address)
                            }
                        }
                    }
                    Err(error) => {
                        tracing::error!("response too short to carry an id: {error}")
                    }
                }
                finished.push(*id);
            } else if now.duration_since(job.started_at) > self.job_deadline {
                tracing::warn!(
                    "giving up on {} {} after {:?} without upstream answer",
                    job.question.qtype,
                    job.question.name,
                    self.job_deadline
                );
                finished.push(*id);
            }
        }
        for id in finished {
            self.wait_list.remove(&id);
        }
    }
}
