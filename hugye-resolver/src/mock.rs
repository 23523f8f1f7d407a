use crate::prelude::{Resolver, ResolverError, Ticket};
use hugye_proto::codec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Resolver with scripted responses. A query for a known qname drops the
/// scripted payload, stamped with the wire id, into an inbox that
/// [`receive`](Resolver::receive) drains; a query for an unknown qname is
/// swallowed, mimicking a silent upstream.
#[derive(Debug, Default)]
pub struct MockResolver {
    next_id: AtomicU16,
    responses: Mutex<HashMap<String, Vec<u8>>>,
    inbox: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<(String, u16)>>,
}

impl MockResolver {
    pub fn with_response<N: Into<String>>(self, qname: N, payload: Vec<u8>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(qname.into(), payload);
        self
    }

    /// Drop a raw datagram into the inbox, bypassing any send.
    pub fn push_response(&self, payload: Vec<u8>) {
        self.inbox.lock().unwrap().push_back(payload);
    }

    /// Every `(qname, wire id)` pair that went through [`Resolver::send`].
    pub fn sent(&self) -> Vec<(String, u16)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Resolver for MockResolver {
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
        let _ = codec::read_u16(buffer, 0)?;
        self.sent.lock().unwrap().push((qname.to_string(), id));

        if let Some(payload) = self.responses.lock().unwrap().get(qname) {
            let mut response = payload.clone();
            codec::write_u16(&mut response, 0, id)?;
            self.inbox.lock().unwrap().push_back(response);
        }
        Ok(Ticket { id })
    }

    async fn receive(&self, _timeout: Duration) -> Result<Vec<u8>, ResolverError> {
        self.inbox
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ResolverError::Timeout)
    }
}
