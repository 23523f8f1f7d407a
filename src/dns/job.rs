use hugye_proto::packet::question::Question;
use hugye_proto::packet::{reader::ReaderError, Query};
use hugye_server::prelude::Message;
use std::net::SocketAddr;
use std::time::Instant;

/// One client query making its way through the worker. The client address
/// and its original transaction id are kept aside so the upstream answer
/// can be routed and rewritten back.
#[derive(Debug)]
pub struct Job {
    /// where the query came from, where the answer goes
    pub address: SocketAddr,
    /// the client datagram, owned
    pub request: Vec<u8>,
    /// the single question the datagram carries
    pub question: Question,
    /// transaction id as sent by the client
    pub origin_id: u16,
    /// transaction id used upstream, 0 until allocated
    pub ticket: u16,
    /// upstream answer, empty until it arrived
    pub response: Vec<u8>,
    pub done: bool,
    pub started_at: Instant,
}

impl Job {
    pub fn parse(message: &Message) -> Result<Self, ReaderError> {
        let query = Query::try_from(message.bytes())?;
        Ok(Self {
            address: message.address,
            request: message.bytes().to_vec(),
            origin_id: query.header.id,
            question: query.question,
            ticket: 0,
            response: Vec::new(),
            done: false,
            started_at: Instant::now(),
        })
    }
}
