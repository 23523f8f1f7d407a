use hugye_proto::packet::MAX_MESSAGE_SIZE;
use std::net::SocketAddr;

/// One datagram read from the server socket.
pub struct Message {
    pub address: SocketAddr,
    pub buffer: [u8; MAX_MESSAGE_SIZE],
    pub size: usize,
}

impl Message {
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[0..self.size]
    }
}
