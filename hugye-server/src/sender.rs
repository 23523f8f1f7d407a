use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

#[derive(Debug)]
pub struct Sender {
    socket: Arc<UdpSocket>,
}

impl Sender {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    /// Write one datagram back to a client, returning the number of bytes
    /// the socket accepted so the caller can notice short writes.
    pub async fn send(&self, address: SocketAddr, buffer: &[u8]) -> std::io::Result<usize> {
        tracing::trace!("sending {} bytes to {address:?}", buffer.len());
        self.socket.send_to(buffer, address).await
    }
}
