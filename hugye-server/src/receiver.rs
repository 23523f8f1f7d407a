use crate::prelude::Message;
use async_stream::stream;
use futures_core::stream::Stream;
use hugye_proto::packet::MAX_MESSAGE_SIZE;
use std::sync::Arc;
use tokio::net::UdpSocket;

#[derive(Debug)]
pub struct Receiver {
    socket: Arc<UdpSocket>,
}

impl Receiver {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    async fn receive(&self) -> std::io::Result<Message> {
        let mut buffer = [0u8; MAX_MESSAGE_SIZE];
        let (size, address) = self.socket.recv_from(&mut buffer).await?;
        Ok(Message {
            address,
            buffer,
            size,
        })
    }

    /// Endless stream of datagrams. Read errors are logged and skipped so
    /// a single bad read never tears the listener down.
    pub fn into_stream(self) -> impl Stream<Item = Message> {
        stream! {
            loop {
                match self.receive().await {
                    Ok(message) => {
                        tracing::trace!("received {} bytes from {:?}", message.size, message.address);
                        yield message;
                    }
                    Err(error) => tracing::error!("unable to read datagram: {error:?}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Receiver;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::net::UdpSocket;

    #[tokio::test]
    async fn should_stream_datagrams() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = socket.local_addr().unwrap();
        let receiver = Receiver::new(Arc::new(socket));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&[1, 2, 3], address).await.unwrap();
        client.send_to(&[4, 5], address).await.unwrap();

        let stream = receiver.into_stream();
        tokio::pin!(stream);
        let first = stream.next().await.unwrap();
        assert_eq!(first.bytes(), &[1, 2, 3]);
        assert_eq!(first.address, client.local_addr().unwrap());
        let second = stream.next().await.unwrap();
        assert_eq!(second.bytes(), &[4, 5]);
    }
}
