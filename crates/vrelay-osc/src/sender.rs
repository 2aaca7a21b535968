//! Connection-less UDP transport for encoded OSC messages.

use async_trait::async_trait;
use tokio::net::UdpSocket;

use vrelay_foundation::error::OscError;

#[async_trait]
pub trait OscSender: Send + Sync {
    async fn send(&self, bytes: &[u8]) -> Result<(), OscError>;
}

/// Sends pre-encoded OSC datagrams to a fixed `{host, port}` destination.
/// Binding and connecting happen once, at construction; `send` never
/// re-resolves the destination.
pub struct UdpOscSender {
    socket: UdpSocket,
}

impl UdpOscSender {
    pub async fn connect(host: &str, port: u16) -> Result<Self, OscError> {
        if port == 0 {
            return Err(OscError::InvalidConfig {
                reason: "port must be in 1..=65535".into(),
            });
        }
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect((host, port)).await?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl OscSender for UdpOscSender {
    async fn send(&self, bytes: &[u8]) -> Result<(), OscError> {
        self.socket.send(bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_port_zero() {
        let err = UdpOscSender::connect("127.0.0.1", 0).await.unwrap_err();
        assert!(matches!(err, OscError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn send_to_a_bound_loopback_socket_succeeds() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let sender = UdpOscSender::connect("127.0.0.1", port).await.unwrap();
        sender.send(b"hello").await.unwrap();

        let mut buf = [0u8; 16];
        let (n, _) = listener.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
    }
}
