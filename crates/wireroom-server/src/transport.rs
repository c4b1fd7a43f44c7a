//! TCP listening endpoint.
//!
//! One bound listener per server instance, living as long as the server.
//! Accepted streams are handed to the runtime, which splits them and owns
//! the halves; this layer only binds, accepts, and reports its address.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;

/// Listening TCP endpoint.
pub struct TcpTransport {
    /// The bound listener
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind the listening endpoint.
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!("TCP transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Accept one connection.
    ///
    /// Blocks until a connection is available. A failure here is
    /// per-connection: the caller logs it and keeps accepting.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        self.listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))
    }

    /// Local address the endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_binds_to_an_ephemeral_port() {
        let transport = TcpTransport::bind("127.0.0.1:0").await;
        assert!(transport.is_ok(), "transport should bind on an ephemeral port");

        let transport = transport.unwrap();
        let addr = transport.local_addr().unwrap();
        assert_ne!(addr.port(), 0, "a concrete port should be assigned");
    }

    #[tokio::test]
    async fn transport_rejects_invalid_address() {
        let result = TcpTransport::bind("not-an-address").await;
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
