use std::net::{Ipv4Addr, SocketAddrV4};

use async_trait::async_trait;
use tokio::net::TcpListener;

use monotui_core::probe::PortChecker;

/// A port counts as in use when it cannot be bound on localhost.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalPortChecker;

#[async_trait]
impl PortChecker for LocalPortChecker {
    async fn is_in_use(&self, port: u16) -> bool {
        TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
            .await
            .is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bound_port_is_in_use() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = held.local_addr().unwrap().port();

        assert!(LocalPortChecker.is_in_use(port).await);

        drop(held);
        assert!(!LocalPortChecker.is_in_use(port).await);
    }
}
