//! Control-channel shutdown behavior.
//!
//! The control channel is the server's only cancellation signal: closing
//! it must stop the loop, close every client socket and the listening
//! endpoint, and report orderly success. Data on the channel is drained
//! and ignored.

use std::{net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncWriteExt, DuplexStream, duplex},
    net::TcpStream,
    task::JoinHandle,
    time::timeout,
};
use wireroom_client::transport::{self, LinkReader, LinkWriter};
use wireroom_server::{DriverConfig, Server, ServerError, ServerRuntimeConfig};

const HOST: &str = "127.0.0.1";
const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> (SocketAddr, DuplexStream, JoinHandle<Result<(), ServerError>>) {
    let config = ServerRuntimeConfig {
        bind_address: format!("{HOST}:0"),
        driver: DriverConfig::default(),
    };
    let server = Server::bind(config).await.expect("server should bind");
    let addr = server.local_addr().expect("server should report its address");

    let (control, control_rx) = duplex(8);
    let handle = tokio::spawn(server.run(control_rx));

    (addr, control, handle)
}

async fn join(addr: SocketAddr) -> (LinkReader, LinkWriter) {
    let (mut reader, writer) =
        transport::connect(HOST, addr.port()).await.expect("client should connect");
    let id = timeout(WAIT, reader.recv_payload())
        .await
        .expect("handshake should not hang")
        .expect("handshake should not fail")
        .expect("server should send an id");
    assert!(!id.is_empty());
    (reader, writer)
}

#[tokio::test]
async fn closing_the_control_channel_stops_the_server_cleanly() {
    let (addr, control, handle) = start_server().await;

    let (mut r1, _w1) = join(addr).await;
    let (mut r2, _w2) = join(addr).await;
    let (mut r3, _w3) = join(addr).await;

    drop(control);

    let outcome = timeout(WAIT, handle).await.expect("shutdown should not hang");
    assert!(matches!(outcome, Ok(Ok(()))), "orderly shutdown must report success");

    // Every client socket was released.
    for reader in [&mut r1, &mut r2, &mut r3] {
        let received = timeout(WAIT, reader.recv_payload())
            .await
            .expect("close should not hang")
            .expect("close is not a receive failure");
        assert!(received.is_none(), "clients must observe the close");
    }

    // The listening endpoint is gone too.
    let refused = TcpStream::connect((HOST, addr.port())).await;
    assert!(refused.is_err(), "the endpoint must stop accepting");
}

#[tokio::test]
async fn control_channel_data_is_drained_not_fatal() {
    let (addr, mut control, handle) = start_server().await;

    control.write_all(b"noise").await.expect("control write should succeed");

    // The server keeps serving: a client can still join and get an id.
    let (_r1, _w1) = join(addr).await;

    drop(control);
    let outcome = timeout(WAIT, handle).await.expect("shutdown should not hang");
    assert!(matches!(outcome, Ok(Ok(()))));
}

#[tokio::test]
async fn shutdown_with_no_clients_is_immediate() {
    let (_addr, control, handle) = start_server().await;

    drop(control);
    let outcome = timeout(WAIT, handle).await.expect("shutdown should not hang");
    assert!(matches!(outcome, Ok(Ok(()))));
}
