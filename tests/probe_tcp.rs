//! End-to-end probe tests against a local fake Modbus TCP server

use std::time::Duration;

use modbus_probe::{
    probe, ModbusError, ProbeConfig, ReadResponse, ReceiveMode, TransportConfig,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const REFERENCE_REQUEST: [u8; 12] = [
    0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A,
];

/// What the fake server observed during one connection
#[derive(Debug)]
struct ServerLog {
    request: Vec<u8>,
    saw_close: bool,
}

/// Accept one connection, read the 12-byte request, send `chunks` with
/// `gap` between them, then wait for the client to hang up.
async fn spawn_server(chunks: Vec<Vec<u8>>, gap: Duration) -> (u16, JoinHandle<ServerLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 12];
        socket.read_exact(&mut request).await.unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(gap).await;
            }
            // The client may already have hung up after a partial read
            if socket.write_all(chunk).await.is_err() || socket.flush().await.is_err() {
                break;
            }
        }

        let mut rest = [0u8; 16];
        let saw_close = matches!(
            tokio::time::timeout(Duration::from_secs(5), socket.read(&mut rest)).await,
            Ok(Ok(0))
        );
        ServerLog { request, saw_close }
    });

    (port, handle)
}

fn config(port: u16) -> ProbeConfig {
    ProbeConfig::new("127.0.0.1", port)
}

#[tokio::test]
async fn reads_registers_and_releases_socket() {
    let response = vec![
        0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x01, 0x03, 0x06, 0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C,
    ];
    let (port, server) = spawn_server(vec![response.clone()], Duration::ZERO).await;

    let report = probe(&config(port)).await.unwrap();
    assert_eq!(report.request_bytes, REFERENCE_REQUEST.to_vec());
    assert_eq!(report.response_bytes, Some(response));
    assert_eq!(report.registers(), Some(&[100u16, 200, 300][..]));

    let log = server.await.unwrap();
    assert_eq!(log.request, REFERENCE_REQUEST.to_vec());
    assert!(log.saw_close);
}

#[tokio::test]
async fn exception_response_is_reported_and_socket_released() {
    let response = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02];
    let (port, server) = spawn_server(vec![response], Duration::ZERO).await;

    let report = probe(&config(port)).await.unwrap();
    match &report.outcome {
        Err(ModbusError::Exception { function, code }) => {
            assert_eq!(*function, 0x03);
            assert_eq!(*code, 2);
        }
        other => panic!("expected exception, got {:?}", other),
    }
    assert!(server.await.unwrap().saw_close);
}

#[tokio::test]
async fn raw_payload_for_other_function_codes() {
    // FC 0x2B reply passes through undecoded
    let response = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0x01, 0x2B, 0x0E, 0x01];
    let (port, server) = spawn_server(vec![response], Duration::ZERO).await;

    let report = probe(&config(port).with_function_code(0x2B)).await.unwrap();
    assert_eq!(report.outcome.unwrap(), ReadResponse::Raw(vec![0x0E, 0x01]));
    assert!(server.await.unwrap().saw_close);
}

#[tokio::test]
async fn connection_refused_is_distinct() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = probe(&config(port)).await.unwrap_err();
    assert!(matches!(err, ModbusError::ConnectionRefused { .. }));
    assert!(err.is_connection_error());
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn receive_timeout_releases_socket() {
    // Server reads the request and never answers
    let (port, server) = spawn_server(vec![], Duration::ZERO).await;
    let transport = TransportConfig::new().with_timeout(Duration::from_millis(100));

    let report = probe(&config(port).with_transport(transport)).await.unwrap();
    assert!(matches!(report.outcome, Err(ModbusError::Timeout { .. })));
    assert!(report.response_bytes.is_none());
    assert!(server.await.unwrap().saw_close);
}

#[tokio::test]
async fn single_read_sees_only_first_segment() {
    let response = vec![
        0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x01, 0x03, 0x06, 0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C,
    ];
    let chunks = vec![response[..5].to_vec(), response[5..].to_vec()];
    let (port, server) = spawn_server(chunks, Duration::from_millis(300)).await;

    let report = probe(&config(port)).await.unwrap();
    assert!(matches!(report.outcome, Err(ModbusError::TooShort { len: 5 })));
    server.await.unwrap();
}

#[tokio::test]
async fn framed_mode_reassembles_segments() {
    let response = vec![
        0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x01, 0x03, 0x06, 0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C,
    ];
    let chunks = vec![response[..5].to_vec(), response[5..].to_vec()];
    let (port, server) = spawn_server(chunks, Duration::from_millis(50)).await;
    let transport = TransportConfig::new().with_receive_mode(ReceiveMode::Framed);

    let report = probe(&config(port).with_transport(transport)).await.unwrap();
    assert_eq!(report.registers(), Some(&[100u16, 200, 300][..]));
    assert!(server.await.unwrap().saw_close);
}
