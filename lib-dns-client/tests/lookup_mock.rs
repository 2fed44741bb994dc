//! End-to-end lookups against mock servers on the loopback
//! interface.

use std::net::Ipv4Addr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

use dns_client::lookup::{resolve, resolve_a};
use dns_client::types::{Config, ResolveError};
use dns_wire::protocol::types::RecordType;

/// Turn a received query into a one-answer A response.
fn a_reply(query: &[u8], octets: [u8; 4]) -> Vec<u8> {
    let mut reply = query.to_vec();
    reply[2] |= 0b1000_0000; // QR
    reply[3] = 0b1000_0000; // RA, RCODE 0
    reply[6..8].copy_from_slice(&1_u16.to_be_bytes()); // ANCOUNT
    reply.extend_from_slice(&[0xc0, 0x0c]); // NAME: pointer to the question
    reply.extend_from_slice(&[0, 1, 0, 1]); // TYPE A, CLASS IN
    reply.extend_from_slice(&[0, 0, 1, 44]); // TTL 300
    reply.extend_from_slice(&[0, 4]);
    reply.extend_from_slice(&octets);
    reply
}

#[tokio::test]
async fn resolve_a_over_udp() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buffer = [0_u8; 1024];
        let (read, peer) = server.recv_from(&mut buffer).await.unwrap();
        server
            .send_to(&a_reply(&buffer[..read], [93, 184, 216, 34]), peer)
            .await
            .unwrap();
    });

    let config = Config {
        server: addr,
        tcp: false,
    };
    let addresses = resolve_a("example.com", &config).await.unwrap();

    assert_eq!(vec![Ipv4Addr::new(93, 184, 216, 34)], addresses);
}

#[tokio::test]
async fn resolve_a_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let length = stream.read_u16().await.unwrap();
        let mut query = vec![0_u8; usize::from(length)];
        stream.read_exact(&mut query).await.unwrap();

        let reply = a_reply(&query, [10, 20, 30, 40]);
        // safe: the reply is tiny
        let reply_length = u16::try_from(reply.len()).unwrap();
        stream.write_all(&reply_length.to_be_bytes()).await.unwrap();
        stream.write_all(&reply).await.unwrap();
    });

    let config = Config {
        server: addr,
        tcp: true,
    };
    let addresses = resolve_a("example.com", &config).await.unwrap();

    assert_eq!(vec![Ipv4Addr::new(10, 20, 30, 40)], addresses);
}

#[tokio::test]
async fn nxdomain_is_a_typed_error() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buffer = [0_u8; 1024];
        let (read, peer) = server.recv_from(&mut buffer).await.unwrap();
        let mut reply = buffer[..read].to_vec();
        reply[2] |= 0b1000_0000; // QR
        reply[3] = 0b1000_0011; // RA, RCODE 3
        server.send_to(&reply, peer).await.unwrap();
    });

    let config = Config {
        server: addr,
        tcp: false,
    };
    let error = resolve(RecordType::A, "missing.test", &config)
        .await
        .unwrap_err();

    assert!(error.is_nxdomain());
    assert_eq!("name error", error.to_string());
}

#[tokio::test]
async fn tcp_short_response_fails_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let length = stream.read_u16().await.unwrap();
        let mut query = vec![0_u8; usize::from(length)];
        stream.read_exact(&mut query).await.unwrap();
        // declare 50 octets, deliver 3, close
        stream.write_all(&[0, 50]).await.unwrap();
        stream.write_all(&[1, 2, 3]).await.unwrap();
    });

    let config = Config {
        server: addr,
        tcp: true,
    };
    let error = resolve(RecordType::A, "example.com", &config)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ResolveError::TcpTooShort {
            expected: 50,
            actual: 3,
        }
    ));
}
