//! One-shot transports: a single query, a single response, a fresh
//! socket each time.  The bulk engines in `pipeline` and `pooled`
//! build on these or on their own socket handling.

use bytes::BytesMut;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::types::ResolveError;

/// How long to wait for a response before giving up.
pub const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest UDP datagram the resolver will accept.
pub const UDP_BUFFER_SIZE: usize = 1024;

/// Send one query over UDP and read one datagram back.
pub async fn exchange_udp(server: SocketAddr, query: &[u8]) -> Result<Vec<u8>, ResolveError> {
    let sock = UdpSocket::bind(local_address_for(server)).await?;
    sock.connect(server).await?;

    let sent = sock.send(query).await?;
    if sent != query.len() {
        return Err(ResolveError::ShortSend {
            sent,
            expected: query.len(),
        });
    }

    let mut buffer = vec![0_u8; UDP_BUFFER_SIZE];
    let read = timeout(READ_TIMEOUT, sock.recv(&mut buffer))
        .await
        .map_err(|_| ResolveError::Timeout)??;
    buffer.truncate(read);
    Ok(buffer)
}

/// Send one query over TCP and read one framed response back.
pub async fn exchange_tcp(server: SocketAddr, query: &[u8]) -> Result<Vec<u8>, ResolveError> {
    let mut stream = TcpStream::connect(server).await?;
    send_tcp_bytes(&mut stream, query).await?;
    let bytes = timeout(READ_TIMEOUT, read_tcp_bytes(&mut stream))
        .await
        .map_err(|_| ResolveError::Timeout)??;
    Ok(bytes.to_vec())
}

/// Write a serialised query to a TCP stream.  A DNS TCP message has a
/// big-endian u16 prefix giving the total length of the message, so
/// the peer can read the whole thing before parsing begins.
async fn send_tcp_bytes(stream: &mut TcpStream, bytes: &[u8]) -> Result<(), ResolveError> {
    let Ok(length) = u16::try_from(bytes.len()) else {
        return Err(ResolveError::QueryTooLong {
            length: bytes.len(),
        });
    };

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(bytes).await?;
    Ok(())
}

/// Read a length-prefixed DNS message from a TCP stream, insisting on
/// every declared octet: a peer that closes the stream early is an
/// error, not a short message.
async fn read_tcp_bytes(stream: &mut TcpStream) -> Result<BytesMut, ResolveError> {
    let size = stream.read_u16().await?;
    let expected = usize::from(size);
    let mut bytes = BytesMut::with_capacity(expected);

    while bytes.len() < expected {
        match stream.read_buf(&mut bytes).await {
            Ok(0) => {
                return Err(ResolveError::TcpTooShort {
                    expected,
                    actual: bytes.len(),
                })
            }
            Ok(_) => (),
            Err(error) => return Err(ResolveError::Io(error)),
        }
    }

    bytes.truncate(expected);
    Ok(bytes)
}

/// The wildcard local address in the server's address family, for
/// binding the query socket.
pub(crate) fn local_address_for(server: SocketAddr) -> SocketAddr {
    match server {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn udp_exchange_round_trips_a_datagram() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buffer = [0_u8; UDP_BUFFER_SIZE];
            let (read, peer) = server.recv_from(&mut buffer).await.unwrap();
            server.send_to(&buffer[..read], peer).await.unwrap();
        });

        let reply = exchange_udp(addr, b"hello").await.unwrap();

        assert_eq!(b"hello".to_vec(), reply);
    }

    #[tokio::test]
    async fn tcp_exchange_frames_both_directions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let length = stream.read_u16().await.unwrap();
            let mut query = vec![0_u8; usize::from(length)];
            stream.read_exact(&mut query).await.unwrap();
            stream.write_all(&length.to_be_bytes()).await.unwrap();
            stream.write_all(&query).await.unwrap();
        });

        let reply = exchange_tcp(addr, b"ping").await.unwrap();

        assert_eq!(b"ping".to_vec(), reply);
    }

    #[tokio::test]
    async fn tcp_short_read_is_an_error_not_a_hang() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = [0_u8; 512];
            let _ = stream.read(&mut buffer).await;
            // declare 100 octets, deliver 10, close
            stream.write_all(&[0, 100]).await.unwrap();
            stream.write_all(&[0; 10]).await.unwrap();
        });

        let error = exchange_tcp(addr, &[0; 12]).await.unwrap_err();

        assert!(matches!(
            error,
            ResolveError::TcpTooShort {
                expected: 100,
                actual: 10,
            }
        ));
    }
}
