use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};

use dns_wire::protocol::{deserialise, serialise};
use dns_wire::protocol::types::{RecordData, RecordType};

/// Where and how to reach the upstream resolver.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Config {
    /// Address and port of the upstream resolver.
    pub server: SocketAddr,

    /// Query over TCP instead of UDP.  Only honoured by the one-shot
    /// path: the bulk engines are UDP-only.
    pub tcp: bool,
}

/// The outcome of one bulk lookup: the addresses found, or the error
/// that stopped them being found.  An NXDOMAIN answer is an empty
/// address list with its error set.
#[derive(Debug)]
pub struct Answer {
    pub ips: Vec<IpAddr>,
    pub error: Option<ResolveError>,
}

/// An error that can occur when resolving a name.
#[derive(Debug)]
pub enum ResolveError {
    /// Could not dial, send, or receive.
    Io(io::Error),

    /// No response within the read deadline.
    Timeout,

    /// The transport accepted fewer octets than the query holds.
    ShortSend { sent: usize, expected: usize },

    /// A TCP response ended before its declared length.
    TcpTooShort { expected: usize, actual: usize },

    /// A query cannot be given a 16-bit TCP length prefix.
    QueryTooLong { length: usize },

    /// A socket task stopped while queries were still in flight.
    Disconnected,

    /// The name cannot be expressed in the wire format.
    Serialise(serialise::Error),

    /// The response could not be decoded, or signalled an error
    /// RCODE.
    Message(deserialise::Error),

    /// A typed lookup got a record variant it has no use for.
    UnexpectedRecord { qtype: RecordType, data: RecordData },

    /// More names than distinct 16-bit transaction ids.
    BatchTooLarge { count: usize },
}

impl ResolveError {
    /// True when the failure is a name-error (NXDOMAIN) response: the
    /// server answered, negatively.
    pub fn is_nxdomain(&self) -> bool {
        matches!(self, ResolveError::Message(error) if error.is_nxdomain())
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolveError::Io(error) => write!(f, "i/o error: {error}"),
            ResolveError::Timeout => write!(f, "read deadline expired"),
            ResolveError::ShortSend { sent, expected } => {
                write!(f, "short send: {sent} of {expected} octets")
            }
            ResolveError::TcpTooShort { expected, actual } => {
                write!(f, "short tcp read: {actual} of {expected} octets")
            }
            ResolveError::QueryTooLong { length } => {
                write!(f, "query of {length} octets cannot be length-prefixed")
            }
            ResolveError::Disconnected => write!(f, "socket task stopped unexpectedly"),
            ResolveError::Serialise(error) => write!(f, "{error}"),
            ResolveError::Message(error) => write!(f, "{error}"),
            ResolveError::UnexpectedRecord { qtype, data } => {
                write!(f, "unexpected {} record in a {qtype} answer", data.rtype())
            }
            ResolveError::BatchTooLarge { count } => {
                write!(f, "batch of {count} names cannot fit the 16-bit id space")
            }
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Io(error) => Some(error),
            ResolveError::Serialise(error) => Some(error),
            ResolveError::Message(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for ResolveError {
    fn from(error: io::Error) -> Self {
        ResolveError::Io(error)
    }
}
