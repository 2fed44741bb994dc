use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Maximum encoded length of a domain name, including the length
/// octets and the terminating zero octet.
pub const NAME_MAX_LEN: usize = 255;

/// Maximum length of a single label in a domain name.
pub const LABEL_MAX_LEN: usize = 63;

/// Length of the fixed message header.  Compression pointers into the
/// header are invalid.
pub const HEADER_LEN: usize = 12;

/// The only record class this resolver speaks: the Internet.
pub const CLASS_IN: u16 = 1;

/// A length octet with both high bits set is a compression pointer,
/// not a label.
pub const POINTER_MASK: u8 = 0b1100_0000;

/// Octet mask for the QR flag being set (response).
pub const HEADER_MASK_QR: u8 = 0b1000_0000;

/// Octet mask for the opcode field.
pub const HEADER_MASK_OPCODE: u8 = 0b0111_1000;

/// Offset for the opcode field.
pub const HEADER_OFFSET_OPCODE: usize = 3;

/// Octet mask for the AA flag being set (authoritative)
pub const HEADER_MASK_AA: u8 = 0b0000_0100;

/// Octet mask for the TC flag being set (truncated)
pub const HEADER_MASK_TC: u8 = 0b0000_0010;

/// Octet mask for the RD flag being set (desired)
pub const HEADER_MASK_RD: u8 = 0b0000_0001;

/// Octet mask for the RA flag being set (available)
pub const HEADER_MASK_RA: u8 = 0b1000_0000;

/// Octet mask for the Z bit.
pub const HEADER_MASK_Z: u8 = 0b0100_0000;

/// Octet mask for the AD flag being set (authentic data)
pub const HEADER_MASK_AD: u8 = 0b0010_0000;

/// Octet mask for the CD flag being set (checking disabled)
pub const HEADER_MASK_CD: u8 = 0b0001_0000;

/// Octet mask for the rcode field.
pub const HEADER_MASK_RCODE: u8 = 0b0000_1111;

/// Common header type for all messages.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.1 of RFC 1035 (the Z field has since been split
/// into Z, AD, and CD by RFC 4035).
///
/// The section counters are not part of this type; they travel in
/// `WireHeader` as they only matter while a message is in its octet
/// form.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Header {
    /// A 16 bit identifier assigned by the program that generates any
    /// kind of query.  This identifier is copied into the
    /// corresponding reply and can be used by the requester to match
    /// up replies to outstanding queries.
    pub id: u16,

    /// A one bit field that specifies whether this message is a query
    /// (0), or a response (1).
    pub is_response: bool,

    /// A four bit field that specifies the kind of query in this
    /// message: standard, inverse, or server status.
    pub opcode: Opcode,

    /// Authoritative Answer - this bit is valid in responses, and
    /// specifies that the responding name server is an authority for
    /// the domain name in the question section.
    pub is_authoritative: bool,

    /// Truncation - specifies that this message was truncated due to
    /// length greater than that permitted on the transmission
    /// channel.
    pub is_truncated: bool,

    /// Recursion Desired - this bit may be set in a query and is
    /// copied into the response.
    pub recursion_desired: bool,

    /// Recursion Available - set or cleared in a response, denotes
    /// whether recursive query support is available in the name
    /// server.
    pub recursion_available: bool,

    /// Reserved bit, zero on the wire.
    pub z: bool,

    /// Authentic Data (DNSSEC, RFC 4035).  Decoded but otherwise
    /// ignored.
    pub authentic_data: bool,

    /// Checking Disabled (DNSSEC, RFC 4035).  Decoded but otherwise
    /// ignored.
    pub checking_disabled: bool,

    /// Response code, set as part of responses.
    pub rcode: Rcode,
}

impl Header {
    /// The header of a fresh query: recursion desired, everything
    /// else zero.
    pub fn query(id: u16) -> Self {
        Self {
            id,
            is_response: false,
            opcode: Opcode::Standard,
            is_authoritative: false,
            is_truncated: false,
            recursion_desired: true,
            recursion_available: false,
            z: false,
            authentic_data: false,
            checking_disabled: false,
            rcode: Rcode::NoError,
        }
    }
}

/// A `Header` plus the four section counters, which are only
/// meaningful during serialisation and deserialisation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WireHeader {
    pub header: Header,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

/// What sort of query this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Opcode {
    Standard,
    Inverse,
    Status,
    Reserved(OpcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Opcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct OpcodeReserved(u8);

impl From<u8> for Opcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Opcode::Standard,
            1 => Opcode::Inverse,
            2 => Opcode::Status,
            other => Opcode::Reserved(OpcodeReserved(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Standard => 0,
            Opcode::Inverse => 1,
            Opcode::Status => 2,
            Opcode::Reserved(OpcodeReserved(octet)) => octet,
        }
    }
}

/// What sort of response this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(RcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Rcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RcodeReserved(u8);

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rcode::NoError => write!(f, "no error"),
            Rcode::FormatError => write!(f, "format error"),
            Rcode::ServerFailure => write!(f, "server failure"),
            Rcode::NameError => write!(f, "name error"),
            Rcode::NotImplemented => write!(f, "not implemented"),
            Rcode::Refused => write!(f, "refused"),
            Rcode::Reserved(RcodeReserved(octet)) => write!(f, "unknown answer error {octet}"),
        }
    }
}

impl From<u8> for Rcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(RcodeReserved(other)),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(RcodeReserved(octet)) => octet,
        }
    }
}

/// The record types this resolver can put in a question or decode
/// from an answer.  `Axfr` and `Any` are query-only: they never name
/// the rdata of a single record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RecordType {
    A,
    Ns,
    Cname,
    Soa,
    Ptr,
    Hinfo,
    Mx,
    Txt,
    Rp,
    Afsdb,
    Aaaa,
    Loc,
    Srv,
    Naptr,
    Axfr,
    Any,
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::Ns,
            5 => RecordType::Cname,
            6 => RecordType::Soa,
            12 => RecordType::Ptr,
            13 => RecordType::Hinfo,
            15 => RecordType::Mx,
            16 => RecordType::Txt,
            17 => RecordType::Rp,
            18 => RecordType::Afsdb,
            28 => RecordType::Aaaa,
            29 => RecordType::Loc,
            33 => RecordType::Srv,
            35 => RecordType::Naptr,
            252 => RecordType::Axfr,
            255 => RecordType::Any,
            other => RecordType::Unknown(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Cname => 5,
            RecordType::Soa => 6,
            RecordType::Ptr => 12,
            RecordType::Hinfo => 13,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Rp => 17,
            RecordType::Afsdb => 18,
            RecordType::Aaaa => 28,
            RecordType::Loc => 29,
            RecordType::Srv => 33,
            RecordType::Naptr => 35,
            RecordType::Axfr => 252,
            RecordType::Any => 255,
            RecordType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Ns => write!(f, "NS"),
            RecordType::Cname => write!(f, "CNAME"),
            RecordType::Soa => write!(f, "SOA"),
            RecordType::Ptr => write!(f, "PTR"),
            RecordType::Hinfo => write!(f, "HINFO"),
            RecordType::Mx => write!(f, "MX"),
            RecordType::Txt => write!(f, "TXT"),
            RecordType::Rp => write!(f, "RP"),
            RecordType::Afsdb => write!(f, "AFSDB"),
            RecordType::Aaaa => write!(f, "AAAA"),
            RecordType::Loc => write!(f, "LOC"),
            RecordType::Srv => write!(f, "SRV"),
            RecordType::Naptr => write!(f, "NAPTR"),
            RecordType::Axfr => write!(f, "AXFR"),
            RecordType::Any => write!(f, "ANY"),
            RecordType::Unknown(other) => write!(f, "TYPE{other}"),
        }
    }
}

pub const CANNOT_PARSE_RECORD_TYPE: &str =
    "expected a record type mnemonic such as 'A', 'AAAA', or 'MX'";

// so clap can take a record type straight from the command line
impl FromStr for RecordType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::Ns),
            "CNAME" => Ok(RecordType::Cname),
            "SOA" => Ok(RecordType::Soa),
            "PTR" => Ok(RecordType::Ptr),
            "HINFO" => Ok(RecordType::Hinfo),
            "MX" => Ok(RecordType::Mx),
            "TXT" => Ok(RecordType::Txt),
            "RP" => Ok(RecordType::Rp),
            "AFSDB" => Ok(RecordType::Afsdb),
            "AAAA" => Ok(RecordType::Aaaa),
            "LOC" => Ok(RecordType::Loc),
            "SRV" => Ok(RecordType::Srv),
            "NAPTR" => Ok(RecordType::Naptr),
            "AXFR" => Ok(RecordType::Axfr),
            "ANY" => Ok(RecordType::Any),
            _ => Err(CANNOT_PARSE_RECORD_TYPE),
        }
    }
}

/// A single question: the name being asked about and the record type
/// wanted.  The class is always IN and so is not carried.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Question {
    pub name: String,
    pub qtype: RecordType,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} IN {}", self.name, self.qtype)
    }
}

/// A fully-parsed response: the transaction id, the echoed question,
/// and the decoded answer section.  Authority and additional sections
/// are skipped.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Response {
    pub id: u16,
    pub question: Question,
    pub answers: Vec<RecordData>,
}

/// Start-of-authority data (RFC 1035 section 3.3.13).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Soa {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// Mail-exchange data (RFC 1035 section 3.3.9).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Mx {
    pub preference: u16,
    pub exchange: String,
}

/// Service-location data (RFC 2782).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Location data (RFC 1876).  Only the version and size octets are
/// decoded; the coordinates are skipped.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Loc {
    pub version: u8,
    pub size: u8,
}

/// Naming-authority-pointer data (RFC 2915).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Naptr {
    pub order: u16,
    pub preference: u16,
    pub flags: String,
    pub service: String,
    pub regex: String,
    pub replacement: String,
}

/// Responsible-person data (RFC 1183).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Rp {
    pub mailbox: String,
    pub txt_rr: String,
}

/// One decoded answer.  DNS answer sections mix record types, so the
/// decoder returns a sequence of these; the typed lookup functions
/// match on the variant they expect.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RecordData {
    A { address: Ipv4Addr },
    Aaaa { address: Ipv6Addr },
    Ns { nsdname: String },
    Cname { cname: String },
    Ptr { ptrdname: String },
    Hinfo { cpu: String },
    Txt { text: String },
    Afsdb { hostname: String },
    Soa(Soa),
    Mx(Mx),
    Srv(Srv),
    Loc(Loc),
    Naptr(Naptr),
    Rp(Rp),
}

impl RecordData {
    pub fn rtype(&self) -> RecordType {
        match self {
            RecordData::A { .. } => RecordType::A,
            RecordData::Aaaa { .. } => RecordType::Aaaa,
            RecordData::Ns { .. } => RecordType::Ns,
            RecordData::Cname { .. } => RecordType::Cname,
            RecordData::Ptr { .. } => RecordType::Ptr,
            RecordData::Hinfo { .. } => RecordType::Hinfo,
            RecordData::Txt { .. } => RecordType::Txt,
            RecordData::Afsdb { .. } => RecordType::Afsdb,
            RecordData::Soa(_) => RecordType::Soa,
            RecordData::Mx(_) => RecordType::Mx,
            RecordData::Srv(_) => RecordType::Srv,
            RecordData::Loc(_) => RecordType::Loc,
            RecordData::Naptr(_) => RecordType::Naptr,
            RecordData::Rp(_) => RecordType::Rp,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordData::A { address } => write!(f, "A {address}"),
            RecordData::Aaaa { address } => write!(f, "AAAA {address}"),
            RecordData::Ns { nsdname } => write!(f, "NS {nsdname}"),
            RecordData::Cname { cname } => write!(f, "CNAME {cname}"),
            RecordData::Ptr { ptrdname } => write!(f, "PTR {ptrdname}"),
            RecordData::Hinfo { cpu } => write!(f, "HINFO {cpu}"),
            RecordData::Txt { text } => write!(f, "TXT {text}"),
            RecordData::Afsdb { hostname } => write!(f, "AFSDB {hostname}"),
            RecordData::Soa(soa) => write!(
                f,
                "SOA {} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            RecordData::Mx(mx) => write!(f, "MX {} {}", mx.preference, mx.exchange),
            RecordData::Srv(srv) => write!(
                f,
                "SRV {} {} {} {}",
                srv.priority, srv.weight, srv.port, srv.target
            ),
            RecordData::Loc(loc) => write!(f, "LOC version {} size {}", loc.version, loc.size),
            RecordData::Naptr(naptr) => write!(
                f,
                "NAPTR {} {} \"{}\" \"{}\" \"{}\" {}",
                naptr.order,
                naptr.preference,
                naptr.flags,
                naptr.service,
                naptr.regex,
                naptr.replacement
            ),
            RecordData::Rp(rp) => write!(f, "RP {} {}", rp.mailbox, rp.txt_rr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_u16_round_trip() {
        for code in [1, 2, 5, 6, 12, 13, 15, 16, 17, 18, 28, 29, 33, 35, 252, 255, 4096] {
            assert_eq!(code, u16::from(RecordType::from(code)));
        }
    }

    #[test]
    fn record_type_from_str_accepts_mnemonics() {
        assert_eq!(Ok(RecordType::A), "A".parse());
        assert_eq!(Ok(RecordType::Aaaa), "aaaa".parse());
        assert_eq!(Ok(RecordType::Naptr), "NAPTR".parse());
        assert!("NOT-A-TYPE".parse::<RecordType>().is_err());
    }

    #[test]
    fn rcode_reserved_displays_numeric_error() {
        assert_eq!(
            "unknown answer error 11",
            Rcode::from(11).to_string().as_str()
        );
    }
}
