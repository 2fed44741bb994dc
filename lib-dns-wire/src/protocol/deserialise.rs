//! Deserialisation of DNS responses from the network.  See the
//! `types` module for details of the format.
//!
//! Compression is mandatory on receive (RFC 1035 section 4.1.4):
//! authoritative servers routinely compress answer names, so every
//! name decoded from a message registers its suffixes in a
//! per-message cache, and later pointers are resolved by looking the
//! target offset up in that cache.  The cache lives exactly as long
//! as one message parse.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::protocol::types::*;
pub use crate::protocol::types::WireHeader;

impl Response {
    /// Parse a whole response: header, the single question, and the
    /// answer section.  Authority and additional records are not
    /// inspected.
    ///
    /// # Errors
    ///
    /// If the message cannot be parsed, signals an error in its
    /// RCODE, or does not carry exactly one question.
    pub fn from_octets(octets: &[u8]) -> Result<Self, Error> {
        let mut buffer = ConsumableBuffer::new(octets);
        let wire_header = WireHeader::deserialise(&mut buffer)?;
        let id = wire_header.header.id;

        if wire_header.header.rcode != Rcode::NoError {
            return Err(Error::Rcode {
                id,
                rcode: wire_header.header.rcode,
            });
        }

        // multi-question messages are neither described by the RFC
        // nor produced by real servers
        if wire_header.qdcount != 1 {
            return Err(Error::UnsupportedQuestionCount {
                id,
                count: wire_header.qdcount,
            });
        }

        let mut cache = NameCache::new();

        // the question must be parsed even though the caller already
        // knows it: answer names point back into it
        let question = Question::deserialise(id, &mut buffer, &mut cache)?;

        let mut answers = Vec::with_capacity(wire_header.ancount.into());
        for _ in 0..wire_header.ancount {
            answers.push(RecordData::deserialise(id, &mut buffer, &mut cache)?);
        }

        Ok(Self {
            id,
            question,
            answers,
        })
    }
}

impl WireHeader {
    /// # Errors
    ///
    /// If the header is too short.
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let id = buffer.next_u16().ok_or(Error::TruncatedId)?;
        let flags1 = buffer.next_u8().ok_or(Error::TruncatedHeader(id))?;
        let flags2 = buffer.next_u8().ok_or(Error::TruncatedHeader(id))?;
        let qdcount = buffer.next_u16().ok_or(Error::TruncatedHeader(id))?;
        let ancount = buffer.next_u16().ok_or(Error::TruncatedHeader(id))?;
        let nscount = buffer.next_u16().ok_or(Error::TruncatedHeader(id))?;
        let arcount = buffer.next_u16().ok_or(Error::TruncatedHeader(id))?;

        Ok(Self {
            header: Header {
                id,
                is_response: flags1 & HEADER_MASK_QR != 0,
                opcode: Opcode::from((flags1 & HEADER_MASK_OPCODE) >> HEADER_OFFSET_OPCODE),
                is_authoritative: flags1 & HEADER_MASK_AA != 0,
                is_truncated: flags1 & HEADER_MASK_TC != 0,
                recursion_desired: flags1 & HEADER_MASK_RD != 0,
                recursion_available: flags2 & HEADER_MASK_RA != 0,
                z: flags2 & HEADER_MASK_Z != 0,
                authentic_data: flags2 & HEADER_MASK_AD != 0,
                checking_disabled: flags2 & HEADER_MASK_CD != 0,
                rcode: Rcode::from(flags2 & HEADER_MASK_RCODE),
            },
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}

impl Question {
    /// # Errors
    ///
    /// If the question cannot be parsed or is not class IN.
    pub fn deserialise(
        id: u16,
        buffer: &mut ConsumableBuffer,
        cache: &mut NameCache,
    ) -> Result<Self, Error> {
        let name = deserialise_name(id, buffer, cache)?;
        let qtype = buffer.next_u16().ok_or(Error::QuestionTooShort(id))?;
        let class = buffer.next_u16().ok_or(Error::QuestionTooShort(id))?;
        if class != CLASS_IN {
            return Err(Error::UnsupportedClass { id, class });
        }

        Ok(Self {
            name,
            qtype: RecordType::from(qtype),
        })
    }
}

impl RecordData {
    /// Parse one answer record: the common preamble, then the rdata
    /// for the record type.  Embedded names are decoded against the
    /// whole message, so pointers inside the rdata resolve against
    /// absolute packet offsets.
    ///
    /// # Errors
    ///
    /// If the record cannot be parsed, is not class IN, or has a type
    /// this resolver does not decode.
    pub fn deserialise(
        id: u16,
        buffer: &mut ConsumableBuffer,
        cache: &mut NameCache,
    ) -> Result<Self, Error> {
        // the owner name is not returned to the caller, but decoding
        // it seeds the compression cache for later records
        let _owner = deserialise_name(id, buffer, cache)?;
        let rtype = buffer.next_u16().ok_or(Error::RecordTooShort(id))?;
        let class = buffer.next_u16().ok_or(Error::RecordTooShort(id))?;
        if class != CLASS_IN {
            return Err(Error::UnsupportedClass { id, class });
        }
        let _ttl = buffer.next_u32().ok_or(Error::RecordTooShort(id))?;
        let rdlength = buffer.next_u16().ok_or(Error::RecordTooShort(id))?;
        let rdata_end = buffer.position + usize::from(rdlength);

        let data = match RecordType::from(rtype) {
            RecordType::A => {
                if rdlength != 4 {
                    return Err(Error::WrongRdataLength {
                        id,
                        rtype: RecordType::A,
                        length: rdlength,
                    });
                }
                RecordData::A {
                    address: Ipv4Addr::from(buffer.next_u32().ok_or(Error::RecordTooShort(id))?),
                }
            }
            RecordType::Aaaa => {
                if rdlength != 16 {
                    return Err(Error::WrongRdataLength {
                        id,
                        rtype: RecordType::Aaaa,
                        length: rdlength,
                    });
                }
                RecordData::Aaaa {
                    address: Ipv6Addr::new(
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                        buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                    ),
                }
            }
            RecordType::Ns => RecordData::Ns {
                nsdname: deserialise_name(id, buffer, cache)?,
            },
            RecordType::Cname => RecordData::Cname {
                cname: deserialise_name(id, buffer, cache)?,
            },
            RecordType::Ptr => RecordData::Ptr {
                ptrdname: deserialise_name(id, buffer, cache)?,
            },
            RecordType::Soa => RecordData::Soa(Soa {
                mname: deserialise_name(id, buffer, cache)?,
                rname: deserialise_name(id, buffer, cache)?,
                serial: buffer.next_u32().ok_or(Error::RecordTooShort(id))?,
                refresh: buffer.next_u32().ok_or(Error::RecordTooShort(id))?,
                retry: buffer.next_u32().ok_or(Error::RecordTooShort(id))?,
                expire: buffer.next_u32().ok_or(Error::RecordTooShort(id))?,
                minimum: buffer.next_u32().ok_or(Error::RecordTooShort(id))?,
            }),
            RecordType::Mx => RecordData::Mx(Mx {
                preference: buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                exchange: deserialise_name(id, buffer, cache)?,
            }),
            RecordType::Srv => RecordData::Srv(Srv {
                priority: buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                weight: buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                port: buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                target: deserialise_name(id, buffer, cache)?,
            }),
            RecordType::Hinfo => {
                // only the CPU string is kept; the OS string is
                // skipped along with the rest of the rdata
                let cpu = deserialise_character_string(id, buffer)?;
                skip_to(id, buffer, rdata_end)?;
                RecordData::Hinfo { cpu }
            }
            RecordType::Txt => {
                // multi-string TXT rdata loses everything after the
                // first character-string
                let text = deserialise_character_string(id, buffer)?;
                skip_to(id, buffer, rdata_end)?;
                RecordData::Txt { text }
            }
            RecordType::Afsdb => {
                let _subtype = buffer.next_u16().ok_or(Error::RecordTooShort(id))?;
                RecordData::Afsdb {
                    hostname: deserialise_name(id, buffer, cache)?,
                }
            }
            RecordType::Loc => {
                let version = buffer.next_u8().ok_or(Error::RecordTooShort(id))?;
                let size = buffer.next_u8().ok_or(Error::RecordTooShort(id))?;
                // TODO: decode the coordinate fields
                skip_to(id, buffer, rdata_end)?;
                RecordData::Loc(Loc { version, size })
            }
            RecordType::Naptr => RecordData::Naptr(Naptr {
                order: buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                preference: buffer.next_u16().ok_or(Error::RecordTooShort(id))?,
                flags: deserialise_character_string(id, buffer)?,
                service: deserialise_character_string(id, buffer)?,
                regex: deserialise_character_string(id, buffer)?,
                replacement: deserialise_name(id, buffer, cache)?,
            }),
            RecordType::Rp => RecordData::Rp(Rp {
                mailbox: deserialise_name(id, buffer, cache)?,
                txt_rr: deserialise_name(id, buffer, cache)?,
            }),
            RecordType::Axfr | RecordType::Any | RecordType::Unknown(_) => {
                return Err(Error::UnsupportedType { id, rtype });
            }
        };

        // the rdata must be consumed exactly
        if buffer.position == rdata_end {
            Ok(data)
        } else {
            Err(Error::RecordLengthMismatch(id))
        }
    }
}

/// Decode a name starting at the buffer's position, collecting labels
/// until a zero octet or a compression pointer.  Every literal label
/// registers a cache entry mapping its packet offset to the suffix
/// rooted there; pointers only consume a pre-resolved suffix and
/// register nothing.
///
/// # Errors
///
/// If a label runs past the buffer, a length octet has exactly one of
/// its two high bits set, or a pointer targets the header or an
/// offset that has not been cached.
pub fn deserialise_name(
    id: u16,
    buffer: &mut ConsumableBuffer,
    cache: &mut NameCache,
) -> Result<String, Error> {
    let start = buffer.position;
    let mut labels = Vec::<String>::with_capacity(5);
    let mut literal_lens = Vec::<usize>::with_capacity(5);

    loop {
        let size = buffer.next_u8().ok_or(Error::NameTooShort(id))?;

        if size & POINTER_MASK == POINTER_MASK {
            let lo = buffer.next_u8().ok_or(Error::NameTooShort(id))?;
            let offset = usize::from(u16::from_be_bytes([size & !POINTER_MASK, lo]));

            if offset < HEADER_LEN {
                return Err(Error::PointerBelowHeader { id, offset });
            }
            let suffix = cache
                .lookup(offset)
                .ok_or(Error::PointerNotCached { id, offset })?;

            labels.push(suffix);
            break;
        } else if usize::from(size) > LABEL_MAX_LEN {
            return Err(Error::BadCompressionMask { id, octet: size });
        } else if size == 0 {
            break;
        } else {
            let octets = buffer
                .take(usize::from(size))
                .ok_or(Error::NameTooShort(id))?;
            labels.push(String::from_utf8_lossy(octets).into_owned());
            literal_lens.push(usize::from(size));
        }
    }

    // register each literal label against the suffix rooted at it; a
    // pointer-resolved tail is part of those suffixes but gets no
    // entry of its own
    let mut offset = start;
    for (index, len) in literal_lens.iter().enumerate() {
        cache.insert(offset, labels[index..].join("."));
        offset += len + 1;
    }

    Ok(labels.join("."))
}

/// Read one `<length><octets>` character-string (RFC 1035 section
/// 3.3).
fn deserialise_character_string(id: u16, buffer: &mut ConsumableBuffer) -> Result<String, Error> {
    let length = buffer.next_u8().ok_or(Error::RecordTooShort(id))?;
    let octets = buffer
        .take(usize::from(length))
        .ok_or(Error::RecordTooShort(id))?;
    Ok(String::from_utf8_lossy(octets).into_owned())
}

/// Advance the buffer to the end of the current rdata, failing if it
/// has already been overrun or the message ends first.
fn skip_to(id: u16, buffer: &mut ConsumableBuffer, rdata_end: usize) -> Result<(), Error> {
    if buffer.position > rdata_end {
        return Err(Error::RecordLengthMismatch(id));
    }
    buffer
        .take(rdata_end - buffer.position)
        .ok_or(Error::RecordTooShort(id))?;
    Ok(())
}

/// Offsets of the name suffixes seen so far in one message, keyed by
/// absolute packet offset.  Created empty when a message parse
/// starts and discarded when it finishes: compression pointers can
/// only reference earlier parts of the same message.
pub struct NameCache {
    suffixes: HashMap<usize, String>,
}

impl NameCache {
    pub fn new() -> Self {
        Self {
            suffixes: HashMap::new(),
        }
    }

    fn insert(&mut self, offset: usize, suffix: String) {
        self.suffixes.insert(offset, suffix);
    }

    fn lookup(&self, offset: usize) -> Option<String> {
        self.suffixes.get(&offset).cloned()
    }
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors encountered when parsing a response.  In all the errors
/// which have a `u16` parameter, that is the ID from the header - so
/// that a failure can be attributed to the query which provoked it.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// The message is not even 2 octets long, so it doesn't contain a
    /// valid ID and cannot be matched with any query.
    TruncatedId,

    /// The header ends before all twelve octets.
    TruncatedHeader(u16),

    /// The response signalled an error in its RCODE field.
    Rcode { id: u16, rcode: Rcode },

    /// The response does not carry exactly one question.
    UnsupportedQuestionCount { id: u16, count: u16 },

    /// The question ends with an incomplete field.
    QuestionTooShort(u16),

    /// A record ends with an incomplete field.
    RecordTooShort(u16),

    /// A record's rdata was not consumed exactly.
    RecordLengthMismatch(u16),

    /// A name runs past the end of the message.
    NameTooShort(u16),

    /// A label length octet has exactly one of the two compression
    /// bits set.
    BadCompressionMask { id: u16, octet: u8 },

    /// A compression pointer targets the fixed header.
    PointerBelowHeader { id: u16, offset: usize },

    /// A compression pointer targets an offset no name was decoded
    /// at.
    PointerNotCached { id: u16, offset: usize },

    /// A question or record is not class IN.
    UnsupportedClass { id: u16, class: u16 },

    /// A record has a type this resolver does not decode.
    UnsupportedType { id: u16, rtype: u16 },

    /// An A or AAAA record's rdata is not exactly an address.
    WrongRdataLength {
        id: u16,
        rtype: RecordType,
        length: u16,
    },
}

impl Error {
    /// The transaction id the failing message carried, if it got far
    /// enough to be read.
    pub fn id(&self) -> Option<u16> {
        match self {
            Error::TruncatedId => None,
            Error::TruncatedHeader(id)
            | Error::QuestionTooShort(id)
            | Error::RecordTooShort(id)
            | Error::RecordLengthMismatch(id)
            | Error::NameTooShort(id)
            | Error::Rcode { id, .. }
            | Error::UnsupportedQuestionCount { id, .. }
            | Error::BadCompressionMask { id, .. }
            | Error::PointerBelowHeader { id, .. }
            | Error::PointerNotCached { id, .. }
            | Error::UnsupportedClass { id, .. }
            | Error::UnsupportedType { id, .. }
            | Error::WrongRdataLength { id, .. } => Some(*id),
        }
    }

    /// True when the response was a name error (NXDOMAIN): the query
    /// was answered, negatively.
    pub fn is_nxdomain(&self) -> bool {
        matches!(
            self,
            Error::Rcode {
                rcode: Rcode::NameError,
                ..
            }
        )
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::TruncatedId => write!(f, "too few octets to read the transaction id"),
            Error::TruncatedHeader(_) => write!(f, "header ends before twelve octets"),
            Error::Rcode { rcode, .. } => write!(f, "{rcode}"),
            Error::UnsupportedQuestionCount { count, .. } => {
                write!(f, "unsupported question number {count}")
            }
            Error::QuestionTooShort(_) => write!(f, "question ends with an incomplete field"),
            Error::RecordTooShort(_) => write!(f, "record ends with an incomplete field"),
            Error::RecordLengthMismatch(_) => write!(f, "rdata not consumed exactly"),
            Error::NameTooShort(_) => write!(f, "name runs past the end of the message"),
            Error::BadCompressionMask { octet, .. } => {
                write!(f, "wrong compression mask in length octet {octet:#010b}")
            }
            Error::PointerBelowHeader { offset, .. } => {
                write!(f, "compression pointer into the header at offset {offset}")
            }
            Error::PointerNotCached { offset, .. } => {
                write!(f, "no cached name suffix at offset {offset}")
            }
            Error::UnsupportedClass { class, .. } => write!(f, "unsupported class {class}"),
            Error::UnsupportedType { rtype, .. } => write!(f, "unsupported data type {rtype}"),
            Error::WrongRdataLength { rtype, length, .. } => {
                write!(f, "wrong data size {length} for {rtype} record")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A buffer which will be consumed by the parsing process.
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    position: usize,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self {
            octets,
            position: 0,
        }
    }

    pub fn next_u8(&mut self) -> Option<u8> {
        if self.octets.len() > self.position {
            let a = self.octets[self.position];
            self.position += 1;
            Some(a)
        } else {
            None
        }
    }

    pub fn next_u16(&mut self) -> Option<u16> {
        if self.octets.len() > self.position + 1 {
            let a = self.octets[self.position];
            let b = self.octets[self.position + 1];
            self.position += 2;
            Some(u16::from_be_bytes([a, b]))
        } else {
            None
        }
    }

    pub fn next_u32(&mut self) -> Option<u32> {
        if self.octets.len() > self.position + 3 {
            let a = self.octets[self.position];
            let b = self.octets[self.position + 1];
            let c = self.octets[self.position + 2];
            let d = self.octets[self.position + 3];
            self.position += 4;
            Some(u32::from_be_bytes([a, b, c, d]))
        } else {
            None
        }
    }

    pub fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        if self.octets.len() >= self.position + size {
            let slice = &self.octets[self.position..self.position + size];
            self.position += size;
            Some(slice)
        } else {
            None
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// A view of the same octets with the cursor moved, for starting
    /// a decode in the middle of a message.
    pub fn at_offset(&self, position: usize) -> ConsumableBuffer<'a> {
        Self {
            octets: self.octets,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::serialise::{serialise_name, WritableBuffer};

    use super::*;

    /// Build a message buffer: 12 octets of header (id 234, response,
    /// recursion, no error), then the given sections.
    #[rustfmt::skip]
    fn message(qdcount: u16, ancount: u16, sections: &[&[u8]]) -> Vec<u8> {
        let mut octets = vec![
            0x00, 0xea, // ID
            0b1000_0001, 0b1000_0000, // QR=1 RD=1 RA=1 RCODE=0
            0x00, 0x00, // QDCOUNT, patched below
            0x00, 0x00, // ANCOUNT, patched below
            0x00, 0x00, // NSCOUNT
            0x00, 0x00, // ARCOUNT
        ];
        octets[4..6].copy_from_slice(&qdcount.to_be_bytes());
        octets[6..8].copy_from_slice(&ancount.to_be_bytes());
        for section in sections {
            octets.extend_from_slice(section);
        }
        octets
    }

    const QUESTION_A_EXAMPLE_COM: &[u8] = &[
        7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, // "example.com"
        0, 1, // QTYPE A
        0, 1, // QCLASS IN
    ];

    #[test]
    fn test_a_record_response() {
        // answer name is a pointer to the question name
        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, // NAME: pointer to offset 12
                    0, 1, // TYPE A
                    0, 1, // CLASS IN
                    0, 0, 1, 44, // TTL 300
                    0, 4, // RDLENGTH
                    93, 184, 216, 34, // RDATA
                ],
            ],
        );

        let parsed = Response::from_octets(&response).unwrap();

        assert_eq!(234, parsed.id);
        assert_eq!(
            Question {
                name: "example.com".to_string(),
                qtype: RecordType::A,
            },
            parsed.question,
        );
        assert_eq!(
            vec![RecordData::A {
                address: Ipv4Addr::new(93, 184, 216, 34)
            }],
            parsed.answers,
        );
    }

    #[test]
    fn test_soa_with_two_compressed_names() {
        // mname points at the question name (offset 12), rname at the
        // "com" suffix inside it (offset 20)
        let response = message(
            1,
            1,
            &[
                &[
                    7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
                    0, 6, // QTYPE SOA
                    0, 1, // QCLASS IN
                ],
                &[
                    0xc0, 0x0c, // NAME: pointer to the question
                    0, 6, // TYPE SOA
                    0, 1, // CLASS IN
                    0, 0, 14, 16, // TTL
                    0, 24, // RDLENGTH
                    0xc0, 0x0c, // MNAME: pointer to offset 12
                    0xc0, 0x14, // RNAME: pointer to offset 20
                    0x78, 0xa3, 0xf1, 0x75, // SERIAL 2024010101
                    0x00, 0x00, 0x0e, 0x10, // REFRESH 3600
                    0x00, 0x00, 0x03, 0x84, // RETRY 900
                    0x00, 0x09, 0x3a, 0x80, // EXPIRE 604800
                    0x00, 0x01, 0x51, 0x80, // MINIMUM 86400
                ],
            ],
        );

        let parsed = Response::from_octets(&response).unwrap();

        assert_eq!(
            vec![RecordData::Soa(Soa {
                mname: "example.com".to_string(),
                rname: "com".to_string(),
                serial: 2_024_010_101,
                refresh: 3600,
                retry: 900,
                expire: 604_800,
                minimum: 86_400,
            })],
            parsed.answers,
        );
    }

    #[test]
    fn test_rejects_two_questions() {
        let response = message(2, 0, &[QUESTION_A_EXAMPLE_COM, QUESTION_A_EXAMPLE_COM]);

        let error = Response::from_octets(&response).unwrap_err();

        assert_eq!(
            Error::UnsupportedQuestionCount { id: 234, count: 2 },
            error,
        );
        assert_eq!("unsupported question number 2", error.to_string());
    }

    #[test]
    fn test_nxdomain_is_an_error_with_the_id() {
        let mut response = message(1, 0, &[QUESTION_A_EXAMPLE_COM]);
        response[3] |= 3; // RCODE = name error

        let error = Response::from_octets(&response).unwrap_err();

        assert_eq!(
            Error::Rcode {
                id: 234,
                rcode: Rcode::NameError,
            },
            error,
        );
        assert!(error.is_nxdomain());
        assert_eq!(Some(234), error.id());
    }

    #[test]
    fn test_rejects_non_in_class() {
        let response = message(
            1,
            0,
            &[&[
                7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, //
                0, 1, // QTYPE A
                0, 3, // QCLASS CH
            ]],
        );

        assert_eq!(
            Err(Error::UnsupportedClass { id: 234, class: 3 }),
            Response::from_octets(&response),
        );
    }

    #[test]
    fn test_rejects_unknown_record_type() {
        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, //
                    0, 99, // TYPE: unassigned
                    0, 1, //
                    0, 0, 1, 44, //
                    0, 2, //
                    1, 2, // opaque rdata
                ],
            ],
        );

        assert_eq!(
            Err(Error::UnsupportedType { id: 234, rtype: 99 }),
            Response::from_octets(&response),
        );
    }

    #[test]
    fn test_rejects_wrong_a_rdata_length() {
        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, //
                    0, 1, //
                    0, 1, //
                    0, 0, 1, 44, //
                    0, 5, // RDLENGTH: one octet too many
                    93, 184, 216, 34, 0,
                ],
            ],
        );

        assert_eq!(
            Err(Error::WrongRdataLength {
                id: 234,
                rtype: RecordType::A,
                length: 5,
            }),
            Response::from_octets(&response),
        );
    }

    #[test]
    fn test_txt_keeps_only_the_first_string() {
        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, //
                    0, 16, // TYPE TXT
                    0, 1, //
                    0, 0, 1, 44, //
                    0, 8, // RDLENGTH
                    3, b'f', b'o', b'o', // first string
                    3, b'b', b'a', b'r', // second string, dropped
                ],
            ],
        );

        let parsed = Response::from_octets(&response).unwrap();

        assert_eq!(
            vec![RecordData::Txt {
                text: "foo".to_string()
            }],
            parsed.answers,
        );
    }

    #[test]
    fn test_hinfo_keeps_only_the_cpu_string() {
        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, //
                    0, 13, // TYPE HINFO
                    0, 1, //
                    0, 0, 1, 44, //
                    0, 7, // RDLENGTH
                    3, b'x', b'8', b'6', // CPU
                    2, b'o', b's', // OS, dropped
                ],
            ],
        );

        let parsed = Response::from_octets(&response).unwrap();

        assert_eq!(
            vec![RecordData::Hinfo {
                cpu: "x86".to_string()
            }],
            parsed.answers,
        );
    }

    #[test]
    fn test_naptr_record() {
        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, //
                    0, 35, // TYPE NAPTR
                    0, 1, //
                    0, 0, 1, 44, //
                    0, 19, // RDLENGTH
                    0, 10, // ORDER
                    0, 20, // PREFERENCE
                    1, b'u', // FLAGS "u"
                    7, b'E', b'2', b'U', b'+', b's', b'i', b'p', // SERVICE
                    2, b'!', b'!', // REGEXP
                    0xc0, 0x14, // REPLACEMENT: pointer to "com"
                ],
            ],
        );

        let parsed = Response::from_octets(&response).unwrap();

        assert_eq!(
            vec![RecordData::Naptr(Naptr {
                order: 10,
                preference: 20,
                flags: "u".to_string(),
                service: "E2U+sip".to_string(),
                regex: "!!".to_string(),
                replacement: "com".to_string(),
            })],
            parsed.answers,
        );
    }

    #[test]
    fn test_mx_exchange_resolves_against_absolute_offsets() {
        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, //
                    0, 15, // TYPE MX
                    0, 1, //
                    0, 0, 1, 44, //
                    0, 8, // RDLENGTH
                    0, 10, // PREFERENCE
                    2, b'm', b'x', 0xc0, 0x0c, // EXCHANGE "mx" + pointer to the question
                    0, // never reached: the pointer terminates the name
                ],
            ],
        );

        // the rdata is one octet longer than the name consumes
        assert_eq!(
            Err(Error::RecordLengthMismatch(234)),
            Response::from_octets(&response),
        );

        let response = message(
            1,
            1,
            &[
                QUESTION_A_EXAMPLE_COM,
                &[
                    0xc0, 0x0c, //
                    0, 15, //
                    0, 1, //
                    0, 0, 1, 44, //
                    0, 7, // RDLENGTH, exact
                    0, 10, //
                    2, b'm', b'x', 0xc0, 0x0c,
                ],
            ],
        );

        let parsed = Response::from_octets(&response).unwrap();

        assert_eq!(
            vec![RecordData::Mx(Mx {
                preference: 10,
                exchange: "mx.example.com".to_string(),
            })],
            parsed.answers,
        );
    }

    #[test]
    fn deserialise_name_populates_the_cache_per_label() {
        let mut octets = vec![0; HEADER_LEN];
        octets.extend_from_slice(&[1, b'a', 1, b'b', 1, b'c', 0]);
        let mut buffer = ConsumableBuffer::new(&octets);
        buffer.position = HEADER_LEN;
        let mut cache = NameCache::new();

        let name = deserialise_name(0, &mut buffer, &mut cache).unwrap();

        assert_eq!("a.b.c", name);
        assert_eq!(HEADER_LEN + 7, buffer.position);
        assert_eq!(Some("a.b.c".to_string()), cache.lookup(12));
        assert_eq!(Some("b.c".to_string()), cache.lookup(14));
        assert_eq!(Some("c".to_string()), cache.lookup(16));
        assert_eq!(None, cache.lookup(13));
    }

    #[test]
    fn deserialise_name_resolves_pointer_to_the_same_string() {
        let mut octets = vec![0; HEADER_LEN];
        octets.extend_from_slice(&[3, b'w', b'w', b'w', 3, b'c', b'o', b'm', 0]); // offset 12
        octets.extend_from_slice(&[4, b'm', b'a', b'i', b'l', 0xc0, 0x10]); // offset 21
        let mut cache = NameCache::new();

        let mut buffer = ConsumableBuffer::new(&octets);
        buffer.position = HEADER_LEN;
        let first = deserialise_name(0, &mut buffer, &mut cache).unwrap();
        assert_eq!("www.com", first);

        buffer.position = 21;
        let second = deserialise_name(0, &mut buffer, &mut cache).unwrap();
        assert_eq!("mail.com", second);
        assert_eq!(28, buffer.position);

        // the pointer target decodes to the same string on its own
        buffer.position = 16;
        assert_eq!(
            "com",
            deserialise_name(0, &mut buffer, &mut cache).unwrap()
        );
    }

    #[test]
    fn deserialise_name_rejects_pointer_into_header() {
        let mut octets = vec![0; HEADER_LEN];
        octets.extend_from_slice(&[0xc0, 0x02]);
        let mut buffer = ConsumableBuffer::new(&octets);
        buffer.position = HEADER_LEN;

        assert_eq!(
            Err(Error::PointerBelowHeader { id: 7, offset: 2 }),
            deserialise_name(7, &mut buffer, &mut NameCache::new()),
        );
    }

    #[test]
    fn deserialise_name_rejects_uncached_pointer() {
        let mut octets = vec![0; HEADER_LEN];
        octets.extend_from_slice(&[0xc0, 0x20]);
        let mut buffer = ConsumableBuffer::new(&octets);
        buffer.position = HEADER_LEN;

        assert_eq!(
            Err(Error::PointerNotCached { id: 7, offset: 32 }),
            deserialise_name(7, &mut buffer, &mut NameCache::new()),
        );
    }

    #[test]
    fn deserialise_name_rejects_half_set_compression_bits() {
        let mut octets = vec![0; HEADER_LEN];
        octets.extend_from_slice(&[0b0100_0001, b'x', 0]);
        let mut buffer = ConsumableBuffer::new(&octets);
        buffer.position = HEADER_LEN;

        assert_eq!(
            Err(Error::BadCompressionMask {
                id: 7,
                octet: 0b0100_0001,
            }),
            deserialise_name(7, &mut buffer, &mut NameCache::new()),
        );
    }

    #[test]
    fn deserialise_name_rejects_label_past_the_end() {
        let mut octets = vec![0; HEADER_LEN];
        octets.extend_from_slice(&[5, b'a', b'b']);
        let mut buffer = ConsumableBuffer::new(&octets);
        buffer.position = HEADER_LEN;

        assert_eq!(
            Err(Error::NameTooShort(7)),
            deserialise_name(7, &mut buffer, &mut NameCache::new()),
        );
    }

    #[test]
    fn name_round_trip_consumes_exactly_the_encoding() {
        for name in ["example.com", "a.b.c", "x", "some.rather.deep.chain.test"] {
            let mut writable = WritableBuffer::default();
            writable.octets.resize(HEADER_LEN, 0);
            serialise_name(name, &mut writable).unwrap();
            let encoded_len = writable.octets.len() - HEADER_LEN;

            let mut buffer = ConsumableBuffer::new(&writable.octets);
            buffer.position = HEADER_LEN;
            let decoded =
                deserialise_name(0, &mut buffer, &mut NameCache::new()).unwrap();

            assert_eq!(name, decoded);
            assert_eq!(HEADER_LEN + encoded_len, buffer.position);
        }
    }

    #[test]
    fn header_round_trip() {
        for flags in 0..=0b1111_u8 {
            let header = Header {
                id: 0x1234,
                is_response: flags & 1 != 0,
                opcode: Opcode::from(flags),
                is_authoritative: flags & 2 != 0,
                is_truncated: flags & 4 != 0,
                recursion_desired: flags & 8 != 0,
                recursion_available: flags & 1 != 0,
                z: flags & 2 != 0,
                authentic_data: flags & 4 != 0,
                checking_disabled: flags & 8 != 0,
                rcode: Rcode::from(flags),
            };

            let mut writable = WritableBuffer::default();
            header.serialise(&mut writable);
            writable.write_u16(1);
            writable.write_u16(2);
            writable.write_u16(3);
            writable.write_u16(4);

            let wire_header =
                WireHeader::deserialise(&mut ConsumableBuffer::new(&writable.octets)).unwrap();

            assert_eq!(header, wire_header.header);
            assert_eq!(1, wire_header.qdcount);
            assert_eq!(2, wire_header.ancount);
            assert_eq!(3, wire_header.nscount);
            assert_eq!(4, wire_header.arcount);
        }
    }

    #[test]
    fn truncated_messages_fail_without_or_with_id() {
        assert_eq!(Err(Error::TruncatedId), Response::from_octets(&[0x12]));
        assert_eq!(
            Err(Error::TruncatedHeader(0x1234)),
            Response::from_octets(&[0x12, 0x34, 0x81, 0x80, 0x00]),
        );
    }
}
