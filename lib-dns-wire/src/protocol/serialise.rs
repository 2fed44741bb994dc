//! Serialisation of DNS queries to the wire format.  Queries always
//! carry exactly one question and never use name compression, so this
//! is much smaller than the deserialisation side.

use crate::protocol::types::*;

/// Build the octets of a query asking a single question: recursion
/// desired, QDCOUNT 1, all other flags and counters zero.
pub fn serialise_query(id: u16, qtype: RecordType, qname: &str) -> Result<Vec<u8>, Error> {
    let mut buffer = WritableBuffer::default();

    Header::query(id).serialise(&mut buffer);
    buffer.write_u16(1);
    buffer.write_u16(0);
    buffer.write_u16(0);
    buffer.write_u16(0);

    Question {
        name: qname.to_string(),
        qtype,
    }
    .serialise(&mut buffer)?;

    Ok(buffer.octets)
}

impl Header {
    pub fn serialise(self, buffer: &mut WritableBuffer) {
        // octet 1
        let flag_qr = if self.is_response { HEADER_MASK_QR } else { 0 };
        let field_opcode = HEADER_MASK_OPCODE & (u8::from(self.opcode) << HEADER_OFFSET_OPCODE);
        let flag_aa = if self.is_authoritative {
            HEADER_MASK_AA
        } else {
            0
        };
        let flag_tc = if self.is_truncated { HEADER_MASK_TC } else { 0 };
        let flag_rd = if self.recursion_desired {
            HEADER_MASK_RD
        } else {
            0
        };
        // octet 2
        let flag_ra = if self.recursion_available {
            HEADER_MASK_RA
        } else {
            0
        };
        let flag_z = if self.z { HEADER_MASK_Z } else { 0 };
        let flag_ad = if self.authentic_data {
            HEADER_MASK_AD
        } else {
            0
        };
        let flag_cd = if self.checking_disabled {
            HEADER_MASK_CD
        } else {
            0
        };
        let field_rcode = HEADER_MASK_RCODE & u8::from(self.rcode);

        buffer.write_u16(self.id);
        buffer.write_u8(flag_qr | field_opcode | flag_aa | flag_tc | flag_rd);
        buffer.write_u8(flag_ra | flag_z | flag_ad | flag_cd | field_rcode);
    }
}

impl Question {
    pub fn serialise(self, buffer: &mut WritableBuffer) -> Result<(), Error> {
        serialise_name(&self.name, buffer)?;
        buffer.write_u16(self.qtype.into());
        buffer.write_u16(CLASS_IN);
        Ok(())
    }
}

/// Encode a dotted name as length-prefixed labels with a zero
/// terminator.  No compression pointers are emitted.
pub fn serialise_name(name: &str, buffer: &mut WritableBuffer) -> Result<(), Error> {
    let mut written = 0;

    for label in name.split('.') {
        if label.len() > LABEL_MAX_LEN {
            return Err(Error::LabelTooLong {
                label: label.to_string(),
            });
        }
        written += label.len() + 1;
        if written + 1 > NAME_MAX_LEN {
            return Err(Error::NameTooLong {
                name: name.to_string(),
            });
        }

        // safe because of the bounds check above
        buffer.write_u8(u8::try_from(label.len()).unwrap());
        buffer.write_octets(label.as_bytes());
    }

    buffer.write_u8(0);
    Ok(())
}

/// Errors encountered when serialising a query.  These are all caller
/// misuse: the wire format simply cannot express the given name.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// A label is over 63 octets.
    LabelTooLong { label: String },

    /// The whole encoded name, terminator included, is over 255
    /// octets.
    NameTooLong { name: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::LabelTooLong { label } => {
                write!(f, "label '{label}' is longer than {LABEL_MAX_LEN} octets")
            }
            Error::NameTooLong { name } => {
                write!(f, "name '{name}' encodes to more than {NAME_MAX_LEN} octets")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A buffer which can be written to, for serialisation purposes.
pub struct WritableBuffer {
    pub octets: Vec<u8>,
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self {
            octets: Vec::with_capacity(512),
        }
    }
}

impl WritableBuffer {
    pub fn write_u8(&mut self, octet: u8) {
        self.octets.push(octet);
    }

    pub fn write_u16(&mut self, value: u16) {
        for octet in value.to_be_bytes() {
            self.octets.push(octet);
        }
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        for octet in octets {
            self.octets.push(*octet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[rustfmt::skip]
    fn test_serialise_query() {
        let octets = serialise_query(0x00ea, RecordType::A, "example.com").unwrap();

        assert_eq!(
            vec![
                // ID
                0x00, 0xea,
                // flags: QR=0, opcode=0, AA=0, TC=0, RD=1 | RA=0, Z=0, AD=0, CD=0, RCODE=0
                0b0000_0001, 0b0000_0000,
                // QDCOUNT
                0, 1,
                // ANCOUNT, NSCOUNT, ARCOUNT
                0, 0, 0, 0, 0, 0,
                // QNAME
                7, 101, 120, 97, 109, 112, 108, 101, // "example"
                3, 99, 111, 109, 0, // "com"
                // QTYPE
                0, 1,
                // QCLASS
                0, 1,
            ],
            octets,
        );
    }

    #[test]
    fn serialise_name_rejects_long_label() {
        let mut buffer = WritableBuffer::default();
        let label = "x".repeat(64);

        assert_eq!(
            Err(Error::LabelTooLong {
                label: label.clone()
            }),
            serialise_name(&format!("{label}.com"), &mut buffer),
        );
    }

    #[test]
    fn serialise_name_accepts_63_octet_label() {
        let mut buffer = WritableBuffer::default();
        let label = "x".repeat(63);

        assert_eq!(Ok(()), serialise_name(&label, &mut buffer));
        assert_eq!(65, buffer.octets.len());
    }

    #[test]
    fn serialise_name_rejects_long_name() {
        // four 62-octet labels encode to 4 * 63 + 1 = 253 octets, five
        // of them to 316
        let label = "y".repeat(62);
        let name = [&label; 5].map(String::as_str).join(".");
        let mut buffer = WritableBuffer::default();

        assert_eq!(
            Err(Error::NameTooLong { name: name.clone() }),
            serialise_name(&name, &mut buffer),
        );
    }
}
