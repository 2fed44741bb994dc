//! The subset of the RFC 1035 wire format a stub resolver needs: full
//! query serialisation, and response deserialisation for the header,
//! the (single) question, and the answer section.

pub mod deserialise;
pub mod serialise;
pub mod types;
