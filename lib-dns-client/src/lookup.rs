//! The one-shot resolver and the typed lookups on top of it.
//!
//! `resolve` speaks to the configured upstream once and hands back
//! whatever mix of records the answer section held.  The typed
//! functions ask for one record type and filter the mix down to it:
//! the address lookups silently step over CNAME chain elements, since
//! servers routinely return the alias chain alongside the addresses,
//! while the others treat any unexpected variant as an error.

use rand::Rng;
use std::net::{Ipv4Addr, Ipv6Addr};

use dns_wire::protocol::serialise::serialise_query;
use dns_wire::protocol::types::*;

use crate::net::{exchange_tcp, exchange_udp};
use crate::types::{Config, ResolveError};

/// Send a single query and decode the response.  Returns the decoded
/// answer values and the transaction id the response carried.
pub async fn resolve(
    qtype: RecordType,
    qname: &str,
    config: &Config,
) -> Result<(Vec<RecordData>, u16), ResolveError> {
    let id = rand::thread_rng().gen();
    let query = serialise_query(id, qtype, qname).map_err(ResolveError::Serialise)?;

    tracing::debug!(%qname, %qtype, id, server = %config.server, tcp = config.tcp, "sending query");

    let octets = if config.tcp {
        exchange_tcp(config.server, &query).await?
    } else {
        exchange_udp(config.server, &query).await?
    };

    let response = Response::from_octets(&octets).map_err(ResolveError::Message)?;
    tracing::debug!(question = %response.question, answers = response.answers.len(), "got response");

    Ok((response.answers, response.id))
}

/// Look up the IPv4 addresses of a name.
pub async fn resolve_a(qname: &str, config: &Config) -> Result<Vec<Ipv4Addr>, ResolveError> {
    let (records, _) = resolve(RecordType::A, qname, config).await?;
    collect_a(records)
}

/// Look up the IPv6 addresses of a name.
pub async fn resolve_aaaa(qname: &str, config: &Config) -> Result<Vec<Ipv6Addr>, ResolveError> {
    let (records, _) = resolve(RecordType::Aaaa, qname, config).await?;
    collect_aaaa(records)
}

/// Look up the canonical name of an alias.
pub async fn resolve_cname(qname: &str, config: &Config) -> Result<Vec<String>, ResolveError> {
    let (records, _) = resolve(RecordType::Cname, qname, config).await?;
    collect_names(RecordType::Cname, records)
}

/// Look up the authoritative nameservers of a domain.
pub async fn resolve_ns(qname: &str, config: &Config) -> Result<Vec<String>, ResolveError> {
    let (records, _) = resolve(RecordType::Ns, qname, config).await?;
    collect_names(RecordType::Ns, records)
}

/// Reverse-look up a dotted-quad.  The `.in-addr.arpa` suffix is
/// appended here; reversing the octet order is the caller's business.
pub async fn resolve_ptr(qname: &str, config: &Config) -> Result<Vec<String>, ResolveError> {
    let qname = format!("{qname}.in-addr.arpa");
    let (records, _) = resolve(RecordType::Ptr, &qname, config).await?;
    collect_names(RecordType::Ptr, records)
}

/// Look up the start-of-authority record of a zone.
pub async fn resolve_soa(qname: &str, config: &Config) -> Result<Vec<Soa>, ResolveError> {
    let (records, _) = resolve(RecordType::Soa, qname, config).await?;
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match record {
            RecordData::Soa(soa) => out.push(soa),
            data => {
                return Err(ResolveError::UnexpectedRecord {
                    qtype: RecordType::Soa,
                    data,
                })
            }
        }
    }
    Ok(out)
}

/// Look up the mail exchangers of a domain.
pub async fn resolve_mx(qname: &str, config: &Config) -> Result<Vec<Mx>, ResolveError> {
    let (records, _) = resolve(RecordType::Mx, qname, config).await?;
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match record {
            RecordData::Mx(mx) => out.push(mx),
            data => {
                return Err(ResolveError::UnexpectedRecord {
                    qtype: RecordType::Mx,
                    data,
                })
            }
        }
    }
    Ok(out)
}

/// Look up the service locations under a name.
pub async fn resolve_srv(qname: &str, config: &Config) -> Result<Vec<Srv>, ResolveError> {
    let (records, _) = resolve(RecordType::Srv, qname, config).await?;
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match record {
            RecordData::Srv(srv) => out.push(srv),
            data => {
                return Err(ResolveError::UnexpectedRecord {
                    qtype: RecordType::Srv,
                    data,
                })
            }
        }
    }
    Ok(out)
}

/// Ask for every record type at once and return the raw mix.
pub async fn resolve_any(qname: &str, config: &Config) -> Result<Vec<RecordData>, ResolveError> {
    let (records, _) = resolve(RecordType::Any, qname, config).await?;
    Ok(records)
}

fn collect_a(records: Vec<RecordData>) -> Result<Vec<Ipv4Addr>, ResolveError> {
    let mut addresses = Vec::with_capacity(records.len());
    for record in records {
        match record {
            RecordData::A { address } => addresses.push(address),
            RecordData::Cname { .. } => (),
            data => {
                return Err(ResolveError::UnexpectedRecord {
                    qtype: RecordType::A,
                    data,
                })
            }
        }
    }
    Ok(addresses)
}

fn collect_aaaa(records: Vec<RecordData>) -> Result<Vec<Ipv6Addr>, ResolveError> {
    let mut addresses = Vec::with_capacity(records.len());
    for record in records {
        match record {
            RecordData::Aaaa { address } => addresses.push(address),
            RecordData::Cname { .. } => (),
            data => {
                return Err(ResolveError::UnexpectedRecord {
                    qtype: RecordType::Aaaa,
                    data,
                })
            }
        }
    }
    Ok(addresses)
}

fn collect_names(qtype: RecordType, records: Vec<RecordData>) -> Result<Vec<String>, ResolveError> {
    let mut names = Vec::with_capacity(records.len());
    for record in records {
        match record {
            RecordData::Ns { nsdname: name }
            | RecordData::Cname { cname: name }
            | RecordData::Ptr { ptrdname: name } => names.push(name),
            data => return Err(ResolveError::UnexpectedRecord { qtype, data }),
        }
    }
    Ok(names)
}
