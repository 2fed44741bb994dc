//! The pipelined bulk engine: many A lookups multiplexed over one
//! UDP socket.
//!
//! Three tasks cooperate.  The scheduler owns the in-flight map -
//! transaction id to query state - and is the only task that touches
//! it.  A writer task drains a bounded queue of ready-to-send frames
//! onto the socket, pacing itself so the batch does not burst.  A
//! reader task copies every arriving datagram onto a second bounded
//! queue.  The tasks share nothing else: the socket is written by one
//! and read by the other, and all coordination happens over the two
//! queues, so no lock is needed anywhere.
//!
//! Responses arrive in whatever order the server pleases, which is
//! why transaction ids - not send order - drive the matching: each
//! input name is assigned its index as its id, and a response (or an
//! attributable failure) removes that id's entry and fills that
//! name's result slot.  Queries unanswered for long enough are simply
//! sent again; the engine runs until the in-flight map is empty.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use dns_wire::protocol::serialise::serialise_query;
use dns_wire::protocol::types::{RecordData, RecordType, Response};

use crate::net::{local_address_for, UDP_BUFFER_SIZE};
use crate::types::{Answer, Config, ResolveError};

/// Queries with no response for this long are sent again.
const RETRANSMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// The scheduler re-checks for due retransmissions at least this
/// often, even when no responses arrive.
const TICK: Duration = Duration::from_secs(1);

/// How many frames may sit queued between the scheduler and each
/// socket task.
const CHANNEL_CAPACITY: usize = 10;

/// Pace of the writer, in queries per second.
const SEND_RATE: u32 = 15;

/// Hard ceiling on the send rate.
const MAX_SEND_RATE: u32 = 1_000_000;

/// Per-query engine state: the name still being resolved, and when
/// its query was last put on the wire (`None` until the first send).
struct InFlight {
    fqdn: String,
    last_sent: Option<Instant>,
}

/// Resolve every name in the batch against one server, concurrently,
/// over a single UDP socket.  The result map has one entry per
/// distinct input name; NXDOMAIN and other attributable failures fill
/// that name's slot rather than failing the batch.
pub async fn bulk_resolve_a(
    names: Vec<String>,
    config: &Config,
) -> Result<HashMap<String, Answer>, ResolveError> {
    run_engine(names, config.server, SEND_RATE, RETRANSMIT_TIMEOUT).await
}

/// The engine proper, with the pacing and retransmission knobs
/// exposed so tests do not take ten seconds per retransmit cycle.
async fn run_engine(
    names: Vec<String>,
    server: SocketAddr,
    rate: u32,
    retransmit_timeout: Duration,
) -> Result<HashMap<String, Answer>, ResolveError> {
    // ids are indices, so a batch cannot outgrow the id space
    if names.len() > usize::from(u16::MAX) + 1 {
        return Err(ResolveError::BatchTooLarge { count: names.len() });
    }

    let sock = Arc::new(UdpSocket::bind(local_address_for(server)).await?);
    sock.connect(server).await?;

    let token = CancellationToken::new();
    let (write_tx, write_rx) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);
    let (read_tx, mut read_rx) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);

    tokio::spawn(write_frames(write_rx, Arc::clone(&sock), rate, token.clone()));
    tokio::spawn(read_frames(read_tx, Arc::clone(&sock), token.clone()));

    let mut in_flight = HashMap::with_capacity(names.len());
    for (index, fqdn) in names.into_iter().enumerate() {
        // safe because of the bounds check above
        let id = u16::try_from(index).unwrap();
        in_flight.insert(
            id,
            InFlight {
                fqdn,
                last_sent: None,
            },
        );
    }

    let mut results = HashMap::with_capacity(in_flight.len());

    while !in_flight.is_empty() {
        // enqueue everything never sent or overdue
        let mut unsendable = Vec::new();
        for (&id, state) in &mut in_flight {
            let due = state
                .last_sent
                .map_or(true, |at| at.elapsed() >= retransmit_timeout);
            if !due {
                continue;
            }

            match serialise_query(id, RecordType::A, &state.fqdn) {
                Ok(query) => {
                    if state.last_sent.is_some() {
                        tracing::debug!(id, fqdn = %state.fqdn, "retransmitting");
                    }
                    if write_tx.send(query).await.is_err() {
                        token.cancel();
                        return Err(ResolveError::Disconnected);
                    }
                    state.last_sent = Some(Instant::now());
                }
                Err(error) => unsendable.push((id, error)),
            }
        }
        // a name the wire format cannot express will never resolve:
        // fail its slot instead of retrying it forever
        for (id, error) in unsendable {
            if let Some(state) = in_flight.remove(&id) {
                results.insert(
                    state.fqdn,
                    Answer {
                        ips: Vec::new(),
                        error: Some(ResolveError::Serialise(error)),
                    },
                );
            }
        }

        // wait for a response, or for the tick so timed-out queries
        // are revisited even if the reader never fires
        tokio::select! {
            received = read_rx.recv() => {
                let Some(octets) = received else {
                    token.cancel();
                    return Err(ResolveError::Disconnected);
                };
                match Response::from_octets(&octets) {
                    Ok(response) => {
                        if let Some(state) = in_flight.remove(&response.id) {
                            tracing::debug!(id = response.id, fqdn = %state.fqdn, answers = response.answers.len(), "resolved");
                            results.insert(
                                state.fqdn,
                                Answer {
                                    ips: extract_addresses(&response.answers),
                                    error: None,
                                },
                            );
                        } else {
                            tracing::warn!(id = response.id, "response for unknown transaction id");
                        }
                    }
                    Err(error) => match error.id() {
                        Some(id) => {
                            if let Some(state) = in_flight.remove(&id) {
                                results.insert(
                                    state.fqdn,
                                    Answer {
                                        ips: Vec::new(),
                                        error: Some(ResolveError::Message(error)),
                                    },
                                );
                            } else {
                                tracing::warn!(id, "errored response for unknown transaction id");
                            }
                        }
                        None => tracing::warn!(%error, "undecodable response"),
                    },
                }
            }
            () = sleep(TICK) => {}
        }
    }

    token.cancel();
    Ok(results)
}

/// Pull the addresses out of a mixed answer sequence, stepping over
/// everything else (CNAME chain elements in particular).
fn extract_addresses(records: &[RecordData]) -> Vec<IpAddr> {
    records
        .iter()
        .filter_map(|record| match record {
            RecordData::A { address } => Some(IpAddr::V4(*address)),
            RecordData::Aaaa { address } => Some(IpAddr::V6(*address)),
            _ => None,
        })
        .collect()
}

/// Writer task: drain the frame queue onto the socket, sleeping for
/// the pacing period between sends.  Send failures are logged, not
/// fatal: the query will time out and be retransmitted.
async fn write_frames(
    mut frames: mpsc::Receiver<Vec<u8>>,
    sock: Arc<UdpSocket>,
    rate: u32,
    token: CancellationToken,
) {
    let rate = rate.clamp(1, MAX_SEND_RATE);
    let period = Duration::from_nanos(1_000_000_000 / u64::from(rate));

    loop {
        let frame = tokio::select! {
            () = token.cancelled() => return,
            received = frames.recv() => match received {
                Some(frame) => frame,
                None => return,
            },
        };

        match sock.send(&frame).await {
            Ok(sent) if sent == frame.len() => (),
            Ok(sent) => tracing::warn!(sent, expected = frame.len(), "short send"),
            Err(error) => tracing::warn!(%error, "unable to send"),
        }

        sleep(period).await;
    }
}

/// Reader task: publish every datagram that arrives.  Parsing happens
/// in the scheduler; this task only copies bytes off the socket.
async fn read_frames(frames: mpsc::Sender<Vec<u8>>, sock: Arc<UdpSocket>, token: CancellationToken) {
    let mut buffer = [0_u8; UDP_BUFFER_SIZE];

    loop {
        let received = tokio::select! {
            () = token.cancelled() => return,
            received = sock.recv(&mut buffer) => received,
        };

        match received {
            Ok(read) => {
                if frames.send(buffer[..read].to_vec()).await.is_err() {
                    return;
                }
            }
            Err(error) => tracing::warn!(%error, "unable to read"),
        }
    }
}
