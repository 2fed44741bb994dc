//! The naive bulk mode: a small pool of workers each doing plain
//! one-shot lookups.  Every lookup pays for its own socket and has no
//! retransmission beyond the one-shot deadline, but there is no
//! shared state to get wrong.  The pipelined engine in `pipeline` is
//! the serious alternative.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::lookup::resolve_a;
use crate::types::{Answer, Config};

/// How many lookups may be outstanding at once.
const WORKER_COUNT: usize = 2;

/// How many finished answers may queue before the collector catches
/// up.
const CHANNEL_CAPACITY: usize = 10;

/// Resolve every name in the batch with one-shot lookups, at most
/// `WORKER_COUNT` at a time.  Per-name failures fill that name's
/// result slot; the batch itself cannot fail.
pub async fn bulk_resolve_a_pooled(names: Vec<String>, config: &Config) -> HashMap<String, Answer> {
    let total = names.len();
    let permits = Arc::new(Semaphore::new(WORKER_COUNT));
    let (answer_tx, mut answer_rx) = mpsc::channel(CHANNEL_CAPACITY);

    for fqdn in names {
        let permits = Arc::clone(&permits);
        let answers = answer_tx.clone();
        let config = *config;

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let answer = match resolve_a(&fqdn, &config).await {
                Ok(ips) => Answer {
                    ips: ips.into_iter().map(IpAddr::V4).collect(),
                    error: None,
                },
                Err(error) => Answer {
                    ips: Vec::new(),
                    error: Some(error),
                },
            };
            let _ = answers.send((fqdn, answer)).await;
        });
    }
    drop(answer_tx);

    let mut results = HashMap::with_capacity(total);
    while let Some((fqdn, answer)) = answer_rx.recv().await {
        tracing::debug!(%fqdn, ips = answer.ips.len(), "collected");
        results.insert(fqdn, answer);
    }
    results
}
