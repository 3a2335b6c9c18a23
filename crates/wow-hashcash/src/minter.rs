//! Nonce minters: a sequential single-worker search and a parallel
//! work-stealing search that fans the claimed shards out across blocking
//! tasks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::HashcashError;
use crate::nonce_iter::{FastIter, ShardClaimer};
use crate::validator::validate;

/// Shards per worker in the parallel minter, so idle workers can steal work
/// from shards a slower worker hasn't reached yet.
const SHARDS_PER_WORKER: u32 = 4;

/// Searches the full nonce space sequentially on the calling task, checking
/// `cancel` before each attempt. Intended for low complexities or tests;
/// [`mint`] is the production entry point.
///
/// # Errors
///
/// Returns [`HashcashError::Cancelled`] if `cancel` fires, or
/// [`HashcashError::CollisionNotFound`] if the space is exhausted.
pub fn mint_single(prefix: &[u8], complexity: u32, cancel: &CancellationToken) -> Result<[u8; 8], HashcashError> {
    let iter = FastIter::new(1);
    while let Some(nonce) = iter.next(0) {
        if cancel.is_cancelled() {
            return Err(HashcashError::Cancelled("mint_single cancelled".to_owned()));
        }
        if validate(prefix, &nonce, complexity).is_ok() {
            return Ok(nonce);
        }
    }
    Err(HashcashError::CollisionNotFound)
}

/// Searches the nonce space across `workers` blocking tasks, each stealing
/// shards from a shared [`ShardClaimer`] as it exhausts its own. The first
/// worker to find a valid nonce wins; `cancel` stops every worker early.
///
/// # Errors
///
/// Returns [`HashcashError::Cancelled`] if `cancel` fires before a nonce is
/// found, or [`HashcashError::CollisionNotFound`] if every shard is
/// exhausted without a match.
///
/// # Panics
///
/// Panics if a worker task panics (propagated via `JoinHandle`), which would
/// indicate a bug rather than an expected runtime condition.
pub async fn mint(prefix: &[u8], complexity: u32, workers: u32, cancel: CancellationToken) -> Result<[u8; 8], HashcashError> {
    let workers = workers.max(1);
    let shard_count = workers.saturating_mul(SHARDS_PER_WORKER).max(1);
    let iter = Arc::new(FastIter::new(shard_count));
    let claimer = Arc::new(ShardClaimer::new(shard_count));
    let prefix = Arc::new(prefix.to_vec());

    let (tx, mut rx) = mpsc::channel::<Option<[u8; 8]>>(workers as usize);
    let worker_cancel = cancel.child_token();

    let mut handles = Vec::with_capacity(workers as usize);
    for _ in 0..workers {
        let iter = Arc::clone(&iter);
        let claimer = Arc::clone(&claimer);
        let prefix = Arc::clone(&prefix);
        let tx = tx.clone();
        let worker_cancel = worker_cancel.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            worker_loop(&iter, &claimer, &prefix, complexity, &worker_cancel, &tx);
        }));
    }
    drop(tx);

    let outcome = tokio::select! {
        () = cancel.cancelled() => Err(HashcashError::Cancelled("mint cancelled".to_owned())),
        result = collect(&mut rx) => result,
    };

    worker_cancel.cancel();
    for handle in handles {
        let _: () = handle.await.expect("hashcash worker task panicked");
    }

    outcome
}

async fn collect(rx: &mut mpsc::Receiver<Option<[u8; 8]>>) -> Result<[u8; 8], HashcashError> {
    let mut done_count = 0;
    while let Some(message) = rx.recv().await {
        match message {
            Some(nonce) => return Ok(nonce),
            None => {
                done_count += 1;
            }
        }
    }
    let _ = done_count;
    Err(HashcashError::CollisionNotFound)
}

fn worker_loop(
    iter: &FastIter,
    claimer: &ShardClaimer,
    prefix: &[u8],
    complexity: u32,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<Option<[u8; 8]>>,
) {
    while let Some(seq) = claimer.claim() {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let Some(nonce) = iter.next(seq) else { break };
            if validate(prefix, &nonce, complexity).is_ok() {
                let _ = tx.blocking_send(Some(nonce));
                return;
            }
        }
    }
    let _ = tx.blocking_send(None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_single_finds_a_zero_complexity_nonce_immediately() {
        let cancel = CancellationToken::new();
        let nonce = mint_single(b"prefix", 0, &cancel).expect("zero complexity always satisfiable");
        assert_eq!(nonce, 0u64.to_le_bytes());
    }

    #[test]
    fn mint_single_respects_pre_set_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = mint_single(b"prefix", 8, &cancel);
        assert!(matches!(result, Err(HashcashError::Cancelled(_))));
    }

    #[tokio::test]
    #[allow(unused_comparisons)]
    async fn mint_finds_a_zero_complexity_nonce_with_multiple_workers() {
        let cancel = CancellationToken::new();
        let nonce = mint(b"prefix", 0, 4, cancel).await.expect("zero complexity always satisfiable");
        let digest = crate::validator::hash(b"prefix", &nonce);
        assert!(crate::validator::count_leading_zero_bits(&digest) >= 0);
    }

    #[tokio::test]
    async fn mint_returns_the_nonce_that_actually_validates() {
        let cancel = CancellationToken::new();
        let nonce = mint(b"prefix", 4, 2, cancel).await.expect("complexity 4 is cheap to find");
        assert!(validate(b"prefix", &nonce, 4).is_ok());
    }

    #[tokio::test]
    async fn mint_honors_pre_set_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = mint(b"prefix", 30, 2, cancel).await;
        assert!(matches!(result, Err(HashcashError::Cancelled(_))));
    }
}
