use crate::block::Block;
use crate::constants::{CANCEL_CHECK_INTERVAL, PROGRESS_LOG_INTERVAL};
use crate::error::MineError;
use crate::pow::meets_difficulty;
use crate::transaction::Transaction;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    Mined(Block),
    /// The search stopped on request after `attempts` hashes.
    Cancelled { attempts: u64 },
}

impl MineOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MineOutcome::Cancelled { .. })
    }

    pub fn into_block(self) -> Option<Block> {
        match self {
            MineOutcome::Mined(block) => Some(block),
            MineOutcome::Cancelled { .. } => None,
        }
    }
}

/// Search nonces, starting at the block's current nonce, until the header
/// hash has at least `difficulty` leading zero hex digits.
///
/// The block is consumed, so a single block value can only ever be under one
/// search. `cancel` is polled every [`CANCEL_CHECK_INTERVAL`] attempts.
#[tracing::instrument(skip(block, cancel), fields(index = block.index()))]
pub fn mine(block: Block, difficulty: u32, cancel: &CancelToken) -> MineOutcome {
    let (mut header, transactions) = block.into_parts();
    header.difficulty = difficulty;

    let mut attempts = 0u64;
    loop {
        if attempts % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            warn!("Mining of block {} cancelled after {} attempts", header.index, attempts);
            return MineOutcome::Cancelled { attempts };
        }

        let hash = header.hash();
        attempts += 1;
        if meets_difficulty(&hash, difficulty) {
            info!(
                "Mined block {} with nonce {} and hash {}",
                header.index,
                header.nonce,
                hex::encode(hash)
            );
            return MineOutcome::Mined(Block::from_header(header, transactions));
        }
        if attempts % PROGRESS_LOG_INTERVAL == 0 {
            debug!(attempts, nonce = header.nonce, "still mining");
        }
        header.nonce = header.nonce.wrapping_add(1);
    }
}

/// Same contract as [`mine`], with the nonce range split across the rayon
/// pool. Every worker polls `cancel` once per [`CANCEL_CHECK_INTERVAL`] nonces.
#[tracing::instrument(skip(block, cancel), fields(index = block.index()))]
pub fn mine_parallel(block: Block, difficulty: u32, cancel: &CancelToken) -> MineOutcome {
    let (mut header, transactions) = block.into_parts();
    header.difficulty = difficulty;
    if cancel.is_cancelled() {
        return MineOutcome::Cancelled { attempts: 0 };
    }

    // Prepare immutable parts for the hashing closure
    let base_header = header;
    let checkpoints = AtomicU64::new(0);

    let found = (0u64..u64::MAX).into_par_iter().find_map_any(|offset| {
        if offset % CANCEL_CHECK_INTERVAL == 0 {
            checkpoints.fetch_add(1, Ordering::Relaxed);
            if cancel.is_cancelled() {
                return Some(None);
            }
        }
        let mut h = base_header;
        h.nonce = base_header.nonce.wrapping_add(offset);
        meets_difficulty(&h.hash(), difficulty).then_some(Some(h.nonce))
    });

    match found {
        Some(Some(nonce)) => {
            header.nonce = nonce;
            let block = Block::from_header(header, transactions);
            info!(
                "Mined block {} with nonce {} and hash {}",
                block.index(),
                nonce,
                block.hash_hex()
            );
            MineOutcome::Mined(block)
        }
        Some(None) => {
            let attempts = checkpoints.load(Ordering::Relaxed) * CANCEL_CHECK_INTERVAL;
            warn!(
                "Mining of block {} cancelled after ~{} attempts",
                header.index, attempts
            );
            MineOutcome::Cancelled { attempts }
        }
        // The whole range came up empty; keep searching the wrapped space.
        None => mine(Block::from_header(base_header, transactions), difficulty, cancel),
    }
}

pub struct MinerHandle {
    cancel: CancelToken,
    worker: JoinHandle<MineOutcome>,
    done: mpsc::Receiver<()>,
}

/// Mine `block` on a dedicated thread. The search stops early once `cancel`
/// is triggered, either by the caller or through [`MinerHandle::cancel`].
pub fn spawn_miner(
    block: Block,
    difficulty: u32,
    cancel: CancelToken,
) -> Result<MinerHandle, MineError> {
    spawn_worker(block, difficulty, false, cancel)
}

fn spawn_worker(
    block: Block,
    difficulty: u32,
    parallel: bool,
    cancel: CancelToken,
) -> Result<MinerHandle, MineError> {
    let token = cancel.clone();
    let (done_tx, done) = mpsc::channel();
    let worker = thread::Builder::new()
        .name(format!("miner-{}", block.index()))
        .spawn(move || {
            let outcome = if parallel {
                mine_parallel(block, difficulty, &token)
            } else {
                mine(block, difficulty, &token)
            };
            let _ = done_tx.send(());
            outcome
        })?;
    Ok(MinerHandle {
        cancel,
        worker,
        done,
    })
}

impl MinerHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> Result<MineOutcome, MineError> {
        self.worker.join().map_err(|_| MineError::WorkerPanicked)
    }

    /// Wait up to `timeout` for a result, then cancel and collect whatever
    /// the worker ends with.
    pub fn wait_timeout(self, timeout: Duration) -> Result<MineOutcome, MineError> {
        if let Err(mpsc::RecvTimeoutError::Timeout) = self.done.recv_timeout(timeout) {
            warn!("Mining timed out after {:?}, cancelling", timeout);
            self.cancel();
        }
        self.join()
    }
}

/// Mining settings for one node, passed to whatever hosts the search.
#[derive(Clone, Copy, Debug)]
pub struct Miner {
    difficulty: u32,
    parallel: bool,
}

impl Miner {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn next_block(&self, tip: &Block, transactions: Vec<Transaction>, timestamp: u64) -> Block {
        Block::new(
            tip.index().saturating_add(1),
            timestamp,
            transactions,
            tip.hash(),
            self.difficulty,
        )
    }

    pub fn mine(&self, block: Block, cancel: &CancelToken) -> MineOutcome {
        if self.parallel {
            mine_parallel(block, self.difficulty, cancel)
        } else {
            mine(block, self.difficulty, cancel)
        }
    }

    pub fn mine_next(
        &self,
        tip: &Block,
        transactions: Vec<Transaction>,
        timestamp: u64,
        cancel: &CancelToken,
    ) -> MineOutcome {
        self.mine(self.next_block(tip, transactions, timestamp), cancel)
    }

    pub fn spawn(&self, block: Block, cancel: CancelToken) -> Result<MinerHandle, MineError> {
        spawn_worker(block, self.difficulty, self.parallel, cancel)
    }
}
