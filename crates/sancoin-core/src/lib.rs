pub mod address;
pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
mod hex_serde;
pub mod merkle;
pub mod mine;
pub mod transaction;
pub mod wallet;

use constants::HASH_SIZE;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub use address::{AddressCodec, Base58CheckCodec};
pub use block::{Block, BlockHeader};
pub use chain::{ChainValidator, Clock, ConsensusParams, GenesisSpec, ValidationResult};
pub use error::{
    AddressError, CoinbaseError, HashKind, LinkageError, MineError, TxError, TxField,
    ValidationError, WalletError,
};
pub use merkle::merkle_root;
pub use mine::{mine, mine_parallel, spawn_miner, CancelToken, MineOutcome, Miner, MinerHandle};
pub use transaction::{Transaction, TxKind, TxSignature};
pub use wallet::Wallet;

pub type Hash = [u8; HASH_SIZE];

pub const ZERO_HASH: Hash = [0u8; HASH_SIZE];

pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    out
}

/// Seconds since the unix epoch; a clock set before 1970 reads as 0.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub mod pow {
    use super::Hash;
    use crate::constants::BITS_PER_DIFFICULTY;

    pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 8;
            } else {
                total += b.leading_zeros();
                break;
            }
        }
        total
    }

    pub fn leading_zero_hex_digits(hash: &Hash) -> u32 {
        count_leading_zero_bits(hash) / BITS_PER_DIFFICULTY
    }

    /// True when `hash`, read as a big-endian integer, is below
    /// `2^(256 - 4 * difficulty)`; i.e. it starts with `difficulty` zero hex digits.
    pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
        count_leading_zero_bits(hash) >= difficulty.saturating_mul(BITS_PER_DIFFICULTY)
    }
}
