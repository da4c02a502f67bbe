use crate::Hash;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is not valid base58: {0}")]
    Encoding(String),

    #[error("address payload is {found} bytes, expected {expected}")]
    Length { expected: usize, found: usize },

    #[error("unsupported address version {0:#04x}")]
    Version(u8),

    #[error("address checksum mismatch")]
    Checksum,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("invalid secret key: expected 32 hex-encoded bytes")]
    InvalidSecretKey,
}

/// Which address field of a transaction failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxField {
    From,
    To,
}

impl fmt::Display for TxField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxField::From => f.write_str("from"),
            TxField::To => f.write_str("to"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("stored transaction hash does not match its contents")]
    HashMismatch,

    #[error("transfer amount must be positive")]
    ZeroAmount,

    #[error("invalid `{field}` address: {source}")]
    InvalidAddress {
        field: TxField,
        #[source]
        source: AddressError,
    },

    #[error("coinbase sender must be `{expected}`, got `{found}`")]
    InvalidCoinbaseSender { expected: String, found: String },

    #[error("timestamp {timestamp} is past the allowed limit {limit}")]
    FutureTimestamp { timestamp: u64, limit: u64 },

    #[error("transaction is not signed")]
    MissingSignature,

    #[error("coinbase transactions must not carry a signature")]
    UnexpectedSignature,

    #[error("signature public key is not a valid ed25519 point")]
    InvalidPublicKey,

    #[error("signing key does not own the sender address")]
    SignerMismatch,

    #[error("signature verification failed")]
    BadSignature,
}

/// Which derived digest failed to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    BlockHash,
    MerkleRoot,
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKind::BlockHash => f.write_str("block hash"),
            HashKind::MerkleRoot => f.write_str("merkle root"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkageError {
    #[error("expected index {expected}, found {found}")]
    IndexGap { expected: u64, found: u64 },

    #[error(
        "previous hash {} does not match {}",
        hex::encode(.found),
        hex::encode(.expected)
    )]
    PreviousHash { expected: Hash, found: Hash },

    #[error("tip index {tip} has no successor")]
    IndexOverflow { tip: u64 },

    #[error(
        "genesis hash {} does not match pinned {}",
        hex::encode(.found),
        hex::encode(.expected)
    )]
    GenesisHash { expected: Hash, found: Hash },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinbaseError {
    #[error("coinbase at position {0}, only the first transaction may mint")]
    Misplaced(usize),

    #[error("coinbase pays {amount}, above the block reward of {reward}")]
    ExcessReward { amount: u64, reward: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("transaction {position} is malformed: {source}")]
    MalformedTransaction {
        position: usize,
        #[source]
        source: TxError,
    },

    #[error("{0} does not match its recomputation")]
    HashMismatch(HashKind),

    #[error("chain linkage broken: {0}")]
    ChainLinkage(LinkageError),

    #[error("invalid coinbase: {0}")]
    InvalidCoinbase(CoinbaseError),

    #[error("insufficient work: need {required} leading zero hex digits, found {found}")]
    InsufficientWork { required: u32, found: u32 },

    #[error("chain has no blocks")]
    EmptyChain,
}

#[derive(Debug, Error)]
pub enum MineError {
    #[error("failed to spawn mining worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("mining worker panicked")]
    WorkerPanicked,
}
