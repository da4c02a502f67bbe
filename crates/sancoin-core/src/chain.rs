use crate::address::{AddressCodec, Base58CheckCodec};
use crate::block::Block;
use crate::constants::{BLOCK_REWARD, DEFAULT_DIFFICULTY, MAX_CLOCK_SKEW_SECS};
use crate::error::{CoinbaseError, LinkageError, ValidationError};
use crate::pow::{leading_zero_hex_digits, meets_difficulty};
use crate::{unix_now, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisSpec {
    pub timestamp: u64,
    /// Sentinel standing in for the missing parent.
    #[serde(with = "crate::hex_serde")]
    pub previous_hash: Hash,
    /// When set, genesis must hash to exactly this value.
    #[serde(with = "crate::hex_serde::option", skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<Hash>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Leading zero hex digits required of every non-genesis block hash.
    pub difficulty: u32,
    pub max_clock_skew_secs: u64,
    /// Upper bound on the single coinbase a block may carry.
    pub block_reward: u64,
    pub genesis: GenesisSpec,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_clock_skew_secs: MAX_CLOCK_SKEW_SECS,
            block_reward: BLOCK_REWARD,
            genesis: GenesisSpec::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    /// A frozen instant in unix seconds.
    Fixed(u64),
}

impl Clock {
    pub fn now(&self) -> u64 {
        match self {
            Clock::System => unix_now(),
            Clock::Fixed(t) => *t,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    /// `index` is the position of the rejected block in the chain.
    Invalid { reason: ValidationError, index: u64 },
}

impl ValidationResult {
    fn from_check(index: u64, check: Result<(), ValidationError>) -> Self {
        match check {
            Ok(()) => ValidationResult::Valid,
            Err(reason) => {
                warn!("rejected block {}: {}", index, reason);
                ValidationResult::Invalid { reason, index }
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn into_result(self) -> Result<(), (u64, ValidationError)> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { reason, index } => Err((index, reason)),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationResult::Valid => f.write_str("valid"),
            ValidationResult::Invalid { reason, index } => {
                write!(f, "invalid block {index}: {reason}")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChainValidator<C = Base58CheckCodec> {
    params: ConsensusParams,
    codec: C,
    clock: Clock,
}

impl ChainValidator<Base58CheckCodec> {
    pub fn new(params: ConsensusParams) -> Self {
        Self::with_codec(params, Base58CheckCodec)
    }
}

impl<C: AddressCodec> ChainValidator<C> {
    pub fn with_codec(params: ConsensusParams, codec: C) -> Self {
        Self {
            params,
            codec,
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Check `candidate` as the successor of `tip`. Rules run in a fixed
    /// order and the first failure is returned: index, previous hash, work,
    /// self-consistency, then each transaction.
    pub fn check_next(&self, candidate: &Block, tip: &Block) -> Result<(), ValidationError> {
        self.check_next_at(candidate, tip, self.clock.now())
    }

    pub fn validate_next(&self, candidate: &Block, tip: &Block) -> ValidationResult {
        let position = tip.index().checked_add(1).unwrap_or(u64::MAX);
        ValidationResult::from_check(position, self.check_next(candidate, tip))
    }

    /// Genesis has no parent and no work requirement; it must match the
    /// agreed [`GenesisSpec`] instead.
    pub fn check_genesis(&self, block: &Block) -> Result<(), ValidationError> {
        self.check_genesis_at(block, self.clock.now())
    }

    pub fn validate_genesis(&self, block: &Block) -> ValidationResult {
        ValidationResult::from_check(0, self.check_genesis(block))
    }

    pub fn validate_chain(&self, blocks: &[Block]) -> ValidationResult {
        let Some(genesis) = blocks.first() else {
            return ValidationResult::from_check(0, Err(ValidationError::EmptyChain));
        };
        let now = self.clock.now();

        if let Err(reason) = self.check_genesis_at(genesis, now) {
            return ValidationResult::from_check(0, Err(reason));
        }
        for (i, pair) in blocks.windows(2).enumerate() {
            let check = self.check_next_at(&pair[1], &pair[0], now);
            if check.is_err() {
                return ValidationResult::from_check(i as u64 + 1, check);
            }
        }
        debug!("validated chain of {} blocks", blocks.len());
        ValidationResult::Valid
    }

    fn check_next_at(&self, candidate: &Block, tip: &Block, now: u64) -> Result<(), ValidationError> {
        let Some(expected) = tip.index().checked_add(1) else {
            return Err(ValidationError::ChainLinkage(LinkageError::IndexOverflow {
                tip: tip.index(),
            }));
        };
        if candidate.index() != expected {
            return Err(ValidationError::ChainLinkage(LinkageError::IndexGap {
                expected,
                found: candidate.index(),
            }));
        }
        if candidate.previous_hash() != tip.hash() {
            return Err(ValidationError::ChainLinkage(LinkageError::PreviousHash {
                expected: tip.hash(),
                found: candidate.previous_hash(),
            }));
        }

        let required = self.params.difficulty;
        if !meets_difficulty(&candidate.hash(), required) {
            return Err(ValidationError::InsufficientWork {
                required,
                found: leading_zero_hex_digits(&candidate.hash()),
            });
        }
        let declared = candidate.header().difficulty;
        if declared < required {
            return Err(ValidationError::InsufficientWork {
                required,
                found: declared,
            });
        }
        if !meets_difficulty(&candidate.hash(), declared) {
            return Err(ValidationError::InsufficientWork {
                required: declared,
                found: leading_zero_hex_digits(&candidate.hash()),
            });
        }

        candidate.verify_self()?;
        self.check_transactions(candidate, now)?;
        debug!("block {} accepted on tip {}", candidate.index(), tip.hash_hex());
        Ok(())
    }

    fn check_genesis_at(&self, block: &Block, now: u64) -> Result<(), ValidationError> {
        let spec = &self.params.genesis;
        if block.index() != 0 {
            return Err(ValidationError::ChainLinkage(LinkageError::IndexGap {
                expected: 0,
                found: block.index(),
            }));
        }
        if block.previous_hash() != spec.previous_hash {
            return Err(ValidationError::ChainLinkage(LinkageError::PreviousHash {
                expected: spec.previous_hash,
                found: block.previous_hash(),
            }));
        }
        if let Some(expected) = spec.expected_hash {
            if block.hash() != expected {
                return Err(ValidationError::ChainLinkage(LinkageError::GenesisHash {
                    expected,
                    found: block.hash(),
                }));
            }
        }
        block.verify_self()?;
        self.check_transactions(block, now)
    }

    fn check_transactions(&self, block: &Block, now: u64) -> Result<(), ValidationError> {
        for (position, tx) in block.transactions().iter().enumerate() {
            tx.validate(&self.codec, now, self.params.max_clock_skew_secs)
                .map_err(|source| ValidationError::MalformedTransaction { position, source })?;
            if tx.is_coinbase() {
                check_coinbase(position, tx.amount(), self.params.block_reward)
                    .map_err(ValidationError::InvalidCoinbase)?;
            }
        }
        Ok(())
    }
}

/// One coinbase per block, in first position, paying at most `reward`.
fn check_coinbase(position: usize, amount: u64, reward: u64) -> Result<(), CoinbaseError> {
    if position != 0 {
        return Err(CoinbaseError::Misplaced(position));
    }
    if amount > reward {
        return Err(CoinbaseError::ExcessReward { amount, reward });
    }
    Ok(())
}
