#![allow(dead_code)]

use sancoin_core::constants::BLOCK_REWARD;
use sancoin_core::{
    Block, CancelToken, ChainValidator, Clock, ConsensusParams, GenesisSpec, Miner, Transaction,
    Wallet,
};

pub const NOW: u64 = 1_700_000_000;

pub fn miner_wallet() -> Wallet {
    Wallet::from_seed([1u8; 32])
}

pub fn recipient() -> Wallet {
    Wallet::from_seed([2u8; 32])
}

pub fn validator(difficulty: u32) -> ChainValidator {
    let params = ConsensusParams {
        difficulty,
        ..ConsensusParams::default()
    };
    ChainValidator::new(params).with_clock(Clock::Fixed(NOW))
}

pub fn block_txs(height: u64) -> Vec<Transaction> {
    let miner = miner_wallet();
    let ts = NOW - 1_000 + height;
    vec![
        Transaction::coinbase(miner.address(), BLOCK_REWARD, ts),
        miner.transfer(&recipient().address(), height, ts),
    ]
}

/// Genesis followed by `len` mined and correctly linked blocks.
pub fn build_chain(len: u64, difficulty: u32) -> Vec<Block> {
    let miner = Miner::new(difficulty);
    let cancel = CancelToken::new();
    let mut chain = vec![Block::genesis(&GenesisSpec::default())];
    for height in 1..=len {
        let tip = chain.last().expect("chain has genesis");
        let block = miner
            .mine_next(tip, block_txs(height), NOW - 1_000 + height, &cancel)
            .into_block()
            .expect("mining was not cancelled");
        chain.push(block);
    }
    chain
}

/// Edit a block's wire form without recomputing any derived hash, the way a
/// dishonest peer would hand it over.
pub fn tamper(block: &Block, edit: impl FnOnce(&mut serde_json::Value)) -> Block {
    let mut json = serde_json::to_value(block).expect("serialize block");
    edit(&mut json);
    serde_json::from_value(json).expect("deserialize tampered block")
}
