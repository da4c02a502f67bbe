use crate::chain::GenesisSpec;
use crate::error::{HashKind, ValidationError};
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use crate::{sha256, Hash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    pub timestamp: u64,
    #[serde(with = "crate::hex_serde")]
    pub previous_hash: Hash,
    #[serde(with = "crate::hex_serde")]
    pub merkle_root: Hash,
    pub nonce: u64,
    /// Leading zero hex digits the block hash was mined to.
    pub difficulty: u32,
}

impl BlockHeader {
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 8 + 32 + 32 + 8 + 4);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.merkle_root);
        bytes.extend_from_slice(&self.previous_hash);
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes.extend_from_slice(&self.difficulty.to_le_bytes());
        bytes
    }

    pub fn hash(&self) -> Hash {
        sha256(&self.hash_bytes())
    }
}

/// A header, its ordered transactions and the header hash.
///
/// Blocks are values: the nonce only changes through [`Block::with_nonce`],
/// which hands back a block whose hash is already recomputed. Blocks read
/// from the outside world may still be inconsistent, which is what
/// [`Block::verify_self`] is for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    #[serde(with = "crate::hex_serde")]
    hash: Hash,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: Hash,
        difficulty: u32,
    ) -> Self {
        let header = BlockHeader {
            index,
            timestamp,
            previous_hash,
            merkle_root: merkle_root(&transactions),
            nonce: 0,
            difficulty,
        };
        Self::from_header(header, transactions)
    }

    pub fn genesis(spec: &GenesisSpec) -> Self {
        Self::new(0, spec.timestamp, Vec::new(), spec.previous_hash, 0)
    }

    pub(crate) fn from_header(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            hash: header.hash(),
            header,
            transactions,
        }
    }

    pub(crate) fn into_parts(self) -> (BlockHeader, Vec<Transaction>) {
        (self.header, self.transactions)
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.header.nonce = nonce;
        self.hash = self.recompute_hash();
        self
    }

    pub fn recompute_hash(&self) -> Hash {
        self.header.hash()
    }

    /// Recompute the merkle root and the header hash and compare both with
    /// the stored values.
    pub fn verify_self(&self) -> Result<(), ValidationError> {
        if merkle_root(&self.transactions) != self.header.merkle_root {
            return Err(ValidationError::HashMismatch(HashKind::MerkleRoot));
        }
        if self.recompute_hash() != self.hash {
            return Err(ValidationError::HashMismatch(HashKind::BlockHash));
        }
        Ok(())
    }

    pub fn is_self_consistent(&self) -> bool {
        self.verify_self().is_ok()
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn previous_hash(&self) -> Hash {
        self.header.previous_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;
    use crate::transaction::TxKind;
    use crate::ZERO_HASH;

    fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction::new("Alice", "Bob", 10, 1_600_000_000, TxKind::Transfer),
            Transaction::new("Bob", "Charlie", 5, 1_600_000_100, TxKind::Transfer),
        ]
    }

    fn sample_block() -> Block {
        Block::new(1, 1_600_000_200, sample_txs(), [0u8; 32], 1)
    }

    #[test]
    fn new_block_derives_merkle_root_and_hash() {
        let block = sample_block();
        assert_eq!(block.header().merkle_root, merkle_root(&sample_txs()));
        assert_eq!(block.header().nonce, 0);
        assert_eq!(block.hash(), block.header().hash());
        assert!(block.is_self_consistent());
    }

    #[test]
    fn block_header_hash_bytes_layout() {
        let header = BlockHeader {
            index: 1,
            timestamp: 1_600_000_000,
            previous_hash: [0u8; 32],
            merkle_root: [1u8; 32],
            nonce: 42,
            difficulty: 3,
        };
        let bytes = header.hash_bytes();
        assert_eq!(bytes.len(), 92);
        assert_eq!(&bytes[0..8], &1u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &1_600_000_000u64.to_le_bytes());
        assert_eq!(&bytes[16..48], &[1u8; 32]);
        assert_eq!(&bytes[48..80], &[0u8; 32]);
        assert_eq!(&bytes[80..88], &42u64.to_le_bytes());
        assert_eq!(&bytes[88..92], &3u32.to_le_bytes());
    }

    #[test]
    fn block_hash_consistency() {
        let block = sample_block();
        assert_eq!(block.recompute_hash(), block.recompute_hash());
        assert_eq!(sample_block().hash(), block.hash());
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        let block = sample_block();
        let bumped = block.clone().with_nonce(1);
        assert_ne!(block.hash(), bumped.hash());
        assert_eq!(bumped.header().nonce, 1);
        assert!(bumped.is_self_consistent());
    }

    #[test]
    fn difficulty_is_committed_to() {
        let a = Block::new(1, 1_600_000_200, sample_txs(), [0u8; 32], 1);
        let b = Block::new(1, 1_600_000_200, sample_txs(), [0u8; 32], 2);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn recompute_hash_leaves_block_untouched() {
        let block = sample_block();
        let before = block.clone();
        let _ = block.recompute_hash();
        assert_eq!(block, before);
    }

    #[test]
    fn edited_transaction_breaks_merkle_root() {
        let mut block = sample_block();
        block.transactions[1] =
            Transaction::new("Bob", "Charlie", 6, 1_600_000_100, TxKind::Transfer);
        assert_eq!(
            block.verify_self(),
            Err(ValidationError::HashMismatch(HashKind::MerkleRoot))
        );
    }

    #[test]
    fn dropped_transaction_breaks_merkle_root() {
        let mut block = sample_block();
        block.transactions.pop();
        assert!(!block.is_self_consistent());
    }

    #[test]
    fn edited_header_breaks_block_hash() {
        let mut block = sample_block();
        block.header.timestamp += 1;
        assert_eq!(
            block.verify_self(),
            Err(ValidationError::HashMismatch(HashKind::BlockHash))
        );
    }

    #[test]
    fn genesis_block_example() {
        let genesis = Block::genesis(&GenesisSpec::default());
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.previous_hash(), ZERO_HASH);
        assert_eq!(genesis.header().merkle_root, ZERO_HASH);
        assert_eq!(genesis.header().difficulty, 0);
        assert!(genesis.transactions().is_empty());
        assert!(genesis.is_self_consistent());
    }

    #[test]
    fn block_serialization_example() {
        let block = sample_block();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["hash"], block.hash_hex());
        assert_eq!(block.hash_hex().len(), HASH_HEX_SIZE);
        assert_eq!(json["header"]["previous_hash"], "0".repeat(HASH_HEX_SIZE));
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
        assert!(back.is_self_consistent());
    }

    #[test]
    fn short_hex_hash_fails_to_deserialize() {
        let mut json = serde_json::to_value(sample_block()).unwrap();
        json["hash"] = serde_json::json!("abcd");
        assert!(serde_json::from_value::<Block>(json).is_err());
    }
}
