use crate::transaction::Transaction;
use crate::{hash_pair, Hash, ZERO_HASH};

/// Fold an ordered list of hashes into a single root.
///
/// Adjacent hashes are paired left to right; a level with an odd count
/// pairs its last hash with itself. An empty list yields [`ZERO_HASH`].
pub fn compute_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return ZERO_HASH;
    }
    let mut level = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let (a, b) = if pair.len() == 2 {
                (&pair[0], &pair[1])
            } else {
                (&pair[0], &pair[0])
            };
            next.push(hash_pair(a, b));
        }
        level = next;
    }
    level[0]
}

// Leaves are recomputed, never read from the stored `hash` field.
pub fn merkle_root(txs: &[Transaction]) -> Hash {
    let hashes: Vec<Hash> = txs.iter().map(Transaction::compute_hash).collect();
    compute_root(&hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sha256;
    use crate::transaction::TxKind;

    fn leaf(i: u8) -> Hash {
        sha256(&[i])
    }

    #[test]
    fn empty_is_the_zero_sentinel() {
        assert_eq!(compute_root(&[]), ZERO_HASH);
        assert_eq!(merkle_root(&[]), ZERO_HASH);
    }

    #[test]
    fn single_hash_is_its_own_root() {
        assert_eq!(compute_root(&[leaf(1)]), leaf(1));
    }

    #[test]
    fn two_hashes() {
        let (h1, h2) = (leaf(1), leaf(2));
        assert_eq!(compute_root(&[h1, h2]), hash_pair(&h1, &h2));
    }

    #[test]
    fn odd_level_duplicates_last() {
        let (h1, h2, h3) = (leaf(1), leaf(2), leaf(3));
        let expected = hash_pair(&hash_pair(&h1, &h2), &hash_pair(&h3, &h3));
        assert_eq!(compute_root(&[h1, h2, h3]), expected);
    }

    #[test]
    fn odd_count_on_an_inner_level() {
        // 5 leaves -> 3 nodes -> 2 nodes -> root
        let h: Vec<Hash> = (1..=5).map(leaf).collect();
        let l1 = [
            hash_pair(&h[0], &h[1]),
            hash_pair(&h[2], &h[3]),
            hash_pair(&h[4], &h[4]),
        ];
        let l2 = [hash_pair(&l1[0], &l1[1]), hash_pair(&l1[2], &l1[2])];
        assert_eq!(compute_root(&h), hash_pair(&l2[0], &l2[1]));
    }

    #[test]
    fn order_matters() {
        assert_ne!(
            compute_root(&[leaf(1), leaf(2)]),
            compute_root(&[leaf(2), leaf(1)])
        );
    }

    #[test]
    fn deterministic_and_sensitive_to_every_leaf() {
        let hashes: Vec<Hash> = (0..17).map(leaf).collect();
        let root = compute_root(&hashes);
        assert_eq!(root, compute_root(&hashes));
        for i in 0..hashes.len() {
            let mut changed = hashes.clone();
            changed[i] = leaf(200);
            assert_ne!(compute_root(&changed), root, "leaf {i} did not affect the root");
        }
    }

    #[test]
    fn merkle_root_uses_transaction_hashes() {
        let txs = vec![
            Transaction::new("a", "b", 10, 1_600_000_000, TxKind::Transfer),
            Transaction::new("b", "c", 5, 1_600_000_100, TxKind::Transfer),
            Transaction::coinbase("a", 50, 1_600_000_200),
        ];
        let hashes: Vec<Hash> = txs.iter().map(|t| t.hash()).collect();
        assert_eq!(merkle_root(&txs), compute_root(&hashes));
    }
}
