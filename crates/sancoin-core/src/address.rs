//! Account addresses.
//!
//! An address is Base58Check over `version || key_hash || checksum`, where
//! `key_hash` is the first 20 bytes of `sha256(public_key)` and `checksum`
//! is the first 4 bytes of `sha256(sha256(version || key_hash))`.

use crate::constants::{ADDRESS_CHECKSUM_SIZE, ADDRESS_KEY_HASH_SIZE, ADDRESS_VERSION};
use crate::error::AddressError;
use crate::sha256;

pub type KeyHash = [u8; ADDRESS_KEY_HASH_SIZE];

const PAYLOAD_SIZE: usize = 1 + ADDRESS_KEY_HASH_SIZE;
const ADDRESS_BYTES: usize = PAYLOAD_SIZE + ADDRESS_CHECKSUM_SIZE;

/// Parses and formats account addresses.
///
/// Validation only ever goes through this trait, so a node can swap in a
/// different address format without touching transaction checks.
pub trait AddressCodec: Send + Sync {
    /// Decode `address`, returning the key hash it commits to.
    fn validate(&self, address: &str) -> Result<KeyHash, AddressError>;

    fn encode(&self, key_hash: &KeyHash) -> String;

    fn is_valid(&self, address: &str) -> bool {
        self.validate(address).is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Base58CheckCodec;

pub fn key_hash(public_key: &[u8; 32]) -> KeyHash {
    let digest = sha256(public_key);
    let mut out = [0u8; ADDRESS_KEY_HASH_SIZE];
    out.copy_from_slice(&digest[..ADDRESS_KEY_HASH_SIZE]);
    out
}

fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECKSUM_SIZE] {
    let second = sha256(&sha256(payload));
    let mut out = [0u8; ADDRESS_CHECKSUM_SIZE];
    out.copy_from_slice(&second[..ADDRESS_CHECKSUM_SIZE]);
    out
}

impl AddressCodec for Base58CheckCodec {
    fn validate(&self, address: &str) -> Result<KeyHash, AddressError> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|e| AddressError::Encoding(e.to_string()))?;
        if bytes.len() != ADDRESS_BYTES {
            return Err(AddressError::Length {
                expected: ADDRESS_BYTES,
                found: bytes.len(),
            });
        }

        let (payload, sum) = bytes.split_at(PAYLOAD_SIZE);
        if payload[0] != ADDRESS_VERSION {
            return Err(AddressError::Version(payload[0]));
        }
        if checksum(payload).as_slice() != sum {
            return Err(AddressError::Checksum);
        }

        let mut out = [0u8; ADDRESS_KEY_HASH_SIZE];
        out.copy_from_slice(&payload[1..]);
        Ok(out)
    }

    fn encode(&self, key_hash: &KeyHash) -> String {
        let mut bytes = Vec::with_capacity(ADDRESS_BYTES);
        bytes.push(ADDRESS_VERSION);
        bytes.extend_from_slice(key_hash);
        let sum = checksum(&bytes);
        bytes.extend_from_slice(&sum);
        bs58::encode(bytes).into_string()
    }
}

/// Address owned by an ed25519 public key.
pub fn address_from_public_key(public_key: &[u8; 32]) -> String {
    Base58CheckCodec.encode(&key_hash(public_key))
}
