use crate::address::{key_hash, AddressCodec};
use crate::constants::COINBASE_SENDER;
use crate::error::{TxError, TxField};
use crate::{sha256, Hash};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxKind {
    Transfer,
    Coinbase,
    ContractExecution,
}

impl TxKind {
    fn tag(self) -> u8 {
        match self {
            TxKind::Transfer => 0,
            TxKind::Coinbase => 1,
            TxKind::ContractExecution => 2,
        }
    }
}

/// Ed25519 signature over a transaction hash, with the key that made it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    #[serde(with = "crate::hex_serde")]
    pub public_key: [u8; 32],
    #[serde(with = "crate::hex_serde")]
    pub signature: [u8; 64],
}

/// A unit of value transfer, addressed by the digest of its contents.
///
/// Fields are private: a transaction is built once and never edited. The
/// stored `hash` is only trusted after [`Transaction::validate`], since a
/// deserialized transaction may carry anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(with = "crate::hex_serde")]
    hash: Hash,
    from: String,
    to: String,
    amount: u64,
    timestamp: u64,
    #[serde(rename = "type")]
    kind: TxKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<TxSignature>,
}

/// Canonical encoding: `len(from) || from || len(to) || to || amount ||
/// timestamp || kind`, integers little-endian.
fn canonical_bytes(from: &str, to: &str, amount: u64, timestamp: u64, kind: TxKind) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + from.len() + 8 + to.len() + 8 + 8 + 1);
    bytes.extend_from_slice(&(from.len() as u64).to_le_bytes());
    bytes.extend_from_slice(from.as_bytes());
    bytes.extend_from_slice(&(to.len() as u64).to_le_bytes());
    bytes.extend_from_slice(to.as_bytes());
    bytes.extend_from_slice(&amount.to_le_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.push(kind.tag());
    bytes
}

impl Transaction {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: u64,
        timestamp: u64,
        kind: TxKind,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        let hash = sha256(&canonical_bytes(&from, &to, amount, timestamp, kind));
        Self {
            hash,
            from,
            to,
            amount,
            timestamp,
            kind,
            signature: None,
        }
    }

    /// Newly issued coins paid to `to`.
    pub fn coinbase(to: impl Into<String>, amount: u64, timestamp: u64) -> Self {
        Self::new(COINBASE_SENDER, to, amount, timestamp, TxKind::Coinbase)
    }

    pub fn with_signature(mut self, signature: TxSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn compute_hash(&self) -> Hash {
        sha256(&canonical_bytes(
            &self.from,
            &self.to,
            self.amount,
            self.timestamp,
            self.kind,
        ))
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn kind(&self) -> TxKind {
        self.kind
    }

    pub fn signature(&self) -> Option<&TxSignature> {
        self.signature.as_ref()
    }

    pub fn is_coinbase(&self) -> bool {
        self.kind == TxKind::Coinbase
    }

    /// Structural and cryptographic checks for a single transaction.
    ///
    /// `now` is the validator's clock in unix seconds; timestamps more than
    /// `max_skew` seconds ahead of it are rejected.
    pub fn validate<C>(&self, codec: &C, now: u64, max_skew: u64) -> Result<(), TxError>
    where
        C: AddressCodec + ?Sized,
    {
        if self.hash != self.compute_hash() {
            return Err(TxError::HashMismatch);
        }
        if self.kind == TxKind::Transfer && self.amount == 0 {
            return Err(TxError::ZeroAmount);
        }

        let sender = if self.is_coinbase() {
            if self.from != COINBASE_SENDER {
                return Err(TxError::InvalidCoinbaseSender {
                    expected: COINBASE_SENDER.to_string(),
                    found: self.from.clone(),
                });
            }
            None
        } else {
            let hash = codec
                .validate(&self.from)
                .map_err(|source| TxError::InvalidAddress {
                    field: TxField::From,
                    source,
                })?;
            Some(hash)
        };
        codec
            .validate(&self.to)
            .map_err(|source| TxError::InvalidAddress {
                field: TxField::To,
                source,
            })?;

        let limit = now.saturating_add(max_skew);
        if self.timestamp > limit {
            return Err(TxError::FutureTimestamp {
                timestamp: self.timestamp,
                limit,
            });
        }

        match (sender, &self.signature) {
            (None, Some(_)) => Err(TxError::UnexpectedSignature),
            (None, None) => Ok(()),
            (Some(_), None) => Err(TxError::MissingSignature),
            (Some(sender), Some(sig)) => {
                let key = VerifyingKey::from_bytes(&sig.public_key)
                    .map_err(|_| TxError::InvalidPublicKey)?;
                if key_hash(&sig.public_key) != sender {
                    return Err(TxError::SignerMismatch);
                }
                key.verify(&self.hash, &Signature::from_bytes(&sig.signature))
                    .map_err(|_| TxError::BadSignature)
            }
        }
    }
}
