use crate::address::address_from_public_key;
use crate::error::WalletError;
use crate::transaction::{Transaction, TxKind, TxSignature};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

pub struct Wallet {
    signing_key: SigningKey,
}

impl Wallet {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn from_hex(secret: &str) -> Result<Self, WalletError> {
        let mut seed = [0u8; 32];
        hex::decode_to_slice(secret.trim(), &mut seed).map_err(|_| WalletError::InvalidSecretKey)?;
        Ok(Self::from_seed(seed))
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn address(&self) -> String {
        address_from_public_key(&self.public_key())
    }

    /// Attach this wallet's signature over `tx.hash()`.
    pub fn sign(&self, tx: Transaction) -> Transaction {
        let signature = self.signing_key.sign(&tx.hash());
        tx.with_signature(TxSignature {
            public_key: self.public_key(),
            signature: signature.to_bytes(),
        })
    }

    pub fn transfer(&self, to: &str, amount: u64, timestamp: u64) -> Transaction {
        self.sign(Transaction::new(
            self.address(),
            to,
            amount,
            timestamp,
            TxKind::Transfer,
        ))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
