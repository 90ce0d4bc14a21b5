use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use harbor_core::Address;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::LedgerError;
use crate::tx::Transaction;

const TX_DOMAIN: &[u8] = b"harbor-tx:";
const PERSONAL_DOMAIN: &[u8] = b"harbor-personal:";

/// A transaction signed by its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub sender: Address,
    pub kind_bytes: Vec<u8>,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedTransaction {
    /// Check the signature and that the sender matches the public key.
    pub fn verify(&self) -> Result<Transaction, LedgerError> {
        let derived = address_of(&self.public_key)?;
        if derived != self.sender {
            return Err(LedgerError::InvalidSignature(format!(
                "sender {} does not match key address {derived}",
                self.sender
            )));
        }
        verify_signature(
            &self.public_key,
            &tx_digest(&self.sender, &self.kind_bytes),
            &self.signature,
        )?;
        Transaction::from_kind_bytes(&self.kind_bytes)
    }
}

/// The operating keypair that signs transactions and session messages.
#[derive(Clone)]
pub struct AgentSigner {
    key: SigningKey,
    address: Address,
}

impl AgentSigner {
    fn from_key(key: SigningKey) -> Self {
        let address = address_from_verifying_key(&key.verifying_key());
        Self { key, address }
    }

    /// Generate a fresh random keypair.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_key(SigningKey::generate(&mut OsRng))
    }

    /// Load a keypair from a 32-byte secret encoded as hex (optional `0x`).
    pub fn from_secret_hex(secret: &str) -> Result<Self, LedgerError> {
        let body = secret.trim().trim_start_matches("0x");
        let bytes = Zeroizing::new(
            hex::decode(body).map_err(|e| LedgerError::InvalidKey(e.to_string()))?,
        );
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            LedgerError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_key(SigningKey::from_bytes(&seed)))
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// Sign the transaction kind with this key as sender.
    pub fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, LedgerError> {
        let kind_bytes = tx.to_kind_bytes()?;
        let signature = self.key.sign(&tx_digest(&self.address, &kind_bytes));
        Ok(SignedTransaction {
            sender: self.address.clone(),
            kind_bytes,
            public_key: self.public_key().to_vec(),
            signature: signature.to_bytes().to_vec(),
        })
    }

    /// Sign an arbitrary message in the personal-message domain.
    #[must_use]
    pub fn sign_personal_message(&self, message: &[u8]) -> Vec<u8> {
        self.key
            .sign(&personal_digest(message))
            .to_bytes()
            .to_vec()
    }
}

impl fmt::Debug for AgentSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Verify a personal-message signature produced by
/// [`AgentSigner::sign_personal_message`].
pub fn verify_personal_message(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), LedgerError> {
    verify_signature(public_key, &personal_digest(message), signature)
}

/// Derive the ledger address of an ed25519 public key.
pub fn address_of(public_key: &[u8]) -> Result<Address, LedgerError> {
    Ok(address_from_verifying_key(&verifying_key(public_key)?))
}

fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    Address::new(format!("0x{}", hex::encode(Sha256::digest(key.as_bytes()))))
}

fn verifying_key(public_key: &[u8]) -> Result<VerifyingKey, LedgerError> {
    let bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| LedgerError::InvalidSignature("public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| LedgerError::InvalidSignature(e.to_string()))
}

fn verify_signature(public_key: &[u8], digest: &[u8], signature: &[u8]) -> Result<(), LedgerError> {
    let key = verifying_key(public_key)?;
    let sig = Signature::from_slice(signature)
        .map_err(|e| LedgerError::InvalidSignature(e.to_string()))?;
    key.verify(digest, &sig)
        .map_err(|e| LedgerError::InvalidSignature(e.to_string()))
}

fn tx_digest(sender: &Address, kind_bytes: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(TX_DOMAIN);
    hasher.update(sender.as_bytes());
    hasher.update([0u8]);
    hasher.update(kind_bytes);
    hasher.finalize().to_vec()
}

fn personal_digest(message: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(PERSONAL_DOMAIN);
    hasher.update(message);
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{AccessControlTx, PackageIds};

    const SECRET: &str = "0x9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn address_is_hex_sha256_of_public_key() {
        let signer = AgentSigner::from_secret_hex(SECRET).unwrap();
        let addr = signer.address().as_str();
        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 66);
        assert_eq!(&address_of(&signer.public_key()).unwrap(), signer.address());
    }

    #[test]
    fn secret_must_be_32_bytes() {
        assert!(matches!(
            AgentSigner::from_secret_hex("abcd"),
            Err(LedgerError::InvalidKey(_))
        ));
        assert!(AgentSigner::from_secret_hex("zz").is_err());
    }

    #[test]
    fn signed_transaction_verifies() {
        let signer = AgentSigner::generate();
        let tx = AccessControlTx::new(PackageIds::default()).create_allowlist("a");
        let signed = signer.sign_transaction(&tx).unwrap();
        assert_eq!(signed.verify().unwrap(), tx);
    }

    #[test]
    fn tampered_transaction_is_rejected() {
        let signer = AgentSigner::generate();
        let builder = AccessControlTx::new(PackageIds::default());
        let mut signed = signer
            .sign_transaction(&builder.create_allowlist("a"))
            .unwrap();
        signed.kind_bytes = builder.create_allowlist("b").to_kind_bytes().unwrap();
        assert!(matches!(
            signed.verify(),
            Err(LedgerError::InvalidSignature(_))
        ));
    }

    #[test]
    fn spoofed_sender_is_rejected() {
        let signer = AgentSigner::generate();
        let other = AgentSigner::generate();
        let tx = AccessControlTx::new(PackageIds::default()).create_allowlist("a");
        let mut signed = signer.sign_transaction(&tx).unwrap();
        signed.sender = other.address().clone();
        assert!(signed.verify().is_err());
    }

    #[test]
    fn personal_message_round_trip() {
        let signer = AgentSigner::generate();
        let sig = signer.sign_personal_message(b"session");
        verify_personal_message(&signer.public_key(), b"session", &sig).unwrap();
        assert!(verify_personal_message(&signer.public_key(), b"other", &sig).is_err());
    }

    #[test]
    fn debug_does_not_leak_key() {
        let signer = AgentSigner::from_secret_hex(SECRET).unwrap();
        let dbg = format!("{signer:?}");
        assert!(dbg.contains("address"));
        assert!(!dbg.contains("9d61b1"));
    }
}
