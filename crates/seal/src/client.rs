use async_trait::async_trait;
use bytes::Bytes;
use harbor_core::{ObjectId, PolicyId};

use crate::error::SealError;
use crate::session::SessionCredentials;

/// Parameters of a threshold encryption.
#[derive(Debug, Clone)]
pub struct EncryptRequest {
    /// Package whose `seal_approve` governs decryption.
    pub package_id: ObjectId,
    /// Identity the ciphertext is bound to.
    pub policy_id: PolicyId,
    /// Number of key servers that must cooperate to decrypt.
    pub threshold: u8,
    pub data: Bytes,
}

/// Client for an (n, k) threshold key-server network.
#[async_trait]
pub trait ThresholdEncryptor: Send + Sync {
    /// Encrypt data so that only callers passing `seal_approve` for the
    /// policy can decrypt it.
    async fn encrypt(&self, request: EncryptRequest) -> Result<Bytes, SealError>;

    /// Decrypt, presenting `approval` (transaction kind bytes of a
    /// `seal_approve` call) as proof of access.
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        approval: &[u8],
        session: &SessionCredentials,
    ) -> Result<Bytes, SealError>;
}
