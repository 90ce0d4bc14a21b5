use chrono::{DateTime, Duration, Utc};
use harbor_core::{Address, ObjectId};
use harbor_ledger::{AgentSigner, address_of, verify_personal_message};
use serde::{Deserialize, Serialize};

use crate::error::SealError;

/// Default lifetime of a decryption session.
pub const DEFAULT_SESSION_TTL_MINUTES: u32 = 10;

/// Proof that `address` authorised key requests for `package_id` during a
/// bounded window.
///
/// Key servers only release shares to a session whose signature verifies
/// and which has not expired; the approval transaction is then dry-run as
/// `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub address: Address,
    pub package_id: ObjectId,
    pub created_at: DateTime<Utc>,
    pub ttl_minutes: u32,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SessionCredentials {
    /// Open a session for `package_id`, signed by `signer`.
    #[must_use]
    pub fn create(
        signer: &AgentSigner,
        package_id: &ObjectId,
        ttl_minutes: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let message = session_message(package_id, ttl_minutes, now);
        Self {
            address: signer.address().clone(),
            package_id: package_id.clone(),
            created_at: now,
            ttl_minutes,
            public_key: signer.public_key().to_vec(),
            signature: signer.sign_personal_message(message.as_bytes()),
        }
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(i64::from(self.ttl_minutes))
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Check expiry, signature and that the address belongs to the key.
    pub fn verify(&self, package_id: &ObjectId, now: DateTime<Utc>) -> Result<(), SealError> {
        if self.package_id.normalized() != package_id.normalized() {
            return Err(SealError::InvalidSession(format!(
                "session is for package {}, ciphertext for {package_id}",
                self.package_id
            )));
        }
        if self.is_expired(now) {
            return Err(SealError::InvalidSession(format!(
                "session expired at {}",
                self.expires_at().to_rfc3339()
            )));
        }
        let derived = address_of(&self.public_key)
            .map_err(|e| SealError::InvalidSession(e.to_string()))?;
        if derived != self.address {
            return Err(SealError::InvalidSession(
                "public key does not belong to session address".into(),
            ));
        }
        let message = session_message(&self.package_id, self.ttl_minutes, self.created_at);
        verify_personal_message(&self.public_key, message.as_bytes(), &self.signature)
            .map_err(|e| SealError::InvalidSession(e.to_string()))
    }
}

fn session_message(package_id: &ObjectId, ttl_minutes: u32, created_at: DateTime<Utc>) -> String {
    format!(
        "Accessing keys of package {} for {ttl_minutes} mins from {}",
        package_id.normalized(),
        created_at.timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> ObjectId {
        ObjectId::new("0xabc")
    }

    #[test]
    fn fresh_session_verifies() {
        let signer = AgentSigner::generate();
        let now = Utc::now();
        let session = SessionCredentials::create(&signer, &package(), 10, now);
        session.verify(&package(), now).unwrap();
        assert_eq!(&session.address, signer.address());
    }

    #[test]
    fn session_expires_after_ttl() {
        let signer = AgentSigner::generate();
        let now = Utc::now();
        let session = SessionCredentials::create(&signer, &package(), 10, now);
        let later = now + Duration::minutes(10);
        assert!(session.is_expired(later));
        assert!(matches!(
            session.verify(&package(), later),
            Err(SealError::InvalidSession(_))
        ));
    }

    #[test]
    fn session_is_package_scoped() {
        let signer = AgentSigner::generate();
        let now = Utc::now();
        let session = SessionCredentials::create(&signer, &package(), 10, now);
        assert!(session.verify(&ObjectId::new("0xdef"), now).is_err());
    }

    #[test]
    fn forged_address_is_rejected() {
        let signer = AgentSigner::generate();
        let victim = AgentSigner::generate();
        let now = Utc::now();
        let mut session = SessionCredentials::create(&signer, &package(), 10, now);
        session.address = victim.address().clone();
        assert!(session.verify(&package(), now).is_err());
    }

    #[test]
    fn extended_ttl_breaks_signature() {
        let signer = AgentSigner::generate();
        let now = Utc::now();
        let mut session = SessionCredentials::create(&signer, &package(), 10, now);
        session.ttl_minutes = 600;
        assert!(session.verify(&package(), now).is_err());
    }
}
