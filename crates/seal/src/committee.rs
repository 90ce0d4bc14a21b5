use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use harbor_core::ObjectId;
use harbor_ledger::{Argument, LedgerClient, LedgerError, SEAL_APPROVE, Transaction};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::client::{EncryptRequest, ThresholdEncryptor};
use crate::envelope::{EncryptedObject, NONCE_LEN, WrappedShare, aad_for};
use crate::error::SealError;
use crate::session::SessionCredentials;

type HmacSha256 = Hmac<Sha256>;
type Key32 = Zeroizing<[u8; 32]>;

fn hmac32(key: &[u8], parts: &[&[u8]]) -> Result<Key32, SealError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| SealError::Encryption(format!("invalid HMAC key: {e}")))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn random_nonce() -> [u8; NONCE_LEN] {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut out = [0u8; NONCE_LEN];
    out.copy_from_slice(nonce.as_slice());
    out
}

/// One member of the committee, holding its own master secret.
struct KeyServer {
    id: String,
    master: Key32,
    online: AtomicBool,
}

impl KeyServer {
    fn policy_key(&self, package_id: &ObjectId, policy_bytes: &[u8]) -> Result<Key32, SealError> {
        hmac32(
            self.master.as_slice(),
            &[package_id.normalized().as_bytes(), &[0u8][..], policy_bytes],
        )
    }

    fn share_aad(&self, package_id: &ObjectId, policy_bytes: &[u8]) -> Vec<u8> {
        let mut aad = aad_for(package_id, policy_bytes);
        aad.extend_from_slice(self.id.as_bytes());
        aad
    }

    fn wrap_share(
        &self,
        data_key: &[u8; 32],
        package_id: &ObjectId,
        policy_bytes: &[u8],
    ) -> Result<WrappedShare, SealError> {
        let key = self.policy_key(package_id, policy_bytes)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| SealError::Encryption(format!("invalid AES key: {e}")))?;
        let nonce = random_nonce();
        let aad = self.share_aad(package_id, policy_bytes);
        let wrapped_key = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: data_key,
                    aad: &aad,
                },
            )
            .map_err(|e| SealError::Encryption(e.to_string()))?;
        Ok(WrappedShare {
            server_id: self.id.clone(),
            nonce,
            wrapped_key,
        })
    }

    fn unwrap_share(&self, share: &WrappedShare, obj: &EncryptedObject) -> Result<Key32, SealError> {
        let key = self.policy_key(&obj.package_id, &obj.policy_bytes)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| SealError::InvalidCiphertext(format!("invalid AES key: {e}")))?;
        let aad = self.share_aad(&obj.package_id, &obj.policy_bytes);
        let plain = Zeroizing::new(
            cipher
                .decrypt(
                    Nonce::from_slice(&share.nonce),
                    Payload {
                        msg: &share.wrapped_key,
                        aad: &aad,
                    },
                )
                .map_err(|_| {
                    SealError::InvalidCiphertext(format!(
                        "key share for {} failed authentication",
                        self.id
                    ))
                })?,
        );
        let mut out = Zeroizing::new([0u8; 32]);
        if plain.len() != out.len() {
            return Err(SealError::InvalidCiphertext("wrapped key has wrong length".into()));
        }
        out.copy_from_slice(&plain);
        Ok(out)
    }
}

/// In-process committee of key servers.
///
/// Every server derives a per-policy wrapping key from its own master
/// secret, so the data key is recoverable from any server's share. Before
/// releasing its share a server verifies the session and dry-runs the
/// approval transaction on the ledger as the session address. Decryption
/// needs `threshold` servers to approve.
pub struct LocalKeyServerCommittee {
    servers: Vec<KeyServer>,
    ledger: Arc<dyn LedgerClient>,
}

impl fmt::Debug for LocalKeyServerCommittee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyServerCommittee")
            .field("servers", &self.server_ids())
            .finish_non_exhaustive()
    }
}

impl LocalKeyServerCommittee {
    /// Build a committee whose server secrets are derived from
    /// `committee_secret`.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        committee_secret: &SecretString,
        server_ids: &[String],
    ) -> Result<Self, SealError> {
        if server_ids.is_empty() {
            return Err(SealError::Encryption("committee needs at least one server".into()));
        }
        let secret = committee_secret.expose_secret().as_bytes();
        let servers = server_ids
            .iter()
            .map(|id| {
                Ok(KeyServer {
                    id: id.clone(),
                    master: hmac32(secret, &[b"harbor-key-server:".as_slice(), id.as_bytes()])?,
                    online: AtomicBool::new(true),
                })
            })
            .collect::<Result<Vec<_>, SealError>>()?;
        info!(servers = servers.len(), "key server committee ready");
        Ok(Self { servers, ledger })
    }

    #[must_use]
    pub fn server_ids(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.id.as_str()).collect()
    }

    /// Mark a server reachable or not. Returns `false` for unknown ids.
    pub fn set_online(&self, server_id: &str, online: bool) -> bool {
        match self.servers.iter().find(|s| s.id == server_id) {
            Some(server) => {
                server.online.store(online, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn server(&self, id: &str) -> Option<&KeyServer> {
        self.servers.iter().find(|s| s.id == id)
    }
}

/// The approval must only call `seal_approve` in the ciphertext's package,
/// for the ciphertext's identity.
fn check_approval(obj: &EncryptedObject, approval: &[u8]) -> Result<(), SealError> {
    let tx = Transaction::from_kind_bytes(approval)
        .map_err(|e| SealError::Unauthorized(format!("unreadable approval: {e}")))?;
    if tx.calls.is_empty() {
        return Err(SealError::Unauthorized("approval has no calls".into()));
    }
    for call in &tx.calls {
        if call.function != SEAL_APPROVE
            || call.package.normalized() != obj.package_id.normalized()
        {
            return Err(SealError::Unauthorized(format!(
                "approval calls {}::{}, not {}::{SEAL_APPROVE}",
                call.package, call.target(), obj.package_id
            )));
        }
        match call.arguments.first() {
            Some(Argument::Bytes(id)) if *id == obj.policy_bytes => {}
            _ => {
                return Err(SealError::Unauthorized(format!(
                    "approval is not for policy {}",
                    obj.policy_id()
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ThresholdEncryptor for LocalKeyServerCommittee {
    async fn encrypt(&self, request: EncryptRequest) -> Result<Bytes, SealError> {
        let threshold = request.threshold;
        if threshold == 0 || usize::from(threshold) > self.servers.len() {
            return Err(SealError::Encryption(format!(
                "threshold {threshold} invalid for {} key servers",
                self.servers.len()
            )));
        }
        let policy_bytes = request
            .policy_id
            .to_bytes()
            .map_err(|e| SealError::Encryption(format!("policy id {}: {e}", request.policy_id)))?;

        let generated = Aes256Gcm::generate_key(&mut OsRng);
        let mut data_key = Zeroizing::new([0u8; 32]);
        data_key.copy_from_slice(generated.as_slice());

        let shares = self
            .servers
            .iter()
            .map(|s| s.wrap_share(&data_key, &request.package_id, &policy_bytes))
            .collect::<Result<Vec<_>, _>>()?;

        let nonce = random_nonce();
        let aad = aad_for(&request.package_id, &policy_bytes);
        let cipher = Aes256Gcm::new_from_slice(data_key.as_slice())
            .map_err(|e| SealError::Encryption(format!("invalid AES key: {e}")))?;
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &request.data,
                    aad: &aad,
                },
            )
            .map_err(|e| SealError::Encryption(e.to_string()))?;

        let object = EncryptedObject {
            package_id: request.package_id,
            policy_bytes,
            threshold,
            shares,
            nonce,
            ciphertext,
        };
        debug!(
            policy_id = %object.policy_id(),
            threshold,
            size = request.data.len(),
            "data encrypted"
        );
        Ok(Bytes::from(object.to_bytes()?))
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        approval: &[u8],
        session: &SessionCredentials,
    ) -> Result<Bytes, SealError> {
        let obj = EncryptedObject::parse(ciphertext)?;
        session.verify(&obj.package_id, Utc::now())?;
        check_approval(&obj, approval)?;

        let threshold = usize::from(obj.threshold);
        let mut keys: Vec<Key32> = Vec::with_capacity(threshold);
        let mut denied: Option<String> = None;

        for share in &obj.shares {
            if keys.len() == threshold {
                break;
            }
            let Some(server) = self.server(&share.server_id) else {
                debug!(server = %share.server_id, "share for unknown key server");
                continue;
            };
            if !server.online.load(Ordering::Relaxed) {
                debug!(server = %server.id, "key server offline");
                continue;
            }
            match self.ledger.dev_inspect(approval, &session.address).await {
                Ok(()) => keys.push(server.unwrap_share(share, &obj)?),
                Err(LedgerError::Rpc(e)) => {
                    warn!(server = %server.id, error = %e, "key server could not reach ledger");
                }
                Err(e) => {
                    debug!(server = %server.id, error = %e, "key server denied share");
                    denied = Some(e.to_string());
                }
            }
        }

        if keys.len() < threshold {
            return Err(match denied {
                Some(reason) => SealError::Unauthorized(reason),
                None => SealError::KeyServerUnavailable {
                    approvals: keys.len(),
                    threshold,
                },
            });
        }
        let first = &keys[0];
        if keys[1..]
            .iter()
            .any(|k| !bool::from(k.as_slice().ct_eq(first.as_slice())))
        {
            return Err(SealError::InvalidCiphertext("inconsistent key shares".into()));
        }

        let cipher = Aes256Gcm::new_from_slice(first.as_slice())
            .map_err(|e| SealError::InvalidCiphertext(format!("invalid AES key: {e}")))?;
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&obj.nonce),
                Payload {
                    msg: &obj.ciphertext,
                    aad: &obj.aad(),
                },
            )
            .map_err(|_| SealError::InvalidCiphertext("ciphertext failed authentication".into()))?;
        Ok(Bytes::from(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::{PolicyId, PolicyKind};
    use harbor_ledger::{AccessControlTx, AgentSigner, MemoryLedger, PackageIds};

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        committee: LocalKeyServerCommittee,
        builder: AccessControlTx,
        signer: AgentSigner,
        list: ObjectId,
    }

    async fn fixture() -> Fixture {
        let packages = PackageIds::default();
        let ledger = Arc::new(MemoryLedger::new(packages.clone()));
        let builder = AccessControlTx::new(packages);
        let signer = AgentSigner::generate();
        let ids: Vec<String> = ["ks-1", "ks-2", "ks-3"].map(String::from).to_vec();
        let committee = LocalKeyServerCommittee::new(
            ledger.clone(),
            &SecretString::new("committee-secret".into()),
            &ids,
        )
        .unwrap();

        let effects = ledger
            .sign_and_execute(&builder.create_allowlist("team"), &signer)
            .await
            .unwrap();
        let list = effects.require_created("Allowlist").unwrap();
        let cap = effects.require_created("Cap").unwrap();
        ledger
            .sign_and_execute(&builder.add_member(&list, &cap, signer.address()), &signer)
            .await
            .unwrap();

        Fixture {
            ledger,
            committee,
            builder,
            signer,
            list,
        }
    }

    impl Fixture {
        fn package(&self) -> ObjectId {
            self.builder.packages().allowlist.clone()
        }

        async fn seal(&self, policy: &PolicyId, data: &'static [u8]) -> Bytes {
            self.committee
                .encrypt(EncryptRequest {
                    package_id: self.package(),
                    policy_id: policy.clone(),
                    threshold: 2,
                    data: Bytes::from_static(data),
                })
                .await
                .unwrap()
        }

        fn approval(&self, policy: &PolicyId) -> Vec<u8> {
            self.builder
                .approve(PolicyKind::Allowlist, policy, &self.list)
                .unwrap()
                .to_kind_bytes()
                .unwrap()
        }

        fn session(&self, signer: &AgentSigner) -> SessionCredentials {
            SessionCredentials::create(signer, &self.package(), 10, Utc::now())
        }
    }

    #[test]
    fn server_keys_depend_on_secret_and_input() {
        let a = hmac32(b"secret", &[b"ks-1".as_slice()]).unwrap();
        assert_eq!(*a, *hmac32(b"secret", &[b"ks-1".as_slice()]).unwrap());
        assert_ne!(*a, *hmac32(b"secret", &[b"ks-2".as_slice()]).unwrap());
        assert_ne!(*a, *hmac32(b"other", &[b"ks-1".as_slice()]).unwrap());
        // Parts are fed in order, so a split input hashes like the joined one.
        assert_eq!(
            *a,
            *hmac32(b"secret", &[b"ks".as_slice(), b"-1".as_slice()]).unwrap()
        );
    }

    #[tokio::test]
    async fn round_trip_for_member() {
        let f = fixture().await;
        let policy = PolicyId::from(&f.list);
        let sealed = f.seal(&policy, b"hello").await;
        assert_eq!(EncryptedObject::parse(&sealed).unwrap().policy_id(), policy);

        let plain = f
            .committee
            .decrypt(&sealed, &f.approval(&policy), &f.session(&f.signer))
            .await
            .unwrap();
        assert_eq!(&plain[..], b"hello");
    }

    #[tokio::test]
    async fn empty_plaintext_round_trips() {
        let f = fixture().await;
        let policy = PolicyId::from(&f.list);
        let sealed = f.seal(&policy, b"").await;
        let plain = f
            .committee
            .decrypt(&sealed, &f.approval(&policy), &f.session(&f.signer))
            .await
            .unwrap();
        assert!(plain.is_empty());
    }

    #[tokio::test]
    async fn proof_for_other_policy_is_unauthorized() {
        let f = fixture().await;
        let sealed = f.seal(&PolicyId::new("0xA1"), b"secret").await;
        let err = f
            .committee
            .decrypt(
                &sealed,
                &f.approval(&PolicyId::from(&f.list)),
                &f.session(&f.signer),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn non_member_is_unauthorized() {
        let f = fixture().await;
        let policy = PolicyId::from(&f.list);
        let sealed = f.seal(&policy, b"secret").await;
        let outsider = AgentSigner::generate();
        let err = f
            .committee
            .decrypt(&sealed, &f.approval(&policy), &f.session(&outsider))
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn below_threshold_is_unavailable() {
        let f = fixture().await;
        let policy = PolicyId::from(&f.list);
        let sealed = f.seal(&policy, b"secret").await;
        assert!(f.committee.set_online("ks-1", false));
        assert!(f.committee.set_online("ks-2", false));

        let err = f
            .committee
            .decrypt(&sealed, &f.approval(&policy), &f.session(&f.signer))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SealError::KeyServerUnavailable {
                approvals: 1,
                threshold: 2
            }
        );

        f.committee.set_online("ks-2", true);
        assert!(
            f.committee
                .decrypt(&sealed, &f.approval(&policy), &f.session(&f.signer))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn tampered_ciphertext_is_invalid() {
        let f = fixture().await;
        let policy = PolicyId::from(&f.list);
        let mut sealed = f.seal(&policy, b"secret").await.to_vec();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        let err = f
            .committee
            .decrypt(&sealed, &f.approval(&policy), &f.session(&f.signer))
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::InvalidCiphertext(_)));

        let err = f
            .committee
            .decrypt(b"garbage", &f.approval(&policy), &f.session(&f.signer))
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::InvalidCiphertext(_)));
    }

    #[tokio::test]
    async fn threshold_above_committee_size_fails_encryption() {
        let f = fixture().await;
        let err = f
            .committee
            .encrypt(EncryptRequest {
                package_id: f.package(),
                policy_id: PolicyId::from(&f.list),
                threshold: 4,
                data: Bytes::from_static(b"x"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::Encryption(_)));
        assert_eq!(f.ledger.transaction_count(), 2);
    }
}
