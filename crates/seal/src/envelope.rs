//! Binary envelope of a threshold-encrypted object.
//!
//! ```text
//! magic "HSEL" | version u8 | package_id (u16 len + utf8) | policy_id (u16 len + raw bytes)
//! | threshold u8 | share count u8 | shares... | data nonce [12] | ciphertext...
//! share := server_id (u8 len + utf8) | nonce [12] | wrapped key (u16 len + bytes)
//! ```

use harbor_core::{ObjectId, PolicyId};

use crate::error::SealError;

const MAGIC: &[u8; 4] = b"HSEL";
const VERSION: u8 = 1;
pub const NONCE_LEN: usize = 12;

/// A data key wrapped for one key server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedShare {
    pub server_id: String,
    pub nonce: [u8; NONCE_LEN],
    pub wrapped_key: Vec<u8>,
}

/// A parsed encrypted object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedObject {
    pub package_id: ObjectId,
    /// Raw bytes of the policy id the data is sealed under.
    pub policy_bytes: Vec<u8>,
    pub threshold: u8,
    pub shares: Vec<WrappedShare>,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], SealError> {
        if self.buf.len() < n {
            return Err(SealError::InvalidCiphertext(format!("truncated {what}")));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self, what: &str) -> Result<u8, SealError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<usize, SealError> {
        let b = self.take(2, what)?;
        Ok(usize::from(u16::from_be_bytes([b[0], b[1]])))
    }

    fn nonce(&mut self, what: &str) -> Result<[u8; NONCE_LEN], SealError> {
        let mut out = [0u8; NONCE_LEN];
        out.copy_from_slice(self.take(NONCE_LEN, what)?);
        Ok(out)
    }

    fn utf8(&mut self, n: usize, what: &str) -> Result<String, SealError> {
        String::from_utf8(self.take(n, what)?.to_vec())
            .map_err(|_| SealError::InvalidCiphertext(format!("{what} is not UTF-8")))
    }
}

fn put_u16(out: &mut Vec<u8>, len: usize, what: &str) -> Result<(), SealError> {
    let len = u16::try_from(len)
        .map_err(|_| SealError::Encryption(format!("{what} longer than 65535 bytes")))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

impl EncryptedObject {
    /// The policy id embedded in the header.
    #[must_use]
    pub fn policy_id(&self) -> PolicyId {
        PolicyId::from_bytes(&self.policy_bytes)
    }

    /// Additional authenticated data binding wrapped keys and ciphertext to
    /// the header's package and policy.
    #[must_use]
    pub fn aad(&self) -> Vec<u8> {
        aad_for(&self.package_id, &self.policy_bytes)
    }

    /// Serialise to the binary envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SealError> {
        let mut out = Vec::with_capacity(64 + self.ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        put_u16(&mut out, self.package_id.len(), "package id")?;
        out.extend_from_slice(self.package_id.as_bytes());
        put_u16(&mut out, self.policy_bytes.len(), "policy id")?;
        out.extend_from_slice(&self.policy_bytes);
        out.push(self.threshold);
        let count = u8::try_from(self.shares.len())
            .map_err(|_| SealError::Encryption("more than 255 key servers".into()))?;
        out.push(count);
        for share in &self.shares {
            let id_len = u8::try_from(share.server_id.len())
                .map_err(|_| SealError::Encryption("server id too long".into()))?;
            out.push(id_len);
            out.extend_from_slice(share.server_id.as_bytes());
            out.extend_from_slice(&share.nonce);
            put_u16(&mut out, share.wrapped_key.len(), "wrapped key")?;
            out.extend_from_slice(&share.wrapped_key);
        }
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Parse the binary envelope.
    pub fn parse(bytes: &[u8]) -> Result<Self, SealError> {
        let mut r = Reader { buf: bytes };
        if r.take(MAGIC.len(), "magic")? != MAGIC {
            return Err(SealError::InvalidCiphertext("bad magic".into()));
        }
        let version = r.u8("version")?;
        if version != VERSION {
            return Err(SealError::InvalidCiphertext(format!(
                "unsupported version {version}"
            )));
        }
        let pkg_len = r.u16("package id length")?;
        let package_id = ObjectId::new(r.utf8(pkg_len, "package id")?);
        let policy_len = r.u16("policy id length")?;
        let policy_bytes = r.take(policy_len, "policy id")?.to_vec();
        let threshold = r.u8("threshold")?;
        let count = r.u8("share count")?;
        if threshold == 0 || threshold > count {
            return Err(SealError::InvalidCiphertext(format!(
                "threshold {threshold} invalid for {count} shares"
            )));
        }

        let mut shares = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let id_len = usize::from(r.u8("server id length")?);
            let server_id = r.utf8(id_len, "server id")?;
            let nonce = r.nonce("share nonce")?;
            let key_len = r.u16("wrapped key length")?;
            let wrapped_key = r.take(key_len, "wrapped key")?.to_vec();
            shares.push(WrappedShare {
                server_id,
                nonce,
                wrapped_key,
            });
        }
        let nonce = r.nonce("data nonce")?;
        Ok(Self {
            package_id,
            policy_bytes,
            threshold,
            shares,
            nonce,
            ciphertext: r.buf.to_vec(),
        })
    }
}

pub(crate) fn aad_for(package_id: &ObjectId, policy_bytes: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(package_id.len() + policy_bytes.len() + 1);
    aad.extend_from_slice(package_id.as_bytes());
    aad.push(0);
    aad.extend_from_slice(policy_bytes);
    aad
}
