use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::IntentError;

/// Chat actions the agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    CreateAllowlist,
    AddAllowlistMember,
    CreateCollection,
    EncryptAndUploadFile,
    DownloadAndDecryptFile,
    EncryptAndUploadMemory,
    DownloadAndDecryptMemory,
    UploadFileWithNft,
    UploadMemoryWithNft,
    MintAccessNft,
    DownloadWithNft,
    DownloadFile,
    ListMyNfts,
    ListCollections,
}

/// A parameter the model is asked to extract.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PromptField {
    pub name: &'static str,
    pub description: &'static str,
}

/// A worked example shown to the model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PromptExample {
    pub user: &'static str,
    pub assistant: &'static str,
}

const fn field(name: &'static str, description: &'static str) -> PromptField {
    PromptField { name, description }
}

const fn example(user: &'static str, assistant: &'static str) -> PromptExample {
    PromptExample { user, assistant }
}

const RETENTION_FIELDS: [PromptField; 2] = [
    field("deletable", "boolean or null"),
    field("epochs", "number or null"),
];

impl Intent {
    pub const ALL: [Intent; 14] = [
        Self::CreateAllowlist,
        Self::AddAllowlistMember,
        Self::CreateCollection,
        Self::EncryptAndUploadFile,
        Self::DownloadAndDecryptFile,
        Self::EncryptAndUploadMemory,
        Self::DownloadAndDecryptMemory,
        Self::UploadFileWithNft,
        Self::UploadMemoryWithNft,
        Self::MintAccessNft,
        Self::DownloadWithNft,
        Self::DownloadFile,
        Self::ListMyNfts,
        Self::ListCollections,
    ];

    /// Canonical action name, e.g. `ENCRYPT_AND_UPLOAD_FILE`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateAllowlist => "CREATE_ALLOWLIST",
            Self::AddAllowlistMember => "ADD_ALLOWLIST",
            Self::CreateCollection => "CREATE_COLLECTION",
            Self::EncryptAndUploadFile => "ENCRYPT_AND_UPLOAD_FILE",
            Self::DownloadAndDecryptFile => "DOWNLOAD_AND_DECRYPT_FILE",
            Self::EncryptAndUploadMemory => "ENCRYPT_AND_UPLOAD_MEMORY",
            Self::DownloadAndDecryptMemory => "DOWNLOAD_AND_DECRYPT_MEMORY",
            Self::UploadFileWithNft => "UPLOAD_FILE_WITH_NFT",
            Self::UploadMemoryWithNft => "UPLOAD_MEMORY_WITH_NFT",
            Self::MintAccessNft => "MINT_ACCESS_NFT",
            Self::DownloadWithNft => "DOWNLOAD_WITH_NFT",
            Self::DownloadFile => "DOWNLOAD_FILE",
            Self::ListMyNfts => "LIST_MY_NFTS",
            Self::ListCollections => "LIST_COLLECTIONS",
        }
    }

    /// Alternative names accepted for the action.
    #[must_use]
    pub fn similes(self) -> &'static [&'static str] {
        match self {
            Self::CreateAllowlist => &["CREATE_ALLOWLIST_ENTRY"],
            Self::AddAllowlistMember => &["ADD_ALLOWLIST_ADDRESS"],
            Self::CreateCollection => &["CREATE_NFT_COLLECTION", "MAKE_COLLECTION"],
            Self::EncryptAndUploadFile => &["UPLOAD_FILE"],
            Self::DownloadAndDecryptFile => &[],
            Self::EncryptAndUploadMemory => &["UPLOAD_MEMORY"],
            Self::DownloadAndDecryptMemory => &["DOWNLOAD_MEMORY"],
            Self::UploadFileWithNft => &["UPLOAD_FILE_NFT"],
            Self::UploadMemoryWithNft => {
                &["UPLOAD_MEMORY_NFT", "ENCRYPT_AND_UPLOAD_MEMORY_WITH_NFT"]
            }
            Self::MintAccessNft => &["MINT_NFT"],
            Self::DownloadWithNft => &["DOWNLOAD_FILE_WITH_NFT", "DOWNLOAD_MEMORY_WITH_NFT"],
            Self::DownloadFile => &[],
            Self::ListMyNfts => &["MY_NFTS"],
            Self::ListCollections => &["LIST_MY_COLLECTIONS"],
        }
    }

    /// Heading of the extraction prompt.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::CreateAllowlist => "Create Allowlist",
            Self::AddAllowlistMember => "Add Address To Allowlist",
            Self::CreateCollection => "Create NFT Collection",
            Self::EncryptAndUploadFile => "Encrypt and Upload File",
            Self::DownloadAndDecryptFile => "Download and Decrypt File",
            Self::EncryptAndUploadMemory => "Encrypt and Upload Memory",
            Self::DownloadAndDecryptMemory => "Download and Decrypt Memory",
            Self::UploadFileWithNft => "Upload File With NFT Access",
            Self::UploadMemoryWithNft => "Upload Memory With NFT Access",
            Self::MintAccessNft => "Mint Access NFT",
            Self::DownloadWithNft => "Download With NFT",
            Self::DownloadFile => "Download File",
            Self::ListMyNfts => "List My NFTs",
            Self::ListCollections => "List Collections",
        }
    }

    /// Parameters the model must extract. Empty for actions that need none.
    #[must_use]
    pub fn fields(self) -> Vec<PromptField> {
        match self {
            Self::CreateAllowlist => vec![field("name", "string (required)")],
            Self::AddAllowlistMember => vec![
                field("allowlistId", "string (required)"),
                field("capId", "string (required)"),
                field("address", "string (required)"),
            ],
            Self::CreateCollection => vec![
                field("name", "string or null"),
                field("mintPrice", "number or null - price in SUI per NFT"),
                field("maxSupply", "number or null - maximum number of NFTs"),
                field("resourceType", "string or null - \"file\" or \"memory\""),
            ],
            Self::EncryptAndUploadFile => {
                let mut v = vec![
                    field("fileId", "string (required)"),
                    field("allowlistId", "string (required)"),
                ];
                v.extend(RETENTION_FIELDS);
                v
            }
            Self::DownloadAndDecryptFile => vec![
                field("blobId", "string (required)"),
                field("allowlistId", "string (required)"),
                field("fileName", "string or null"),
            ],
            Self::EncryptAndUploadMemory => {
                let mut v = vec![
                    field("allowlistId", "string (required)"),
                    field("tableName", "string or null"),
                ];
                v.extend(RETENTION_FIELDS);
                v
            }
            Self::DownloadAndDecryptMemory => vec![
                field("blobId", "string (required)"),
                field("allowlistId", "string (required)"),
            ],
            Self::UploadFileWithNft | Self::UploadMemoryWithNft => {
                let mut v = Vec::new();
                if self == Self::UploadFileWithNft {
                    v.push(field("fileId", "string (required)"));
                }
                v.push(field("name", "string or null"));
                v.extend(RETENTION_FIELDS);
                v.push(field("maxSupply", "number or null"));
                v.push(field("mintPrice", "number or null - price in SUI"));
                v
            }
            Self::MintAccessNft => vec![
                field("collectionId", "string (required)"),
                field("paymentAmount", "number or null - SUI to pay"),
            ],
            Self::DownloadWithNft => vec![field("nft", "string (required)")],
            Self::DownloadFile => vec![
                field("blobId", "string (required)"),
                field("fileName", "string (required)"),
            ],
            Self::ListMyNfts | Self::ListCollections => Vec::new(),
        }
    }

    /// Worked examples included in the prompt.
    #[must_use]
    pub fn examples(self) -> &'static [PromptExample] {
        match self {
            Self::CreateAllowlist => const { &[example(
                "create allowlist named team-docs",
                r#"{"name":"team-docs"}"#,
            )] },
            Self::AddAllowlistMember => const { &[example(
                "add 0xabc to allowlist 0x123 with cap 0x456",
                r#"{"allowlistId":"0x123","capId":"0x456","address":"0xabc"}"#,
            )] },
            Self::CreateCollection => const { &[example(
                "make memory nft collection with price 2 SUI limit 100 nfts",
                r#"{"name":null,"mintPrice":2,"maxSupply":100,"resourceType":"memory"}"#,
            )] },
            Self::EncryptAndUploadFile => const { &[
                example(
                    "upload file 3f2a to 0x123abc",
                    r#"{"fileId":"3f2a","allowlistId":"0x123abc","deletable":null,"epochs":null}"#,
                ),
                example(
                    "upload file 3f2a to 0x123abc with 5 epochs, not deletable",
                    r#"{"fileId":"3f2a","allowlistId":"0x123abc","deletable":false,"epochs":5}"#,
                ),
            ] },
            Self::DownloadAndDecryptFile => const { &[example(
                "download blob Yx9 from allowlist 0x123abc as report.pdf",
                r#"{"blobId":"Yx9","allowlistId":"0x123abc","fileName":"report.pdf"}"#,
            )] },
            Self::EncryptAndUploadMemory => const { &[example(
                "upload memories to 0x123abc for 5 epochs",
                r#"{"allowlistId":"0x123abc","tableName":null,"deletable":null,"epochs":5}"#,
            )] },
            Self::DownloadAndDecryptMemory => const { &[example(
                "restore memory blob Yx9 with allowlist 0x123abc",
                r#"{"blobId":"Yx9","allowlistId":"0x123abc"}"#,
            )] },
            Self::UploadFileWithNft => const { &[example(
                "sell file 3f2a as nft, 20 copies at 0.5 SUI",
                r#"{"fileId":"3f2a","name":null,"deletable":null,"epochs":null,"maxSupply":20,"mintPrice":0.5}"#,
            )] },
            Self::UploadMemoryWithNft => const { &[example(
                "upload memory with nft access named Trip Notes",
                r#"{"name":"Trip Notes","deletable":null,"epochs":null,"maxSupply":null,"mintPrice":null}"#,
            )] },
            Self::MintAccessNft => const { &[example(
                "mint an nft from collection 0x789",
                r#"{"collectionId":"0x789","paymentAmount":null}"#,
            )] },
            Self::DownloadWithNft => const { &[example("download with nft 0xnft1", r#"{"nft":"0xnft1"}"#)] },
            Self::DownloadFile => const { &[example(
                "download blob Yx9 as photo.png",
                r#"{"blobId":"Yx9","fileName":"photo.png"}"#,
            )] },
            Self::ListMyNfts | Self::ListCollections => &[],
        }
    }

    /// Whether the model needs to be consulted at all.
    #[must_use]
    pub fn needs_extraction(self) -> bool {
        !matches!(self, Self::ListMyNfts | Self::ListCollections)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Intent {
    type Err = IntentError;

    /// Accepts the canonical name or a simile, case-insensitively, with `-`
    /// standing in for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|i| i.name() == wanted)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|i| i.similes().contains(&wanted.as_str()))
            })
            .ok_or_else(|| IntentError::UnknownAction(s.to_owned()))
    }
}
