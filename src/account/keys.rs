//! Public key and signature variants accepted by the smart account

use stellar_xdr::curr::ScAddress;

use crate::codec::CodecError;

pub const NATIVE_KEY_LEN: usize = 32;
pub const NATIVE_SIGNATURE_LEN: usize = 64;
pub const SECP256K1_KEY_LEN: usize = 65;
pub const SECP256K1_ADDRESS_LEN: usize = 20;
pub const SECP256K1_SIGNATURE_LEN: usize = 65;

/// Signature scheme a key or signature belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Stellar ed25519
    Native,
    /// Uncompressed secp256k1 public key
    Secp256k1,
    /// Ethereum address (keccak of the public key, last 20 bytes)
    Secp256k1Address,
}

impl VariantKind {
    pub const ALL: [VariantKind; 3] = [
        VariantKind::Native,
        VariantKind::Secp256k1,
        VariantKind::Secp256k1Address,
    ];

    /// Symbol the contract uses for this case
    pub fn tag(&self) -> &'static str {
        match self {
            VariantKind::Native => "Stellar",
            VariantKind::Secp256k1 => "Ethereum",
            VariantKind::Secp256k1Address => "EthereumAddress",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Identity length (public key or address)
    pub fn key_len(&self) -> usize {
        match self {
            VariantKind::Native => NATIVE_KEY_LEN,
            VariantKind::Secp256k1 => SECP256K1_KEY_LEN,
            VariantKind::Secp256k1Address => SECP256K1_ADDRESS_LEN,
        }
    }

    /// Map field holding the identity inside a signature
    pub fn identity_field(&self) -> &'static str {
        match self {
            VariantKind::Native | VariantKind::Secp256k1 => "public_key",
            VariantKind::Secp256k1Address => "address",
        }
    }

    /// Pick the variant from an identity's byte length
    pub fn from_key_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key_len() == len)
    }
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

fn fixed<const N: usize>(
    kind: VariantKind,
    field: &'static str,
    bytes: &[u8],
) -> Result<[u8; N], CodecError> {
    bytes.try_into().map_err(|_| CodecError::InvalidLength {
        variant: kind.tag(),
        field,
        expected: N,
        actual: bytes.len(),
    })
}

/// A signer identity registered with the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyVariant {
    Native([u8; NATIVE_KEY_LEN]),
    Secp256k1Uncompressed([u8; SECP256K1_KEY_LEN]),
    Secp256k1Address([u8; SECP256K1_ADDRESS_LEN]),
}

impl PublicKeyVariant {
    /// Build a key of the given kind, rejecting any length mismatch
    pub fn from_slice(kind: VariantKind, bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(match kind {
            VariantKind::Native => Self::Native(fixed(kind, "public_key", bytes)?),
            VariantKind::Secp256k1 => {
                Self::Secp256k1Uncompressed(fixed(kind, "public_key", bytes)?)
            }
            VariantKind::Secp256k1Address => {
                Self::Secp256k1Address(fixed(kind, "address", bytes)?)
            }
        })
    }

    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Native(_) => VariantKind::Native,
            Self::Secp256k1Uncompressed(_) => VariantKind::Secp256k1,
            Self::Secp256k1Address(_) => VariantKind::Secp256k1Address,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Native(key) => key,
            Self::Secp256k1Uncompressed(key) => key,
            Self::Secp256k1Address(address) => address,
        }
    }
}

/// A signature presented to `__check_auth`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVariant {
    Native {
        public_key: [u8; NATIVE_KEY_LEN],
        signature: [u8; NATIVE_SIGNATURE_LEN],
    },
    /// `signature` is `r || s || v`; the contract reads `v` from byte 64
    Secp256k1 {
        public_key: [u8; SECP256K1_KEY_LEN],
        signature: [u8; SECP256K1_SIGNATURE_LEN],
    },
    Secp256k1Address {
        address: [u8; SECP256K1_ADDRESS_LEN],
        signature: [u8; SECP256K1_SIGNATURE_LEN],
    },
}

impl SignatureVariant {
    /// Pair an identity with a signature of the given kind
    pub fn new(kind: VariantKind, identity: &[u8], signature: &[u8]) -> Result<Self, CodecError> {
        let field = kind.identity_field();
        Ok(match kind {
            VariantKind::Native => Self::Native {
                public_key: fixed(kind, field, identity)?,
                signature: fixed(kind, "signature", signature)?,
            },
            VariantKind::Secp256k1 => Self::Secp256k1 {
                public_key: fixed(kind, field, identity)?,
                signature: fixed(kind, "signature", signature)?,
            },
            VariantKind::Secp256k1Address => Self::Secp256k1Address {
                address: fixed(kind, field, identity)?,
                signature: fixed(kind, "signature", signature)?,
            },
        })
    }

    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Native { .. } => VariantKind::Native,
            Self::Secp256k1 { .. } => VariantKind::Secp256k1,
            Self::Secp256k1Address { .. } => VariantKind::Secp256k1Address,
        }
    }

    pub fn identity(&self) -> &[u8] {
        match self {
            Self::Native { public_key, .. } => public_key,
            Self::Secp256k1 { public_key, .. } => public_key,
            Self::Secp256k1Address { address, .. } => address,
        }
    }

    pub fn signature(&self) -> &[u8] {
        match self {
            Self::Native { signature, .. } => signature,
            Self::Secp256k1 { signature, .. } => signature,
            Self::Secp256k1Address { signature, .. } => signature,
        }
    }
}

/// Storage keys of the account contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKey {
    SignerCount,
    Signer(PublicKeyVariant),
    SpendLimit(ScAddress),
}

impl DataKey {
    pub fn tag(&self) -> &'static str {
        match self {
            DataKey::SignerCount => "SignerCnt",
            DataKey::Signer(_) => "Signer",
            DataKey::SpendLimit(_) => "SpendLimit",
        }
    }
}
