//! Stellar strkey text encoding (G... accounts, S... seeds, C... contracts)
//!
//! Base32 of `version byte || 32-byte payload || CRC16-XModem (little endian)`.

use data_encoding::BASE32;
use stellar_xdr::curr::{AccountId, Hash, PublicKey, ScAddress, Uint256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrKeyError {
    #[error("Invalid base32 encoding")]
    Base32,

    #[error("Invalid strkey length: {0} bytes")]
    Length(usize),

    #[error("Unexpected version byte {found:#04x}, expected {expected:#04x}")]
    Version { expected: u8, found: u8 },

    #[error("Checksum mismatch")]
    Checksum,

    #[error("Unsupported address prefix: {0}")]
    Prefix(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Account,
    Seed,
    Contract,
}

impl Version {
    fn byte(self) -> u8 {
        match self {
            Version::Account => 6 << 3,
            Version::Seed => 18 << 3,
            Version::Contract => 2 << 3,
        }
    }
}

pub fn encode(version: Version, payload: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(35);
    data.push(version.byte());
    data.extend_from_slice(payload);
    let checksum = crc16_xmodem(&data);
    data.extend_from_slice(&checksum.to_le_bytes());
    BASE32.encode(&data)
}

pub fn decode(version: Version, text: &str) -> Result<[u8; 32], StrKeyError> {
    let data = BASE32
        .decode(text.as_bytes())
        .map_err(|_| StrKeyError::Base32)?;
    if data.len() != 35 {
        return Err(StrKeyError::Length(data.len()));
    }
    if data[0] != version.byte() {
        return Err(StrKeyError::Version {
            expected: version.byte(),
            found: data[0],
        });
    }
    let (body, checksum) = data.split_at(33);
    if crc16_xmodem(body).to_le_bytes() != checksum {
        return Err(StrKeyError::Checksum);
    }
    let mut payload = [0u8; 32];
    payload.copy_from_slice(&body[1..]);
    Ok(payload)
}

/// Decode an `S...` secret seed
pub fn decode_seed(text: &str) -> Result<[u8; 32], StrKeyError> {
    decode(Version::Seed, text)
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// A contract id (`C...`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId(pub [u8; 32]);

impl ContractId {
    pub fn sc_address(&self) -> ScAddress {
        ScAddress::Contract(Hash(self.0))
    }

    pub fn from_sc_address(address: &ScAddress) -> Option<Self> {
        match address {
            ScAddress::Contract(Hash(id)) => Some(Self(*id)),
            _ => None,
        }
    }
}

impl std::str::FromStr for ContractId {
    type Err = StrKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(Version::Contract, s).map(Self)
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&encode(Version::Contract, &self.0))
    }
}

/// An ed25519 account key (`G...`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountKey(pub [u8; 32]);

impl AccountKey {
    pub fn account_id(&self) -> AccountId {
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(self.0)))
    }

    pub fn sc_address(&self) -> ScAddress {
        ScAddress::Account(self.account_id())
    }
}

impl std::str::FromStr for AccountKey {
    type Err = StrKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(Version::Account, s).map(Self)
    }
}

impl std::fmt::Display for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&encode(Version::Account, &self.0))
    }
}

/// Parse either a `G...` account or a `C...` contract into an `ScAddress`
pub fn parse_address(text: &str) -> Result<ScAddress, StrKeyError> {
    match text.chars().next() {
        Some('G') => Ok(text.parse::<AccountKey>()?.sc_address()),
        Some('C') => Ok(text.parse::<ContractId>()?.sc_address()),
        _ => Err(StrKeyError::Prefix(text.chars().take(1).collect())),
    }
}
