//! Signer data model of the smart account contract

mod error_code;
mod keys;

pub use error_code::ContractErrorCode;
pub use keys::{
    DataKey, PublicKeyVariant, SignatureVariant, VariantKind, NATIVE_KEY_LEN,
    NATIVE_SIGNATURE_LEN, SECP256K1_ADDRESS_LEN, SECP256K1_KEY_LEN, SECP256K1_SIGNATURE_LEN,
};
