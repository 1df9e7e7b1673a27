//! Wire codec between account types and Soroban `ScVal`s
//!
//! Enum cases travel as `vec[Symbol(tag), payload...]` and structs as maps
//! keyed by field symbol, sorted ascending as the host requires.

mod variants;

use stellar_xdr::curr::{
    BytesM, Int128Parts, ScAddress, ScBytes, ScMap, ScMapEntry, ScSymbol, ScVal, ScVec, StringM,
    VecM,
};
use thiserror::Error;

use crate::account::{PublicKeyVariant, VariantKind};

pub use variants::encode_public_key;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{variant} {field} must be {expected} bytes, got {actual}")]
    InvalidLength {
        variant: &'static str,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown variant tag: {0}")]
    UnknownVariant(String),

    #[error("Expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: String,
    },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),
}

/// Types with a fixed `ScVal` layout
pub trait ToScVal {
    fn to_sc_val(&self) -> Result<ScVal, CodecError>;
}

pub trait FromScVal: Sized {
    fn from_sc_val(val: &ScVal) -> Result<Self, CodecError>;
}

pub fn encode<T: ToScVal + ?Sized>(value: &T) -> Result<ScVal, CodecError> {
    value.to_sc_val()
}

pub fn decode<T: FromScVal>(val: &ScVal) -> Result<T, CodecError> {
    T::from_sc_val(val)
}

impl ToScVal for ScAddress {
    fn to_sc_val(&self) -> Result<ScVal, CodecError> {
        Ok(ScVal::Address(self.clone()))
    }
}

impl FromScVal for ScAddress {
    fn from_sc_val(val: &ScVal) -> Result<Self, CodecError> {
        match val {
            ScVal::Address(address) => Ok(address.clone()),
            other => Err(shape("Address", other)),
        }
    }
}

impl ToScVal for i128 {
    fn to_sc_val(&self) -> Result<ScVal, CodecError> {
        Ok(ScVal::I128(Int128Parts {
            hi: (*self >> 64) as i64,
            lo: *self as u64,
        }))
    }
}

impl FromScVal for i128 {
    fn from_sc_val(val: &ScVal) -> Result<Self, CodecError> {
        match val {
            ScVal::I128(Int128Parts { hi, lo }) => Ok(((*hi as i128) << 64) | (*lo as i128)),
            other => Err(shape("I128", other)),
        }
    }
}

impl ToScVal for u32 {
    fn to_sc_val(&self) -> Result<ScVal, CodecError> {
        Ok(ScVal::U32(*self))
    }
}

impl FromScVal for u32 {
    fn from_sc_val(val: &ScVal) -> Result<Self, CodecError> {
        match val {
            ScVal::U32(v) => Ok(*v),
            other => Err(shape("U32", other)),
        }
    }
}

impl ToScVal for PublicKeyVariant {
    fn to_sc_val(&self) -> Result<ScVal, CodecError> {
        tagged(self.kind().tag(), vec![bytes(self.as_bytes())?])
    }
}

impl FromScVal for PublicKeyVariant {
    fn from_sc_val(val: &ScVal) -> Result<Self, CodecError> {
        let (tag, payload) = untag(val)?;
        let kind = VariantKind::from_tag(&tag).ok_or(CodecError::UnknownVariant(tag))?;
        let [value] = payload else {
            return Err(CodecError::UnexpectedShape {
                expected: "one public key payload",
                found: format!("{} payload values", payload.len()),
            });
        };
        PublicKeyVariant::from_slice(kind, as_bytes(value)?)
    }
}

pub(crate) fn symbol(name: &str) -> Result<ScVal, CodecError> {
    Ok(ScVal::Symbol(ScSymbol(StringM::try_from(name)?)))
}

pub(crate) fn bytes(value: &[u8]) -> Result<ScVal, CodecError> {
    Ok(ScVal::Bytes(ScBytes(BytesM::try_from(value.to_vec())?)))
}

pub(crate) fn vec(items: Vec<ScVal>) -> Result<ScVal, CodecError> {
    Ok(ScVal::Vec(Some(ScVec(VecM::try_from(items)?))))
}

/// Map with symbol keys, emitted in ascending key order
pub(crate) fn map(mut fields: Vec<(&str, ScVal)>) -> Result<ScVal, CodecError> {
    fields.sort_by(|a, b| a.0.cmp(b.0));
    let entries = fields
        .into_iter()
        .map(|(key, val)| Ok(ScMapEntry { key: symbol(key)?, val }))
        .collect::<Result<Vec<_>, CodecError>>()?;
    Ok(ScVal::Map(Some(ScMap(VecM::try_from(entries)?))))
}

pub(crate) fn tagged(tag: &str, mut payload: Vec<ScVal>) -> Result<ScVal, CodecError> {
    payload.insert(0, symbol(tag)?);
    vec(payload)
}

pub(crate) fn as_symbol(val: &ScVal) -> Result<String, CodecError> {
    match val {
        ScVal::Symbol(sym) => Ok(String::from_utf8_lossy(sym.0.as_slice()).into_owned()),
        other => Err(shape("Symbol", other)),
    }
}

pub(crate) fn as_bytes(val: &ScVal) -> Result<&[u8], CodecError> {
    match val {
        ScVal::Bytes(b) => Ok(b.0.as_slice()),
        other => Err(shape("Bytes", other)),
    }
}

pub(crate) fn as_vec(val: &ScVal) -> Result<&[ScVal], CodecError> {
    match val {
        ScVal::Vec(Some(items)) => Ok(items.0.as_slice()),
        other => Err(shape("Vec", other)),
    }
}

/// Symbol-keyed map entries, in wire order
pub(crate) fn as_map(val: &ScVal) -> Result<Vec<(String, &ScVal)>, CodecError> {
    match val {
        ScVal::Map(Some(entries)) => entries
            .0
            .iter()
            .map(|entry| Ok((as_symbol(&entry.key)?, &entry.val)))
            .collect::<Result<Vec<_>, CodecError>>(),
        other => Err(shape("Map", other)),
    }
}

/// Split `vec[Symbol(tag), payload...]`
pub(crate) fn untag(val: &ScVal) -> Result<(String, &[ScVal]), CodecError> {
    match as_vec(val)? {
        [tag, payload @ ..] => Ok((as_symbol(tag)?, payload)),
        [] => Err(CodecError::UnexpectedShape {
            expected: "tagged vec",
            found: "empty vec".to_string(),
        }),
    }
}

pub(crate) fn shape(expected: &'static str, found: &ScVal) -> CodecError {
    CodecError::UnexpectedShape {
        expected,
        found: format!("{:?}", found.discriminant()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keys_are_sorted() {
        let val = map(vec![
            ("signature", ScVal::U32(2)),
            ("address", ScVal::U32(0)),
            ("public_key", ScVal::U32(1)),
        ])
        .unwrap();
        let keys: Vec<String> = as_map(&val).unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["address", "public_key", "signature"]);
    }

    #[test]
    fn i128_splits_into_parts() {
        let val = (-5i128).to_sc_val().unwrap();
        assert_eq!(val, ScVal::I128(Int128Parts { hi: -1, lo: u64::MAX - 4 }));
        assert_eq!(i128::from_sc_val(&val).unwrap(), -5);

        let big = 10_000_000i128 << 64;
        assert_eq!(i128::from_sc_val(&big.to_sc_val().unwrap()).unwrap(), big);
    }

    #[test]
    fn public_key_wire_layout() {
        let key = PublicKeyVariant::Secp256k1Address([0xAA; 20]);
        let val = encode(&key).unwrap();
        let (tag, payload) = untag(&val).unwrap();
        assert_eq!(tag, "EthereumAddress");
        assert_eq!(as_bytes(&payload[0]).unwrap(), &[0xAA; 20]);
    }

    #[test]
    fn short_key_payload_fails_on_decode() {
        let val = tagged("Stellar", vec![bytes(&[1u8; 31]).unwrap()]).unwrap();
        let err = decode::<PublicKeyVariant>(&val).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength { expected: 32, actual: 31, .. }));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let val = tagged("Bitcoin", vec![bytes(&[1u8; 33]).unwrap()]).unwrap();
        assert!(matches!(
            decode::<PublicKeyVariant>(&val),
            Err(CodecError::UnknownVariant(tag)) if tag == "Bitcoin"
        ));
    }
}
