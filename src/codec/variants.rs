use stellar_xdr::curr::{ScAddress, ScVal};

use super::{as_bytes, as_map, bytes, map, tagged, untag, CodecError, FromScVal, ToScVal};
use crate::account::{DataKey, PublicKeyVariant, SignatureVariant, VariantKind};

/// Encode raw key bytes as the given variant, checking the length first
pub fn encode_public_key(kind: VariantKind, key: &[u8]) -> Result<ScVal, CodecError> {
    PublicKeyVariant::from_slice(kind, key)?.to_sc_val()
}

impl ToScVal for SignatureVariant {
    fn to_sc_val(&self) -> Result<ScVal, CodecError> {
        let kind = self.kind();
        let fields = vec![
            (kind.identity_field(), bytes(self.identity())?),
            ("signature", bytes(self.signature())?),
        ];
        tagged(kind.tag(), vec![map(fields)?])
    }
}

impl FromScVal for SignatureVariant {
    fn from_sc_val(val: &ScVal) -> Result<Self, CodecError> {
        let (tag, payload) = untag(val)?;
        let kind = VariantKind::from_tag(&tag).ok_or(CodecError::UnknownVariant(tag))?;
        let [fields] = payload else {
            return Err(CodecError::UnexpectedShape {
                expected: "one signature map",
                found: format!("{} payload values", payload.len()),
            });
        };

        let mut identity = None;
        let mut signature = None;
        for (key, value) in as_map(fields)? {
            match key.as_str() {
                k if k == kind.identity_field() => identity = Some(as_bytes(value)?),
                "signature" => signature = Some(as_bytes(value)?),
                _ => return Err(CodecError::UnexpectedField(key.clone())),
            }
        }

        let identity = identity.ok_or(CodecError::MissingField(kind.identity_field()))?;
        let signature = signature.ok_or(CodecError::MissingField("signature"))?;
        SignatureVariant::new(kind, identity, signature)
    }
}

impl ToScVal for DataKey {
    fn to_sc_val(&self) -> Result<ScVal, CodecError> {
        let payload = match self {
            DataKey::SignerCount => vec![],
            DataKey::Signer(key) => vec![key.to_sc_val()?],
            DataKey::SpendLimit(token) => vec![token.to_sc_val()?],
        };
        tagged(self.tag(), payload)
    }
}

impl FromScVal for DataKey {
    fn from_sc_val(val: &ScVal) -> Result<Self, CodecError> {
        let (tag, payload) = untag(val)?;
        match (tag.as_str(), payload) {
            ("SignerCnt", []) => Ok(DataKey::SignerCount),
            ("Signer", [key]) => Ok(DataKey::Signer(PublicKeyVariant::from_sc_val(key)?)),
            ("SpendLimit", [token]) => Ok(DataKey::SpendLimit(ScAddress::from_sc_val(token)?)),
            ("SignerCnt" | "Signer" | "SpendLimit", _) => Err(CodecError::UnexpectedShape {
                expected: "DataKey payload",
                found: format!("{} payload values for {}", payload.len(), tag),
            }),
            _ => Err(CodecError::UnknownVariant(tag.clone())),
        }
    }
}
