//! Error codes returned by the account contract

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ContractErrorCode {
    #[error("not enough signers")]
    NotEnoughSigners = 1,
    #[error("negative amount")]
    NegativeAmount = 2,
    #[error("signatures are not in order")]
    BadSignatureOrder = 3,
    #[error("unknown signer")]
    UnknownSigner = 4,
    #[error("invalid authorization context")]
    InvalidContext = 5,
    #[error("signer mismatch")]
    SignerMismatch = 6,
    #[error("authentication failed")]
    AuthenticationFailed = 7,
}

impl ContractErrorCode {
    pub const ALL: [ContractErrorCode; 7] = [
        ContractErrorCode::NotEnoughSigners,
        ContractErrorCode::NegativeAmount,
        ContractErrorCode::BadSignatureOrder,
        ContractErrorCode::UnknownSigner,
        ContractErrorCode::InvalidContext,
        ContractErrorCode::SignerMismatch,
        ContractErrorCode::AuthenticationFailed,
    ];

    pub fn code(&self) -> u32 {
        *self as u32
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NotEnoughSigners => "NotEnoughSigners",
            Self::NegativeAmount => "NegativeAmount",
            Self::BadSignatureOrder => "BadSignatureOrder",
            Self::UnknownSigner => "UnknownSigner",
            Self::InvalidContext => "InvalidContext",
            Self::SignerMismatch => "SignerMismatch",
            Self::AuthenticationFailed => "AuthenticationFailed",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Extract the code from host diagnostic text such as
    /// `HostError: Error(Contract, #6)`.
    pub fn from_host_error(message: &str) -> Option<Self> {
        const MARKER: &str = "Error(Contract, #";
        let start = message.find(MARKER)? + MARKER.len();
        let digits: String = message[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok().and_then(Self::from_code)
    }
}

impl TryFrom<u32> for ContractErrorCode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, u32> {
        Self::from_code(code).ok_or(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        for (i, code) in ContractErrorCode::ALL.iter().enumerate() {
            assert_eq!(code.code(), i as u32 + 1);
        }
        assert_eq!(ContractErrorCode::try_from(8), Err(8));
        assert_eq!(ContractErrorCode::try_from(0), Err(0));
    }

    #[test]
    fn parses_host_error_text() {
        let message = "HostError: Error(Contract, #6)\n\nEvent log (newest first):";
        assert_eq!(
            ContractErrorCode::from_host_error(message),
            Some(ContractErrorCode::SignerMismatch)
        );
        assert_eq!(ContractErrorCode::from_host_error("Error(Budget, ExceededLimit)"), None);
        assert_eq!(ContractErrorCode::from_host_error("Error(Contract, #42)"), None);
    }
}
