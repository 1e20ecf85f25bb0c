use crate::tls::types::AlertDescription;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Crypto error: {0}")]
    CryptoError(String),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Record of {length} bytes does not fit the {capacity} byte receive buffer")]
    RecordTooLong { length: usize, capacity: usize },

    #[error("Record of {0} bytes exceeds the TLS record size limit")]
    RecordOver16K(usize),

    #[error("Handshake message of {0} bytes is too long")]
    HandshakeMessageTooLong(usize),

    #[error("Record authentication failed")]
    BadRecordMac,

    #[error("Decrypted record plaintext is all zeros")]
    EmptyInnerPlaintext,

    #[error("{message}")]
    Alert {
        description: AlertDescription,
        message: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Transport error: {0}")]
    TransportError(String),
}

impl Error {
    /// A fatal condition that maps to a specific alert code.
    pub fn alert(description: AlertDescription, message: impl Into<String>) -> Self {
        Error::Alert {
            description,
            message: message.into(),
        }
    }

    /// The alert sent to the peer when this error terminates a connection.
    pub fn alert_description(&self) -> AlertDescription {
        match self {
            Error::ParseError(_)
            | Error::RecordTooLong { .. }
            | Error::RecordOver16K(_)
            | Error::HandshakeMessageTooLong(_)
            | Error::EmptyInnerPlaintext => AlertDescription::DecodeError,
            Error::BadRecordMac => AlertDescription::BadRecordMac,
            Error::CertificateError(_) => AlertDescription::BadCertificate,
            Error::Alert { description, .. } => *description,
            Error::CryptoError(_)
            | Error::IoError(_)
            | Error::InvalidState(_)
            | Error::TransportError(_) => AlertDescription::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_mapping() {
        assert_eq!(
            Error::RecordTooLong { length: 10, capacity: 9 }.alert_description(),
            AlertDescription::DecodeError
        );
        assert_eq!(Error::RecordOver16K(16641).alert_description(), AlertDescription::DecodeError);
        assert_eq!(Error::BadRecordMac.alert_description(), AlertDescription::BadRecordMac);
        assert_eq!(Error::EmptyInnerPlaintext.alert_description(), AlertDescription::DecodeError);
        assert_eq!(
            Error::alert(AlertDescription::DecryptError, "bad finished").alert_description(),
            AlertDescription::DecryptError
        );
        assert_eq!(
            Error::CryptoError("x".to_string()).alert_description(),
            AlertDescription::InternalError
        );
    }
}
