use crate::error::{Error, Result};
use crate::handshake::HandshakeType;
use crate::tls::types::AlertDescription;
use std::convert::TryFrom;

fn unexpected(message: String) -> Error {
    Error::alert(AlertDescription::UnexpectedMessage, message)
}

fn handshake_type(msg_type: u8) -> Result<HandshakeType> {
    HandshakeType::try_from(msg_type)
        .map_err(|_| unexpected(format!("Unknown handshake message type {}", msg_type)))
}

/// Tracks which server handshake messages have arrived and rejects the ones
/// that may not arrive yet.
#[derive(Debug, Default, Clone)]
pub struct HandshakeProgress {
    server_hello: bool,
    certificate: bool,
    certificate_requested: bool,
}

impl HandshakeProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, msg_type: u8) -> Result<HandshakeType> {
        let handshake_type = handshake_type(msg_type)?;
        match handshake_type {
            HandshakeType::ServerHello => {
                if self.server_hello {
                    return Err(unexpected("A second ServerHello message has been received".to_string()));
                }
                self.server_hello = true;
            }
            HandshakeType::EncryptedExtensions
            | HandshakeType::Certificate
            | HandshakeType::CertificateRequest
            | HandshakeType::CertificateVerify
            | HandshakeType::Finished
                if !self.server_hello =>
            {
                return Err(unexpected(format!(
                    "{:?} message received before ServerHello",
                    handshake_type
                )));
            }
            HandshakeType::EncryptedExtensions => {}
            HandshakeType::CertificateRequest => self.certificate_requested = true,
            HandshakeType::Certificate => self.certificate = true,
            HandshakeType::CertificateVerify if !self.certificate => {
                return Err(unexpected("CertificateVerify message received before Certificate".to_string()));
            }
            HandshakeType::CertificateVerify => {}
            HandshakeType::Finished if !self.certificate => {
                return Err(Error::alert(
                    AlertDescription::CertificateRequired,
                    "Finished message received before Certificate",
                ));
            }
            HandshakeType::Finished => {}
            other => {
                return Err(unexpected(format!(
                    "Unexpected handshake message of type {:?} received during handshake",
                    other
                )));
            }
        }
        Ok(handshake_type)
    }

    pub fn certificate_requested(&self) -> bool {
        self.certificate_requested
    }
}

/// Once established only KeyUpdate and NewSessionTicket may arrive.
pub fn accept_post_handshake(msg_type: u8) -> Result<HandshakeType> {
    match handshake_type(msg_type)? {
        t @ (HandshakeType::KeyUpdate | HandshakeType::NewSessionTicket) => Ok(t),
        other => Err(unexpected(format!(
            "Unexpected handshake message of type {:?} received after the handshake",
            other
        ))),
    }
}
