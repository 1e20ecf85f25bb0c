use crate::error::{Error, Result};
use crate::tls::constants::HANDSHAKE_HEADER_LEN;
use crate::utils;
use std::convert::TryFrom;
use std::fmt::Debug;

pub mod certificate;
pub mod certificate_request;
pub mod certificate_verify;
pub mod client_hello;
pub mod encrypted_extensions;
pub mod extensions;
pub mod finished;
pub mod key_update;
pub mod server_hello;

pub use certificate::{Certificate, CertificateEntry};
pub use certificate_request::CertificateRequest;
pub use certificate_verify::CertificateVerify;
pub use client_hello::ClientHello;
pub use encrypted_extensions::EncryptedExtensions;
pub use extensions::key_share::{KeyShareEntry, NamedGroup};
pub use extensions::{Extension, ExtensionType};
pub use finished::Finished;
pub use key_update::{KeyUpdate, KeyUpdateRequest};
pub use server_hello::ServerHello;

/// The only cipher suite this client offers.
pub const TLS_AES_128_GCM_SHA256: u16 = 0x1301;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeType {
    ClientHello = 1,
    ServerHello = 2,
    NewSessionTicket = 4,
    EndOfEarlyData = 5,
    EncryptedExtensions = 8,
    Certificate = 11,
    CertificateRequest = 13,
    CertificateVerify = 15,
    Finished = 20,
    KeyUpdate = 24,
    MessageHash = 254,
}

impl TryFrom<u8> for HandshakeType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(HandshakeType::ClientHello),
            2 => Ok(HandshakeType::ServerHello),
            4 => Ok(HandshakeType::NewSessionTicket),
            5 => Ok(HandshakeType::EndOfEarlyData),
            8 => Ok(HandshakeType::EncryptedExtensions),
            11 => Ok(HandshakeType::Certificate),
            13 => Ok(HandshakeType::CertificateRequest),
            15 => Ok(HandshakeType::CertificateVerify),
            20 => Ok(HandshakeType::Finished),
            24 => Ok(HandshakeType::KeyUpdate),
            254 => Ok(HandshakeType::MessageHash),
            _ => Err(Error::ParseError(format!(
                "Invalid HandshakeType value: {}",
                value
            ))),
        }
    }
}

pub trait HandshakeMessage: Debug {
    fn message_type(&self) -> HandshakeType;

    /// The message body, without the 4-byte handshake header.
    fn serialize(&self) -> Result<Vec<u8>>;

    /// Header plus body, as sent on the wire and hashed into the transcript.
    fn to_wire(&self) -> Result<Vec<u8>> {
        encode_handshake(self.message_type(), &self.serialize()?)
    }
}

pub fn encode_handshake(msg_type: HandshakeType, body: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(HANDSHAKE_HEADER_LEN + body.len());
    utils::write_u8(&mut result, msg_type as u8);
    utils::write_vector_u24(&mut result, body)?;
    Ok(result)
}
