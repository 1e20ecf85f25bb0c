use crate::error::{Error, Result};
use crate::handshake::extensions::key_share::{KeyShareEntry, NamedGroup};
use crate::handshake::extensions::{
    find_extension, parse_extensions, serialize_extensions, supported_versions, Extension, ExtensionType,
};
use crate::handshake::{HandshakeMessage, HandshakeType, TLS_AES_128_GCM_SHA256};
use crate::tls::constants::TLS13;
use crate::tls::types::AlertDescription;
use crate::utils;

// SHA-256("HelloRetryRequest"), RFC 8446 §4.1.3
const HELLO_RETRY_REQUEST_RANDOM: [u8; 32] = [
    0xCF, 0x21, 0xAD, 0x74, 0xE5, 0x9A, 0x61, 0x11,
    0xBE, 0x1D, 0x8C, 0x02, 0x1E, 0x65, 0xB8, 0x91,
    0xC2, 0xA2, 0x11, 0x16, 0x7A, 0xBB, 0x8C, 0x5E,
    0x07, 0x9E, 0x09, 0xE2, 0xC8, 0xA8, 0x33, 0x9C,
];

#[derive(Debug, Clone)]
pub struct ServerHello {
    pub legacy_version: u16,
    pub random: [u8; 32],
    pub legacy_session_id_echo: Vec<u8>,
    pub cipher_suite: u16,
    pub legacy_compression_method: u8,
    pub extensions: Vec<Extension>,
}

impl ServerHello {
    pub fn new(
        legacy_version: u16,
        random: [u8; 32],
        legacy_session_id_echo: Vec<u8>,
        cipher_suite: u16,
        legacy_compression_method: u8,
        extensions: Vec<Extension>,
    ) -> Self {
        Self {
            legacy_version,
            random,
            legacy_session_id_echo,
            cipher_suite,
            legacy_compression_method,
            extensions,
        }
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let legacy_version = utils::read_u16(data, pos)?;

        let mut random = [0u8; 32];
        random.copy_from_slice(utils::read_bytes(data, pos, 32)?);

        let legacy_session_id_echo = utils::read_vector_u8(data, pos)?.to_vec();
        let cipher_suite = utils::read_u16(data, pos)?;
        let legacy_compression_method = utils::read_u8(data, pos)?;
        let extensions = parse_extensions(data, pos)?;
        utils::expect_end(data, *pos, "ServerHello")?;

        Ok(Self {
            legacy_version,
            random,
            legacy_session_id_echo,
            cipher_suite,
            legacy_compression_method,
            extensions,
        })
    }

    pub fn is_hello_retry_request(&self) -> bool {
        self.random == HELLO_RETRY_REQUEST_RANDOM
    }

    pub fn get_extension(&self, extension_type: ExtensionType) -> Option<&Extension> {
        find_extension(&self.extensions, extension_type)
    }

    /// Checks that the server accepted what this client offered and returns
    /// the server's P-256 public key.
    pub fn validate(&self, sent_session_id: &[u8]) -> Result<Vec<u8>> {
        if self.is_hello_retry_request() {
            return Err(Error::alert(
                AlertDescription::HandshakeFailure,
                "HelloRetryRequest is not supported",
            ));
        }

        let version = match self.get_extension(ExtensionType::SupportedVersions) {
            Some(extension) => supported_versions::parse_server(extension)?,
            None => self.legacy_version,
        };
        if version != TLS13 {
            return Err(Error::alert(
                AlertDescription::ProtocolVersion,
                format!("Server selected version {:#06x}, only TLS 1.3 is supported", version),
            ));
        }

        if self.cipher_suite != TLS_AES_128_GCM_SHA256 {
            return Err(Error::alert(
                AlertDescription::IllegalParameter,
                format!("Server selected cipher suite {:#06x}, which was not offered", self.cipher_suite),
            ));
        }

        let key_share = match self.get_extension(ExtensionType::KeyShare) {
            Some(extension) => KeyShareEntry::parse_server(extension)?,
            None => {
                return Err(Error::alert(
                    AlertDescription::HandshakeFailure,
                    "ServerHello carries no key share",
                ))
            }
        };
        if key_share.group != NamedGroup::Secp256r1 as u16 {
            return Err(Error::alert(
                AlertDescription::HandshakeFailure,
                format!("Server key share uses group {:#06x}", key_share.group),
            ));
        }

        if self.legacy_session_id_echo != sent_session_id {
            return Err(Error::alert(
                AlertDescription::HandshakeFailure,
                "ServerHello session id does not match the one sent",
            ));
        }

        if self.legacy_compression_method != 0 {
            return Err(Error::alert(
                AlertDescription::HandshakeFailure,
                "ServerHello compression method is not null",
            ));
        }

        Ok(key_share.key_exchange)
    }
}

impl HandshakeMessage for ServerHello {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::ServerHello
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut result = Vec::new();

        utils::write_u16(&mut result, self.legacy_version);
        result.extend_from_slice(&self.random);
        utils::write_vector_u8(&mut result, &self.legacy_session_id_echo)?;
        utils::write_u16(&mut result, self.cipher_suite);
        utils::write_u8(&mut result, self.legacy_compression_method);
        serialize_extensions(&mut result, &self.extensions)?;

        Ok(result)
    }
}
