use crate::error::{Error, Result};
use crate::handshake::extensions::key_share::{KeyShareEntry, NamedGroup};
use crate::handshake::extensions::{
    find_extension, parse_extensions, serialize_extensions, supported_versions, Extension, ExtensionType,
};
use crate::handshake::{HandshakeMessage, HandshakeType, TLS_AES_128_GCM_SHA256};
use crate::tls::constants::{LEGACY_VERSION, TLS13};
use crate::utils;

// ecdsa_secp256r1_sha256, rsa_pss_rsae_sha256, rsa_pkcs1_sha256
const SIGNATURE_SCHEMES: [u16; 3] = [0x0403, 0x0804, 0x0401];

// max_fragment_length code for 2^9 bytes
const MAX_FRAGMENT_LENGTH_512: u8 = 1;

#[derive(Debug, Clone)]
pub struct ClientHello {
    pub legacy_version: u16,
    pub random: [u8; 32],
    pub legacy_session_id: Vec<u8>,
    pub cipher_suites: Vec<u16>,
    pub legacy_compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    pub fn new(
        legacy_version: u16,
        random: [u8; 32],
        legacy_session_id: Vec<u8>,
        cipher_suites: Vec<u16>,
        legacy_compression_methods: Vec<u8>,
        extensions: Vec<Extension>,
    ) -> Self {
        Self {
            legacy_version,
            random,
            legacy_session_id,
            cipher_suites,
            legacy_compression_methods,
            extensions,
        }
    }

    /// The hello this client sends: TLS 1.3 only, TLS_AES_128_GCM_SHA256,
    /// one P-256 key share.
    pub fn for_p256(
        random: [u8; 32],
        legacy_session_id: Vec<u8>,
        public_key: &[u8],
        server_name: Option<&str>,
        request_max_fragment_length: bool,
    ) -> Result<Self> {
        let mut extensions = Vec::new();

        if let Some(name) = server_name {
            extensions.push(server_name_extension(name)?);
        }
        if request_max_fragment_length {
            extensions.push(Extension::new(
                ExtensionType::MaxFragmentLength,
                vec![MAX_FRAGMENT_LENGTH_512],
            ));
        }
        extensions.push(supported_versions::client_extension(&[TLS13])?);

        let mut groups = Vec::new();
        utils::write_vector_u16(&mut groups, &(NamedGroup::Secp256r1 as u16).to_be_bytes())?;
        extensions.push(Extension::new(ExtensionType::SupportedGroups, groups));

        let schemes: Vec<u8> = SIGNATURE_SCHEMES.iter().flat_map(|s| s.to_be_bytes()).collect();
        let mut signature_algorithms = Vec::new();
        utils::write_vector_u16(&mut signature_algorithms, &schemes)?;
        extensions.push(Extension::new(ExtensionType::SignatureAlgorithms, signature_algorithms));

        extensions.push(KeyShareEntry::client_extension(&[KeyShareEntry::new(
            NamedGroup::Secp256r1,
            public_key.to_vec(),
        )])?);

        Ok(Self::new(
            LEGACY_VERSION,
            random,
            legacy_session_id,
            vec![TLS_AES_128_GCM_SHA256],
            vec![0],
            extensions,
        ))
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let legacy_version = utils::read_u16(data, pos)?;

        let mut random = [0u8; 32];
        random.copy_from_slice(utils::read_bytes(data, pos, 32)?);

        let legacy_session_id = utils::read_vector_u8(data, pos)?.to_vec();

        let suites = utils::read_vector_u16(data, pos)?;
        if suites.len() % 2 != 0 {
            return Err(Error::ParseError("Cipher suites length must be even".to_string()));
        }
        let cipher_suites = suites
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();

        let legacy_compression_methods = utils::read_vector_u8(data, pos)?.to_vec();
        let extensions = parse_extensions(data, pos)?;
        utils::expect_end(data, *pos, "ClientHello")?;

        Ok(Self {
            legacy_version,
            random,
            legacy_session_id,
            cipher_suites,
            legacy_compression_methods,
            extensions,
        })
    }

    pub fn get_extension(&self, extension_type: ExtensionType) -> Option<&Extension> {
        find_extension(&self.extensions, extension_type)
    }
}

fn server_name_extension(name: &str) -> Result<Extension> {
    // ServerNameList with a single host_name entry
    let mut entry = Vec::with_capacity(3 + name.len());
    utils::write_u8(&mut entry, 0);
    utils::write_vector_u16(&mut entry, name.as_bytes())?;

    let mut data = Vec::with_capacity(2 + entry.len());
    utils::write_vector_u16(&mut data, &entry)?;
    Ok(Extension::new(ExtensionType::ServerName, data))
}

impl HandshakeMessage for ClientHello {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::ClientHello
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut result = Vec::new();

        utils::write_u16(&mut result, self.legacy_version);
        result.extend_from_slice(&self.random);
        utils::write_vector_u8(&mut result, &self.legacy_session_id)?;

        let suites: Vec<u8> = self.cipher_suites.iter().flat_map(|s| s.to_be_bytes()).collect();
        utils::write_vector_u16(&mut result, &suites)?;

        utils::write_vector_u8(&mut result, &self.legacy_compression_methods)?;
        serialize_extensions(&mut result, &self.extensions)?;

        Ok(result)
    }
}
