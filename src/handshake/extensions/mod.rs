use crate::error::{Error, Result};
use crate::tls::types::AlertDescription;
use crate::utils;

pub mod key_share;
pub mod supported_versions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    ServerName = 0,
    MaxFragmentLength = 1,
    SupportedGroups = 10,
    SignatureAlgorithms = 13,
    ApplicationLayerProtocolNegotiation = 16,
    RecordSizeLimit = 28,
    PreSharedKey = 41,
    EarlyData = 42,
    SupportedVersions = 43,
    Cookie = 44,
    PskKeyExchangeModes = 45,
    KeyShare = 51,
}

/// A raw extension. The type stays a plain `u16` so that extensions this
/// client does not know can be carried and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: u16,
    pub data: Vec<u8>,
}

impl Extension {
    pub fn new(extension_type: ExtensionType, data: Vec<u8>) -> Self {
        Self {
            extension_type: extension_type as u16,
            data,
        }
    }

    pub fn is(&self, extension_type: ExtensionType) -> bool {
        self.extension_type == extension_type as u16
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let extension_type = utils::read_u16(data, pos)?;
        let extension_data = utils::read_vector_u16(data, pos)?;

        Ok(Self {
            extension_type,
            data: extension_data.to_vec(),
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) -> Result<()> {
        utils::write_u16(out, self.extension_type);
        utils::write_vector_u16(out, &self.data)
    }
}

/// Parses a u16 length-prefixed extension block. Repeated types are an
/// illegal_parameter condition.
pub fn parse_extensions(data: &[u8], pos: &mut usize) -> Result<Vec<Extension>> {
    let block = utils::read_vector_u16(data, pos)?;
    let mut inner = 0;
    let mut extensions: Vec<Extension> = Vec::new();

    while inner < block.len() {
        let extension = Extension::parse(block, &mut inner)?;
        if extensions.iter().any(|e| e.extension_type == extension.extension_type) {
            return Err(Error::alert(
                AlertDescription::IllegalParameter,
                format!("Duplicate extension {}", extension.extension_type),
            ));
        }
        extensions.push(extension);
    }

    Ok(extensions)
}

pub fn serialize_extensions(out: &mut Vec<u8>, extensions: &[Extension]) -> Result<()> {
    let mut block = Vec::new();
    for extension in extensions {
        extension.serialize(&mut block)?;
    }
    utils::write_vector_u16(out, &block)
}

pub fn find_extension(extensions: &[Extension], extension_type: ExtensionType) -> Option<&Extension> {
    extensions.iter().find(|e| e.is(extension_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_block_parsing() {
        let block = [
            0x00, 0x10, // block length
            0x00, 0x0A, // SupportedGroups
            0x00, 0x04, 0x00, 0x02, 0x00, 0x17,
            0xFF, 0x01, // unknown type
            0x00, 0x02, 0xAB, 0xCD,
        ];

        let mut pos = 0;
        let extensions = parse_extensions(&block, &mut pos).unwrap();

        assert_eq!(pos, block.len());
        assert_eq!(extensions.len(), 2);
        assert!(extensions[0].is(ExtensionType::SupportedGroups));
        assert_eq!(extensions[0].data, vec![0x00, 0x02, 0x00, 0x17]);
        assert_eq!(extensions[1].extension_type, 0xFF01);
        assert!(find_extension(&extensions, ExtensionType::KeyShare).is_none());
    }

    #[test]
    fn test_duplicate_extension() {
        let block = [0x00, 0x08, 0x00, 0x2B, 0x00, 0x00, 0x00, 0x2B, 0x00, 0x00];
        let err = parse_extensions(&block, &mut 0).unwrap_err();
        assert_eq!(err.alert_description(), AlertDescription::IllegalParameter);
    }

    #[test]
    fn test_extension_serialization() {
        let mut out = Vec::new();
        serialize_extensions(&mut out, &[Extension::new(ExtensionType::MaxFragmentLength, vec![1])]).unwrap();
        assert_eq!(out, [0x00, 0x05, 0x00, 0x01, 0x00, 0x01, 0x01]);
    }
}
