use crate::error::{Error, Result};
use crate::handshake::extensions::{find_extension, parse_extensions, serialize_extensions, Extension, ExtensionType};
use crate::handshake::{HandshakeMessage, HandshakeType};
use crate::tls::constants::SMALL_FRAGMENT_LEN;
use crate::tls::types::AlertDescription;
use crate::utils;

#[derive(Debug, Clone)]
pub struct EncryptedExtensions {
    pub extensions: Vec<Extension>,
}

impl EncryptedExtensions {
    pub fn new(extensions: Vec<Extension>) -> Self {
        Self { extensions }
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let extensions = parse_extensions(data, pos)?;
        utils::expect_end(data, *pos, "EncryptedExtensions")?;
        Ok(Self { extensions })
    }

    pub fn get_extension(&self, extension_type: ExtensionType) -> Option<&Extension> {
        find_extension(&self.extensions, extension_type)
    }

    /// The negotiated record size cap. Only the 2^9 code is accepted since it
    /// is the only one this client ever requests. Other extensions are ignored.
    pub fn max_fragment_length(&self) -> Result<Option<usize>> {
        match self.get_extension(ExtensionType::MaxFragmentLength) {
            None => Ok(None),
            Some(extension) if extension.data == [1] => Ok(Some(SMALL_FRAGMENT_LEN)),
            Some(extension) => Err(Error::alert(
                AlertDescription::IllegalParameter,
                format!("Unsupported max_fragment_length value {:?}", extension.data),
            )),
        }
    }
}

impl HandshakeMessage for EncryptedExtensions {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::EncryptedExtensions
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        serialize_extensions(&mut result, &self.extensions)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_fragment_length() {
        let none = EncryptedExtensions::parse(&[0x00, 0x00], &mut 0).unwrap();
        assert_eq!(none.max_fragment_length().unwrap(), None);

        let small = EncryptedExtensions::parse(&[0x00, 0x05, 0x00, 0x01, 0x00, 0x01, 0x01], &mut 0).unwrap();
        assert_eq!(small.max_fragment_length().unwrap(), Some(512));

        let other = EncryptedExtensions::parse(&[0x00, 0x05, 0x00, 0x01, 0x00, 0x01, 0x02], &mut 0).unwrap();
        assert_eq!(
            other.max_fragment_length().unwrap_err().alert_description(),
            AlertDescription::IllegalParameter
        );
    }

    #[test]
    fn test_unknown_extensions_are_skipped() {
        let data = [0x00, 0x08, 0x00, 0x10, 0x00, 0x00, 0xFE, 0xFE, 0x00, 0x00];
        let ee = EncryptedExtensions::parse(&data, &mut 0).unwrap();
        assert_eq!(ee.extensions.len(), 2);
        assert_eq!(ee.max_fragment_length().unwrap(), None);
    }

    #[test]
    fn test_trailing_data() {
        assert!(EncryptedExtensions::parse(&[0x00, 0x00, 0x01], &mut 0).is_err());
    }
}
