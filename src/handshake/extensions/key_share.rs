use crate::error::{Error, Result};
use crate::handshake::extensions::{Extension, ExtensionType};
use crate::utils;
use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedGroup {
    Secp256r1 = 0x0017,
    Secp384r1 = 0x0018,
    Secp521r1 = 0x0019,
    X25519 = 0x001D,
    X448 = 0x001E,
}

impl TryFrom<u16> for NamedGroup {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0x0017 => Ok(NamedGroup::Secp256r1),
            0x0018 => Ok(NamedGroup::Secp384r1),
            0x0019 => Ok(NamedGroup::Secp521r1),
            0x001D => Ok(NamedGroup::X25519),
            0x001E => Ok(NamedGroup::X448),
            _ => Err(Error::ParseError(format!("Invalid NamedGroup value: {:#06x}", value))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: u16,
    pub key_exchange: Vec<u8>,
}

impl KeyShareEntry {
    pub fn new(group: NamedGroup, key_exchange: Vec<u8>) -> Self {
        Self {
            group: group as u16,
            key_exchange,
        }
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let group = utils::read_u16(data, pos)?;
        let key_exchange = utils::read_vector_u16(data, pos)?.to_vec();
        Ok(Self { group, key_exchange })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) -> Result<()> {
        utils::write_u16(out, self.group);
        utils::write_vector_u16(out, &self.key_exchange)
    }

    /// ClientHello form: a u16 length-prefixed list of entries.
    pub fn client_extension(entries: &[KeyShareEntry]) -> Result<Extension> {
        let mut list = Vec::new();
        for entry in entries {
            entry.serialize(&mut list)?;
        }
        let mut data = Vec::with_capacity(2 + list.len());
        utils::write_vector_u16(&mut data, &list)?;
        Ok(Extension::new(ExtensionType::KeyShare, data))
    }

    /// ServerHello form: exactly one entry.
    pub fn parse_server(extension: &Extension) -> Result<Self> {
        let mut pos = 0;
        let entry = Self::parse(&extension.data, &mut pos)?;
        utils::expect_end(&extension.data, pos, "ServerHello key_share")?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_key_share() {
        let extension = Extension::new(ExtensionType::KeyShare, vec![0x00, 0x17, 0x00, 0x03, 0x04, 0x01, 0x02]);
        let entry = KeyShareEntry::parse_server(&extension).unwrap();

        assert_eq!(NamedGroup::try_from(entry.group).unwrap(), NamedGroup::Secp256r1);
        assert_eq!(entry.key_exchange, vec![0x04, 0x01, 0x02]);
    }

    #[test]
    fn test_client_key_share_list() {
        let entry = KeyShareEntry::new(NamedGroup::Secp256r1, vec![0x04, 0xAA]);
        let extension = KeyShareEntry::client_extension(&[entry]).unwrap();

        assert!(extension.is(ExtensionType::KeyShare));
        assert_eq!(extension.data, vec![0x00, 0x06, 0x00, 0x17, 0x00, 0x02, 0x04, 0xAA]);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let extension = Extension::new(ExtensionType::KeyShare, vec![0x00, 0x17, 0x00, 0x01, 0x04, 0xFF]);
        assert!(KeyShareEntry::parse_server(&extension).is_err());
    }
}
