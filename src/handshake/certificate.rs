use crate::error::{Error, Result};
use crate::handshake::extensions::{parse_extensions, serialize_extensions, Extension};
use crate::handshake::{HandshakeMessage, HandshakeType};
use crate::utils;

#[derive(Debug, Clone)]
pub struct CertificateEntry {
    pub cert_data: Vec<u8>,
    pub extensions: Vec<Extension>,
}

impl CertificateEntry {
    pub fn new(cert_data: Vec<u8>) -> Self {
        Self {
            cert_data,
            extensions: Vec::new(),
        }
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let cert_data = utils::read_vector_u24(data, pos)?.to_vec();
        if cert_data.is_empty() {
            return Err(Error::ParseError("Empty certificate entry".to_string()));
        }
        let extensions = parse_extensions(data, pos)?;
        Ok(Self {
            cert_data,
            extensions,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) -> Result<()> {
        utils::write_vector_u24(out, &self.cert_data)?;
        serialize_extensions(out, &self.extensions)
    }
}

#[derive(Debug, Clone)]
pub struct Certificate {
    pub cert_request_context: Vec<u8>,
    pub certificate_list: Vec<CertificateEntry>,
}

impl Certificate {
    pub fn new(cert_request_context: Vec<u8>, certificate_list: Vec<CertificateEntry>) -> Self {
        Self {
            cert_request_context,
            certificate_list,
        }
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let cert_request_context = utils::read_vector_u8(data, pos)?.to_vec();

        let list = utils::read_vector_u24(data, pos)?;
        let mut inner = 0;
        let mut certificate_list = Vec::new();
        while inner < list.len() {
            certificate_list.push(CertificateEntry::parse(list, &mut inner)?);
        }
        utils::expect_end(data, *pos, "Certificate")?;

        Ok(Self {
            cert_request_context,
            certificate_list,
        })
    }
}

impl HandshakeMessage for Certificate {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::Certificate
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        utils::write_vector_u8(&mut result, &self.cert_request_context)?;

        let mut list = Vec::new();
        for entry in &self.certificate_list {
            entry.serialize(&mut list)?;
        }
        utils::write_vector_u24(&mut result, &list)?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_certificate_list_parsing() {
        let data = [
            0x00, // empty request context
            0x00, 0x00, 0x0E, // list length
            0x00, 0x00, 0x02, 0xAA, 0xBB, 0x00, 0x00, // entry 1
            0x00, 0x00, 0x01, 0xCC, 0x00, 0x00, 0x00, // entry 2 and a stray byte
        ];
        assert!(Certificate::parse(&data, &mut 0).is_err());

        let data = [
            0x00,
            0x00, 0x00, 0x0D,
            0x00, 0x00, 0x02, 0xAA, 0xBB, 0x00, 0x00,
            0x00, 0x00, 0x01, 0xCC, 0x00, 0x00,
        ];
        let certificate = Certificate::parse(&data, &mut 0).unwrap();
        assert_eq!(certificate.certificate_list.len(), 2);
        assert_eq!(certificate.certificate_list[0].cert_data, vec![0xAA, 0xBB]);
        assert_eq!(certificate.certificate_list[1].cert_data, vec![0xCC]);
    }

    #[test]
    fn test_entry_extensions_are_skipped() {
        let data = [
            0x00,
            0x00, 0x00, 0x0A,
            0x00, 0x00, 0x01, 0xAA,
            0x00, 0x04, 0x00, 0x05, 0x00, 0x00, // status_request, empty
        ];
        let certificate = Certificate::parse(&data, &mut 0).unwrap();
        assert_eq!(certificate.certificate_list[0].cert_data, vec![0xAA]);
        assert_eq!(certificate.certificate_list[0].extensions.len(), 1);
    }

    #[test]
    fn test_empty_certificate_message() {
        let wire = Certificate::new(Vec::new(), Vec::new()).to_wire().unwrap();
        assert_eq!(wire, vec![11, 0, 0, 4, 0, 0, 0, 0]);
    }
}
