use crate::error::Result;
use crate::handshake::extensions::{parse_extensions, serialize_extensions, Extension};
use crate::handshake::{HandshakeMessage, HandshakeType};
use crate::utils;

/// A server's request for a client certificate. This client never has one
/// to offer, so only the context is kept to be echoed in the empty
/// Certificate answer.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub certificate_request_context: Vec<u8>,
    pub extensions: Vec<Extension>,
}

impl CertificateRequest {
    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let certificate_request_context = utils::read_vector_u8(data, pos)?.to_vec();
        let extensions = parse_extensions(data, pos)?;
        utils::expect_end(data, *pos, "CertificateRequest")?;
        Ok(Self {
            certificate_request_context,
            extensions,
        })
    }
}

impl HandshakeMessage for CertificateRequest {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::CertificateRequest
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        utils::write_vector_u8(&mut result, &self.certificate_request_context)?;
        serialize_extensions(&mut result, &self.extensions)?;
        Ok(result)
    }
}
