use crate::error::Result;
use crate::handshake::{HandshakeMessage, HandshakeType};
use crate::utils;

/// The server's CertificateVerify. Only decoded; checking the signature
/// belongs to certificate validation, which this client leaves to the caller.
#[derive(Debug, Clone)]
pub struct CertificateVerify {
    pub algorithm: u16,
    pub signature: Vec<u8>,
}

impl CertificateVerify {
    pub fn new(algorithm: u16, signature: Vec<u8>) -> Self {
        Self {
            algorithm,
            signature,
        }
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let algorithm = utils::read_u16(data, pos)?;
        let signature = utils::read_vector_u16(data, pos)?.to_vec();
        utils::expect_end(data, *pos, "CertificateVerify")?;
        Ok(Self {
            algorithm,
            signature,
        })
    }
}

impl HandshakeMessage for CertificateVerify {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::CertificateVerify
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut result = Vec::with_capacity(4 + self.signature.len());
        utils::write_u16(&mut result, self.algorithm);
        utils::write_vector_u16(&mut result, &self.signature)?;
        Ok(result)
    }
}
