use crate::crypto::hkdf;
use crate::error::Result;
use crate::handshake::{HandshakeMessage, HandshakeType};
use crate::tls::constants::HASH_LEN;
use crate::utils;

#[derive(Debug, Clone)]
pub struct Finished {
    pub verify_data: Vec<u8>,
}

impl Finished {
    pub fn new(verify_data: Vec<u8>) -> Self {
        Self { verify_data }
    }

    /// verify_data = HMAC(finished_key, transcript_hash)
    pub fn compute(finished_key: &[u8], transcript_hash: &[u8]) -> Self {
        Self::new(hkdf::hmac_sha256(finished_key, transcript_hash))
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        let verify_data = utils::read_bytes(data, pos, HASH_LEN)?.to_vec();
        utils::expect_end(data, *pos, "Finished")?;
        Ok(Self { verify_data })
    }

    pub fn verify(&self, finished_key: &[u8], transcript_hash: &[u8]) -> bool {
        hkdf::verify_hmac_sha256(finished_key, transcript_hash, &self.verify_data)
    }
}

impl HandshakeMessage for Finished {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::Finished
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(self.verify_data.clone())
    }
}
