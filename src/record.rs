use crate::error::{Error, Result};
use crate::tls::constants::{MAX_CIPHERTEXT_LEN, RECORD_HEADER_LEN};
use crate::tls::types::AlertDescription;
use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl TryFrom<u8> for ContentType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            20 => Ok(ContentType::ChangeCipherSpec),
            21 => Ok(ContentType::Alert),
            22 => Ok(ContentType::Handshake),
            23 => Ok(ContentType::ApplicationData),
            _ => Err(Error::alert(
                AlertDescription::UnexpectedMessage,
                format!("Invalid ContentType value: {}", value),
            )),
        }
    }
}

/// The 5-byte header in front of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    pub legacy_version: u16,
    pub length: usize,
}

impl RecordHeader {
    /// Parses a header from the first five bytes of `data`.
    ///
    /// Only the type byte is validated here; length limits depend on the
    /// receiver's buffer and are checked by the caller.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < RECORD_HEADER_LEN {
            return Err(Error::ParseError("Record header too short".to_string()));
        }
        let mut pos = 0;
        let content_type = ContentType::try_from(utils::read_u8(data, &mut pos)?)?;
        let legacy_version = utils::read_u16(data, &mut pos)?;
        let length = utils::read_u16(data, &mut pos)? as usize;

        Ok(Self {
            content_type,
            legacy_version,
            length,
        })
    }

    pub fn total_len(&self) -> usize {
        RECORD_HEADER_LEN + self.length
    }
}

/// Frames `payload` as a single record.
pub fn encode_record(content_type: ContentType, legacy_version: u16, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_CIPHERTEXT_LEN {
        return Err(Error::RecordOver16K(payload.len()));
    }

    let mut result = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
    utils::write_u8(&mut result, content_type as u8);
    utils::write_u16(&mut result, legacy_version);
    utils::write_vector_u16(&mut result, payload)?;
    Ok(result)
}
