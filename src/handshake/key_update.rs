use crate::error::{Error, Result};
use crate::handshake::{HandshakeMessage, HandshakeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUpdateRequest {
    UpdateNotRequested = 0,
    UpdateRequested = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUpdate {
    pub request_update: KeyUpdateRequest,
}

impl KeyUpdate {
    pub fn new(request_update: KeyUpdateRequest) -> Self {
        Self { request_update }
    }

    /// The body is exactly one byte holding 0 or 1; anything else is a
    /// decode_error.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let request_update = match data {
            [0] => KeyUpdateRequest::UpdateNotRequested,
            [1] => KeyUpdateRequest::UpdateRequested,
            _ => {
                return Err(Error::ParseError(format!(
                    "Invalid KeyUpdate body {:02x?}",
                    data
                )))
            }
        };
        Ok(Self { request_update })
    }
}

impl HandshakeMessage for KeyUpdate {
    fn message_type(&self) -> HandshakeType {
        HandshakeType::KeyUpdate
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(vec![self.request_update as u8])
    }
}
