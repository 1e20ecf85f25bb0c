use crate::error::{Error, Result};
use crate::tls::types::{AlertDescription, AlertLevel};
use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub fn new(level: AlertLevel, description: AlertDescription) -> Self {
        Self { level, description }
    }

    /// Alert with the level we use when sending `description`.
    pub fn outgoing(description: AlertDescription) -> Self {
        Self::new(description.level(), description)
    }

    pub fn parse(data: &[u8], pos: &mut usize) -> Result<Self> {
        if *pos + 2 > data.len() {
            return Err(Error::ParseError("Alert message truncated".to_string()));
        }

        // Unlisted codes are kept as they are; the receiver closes either way
        let level = AlertLevel::from(utils::read_u8(data, pos)?);
        let description = AlertDescription::from(utils::read_u8(data, pos)?);

        Ok(Self { level, description })
    }

    pub fn serialize(&self) -> Vec<u8> {
        vec![self.level.code(), self.description.code()]
    }

}
