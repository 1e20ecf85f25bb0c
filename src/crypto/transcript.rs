use crate::error::{Error, Result};
use ring::digest::{Context, SHA256};

/// Running SHA-256 over the wire bytes (header + body) of every handshake
/// message since ClientHello.
pub struct TranscriptHash {
    context: Context,
    frozen: bool,
}

impl TranscriptHash {
    pub fn new() -> Self {
        Self {
            context: Context::new(&SHA256),
            frozen: false,
        }
    }

    pub fn append(&mut self, message: &[u8]) -> Result<()> {
        if self.frozen {
            return Err(Error::InvalidState(
                "Handshake transcript is frozen".to_string(),
            ));
        }
        self.context.update(message);
        Ok(())
    }

    pub fn current_hash(&self) -> Vec<u8> {
        self.context.clone().finish().as_ref().to_vec()
    }

    /// No further messages are accepted once application keys exist.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}

impl Default for TranscriptHash {
    fn default() -> Self {
        Self::new()
    }
}
