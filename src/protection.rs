// AEAD record protection (RFC 8446 §5.2)
use crate::crypto::AeadKey;
use crate::error::{Error, Result};
use crate::key_schedule::TrafficKeys;
use crate::record::ContentType;
use crate::tls::constants::{LEGACY_VERSION, MAX_PLAINTEXT_LEN, TAG_LEN};
use crate::utils;
use log::trace;

struct DirectionState {
    key: AeadKey,
    sequence: u64,
}

impl DirectionState {
    fn new(keys: &TrafficKeys) -> Result<Self> {
        Ok(Self {
            key: AeadKey::new(keys.key(), keys.iv())?,
            sequence: 0,
        })
    }

    fn advance(&mut self) -> Result<()> {
        self.sequence = self
            .sequence
            .checked_add(1)
            .ok_or_else(|| Error::CryptoError("Record sequence number exhausted".to_string()))?;
        Ok(())
    }
}

fn additional_data(ciphertext_len: usize) -> Result<[u8; 5]> {
    let len = u16::try_from(ciphertext_len)
        .map_err(|_| Error::RecordOver16K(ciphertext_len))?
        .to_be_bytes();
    let version = LEGACY_VERSION.to_be_bytes();
    Ok([ContentType::ApplicationData as u8, version[0], version[1], len[0], len[1]])
}

/// Per-direction AEAD state. Sequence numbers start at zero whenever keys
/// are installed and advance only after a record was processed successfully.
pub struct RecordProtection {
    write: DirectionState,
    read: DirectionState,
}

impl RecordProtection {
    pub fn new(write: &TrafficKeys, read: &TrafficKeys) -> Result<Self> {
        Ok(Self {
            write: DirectionState::new(write)?,
            read: DirectionState::new(read)?,
        })
    }

    /// Encrypts one TLSInnerPlaintext and returns the record payload
    /// (ciphertext followed by the tag).
    pub fn encrypt(&mut self, content_type: ContentType, plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = self.seal(content_type, plaintext)?;
        self.commit_write()?;
        Ok(sealed)
    }

    /// Like `encrypt` but leaves the write sequence where it is. The caller
    /// calls `commit_write` once the record was actually handed off; a record
    /// that never left may be sealed again under the same sequence.
    pub fn seal(&self, content_type: ContentType, plaintext: &[u8]) -> Result<Vec<u8>> {
        if plaintext.len() > MAX_PLAINTEXT_LEN {
            return Err(Error::RecordOver16K(plaintext.len()));
        }

        let mut inner = Vec::with_capacity(plaintext.len() + 1 + TAG_LEN);
        inner.extend_from_slice(plaintext);
        inner.push(content_type as u8);

        let aad = additional_data(inner.len() + TAG_LEN)?;
        let sealed = self.write.key.seal(self.write.sequence, &aad, &inner)?;
        trace!("sealed {:?} record, seq {}", content_type, self.write.sequence);
        Ok(sealed)
    }

    pub fn commit_write(&mut self) -> Result<()> {
        self.write.advance()
    }

    /// Opens an ApplicationData-typed record payload and splits off the real
    /// content type after stripping zero padding.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<(ContentType, Vec<u8>)> {
        if ciphertext.len() < TAG_LEN {
            return Err(Error::BadRecordMac);
        }

        let aad = additional_data(ciphertext.len())?;
        let mut inner = self.read.key.open(self.read.sequence, &aad, ciphertext)?;

        let type_pos = inner
            .iter()
            .rposition(|b| *b != 0)
            .ok_or(Error::EmptyInnerPlaintext)?;
        let content_type = ContentType::try_from(inner[type_pos])?;
        inner.truncate(type_pos);

        if inner.len() > MAX_PLAINTEXT_LEN {
            return Err(Error::RecordOver16K(inner.len()));
        }

        trace!(
            "opened {:?} record, seq {}, {}",
            content_type,
            self.read.sequence,
            utils::fingerprint(&inner)
        );
        self.read.advance()?;
        Ok((content_type, inner))
    }

    pub fn install_write_keys(&mut self, keys: &TrafficKeys) -> Result<()> {
        self.write = DirectionState::new(keys)?;
        Ok(())
    }

    pub fn install_read_keys(&mut self, keys: &TrafficKeys) -> Result<()> {
        self.read = DirectionState::new(keys)?;
        Ok(())
    }

    pub fn write_sequence(&self) -> u64 {
        self.write.sequence
    }

    pub fn read_sequence(&self) -> u64 {
        self.read.sequence
    }
}
