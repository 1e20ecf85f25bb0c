use crate::error::{Error, Result};
use crate::tls::constants::{IV_LEN, KEY_LEN};
use ring::aead;

/// AES-128-GCM key bound to a traffic IV. The nonce for each record is the
/// IV XORed with the big-endian sequence number.
pub struct AeadKey {
    key: aead::LessSafeKey,
    iv: [u8; IV_LEN],
}

impl AeadKey {
    pub fn new(key_material: &[u8], iv: &[u8]) -> Result<Self> {
        if key_material.len() != KEY_LEN || iv.len() != IV_LEN {
            return Err(Error::CryptoError(format!(
                "Invalid key/iv length {}/{}, expected {}/{}",
                key_material.len(),
                iv.len(),
                KEY_LEN,
                IV_LEN
            )));
        }

        let unbound_key = aead::UnboundKey::new(&aead::AES_128_GCM, key_material)
            .map_err(|_| Error::CryptoError("Failed to create AEAD key".to_string()))?;

        let mut fixed_iv = [0u8; IV_LEN];
        fixed_iv.copy_from_slice(iv);

        Ok(Self {
            key: aead::LessSafeKey::new(unbound_key),
            iv: fixed_iv,
        })
    }

    fn nonce(&self, sequence: u64) -> aead::Nonce {
        let mut nonce = self.iv;
        for (n, s) in nonce[IV_LEN - 8..].iter_mut().zip(sequence.to_be_bytes()) {
            *n ^= s;
        }
        aead::Nonce::assume_unique_for_key(nonce)
    }

    /// Returns ciphertext with the tag appended.
    pub fn seal(&self, sequence: u64, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(self.nonce(sequence), aead::Aad::from(aad), &mut in_out)
            .map_err(|_| Error::CryptoError("AEAD encryption failed".to_string()))?;
        Ok(in_out)
    }

    pub fn open(&self, sequence: u64, aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let mut in_out = ciphertext.to_vec();
        let plaintext_len = self
            .key
            .open_in_place(self.nonce(sequence), aead::Aad::from(aad), &mut in_out)
            .map_err(|_| Error::BadRecordMac)?
            .len();

        in_out.truncate(plaintext_len);
        Ok(in_out)
    }
}
