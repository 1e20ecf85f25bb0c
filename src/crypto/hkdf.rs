// HKDF (RFC 5869) and the TLS 1.3 labelled expansion, SHA-256 only
use crate::error::{Error, Result};
use crate::tls::constants::HASH_LEN;
use crate::utils;
use ring::hmac;

const LABEL_PREFIX: &[u8] = b"tls13 ";

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

/// Constant-time HMAC check.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::verify(&key, data, tag).is_ok()
}

// An absent salt is a string of HashLen zeros, which HMAC treats like an empty key.
pub fn extract(salt: &[u8], ikm: &[u8]) -> Vec<u8> {
    hmac_sha256(salt, ikm)
}

pub fn expand(prk: &[u8], info: &[u8], output_len: usize) -> Result<Vec<u8>> {
    let n = output_len.div_ceil(HASH_LEN);
    if n > 255 {
        return Err(Error::CryptoError("HKDF output length too large".to_string()));
    }

    let key = hmac::Key::new(hmac::HMAC_SHA256, prk);
    let mut output = Vec::with_capacity(n * HASH_LEN);
    let mut t: Vec<u8> = Vec::new();

    for i in 1..=n {
        let mut ctx = hmac::Context::with_key(&key);
        ctx.update(&t);
        ctx.update(info);
        ctx.update(&[i as u8]);
        t = ctx.sign().as_ref().to_vec();
        output.extend_from_slice(&t);
    }

    output.truncate(output_len);
    Ok(output)
}

pub struct HkdfLabel<'a> {
    pub length: u16,
    pub label: &'a [u8],
    pub context: &'a [u8],
}

impl<'a> HkdfLabel<'a> {
    pub fn new(length: u16, label: &'a [u8], context: &'a [u8]) -> Self {
        Self {
            length,
            label,
            context,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let full_label = [LABEL_PREFIX, self.label].concat();

        let mut result = Vec::with_capacity(4 + full_label.len() + self.context.len());
        utils::write_u16(&mut result, self.length);
        utils::write_vector_u8(&mut result, &full_label)?;
        utils::write_vector_u8(&mut result, self.context)?;
        Ok(result)
    }
}

/// HKDF-Expand-Label from RFC 8446 §7.1.
pub fn expand_label(secret: &[u8], label: &[u8], context: &[u8], length: usize) -> Result<Vec<u8>> {
    let length16 = u16::try_from(length)
        .map_err(|_| Error::CryptoError(format!("Label output length {} too large", length)))?;
    let info = HkdfLabel::new(length16, label, context).encode()?;
    expand(secret, &info, length)
}

/// Derive-Secret: the context is an already computed transcript hash.
pub fn derive_secret(secret: &[u8], label: &[u8], transcript_hash: &[u8]) -> Result<Vec<u8>> {
    expand_label(secret, label, transcript_hash, HASH_LEN)
}
