// Ephemeral P-256 key exchange
use crate::error::{Error, Result};
use crate::tls::types::AlertDescription;
use ring::{agreement, rand};
use zeroize::Zeroizing;

/// Uncompressed SEC1 point: 0x04 || X || Y.
pub const P256_PUBLIC_KEY_LEN: usize = 65;

pub struct KeyPair {
    private_key: agreement::EphemeralPrivateKey,
    public_key: Vec<u8>,
}

impl KeyPair {
    pub fn generate() -> Result<Self> {
        let rng = rand::SystemRandom::new();

        let private_key = agreement::EphemeralPrivateKey::generate(&agreement::ECDH_P256, &rng)
            .map_err(|_| Error::CryptoError("Failed to generate P-256 private key".to_string()))?;

        let public_key = private_key
            .compute_public_key()
            .map_err(|_| Error::CryptoError("Failed to compute P-256 public key".to_string()))?
            .as_ref()
            .to_vec();

        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Consumes the private key. A peer key that is not a valid point is an
    /// illegal_parameter condition.
    pub fn agree(self, peer_public_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if peer_public_key.len() != P256_PUBLIC_KEY_LEN {
            return Err(Error::alert(
                AlertDescription::IllegalParameter,
                format!("P-256 key share has length {}", peer_public_key.len()),
            ));
        }

        let peer = agreement::UnparsedPublicKey::new(&agreement::ECDH_P256, peer_public_key);
        agreement::agree_ephemeral(self.private_key, &peer, |secret| Zeroizing::new(secret.to_vec()))
            .map_err(|_| {
                Error::alert(
                    AlertDescription::IllegalParameter,
                    "Server key share is not a valid P-256 point",
                )
            })
    }
}
