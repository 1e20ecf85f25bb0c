// Cryptographic building blocks on top of ring
pub mod aead;
pub mod hkdf;
pub mod key_exchange;
pub mod transcript;

pub use aead::AeadKey;
pub use key_exchange::KeyPair;
pub use transcript::TranscriptHash;
