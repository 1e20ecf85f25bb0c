// TLS 1.3 key schedule (RFC 8446 §7.1) for TLS_AES_128_GCM_SHA256
use crate::crypto::hkdf;
use crate::error::{Error, Result};
use crate::tls::constants::{HASH_LEN, IV_LEN, KEY_LEN};
use crate::utils;
use log::trace;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const LABEL_DERIVED: &[u8] = b"derived";
const LABEL_C_HS_TRAFFIC: &[u8] = b"c hs traffic";
const LABEL_S_HS_TRAFFIC: &[u8] = b"s hs traffic";
const LABEL_C_AP_TRAFFIC: &[u8] = b"c ap traffic";
const LABEL_S_AP_TRAFFIC: &[u8] = b"s ap traffic";
const LABEL_KEY: &[u8] = b"key";
const LABEL_IV: &[u8] = b"iv";
const LABEL_FINISHED: &[u8] = b"finished";
const LABEL_TRAFFIC_UPDATE: &[u8] = b"traffic upd";

// SHA-256 of the empty string
const EMPTY_HASH_SHA256: [u8; HASH_LEN] = [
    0xE3, 0xB0, 0xC4, 0x42, 0x98, 0xFC, 0x1C, 0x14, 0x9A, 0xFB, 0xF4, 0xC8, 0x99, 0x6F, 0xB9, 0x24,
    0x27, 0xAE, 0x41, 0xE4, 0x64, 0x9B, 0x93, 0x4C, 0xA4, 0x95, 0x99, 0x1B, 0x78, 0x52, 0xB8, 0x55,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Client,
    Server,
}

/// One direction's traffic secret with the key and IV derived from it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct TrafficKeys {
    secret: Vec<u8>,
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl TrafficKeys {
    pub fn from_secret(secret: Vec<u8>) -> Result<Self> {
        let key = hkdf::expand_label(&secret, LABEL_KEY, &[], KEY_LEN)?;
        let iv = hkdf::expand_label(&secret, LABEL_IV, &[], IV_LEN)?;
        Ok(Self { secret, key, iv })
    }

    /// application_traffic_secret_N+1 (RFC 8446 §7.2).
    pub fn next_generation(&self) -> Result<Self> {
        let secret = hkdf::expand_label(&self.secret, LABEL_TRAFFIC_UPDATE, &[], HASH_LEN)?;
        Self::from_secret(secret)
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initial,
    Handshake,
    Application,
}

pub struct KeySchedule {
    stage: Stage,
    handshake_secret: Option<Zeroizing<Vec<u8>>>,
    client: Option<TrafficKeys>,
    server: Option<TrafficKeys>,
}

impl KeySchedule {
    pub fn new() -> Self {
        Self {
            stage: Stage::Initial,
            handshake_secret: None,
            client: None,
            server: None,
        }
    }

    /// Derives the handshake traffic keys from the ECDH shared secret and
    /// Hash(ClientHello..ServerHello).
    pub fn compute_handshake_keys(&mut self, shared_secret: &[u8], transcript_hash: &[u8]) -> Result<()> {
        if self.stage != Stage::Initial {
            return Err(Error::InvalidState("Handshake keys already computed".to_string()));
        }

        let early_secret = Zeroizing::new(hkdf::extract(&[], &[0u8; HASH_LEN]));
        let derived = Zeroizing::new(hkdf::derive_secret(&early_secret, LABEL_DERIVED, &EMPTY_HASH_SHA256)?);
        let handshake_secret = Zeroizing::new(hkdf::extract(&derived, shared_secret));

        let client_secret = hkdf::derive_secret(&handshake_secret, LABEL_C_HS_TRAFFIC, transcript_hash)?;
        let server_secret = hkdf::derive_secret(&handshake_secret, LABEL_S_HS_TRAFFIC, transcript_hash)?;

        self.client = Some(TrafficKeys::from_secret(client_secret)?);
        self.server = Some(TrafficKeys::from_secret(server_secret)?);
        self.handshake_secret = Some(handshake_secret);
        self.stage = Stage::Handshake;
        trace!("handshake keys derived, hash {}", utils::fingerprint(transcript_hash));
        Ok(())
    }

    /// Derives the application traffic keys from Hash(ClientHello..server Finished).
    /// The handshake secret is dropped afterwards.
    pub fn compute_application_keys(&mut self, transcript_hash: &[u8]) -> Result<()> {
        let handshake_secret = match (self.stage, self.handshake_secret.take()) {
            (Stage::Handshake, Some(secret)) => secret,
            _ => {
                return Err(Error::InvalidState(
                    "Application keys need the handshake secret".to_string(),
                ))
            }
        };

        let derived = Zeroizing::new(hkdf::derive_secret(&handshake_secret, LABEL_DERIVED, &EMPTY_HASH_SHA256)?);
        let master_secret = Zeroizing::new(hkdf::extract(&derived, &[0u8; HASH_LEN]));

        let client_secret = hkdf::derive_secret(&master_secret, LABEL_C_AP_TRAFFIC, transcript_hash)?;
        let server_secret = hkdf::derive_secret(&master_secret, LABEL_S_AP_TRAFFIC, transcript_hash)?;

        self.client = Some(TrafficKeys::from_secret(client_secret)?);
        self.server = Some(TrafficKeys::from_secret(server_secret)?);
        self.stage = Stage::Application;
        trace!("application keys derived, hash {}", utils::fingerprint(transcript_hash));
        Ok(())
    }

    /// Ratchets one direction forward. The previous keys are dropped.
    pub fn update_keys(&mut self, direction: Direction) -> Result<()> {
        if self.stage != Stage::Application {
            return Err(Error::InvalidState(
                "Key update before application keys".to_string(),
            ));
        }
        let slot = match direction {
            Direction::Client => &mut self.client,
            Direction::Server => &mut self.server,
        };
        let next = slot
            .as_ref()
            .ok_or_else(|| Error::InvalidState("No traffic keys to update".to_string()))?
            .next_generation()?;
        *slot = Some(next);
        trace!("{:?} traffic keys updated", direction);
        Ok(())
    }

    /// finished_key for the current traffic secret of `direction`. Only
    /// meaningful while the handshake traffic secrets are installed.
    pub fn finished_key(&self, direction: Direction) -> Result<Zeroizing<Vec<u8>>> {
        if self.stage != Stage::Handshake {
            return Err(Error::InvalidState(
                "Finished key outside the handshake".to_string(),
            ));
        }
        let keys = self.keys(direction)?;
        Ok(Zeroizing::new(hkdf::expand_label(keys.secret(), LABEL_FINISHED, &[], HASH_LEN)?))
    }

    pub fn keys(&self, direction: Direction) -> Result<&TrafficKeys> {
        let keys = match direction {
            Direction::Client => self.client.as_ref(),
            Direction::Server => self.server.as_ref(),
        };
        keys.ok_or_else(|| Error::InvalidState("Traffic keys not derived yet".to_string()))
    }

    pub fn client_keys(&self) -> Option<&TrafficKeys> {
        self.client.as_ref()
    }

    pub fn server_keys(&self) -> Option<&TrafficKeys> {
        self.server.as_ref()
    }

    pub fn has_application_keys(&self) -> bool {
        self.stage == Stage::Application
    }
}

impl Default for KeySchedule {
    fn default() -> Self {
        Self::new()
    }
}
