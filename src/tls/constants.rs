// TLS Protocol Constants

// TLS 1.3 Version
pub const TLS13: u16 = 0x0304;

// Legacy version identifiers
pub const TLS12: u16 = 0x0303;
pub const TLS10: u16 = 0x0301;

// legacy_record_version: 0x0301 is only used for the ClientHello record
pub const CLIENT_HELLO_RECORD_VERSION: u16 = TLS10;
pub const LEGACY_VERSION: u16 = TLS12;

// Sizes
pub const RECORD_HEADER_LEN: usize = 5;
pub const HANDSHAKE_HEADER_LEN: usize = 4;
pub const MAX_PLAINTEXT_LEN: usize = 16384;
pub const MAX_CIPHERTEXT_LEN: usize = MAX_PLAINTEXT_LEN + 256;
// Handshake bodies must fit a 16-bit length
pub const MAX_HANDSHAKE_SIZE: usize = 0xFFFF;

// Fragment length negotiated with max_fragment_length = 1 (2^9)
pub const SMALL_FRAGMENT_LEN: usize = 512;

// RFC 8446 §5.5 allows about 2^24.5 AES-GCM records per key; stay well below
pub const DEFAULT_MAX_RECORDS_PER_KEY: u64 = 20_000_000;

// AES-128-GCM / SHA-256
pub const KEY_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const HASH_LEN: usize = 32;
