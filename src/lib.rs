pub mod alert;
pub mod certificate;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod key_schedule;
pub mod protection;
pub mod receiver;
pub mod record;
pub mod state;
pub mod tls;
pub mod transport;
pub mod utils;

pub use connection::{RecordObserver, TlsClientConnection};
pub use error::{Error, Result};
pub use state::ConnectionState;
pub use tls::types::AlertDescription;
pub use transport::{MemoryTransport, TcpTransport, Transport};

use tls::constants::{DEFAULT_MAX_RECORDS_PER_KEY, MAX_CIPHERTEXT_LEN};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init_logging() {
    let _ = env_logger::builder().try_init();
}

pub struct TlsClientParams {
    /// Sent in a server_name extension when set.
    pub server_name: Option<String>,
    /// Capacity of the record reassembly buffer. Records larger than this
    /// are rejected even when the protocol would allow them.
    pub receive_buffer_size: usize,
    /// Records sent under one client key before it is updated.
    pub max_records_per_key: u64,
    /// Ask the server for 512-byte records.
    pub request_max_fragment_length: bool,
}

impl Default for TlsClientParams {
    fn default() -> Self {
        Self {
            server_name: None,
            receive_buffer_size: MAX_CIPHERTEXT_LEN,
            max_records_per_key: DEFAULT_MAX_RECORDS_PER_KEY,
            request_max_fragment_length: false,
        }
    }
}
