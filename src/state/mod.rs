pub mod client;

pub use client::HandshakeProgress;

/// Lifecycle of a client connection. `LocallyClosed` and `RemotelyClosed`
/// are the two half-closed states reached from `Established`; both end in
/// `FullClosed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initial,
    Handshake,
    Established,
    LocallyClosed,
    RemotelyClosed,
    FullClosed,
}

impl ConnectionState {
    pub fn can_send(self) -> bool {
        matches!(self, ConnectionState::Established | ConnectionState::RemotelyClosed)
    }

    pub fn can_receive(self) -> bool {
        matches!(self, ConnectionState::Established | ConnectionState::LocallyClosed)
    }

    /// States in which records are still read from the transport.
    pub fn reads_records(self) -> bool {
        self == ConnectionState::Handshake || self.can_receive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_receive_predicates() {
        use ConnectionState::*;

        let senders: Vec<_> = [Initial, Handshake, Established, LocallyClosed, RemotelyClosed, FullClosed]
            .into_iter()
            .filter(|s| s.can_send())
            .collect();
        assert_eq!(senders, vec![Established, RemotelyClosed]);

        let receivers: Vec<_> = [Initial, Handshake, Established, LocallyClosed, RemotelyClosed, FullClosed]
            .into_iter()
            .filter(|s| s.can_receive())
            .collect();
        assert_eq!(receivers, vec![Established, LocallyClosed]);

        assert!(Handshake.reads_records());
        assert!(!RemotelyClosed.reads_records());
    }
}
