// Record and handshake-message reassembly over a byte stream
use crate::error::{Error, Result};
use crate::handshake::HandshakeType;
use crate::protection::RecordProtection;
use crate::record::{ContentType, RecordHeader};
use crate::tls::constants::{HANDSHAKE_HEADER_LEN, MAX_CIPHERTEXT_LEN, MAX_HANDSHAKE_SIZE, RECORD_HEADER_LEN};
use crate::tls::types::AlertDescription;
use crate::transport::Transport;
use bytes::{Buf, Bytes, BytesMut};
use log::{debug, trace};

/// A complete handshake message: the 4-byte header and its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeData {
    pub header: [u8; HANDSHAKE_HEADER_LEN],
    pub body: Bytes,
}

impl HandshakeData {
    pub fn msg_type(&self) -> u8 {
        self.header[0]
    }

    /// Header followed by body, as hashed into the transcript.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HANDSHAKE_HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentPosition {
    First,
    Middle,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    NoChange,
    Record {
        content_type: ContentType,
        payload: Bytes,
    },
    HandshakeMessage(HandshakeData),
    HandshakeFragment {
        position: FragmentPosition,
        header: [u8; HANDSHAKE_HEADER_LEN],
        data: Bytes,
    },
}

/// What the connection consumes: records or fully assembled handshake messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Record {
        content_type: ContentType,
        payload: Bytes,
    },
    Handshake(HandshakeData),
}

struct InFlight {
    header: [u8; HANDSHAKE_HEADER_LEN],
    remaining: usize,
}

pub struct RecordReceiver {
    capacity: usize,
    buffer: BytesMut,
    // Unconsumed plaintext of the current Handshake record
    handshake_payload: Bytes,
    partial_header: Vec<u8>,
    in_flight: Option<InFlight>,
    assembly: Option<([u8; HANDSHAKE_HEADER_LEN], BytesMut)>,
    allow_interleave: bool,
}

impl RecordReceiver {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(RECORD_HEADER_LEN);
        Self {
            capacity,
            buffer: BytesMut::with_capacity(capacity),
            handshake_payload: Bytes::new(),
            partial_header: Vec::with_capacity(HANDSHAKE_HEADER_LEN),
            in_flight: None,
            assembly: None,
            allow_interleave: false,
        }
    }

    /// Once established, KeyUpdate and NewSessionTicket fragments may be
    /// interleaved with other records.
    pub fn set_allow_interleave(&mut self, allow: bool) {
        self.allow_interleave = allow;
    }

    /// True while undelivered bytes remain buffered.
    pub fn has_buffered_data(&self) -> bool {
        !self.buffer.is_empty() || !self.handshake_payload.is_empty()
    }

    /// Keys may only change on a record boundary with no handshake message
    /// partially consumed.
    pub fn at_record_boundary(&self) -> bool {
        self.handshake_payload.is_empty()
            && self.partial_header.is_empty()
            && self.in_flight.is_none()
            && self.assembly.is_none()
    }

    pub fn poll<T: Transport>(
        &mut self,
        transport: &mut T,
        mut protection: Option<&mut RecordProtection>,
    ) -> Result<ReceiveEvent> {
        loop {
            if !self.handshake_payload.is_empty() {
                if let Some(event) = self.next_handshake_event()? {
                    return Ok(event);
                }
                continue;
            }

            if let Some(record) = self.take_record()? {
                if let Some(event) = self.process_record(record, protection.as_deref_mut())? {
                    return Ok(event);
                }
                continue;
            }

            if !transport.has_data() {
                return Ok(ReceiveEvent::NoChange);
            }
            let room = self.capacity - self.buffer.len();
            let data = transport.receive(room);
            if data.is_empty() {
                return Ok(ReceiveEvent::NoChange);
            }
            trace!("received {} bytes from transport", data.len());
            self.buffer.extend_from_slice(&data);
        }
    }

    /// Polls until a record or a whole handshake message is available.
    pub fn next_message<T: Transport>(
        &mut self,
        transport: &mut T,
        mut protection: Option<&mut RecordProtection>,
    ) -> Result<Option<Received>> {
        loop {
            match self.poll(transport, protection.as_deref_mut())? {
                ReceiveEvent::NoChange => return Ok(None),
                ReceiveEvent::Record {
                    content_type,
                    payload,
                } => {
                    return Ok(Some(Received::Record {
                        content_type,
                        payload,
                    }))
                }
                ReceiveEvent::HandshakeMessage(data) => return Ok(Some(Received::Handshake(data))),
                ReceiveEvent::HandshakeFragment {
                    position,
                    header,
                    data,
                } => match position {
                    FragmentPosition::First => {
                        let mut body = BytesMut::new();
                        body.extend_from_slice(&data);
                        self.assembly = Some((header, body));
                    }
                    FragmentPosition::Middle | FragmentPosition::Last => {
                        let (_, body) = self.assembly.as_mut().ok_or_else(|| {
                            Error::InvalidState("Handshake fragment without a first part".to_string())
                        })?;
                        body.extend_from_slice(&data);
                        if position == FragmentPosition::Last {
                            if let Some((header, body)) = self.assembly.take() {
                                return Ok(Some(Received::Handshake(HandshakeData {
                                    header,
                                    body: body.freeze(),
                                })));
                            }
                        }
                    }
                },
            }
        }
    }

    fn take_record(&mut self) -> Result<Option<(RecordHeader, Bytes)>> {
        if self.buffer.len() < RECORD_HEADER_LEN {
            return Ok(None);
        }
        let header = RecordHeader::parse(&self.buffer[..RECORD_HEADER_LEN])?;
        let total = header.total_len();
        if total > self.capacity {
            return Err(Error::RecordTooLong {
                length: total,
                capacity: self.capacity,
            });
        }
        if header.length > MAX_CIPHERTEXT_LEN {
            return Err(Error::RecordOver16K(header.length));
        }
        if self.buffer.len() < total {
            return Ok(None);
        }

        let mut record = self.buffer.split_to(total).freeze();
        record.advance(RECORD_HEADER_LEN);
        Ok(Some((header, record)))
    }

    fn process_record(
        &mut self,
        (header, payload): (RecordHeader, Bytes),
        protection: Option<&mut RecordProtection>,
    ) -> Result<Option<ReceiveEvent>> {
        let (content_type, payload) = match (header.content_type, protection) {
            (ContentType::ApplicationData, Some(protection)) => {
                let (inner_type, plaintext) = protection.decrypt(&payload)?;
                if inner_type == ContentType::ChangeCipherSpec {
                    return Err(Error::alert(
                        AlertDescription::UnexpectedMessage,
                        "Encrypted ChangeCipherSpec record",
                    ));
                }
                (inner_type, Bytes::from(plaintext))
            }
            (ContentType::Handshake, Some(_)) => {
                return Err(Error::alert(
                    AlertDescription::UnexpectedMessage,
                    "Plaintext handshake record after keys were installed",
                ))
            }
            (content_type, _) => (content_type, payload),
        };
        debug!("record {:?}, {} bytes", content_type, payload.len());

        if content_type == ContentType::Handshake {
            if payload.is_empty() {
                return Err(Error::ParseError("Empty handshake record".to_string()));
            }
            self.handshake_payload = payload;
            return self.next_handshake_event();
        }

        if let Some(msg_type) = self.pending_handshake_type() {
            let interleavable = msg_type == HandshakeType::KeyUpdate as u8
                || msg_type == HandshakeType::NewSessionTicket as u8;
            if !(self.allow_interleave && interleavable) {
                return Err(Error::alert(
                    AlertDescription::UnexpectedMessage,
                    format!("{:?} record inside a fragmented handshake message", content_type),
                ));
            }
        }

        Ok(Some(ReceiveEvent::Record {
            content_type,
            payload,
        }))
    }

    fn pending_handshake_type(&self) -> Option<u8> {
        self.in_flight
            .as_ref()
            .map(|f| f.header[0])
            .or_else(|| self.partial_header.first().copied())
    }

    /// Splits the next handshake event off the current record's payload.
    /// Returns `None` when the payload ran out inside a handshake header.
    fn next_handshake_event(&mut self) -> Result<Option<ReceiveEvent>> {
        if let Some(in_flight) = self.in_flight.as_mut() {
            let n = in_flight.remaining.min(self.handshake_payload.len());
            let data = self.handshake_payload.split_to(n);
            in_flight.remaining -= n;
            let header = in_flight.header;
            let position = if in_flight.remaining == 0 {
                self.in_flight = None;
                FragmentPosition::Last
            } else {
                FragmentPosition::Middle
            };
            return Ok(Some(ReceiveEvent::HandshakeFragment {
                position,
                header,
                data,
            }));
        }

        let needed = HANDSHAKE_HEADER_LEN - self.partial_header.len();
        let take = needed.min(self.handshake_payload.len());
        let head = self.handshake_payload.split_to(take);
        self.partial_header.extend_from_slice(&head);
        if self.partial_header.len() < HANDSHAKE_HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0u8; HANDSHAKE_HEADER_LEN];
        header.copy_from_slice(&self.partial_header);
        self.partial_header.clear();

        let length = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;
        if length > MAX_HANDSHAKE_SIZE {
            return Err(Error::HandshakeMessageTooLong(length));
        }

        if self.handshake_payload.len() >= length {
            let body = self.handshake_payload.split_to(length);
            return Ok(Some(ReceiveEvent::HandshakeMessage(HandshakeData { header, body })));
        }

        let data = std::mem::take(&mut self.handshake_payload);
        self.in_flight = Some(InFlight {
            header,
            remaining: length - data.len(),
        });
        Ok(Some(ReceiveEvent::HandshakeFragment {
            position: FragmentPosition::First,
            header,
            data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_schedule::TrafficKeys;
    use crate::record::encode_record;
    use crate::transport::MemoryTransport;
    use pretty_assertions::assert_eq;

    fn handshake_message(msg_type: u8, body: &[u8]) -> Vec<u8> {
        let len = body.len() as u32;
        let mut out = vec![msg_type];
        out.extend_from_slice(&len.to_be_bytes()[1..]);
        out.extend_from_slice(body);
        out
    }

    fn record(content_type: ContentType, payload: &[u8]) -> Vec<u8> {
        encode_record(content_type, 0x0303, payload).unwrap()
    }

    fn setup(capacity: usize) -> (MemoryTransport, MemoryTransport, RecordReceiver) {
        let handle = MemoryTransport::new();
        (handle.clone(), handle, RecordReceiver::new(capacity))
    }

    #[test]
    fn test_no_data_is_no_change() {
        let (mut transport, _, mut receiver) = setup(16640);
        for _ in 0..3 {
            assert_eq!(receiver.poll(&mut transport, None).unwrap(), ReceiveEvent::NoChange);
        }
        assert!(!receiver.has_buffered_data());
    }

    #[test]
    fn test_record_delivered_in_chunks() {
        let (mut transport, handle, mut receiver) = setup(16640);
        let wire = record(ContentType::Alert, &[1, 0]);

        for byte in &wire[..wire.len() - 1] {
            handle.push_incoming(&[*byte]);
            assert_eq!(receiver.poll(&mut transport, None).unwrap(), ReceiveEvent::NoChange);
        }
        handle.push_incoming(&wire[wire.len() - 1..]);

        assert_eq!(
            receiver.poll(&mut transport, None).unwrap(),
            ReceiveEvent::Record {
                content_type: ContentType::Alert,
                payload: Bytes::from_static(&[1, 0]),
            }
        );
    }

    #[test]
    fn test_buffer_capacity_is_exact() {
        let payload = vec![0u8; 100];
        let wire = record(ContentType::ApplicationData, &payload);

        let (mut transport, handle, mut receiver) = setup(wire.len());
        handle.push_incoming(&wire);
        assert!(matches!(
            receiver.poll(&mut transport, None).unwrap(),
            ReceiveEvent::Record { .. }
        ));

        let (mut transport, handle, mut receiver) = setup(wire.len() - 1);
        handle.push_incoming(&wire);
        assert!(matches!(
            receiver.poll(&mut transport, None),
            Err(Error::RecordTooLong { length, capacity }) if length == wire.len() && capacity == wire.len() - 1
        ));
    }

    #[test]
    fn test_record_ceiling() {
        let (mut transport, handle, mut receiver) = setup(20000);
        handle.push_incoming(&record(ContentType::ApplicationData, &vec![0u8; 0x4100]));
        assert!(matches!(
            receiver.poll(&mut transport, None).unwrap(),
            ReceiveEvent::Record { .. }
        ));

        handle.push_incoming(&[23, 3, 3, 0x41, 0x01]);
        assert!(matches!(
            receiver.poll(&mut transport, None),
            Err(Error::RecordOver16K(0x4101))
        ));
    }

    #[test]
    fn test_capacity_checked_before_ceiling() {
        let (mut transport, handle, mut receiver) = setup(16640);
        handle.push_incoming(&[23, 3, 3, 0x41, 0x01]);
        assert!(matches!(
            receiver.poll(&mut transport, None),
            Err(Error::RecordTooLong { .. })
        ));
    }

    #[test]
    fn test_coalesced_handshake_messages() {
        let (mut transport, handle, mut receiver) = setup(16640);
        let first = handshake_message(8, &[0, 0]);
        let second = handshake_message(11, &[1, 2, 3]);
        handle.push_incoming(&record(ContentType::Handshake, &[first.clone(), second.clone()].concat()));

        let a = receiver.next_message(&mut transport, None).unwrap();
        let b = receiver.next_message(&mut transport, None).unwrap();
        match (a, b) {
            (Some(Received::Handshake(a)), Some(Received::Handshake(b))) => {
                assert_eq!(a.wire_bytes(), first);
                assert_eq!(b.wire_bytes(), second);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(receiver.next_message(&mut transport, None).unwrap(), None);
    }

    #[test]
    fn test_split_then_coalesced() {
        let (mut transport, handle, mut receiver) = setup(16640);
        let big = handshake_message(11, &[0xAB; 40]);
        let small = handshake_message(15, &[0xCD; 3]);

        handle.push_incoming(&record(ContentType::Handshake, &big[..10]));
        handle.push_incoming(&record(ContentType::Handshake, &big[10..30]));
        handle.push_incoming(&record(ContentType::Handshake, &[&big[30..], &small[..]].concat()));

        let events: Vec<ReceiveEvent> = (0..4)
            .map(|_| receiver.poll(&mut transport, None).unwrap())
            .collect();

        let header = [11, 0, 0, 40];
        assert_eq!(
            events,
            vec![
                ReceiveEvent::HandshakeFragment {
                    position: FragmentPosition::First,
                    header,
                    data: Bytes::copy_from_slice(&big[4..10]),
                },
                ReceiveEvent::HandshakeFragment {
                    position: FragmentPosition::Middle,
                    header,
                    data: Bytes::copy_from_slice(&big[10..30]),
                },
                ReceiveEvent::HandshakeFragment {
                    position: FragmentPosition::Last,
                    header,
                    data: Bytes::copy_from_slice(&big[30..]),
                },
                ReceiveEvent::HandshakeMessage(HandshakeData {
                    header: [15, 0, 0, 3],
                    body: Bytes::from_static(&[0xCD; 3]),
                }),
            ]
        );
        assert_eq!(receiver.poll(&mut transport, None).unwrap(), ReceiveEvent::NoChange);
    }

    #[test]
    fn test_fragmented_matches_whole() {
        let message = handshake_message(8, &(0u8..200).collect::<Vec<_>>());

        let (mut transport, handle, mut receiver) = setup(16640);
        for chunk in message.chunks(7) {
            handle.push_incoming(&record(ContentType::Handshake, chunk));
        }
        match receiver.next_message(&mut transport, None).unwrap() {
            Some(Received::Handshake(data)) => assert_eq!(data.wire_bytes(), message),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_split_across_records() {
        let (mut transport, handle, mut receiver) = setup(16640);
        let message = handshake_message(20, &[9; 32]);
        handle.push_incoming(&record(ContentType::Handshake, &message[..2]));
        handle.push_incoming(&record(ContentType::Handshake, &message[2..]));

        match receiver.next_message(&mut transport, None).unwrap() {
            Some(Received::Handshake(data)) => assert_eq!(data.wire_bytes(), message),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_handshake_too_long() {
        let (mut transport, handle, mut receiver) = setup(16640);
        handle.push_incoming(&record(ContentType::Handshake, &[11, 0x01, 0x00, 0x00]));
        assert!(matches!(
            receiver.poll(&mut transport, None),
            Err(Error::HandshakeMessageTooLong(0x010000))
        ));
    }

    #[test]
    fn test_interleaving_rejected_mid_message() {
        let (mut transport, handle, mut receiver) = setup(16640);
        let message = handshake_message(11, &[0; 20]);
        handle.push_incoming(&record(ContentType::Handshake, &message[..8]));
        handle.push_incoming(&record(ContentType::Alert, &[1, 0]));

        assert!(matches!(
            receiver.poll(&mut transport, None).unwrap(),
            ReceiveEvent::HandshakeFragment { position: FragmentPosition::First, .. }
        ));
        let err = receiver.poll(&mut transport, None).unwrap_err();
        assert_eq!(err.alert_description(), AlertDescription::UnexpectedMessage);
    }

    #[test]
    fn test_interleaving_allowed_for_key_update() {
        let (mut transport, handle, mut receiver) = setup(16640);
        receiver.set_allow_interleave(true);
        let message = handshake_message(24, &[1]);
        handle.push_incoming(&record(ContentType::Handshake, &message[..3]));
        handle.push_incoming(&record(ContentType::ApplicationData, b"data"));
        handle.push_incoming(&record(ContentType::Handshake, &message[3..]));

        assert!(matches!(
            receiver.next_message(&mut transport, None).unwrap(),
            Some(Received::Record { content_type: ContentType::ApplicationData, .. })
        ));
        match receiver.next_message(&mut transport, None).unwrap() {
            Some(Received::Handshake(data)) => assert_eq!(data.wire_bytes(), message),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_handshake_record() {
        let (mut transport, handle, mut receiver) = setup(16640);
        handle.push_incoming(&record(ContentType::Handshake, &[]));
        let err = receiver.poll(&mut transport, None).unwrap_err();
        assert_eq!(err.alert_description(), AlertDescription::DecodeError);
    }

    fn protection_pair() -> (RecordProtection, RecordProtection) {
        let c = TrafficKeys::from_secret(vec![1; 32]).unwrap();
        let s = TrafficKeys::from_secret(vec![2; 32]).unwrap();
        (
            RecordProtection::new(&c, &s).unwrap(),
            RecordProtection::new(&s, &c).unwrap(),
        )
    }

    #[test]
    fn test_encrypted_handshake_record() {
        let (mut client, mut server) = protection_pair();
        let (mut transport, handle, mut receiver) = setup(16640);

        let message = handshake_message(8, &[0, 0]);
        let sealed = server.encrypt(ContentType::Handshake, &message).unwrap();
        handle.push_incoming(&record(ContentType::ApplicationData, &sealed));

        match receiver.poll(&mut transport, Some(&mut client)).unwrap() {
            ReceiveEvent::HandshakeMessage(data) => assert_eq!(data.wire_bytes(), message),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(client.read_sequence(), 1);
    }

    #[test]
    fn test_bad_tag_reported() {
        let (mut client, mut server) = protection_pair();
        let (mut transport, handle, mut receiver) = setup(16640);

        let mut sealed = server.encrypt(ContentType::ApplicationData, b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        handle.push_incoming(&record(ContentType::ApplicationData, &sealed));

        assert!(matches!(
            receiver.poll(&mut transport, Some(&mut client)),
            Err(Error::BadRecordMac)
        ));
    }

    #[test]
    fn test_plaintext_handshake_after_keys() {
        let (mut client, _) = protection_pair();
        let (mut transport, handle, mut receiver) = setup(16640);
        handle.push_incoming(&record(ContentType::Handshake, &handshake_message(8, &[0, 0])));

        let err = receiver.poll(&mut transport, Some(&mut client)).unwrap_err();
        assert_eq!(err.alert_description(), AlertDescription::UnexpectedMessage);
    }
}
