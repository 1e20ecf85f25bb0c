// In-memory TLS 1.3 server used to drive the client through whole connections
#![allow(dead_code)]

use tls13_client::crypto::{KeyPair, TranscriptHash};
use tls13_client::handshake::{
    Certificate, CertificateEntry, CertificateRequest, CertificateVerify, ClientHello,
    EncryptedExtensions, Extension, ExtensionType, Finished, HandshakeMessage, KeyShareEntry,
    KeyUpdate, KeyUpdateRequest, NamedGroup, ServerHello, TLS_AES_128_GCM_SHA256,
};
use tls13_client::key_schedule::{Direction, KeySchedule};
use tls13_client::protection::RecordProtection;
use tls13_client::record::{encode_record, ContentType, RecordHeader};
use tls13_client::tls::constants::{RECORD_HEADER_LEN, TLS12};
use tls13_client::utils;
use tls13_client::{ConnectionState, MemoryTransport, TlsClientConnection, TlsClientParams};

pub struct ServerOptions {
    pub cipher_suite: u16,
    pub max_fragment_length: Option<u8>,
    pub request_certificate: bool,
    pub corrupt_finished: bool,
    /// Cut the encrypted flight into records of this many plaintext bytes
    /// instead of one record per message.
    pub fragment_size: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            cipher_suite: TLS_AES_128_GCM_SHA256,
            max_fragment_length: None,
            request_certificate: false,
            corrupt_finished: false,
            fragment_size: None,
        }
    }
}

/// A received client record, decrypted when keys were in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub content_type: ContentType,
    pub payload: Vec<u8>,
}

pub struct MockServer {
    pub handle: MemoryTransport,
    pub options: ServerOptions,
    pub certificate_der: Vec<u8>,
    transcript: TranscriptHash,
    key_schedule: KeySchedule,
    protection: Option<RecordProtection>,
    client_finished_key: Vec<u8>,
}

impl MockServer {
    pub fn new(options: ServerOptions) -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        Self {
            handle: MemoryTransport::new(),
            options,
            certificate_der: certified.cert.der().to_vec(),
            transcript: TranscriptHash::new(),
            key_schedule: KeySchedule::new(),
            protection: None,
            client_finished_key: Vec::new(),
        }
    }

    pub fn client(&self, params: TlsClientParams) -> TlsClientConnection<MemoryTransport> {
        TlsClientConnection::new(self.handle.clone(), params)
    }

    pub fn push_raw(&self, data: &[u8]) {
        self.handle.push_incoming(data);
    }

    pub fn send_plain(&self, content_type: ContentType, payload: &[u8]) {
        self.push_raw(&encode_record(content_type, TLS12, payload).unwrap());
    }

    pub fn send_encrypted(&mut self, content_type: ContentType, payload: &[u8]) {
        let protection = self.protection.as_mut().expect("server has no keys");
        let sealed = protection.encrypt(content_type, payload).unwrap();
        self.push_raw(&encode_record(ContentType::ApplicationData, TLS12, &sealed).unwrap());
    }

    pub fn send_application_data(&mut self, data: &[u8]) {
        self.send_encrypted(ContentType::ApplicationData, data);
    }

    /// Takes the single ClientHello record the client sent and hashes it.
    pub fn receive_client_hello(&mut self) -> ClientHello {
        let sent = self.handle.take_sent();
        assert_eq!(sent.len(), 1, "expected exactly one ClientHello record");
        let record = &sent[0];

        let header = RecordHeader::parse(&record[..RECORD_HEADER_LEN]).unwrap();
        assert_eq!(header.content_type, ContentType::Handshake);
        assert_eq!(header.legacy_version, 0x0301);
        let message = &record[RECORD_HEADER_LEN..];
        assert_eq!(message.len(), header.length);

        self.transcript.append(message).unwrap();
        ClientHello::parse(&message[4..], &mut 0).unwrap()
    }

    pub fn send_server_hello(&mut self, client_hello: &ClientHello) {
        let key_share = client_hello.get_extension(ExtensionType::KeyShare).unwrap();
        let mut pos = 0;
        let entries = utils::read_vector_u16(&key_share.data, &mut pos).unwrap();
        let client_share = KeyShareEntry::parse(entries, &mut 0).unwrap();
        assert_eq!(client_share.group, NamedGroup::Secp256r1 as u16);

        let key_pair = KeyPair::generate().unwrap();
        let mut share = Vec::new();
        KeyShareEntry::new(NamedGroup::Secp256r1, key_pair.public_key().to_vec())
            .serialize(&mut share)
            .unwrap();
        let shared_secret = key_pair.agree(&client_share.key_exchange).unwrap();

        let server_hello = ServerHello::new(
            TLS12,
            [0x5A; 32],
            client_hello.legacy_session_id.clone(),
            self.options.cipher_suite,
            0,
            vec![
                Extension::new(ExtensionType::SupportedVersions, vec![0x03, 0x04]),
                Extension::new(ExtensionType::KeyShare, share),
            ],
        );
        let wire = server_hello.to_wire().unwrap();
        self.transcript.append(&wire).unwrap();
        self.send_plain(ContentType::Handshake, &wire);

        self.key_schedule
            .compute_handshake_keys(&shared_secret, &self.transcript.current_hash())
            .unwrap();
        self.protection = Some(
            RecordProtection::new(
                self.key_schedule.keys(Direction::Server).unwrap(),
                self.key_schedule.keys(Direction::Client).unwrap(),
            )
            .unwrap(),
        );
        self.send_plain(ContentType::ChangeCipherSpec, &[1]);
    }

    /// EncryptedExtensions through Finished, then derives application keys.
    pub fn send_encrypted_flight(&mut self) {
        let mut extensions = Vec::new();
        if let Some(code) = self.options.max_fragment_length {
            extensions.push(Extension::new(ExtensionType::MaxFragmentLength, vec![code]));
        }

        let mut messages = vec![EncryptedExtensions::new(extensions).to_wire().unwrap()];
        if self.options.request_certificate {
            let request = CertificateRequest {
                certificate_request_context: Vec::new(),
                extensions: vec![Extension::new(
                    ExtensionType::SignatureAlgorithms,
                    vec![0x00, 0x02, 0x04, 0x03],
                )],
            };
            messages.push(request.to_wire().unwrap());
        }
        messages.push(
            Certificate::new(Vec::new(), vec![CertificateEntry::new(self.certificate_der.clone())])
                .to_wire()
                .unwrap(),
        );
        messages.push(CertificateVerify::new(0x0403, vec![0x30; 70]).to_wire().unwrap());

        let mut flight = Vec::new();
        let mut boundaries = Vec::new();
        for message in messages {
            self.transcript.append(&message).unwrap();
            flight.extend_from_slice(&message);
            boundaries.push(flight.len());
        }

        let finished_key = self.key_schedule.finished_key(Direction::Server).unwrap();
        let mut finished = Finished::compute(&finished_key, &self.transcript.current_hash());
        if self.options.corrupt_finished {
            finished.verify_data[0] ^= 0xFF;
        }
        let finished_wire = finished.to_wire().unwrap();
        self.transcript.append(&finished_wire).unwrap();
        flight.extend_from_slice(&finished_wire);
        boundaries.push(flight.len());

        match self.options.fragment_size {
            Some(size) => {
                for chunk in flight.chunks(size).map(|c| c.to_vec()).collect::<Vec<_>>() {
                    self.send_encrypted(ContentType::Handshake, &chunk);
                }
            }
            None => {
                let mut start = 0;
                for end in boundaries {
                    let message = flight[start..end].to_vec();
                    self.send_encrypted(ContentType::Handshake, &message);
                    start = end;
                }
            }
        }

        self.client_finished_key = self.key_schedule.finished_key(Direction::Client).unwrap().to_vec();
        self.key_schedule
            .compute_application_keys(&self.transcript.current_hash())
            .unwrap();
    }

    /// Reads the client's answer to the flight, checks its Finished and
    /// switches to application keys. Returns the handshake types received.
    pub fn receive_client_finished(&mut self) -> Vec<u8> {
        let mut types = Vec::new();
        for record in self.receive_records() {
            match record.content_type {
                ContentType::ChangeCipherSpec => assert_eq!(record.payload, vec![1]),
                ContentType::Handshake => {
                    let msg_type = record.payload[0];
                    if msg_type == 20 {
                        let finished = Finished::parse(&record.payload[4..], &mut 0).unwrap();
                        assert!(
                            finished.verify(&self.client_finished_key, &self.transcript.current_hash()),
                            "client Finished does not verify"
                        );
                    }
                    self.transcript.append(&record.payload).unwrap();
                    types.push(msg_type);
                }
                other => panic!("unexpected {:?} record from client", other),
            }
        }

        let protection = self.protection.as_mut().unwrap();
        protection
            .install_write_keys(self.key_schedule.keys(Direction::Server).unwrap())
            .unwrap();
        protection
            .install_read_keys(self.key_schedule.keys(Direction::Client).unwrap())
            .unwrap();
        types
    }

    /// Decrypts everything the client sent since the last call. A client
    /// KeyUpdate switches the server's read keys right after its record.
    pub fn receive_records(&mut self) -> Vec<ClientRecord> {
        let mut records = Vec::new();
        for raw in self.handle.take_sent() {
            let header = RecordHeader::parse(&raw[..RECORD_HEADER_LEN]).unwrap();
            let payload = &raw[RECORD_HEADER_LEN..];
            assert_eq!(payload.len(), header.length);

            let record = match (header.content_type, self.protection.as_mut()) {
                (ContentType::ApplicationData, Some(protection)) => {
                    let (content_type, plaintext) = protection.decrypt(payload).unwrap();
                    ClientRecord {
                        content_type,
                        payload: plaintext,
                    }
                }
                (content_type, _) => ClientRecord {
                    content_type,
                    payload: payload.to_vec(),
                },
            };

            if record.content_type == ContentType::Handshake && record.payload[0] == 24 {
                self.key_schedule.update_keys(Direction::Client).unwrap();
                let protection = self.protection.as_mut().unwrap();
                protection
                    .install_read_keys(self.key_schedule.keys(Direction::Client).unwrap())
                    .unwrap();
            }
            records.push(record);
        }
        records
    }

    pub fn send_key_update(&mut self, request: KeyUpdateRequest) {
        let wire = KeyUpdate::new(request).to_wire().unwrap();
        self.send_encrypted(ContentType::Handshake, &wire);
        self.key_schedule.update_keys(Direction::Server).unwrap();
        let protection = self.protection.as_mut().unwrap();
        protection
            .install_write_keys(self.key_schedule.keys(Direction::Server).unwrap())
            .unwrap();
    }
}

/// A client and server that completed a full handshake.
pub fn established(
    params: TlsClientParams,
    options: ServerOptions,
) -> (MockServer, TlsClientConnection<MemoryTransport>) {
    let mut server = MockServer::new(options);
    let mut client = server.client(params);

    assert_eq!(client.state(), ConnectionState::Handshake);
    let client_hello = server.receive_client_hello();
    server.send_server_hello(&client_hello);
    server.send_encrypted_flight();

    assert_eq!(client.state(), ConnectionState::Established);
    server.receive_client_finished();
    (server, client)
}
