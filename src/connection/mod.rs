// Client connection: drives the handshake and the established phase over a Transport
use crate::alert::Alert;
use crate::certificate::ServerCertificate;
use crate::crypto::{KeyPair, TranscriptHash};
use crate::error::{Error, Result};
use crate::handshake::{CertificateVerify, HandshakeMessage, HandshakeType};
use crate::key_schedule::KeySchedule;
use crate::protection::RecordProtection;
use crate::receiver::{Received, RecordReceiver};
use crate::record::{encode_record, ContentType};
use crate::state::{ConnectionState, HandshakeProgress};
use crate::tls::constants::{CLIENT_HELLO_RECORD_VERSION, LEGACY_VERSION, MAX_PLAINTEXT_LEN};
use crate::tls::types::AlertDescription;
use crate::transport::Transport;
use crate::TlsClientParams;
use bytes::BytesMut;
use log::{debug, error, trace, warn};

mod established;
mod handshake;

/// Optional hooks for diagnostics. Payloads are plaintext: handshake
/// messages with their header, other records without the record header.
pub trait RecordObserver {
    fn record_sent(&mut self, _content_type: ContentType, _payload: &[u8], _encrypted: bool) {}
    fn record_received(&mut self, _content_type: ContentType, _payload: &[u8]) {}
    fn state_changed(&mut self, _state: ConnectionState) {}
}

/// A TLS 1.3 client connection over a non-blocking transport.
///
/// Nothing happens on its own: every public operation first processes
/// whatever input the transport has available, performs the sends that
/// result from it, and only then does its own work. Callers poll by calling
/// any of them (typically [`state`](Self::state)) repeatedly.
pub struct TlsClientConnection<T: Transport> {
    transport: T,
    params: TlsClientParams,
    state: ConnectionState,
    receiver: RecordReceiver,
    protection: Option<RecordProtection>,
    key_schedule: KeySchedule,
    transcript: TranscriptHash,
    key_pair: Option<KeyPair>,
    session_id: Vec<u8>,
    progress: HandshakeProgress,
    certificate_request_context: Vec<u8>,
    server_certificates: Vec<ServerCertificate>,
    certificate_verify: Option<CertificateVerify>,
    max_fragment_length: usize,
    alert_sent: Option<AlertDescription>,
    alert_received: Option<AlertDescription>,
    error_message: Option<String>,
    application_data: BytesMut,
    running: bool,
    observer: Option<Box<dyn RecordObserver>>,
}

impl<T: Transport> TlsClientConnection<T> {
    pub fn new(transport: T, params: TlsClientParams) -> Self {
        let receiver = RecordReceiver::new(params.receive_buffer_size);
        Self {
            transport,
            params,
            state: ConnectionState::Initial,
            receiver,
            protection: None,
            key_schedule: KeySchedule::new(),
            transcript: TranscriptHash::new(),
            key_pair: None,
            session_id: Vec::new(),
            progress: HandshakeProgress::new(),
            certificate_request_context: Vec::new(),
            server_certificates: Vec::new(),
            certificate_verify: None,
            max_fragment_length: MAX_PLAINTEXT_LEN,
            alert_sent: None,
            alert_received: None,
            error_message: None,
            application_data: BytesMut::new(),
            running: false,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn RecordObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&mut self) -> ConnectionState {
        self.run_state_machine();
        self.state
    }

    pub fn can_send(&mut self) -> bool {
        self.run_state_machine();
        self.state.can_send()
    }

    pub fn can_receive(&mut self) -> bool {
        self.run_state_machine();
        self.state.can_receive()
    }

    /// Sends `data` as one or more application data records, each at most
    /// the negotiated fragment length. Returns `Ok(false)` when sending is
    /// not allowed in the current state or the transport refused the data.
    /// Errors are fatal: the connection is already closed when one is returned.
    pub fn send_application_data(&mut self, data: &[u8]) -> Result<bool> {
        self.run_state_machine();
        if !self.state.can_send() {
            return Ok(false);
        }

        match self.send_fragments(data) {
            Ok(sent) => Ok(sent),
            Err(e) => {
                self.handle_fatal(&e);
                Err(e)
            }
        }
    }

    /// Copies received application data into `buf`, returning how many bytes
    /// were written. Zero means nothing is available right now.
    pub fn receive_application_data(&mut self, buf: &mut [u8]) -> usize {
        self.run_state_machine();
        let n = buf.len().min(self.application_data.len());
        if n > 0 {
            buf[..n].copy_from_slice(&self.application_data.split_to(n));
        }
        n
    }

    /// Announces that no more data will be sent. Data can still be received
    /// until the server closes its side.
    pub fn close(&mut self) {
        self.run_state_machine();
        self.close_core();
    }

    pub fn alert_sent(&self) -> Option<AlertDescription> {
        self.alert_sent
    }

    pub fn alert_received(&self) -> Option<AlertDescription> {
        self.alert_received
    }

    /// Details of the fatal error that closed the connection, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn server_certificates(&self) -> &[ServerCertificate] {
        &self.server_certificates
    }

    pub fn certificate_verify(&self) -> Option<&CertificateVerify> {
        self.certificate_verify.as_ref()
    }

    /// Whether the server asked for a client certificate (an empty one was sent).
    pub fn certificate_requested(&self) -> bool {
        self.progress.certificate_requested()
    }

    pub fn max_fragment_length(&self) -> usize {
        self.max_fragment_length
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn run_state_machine(&mut self) {
        if self.running {
            return;
        }

        self.running = true;
        if let Err(e) = self.process_input() {
            self.handle_fatal(&e);
        }
        self.running = false;
    }

    fn process_input(&mut self) -> Result<()> {
        if self.state == ConnectionState::Initial {
            self.start_handshake()?;
        }

        while self.state.reads_records() && self.application_data.len() < MAX_PLAINTEXT_LEN {
            let received = self
                .receiver
                .next_message(&mut self.transport, self.protection.as_mut())?;
            match received {
                Some(received) => self.handle_received(received)?,
                None => break,
            }
        }

        if !matches!(
            self.state,
            ConnectionState::RemotelyClosed | ConnectionState::FullClosed
        ) && self.transport.is_remotely_closed()
            && !self.transport.has_data()
            && !self.receiver.has_buffered_data()
        {
            warn!("Transport closed by the server without close_notify");
            if self.error_message.is_none() {
                self.error_message = Some("Connection closed by the server without close_notify".to_string());
            }
            self.close_core();
            self.close_fully();
        }

        Ok(())
    }

    fn handle_received(&mut self, received: Received) -> Result<()> {
        match received {
            Received::Handshake(message) => {
                if let Some(observer) = self.observer.as_mut() {
                    observer.record_received(ContentType::Handshake, &message.wire_bytes());
                }
                if self.state == ConnectionState::Handshake {
                    self.handle_handshake_message(message)
                } else {
                    self.handle_post_handshake_message(message)
                }
            }
            Received::Record {
                content_type,
                payload,
            } => {
                if let Some(observer) = self.observer.as_mut() {
                    observer.record_received(content_type, &payload);
                }
                match content_type {
                    ContentType::Alert => self.handle_alert(&payload),
                    ContentType::ChangeCipherSpec if self.state == ConnectionState::Handshake => {
                        trace!("ignoring ChangeCipherSpec");
                        Ok(())
                    }
                    ContentType::ApplicationData if self.state.can_receive() => {
                        self.application_data.extend_from_slice(&payload);
                        Ok(())
                    }
                    other => Err(Error::alert(
                        AlertDescription::UnexpectedMessage,
                        format!("Unexpected record of type {:?} received in state {:?}", other, self.state),
                    )),
                }
            }
        }
    }

    /// The single place fatal errors end up: at most one alert is sent, the
    /// connection is fully closed.
    fn handle_fatal(&mut self, error: &Error) {
        let description = error.alert_description();
        error!("Fatal error in state {:?}: {} (alert: {})", self.state, error, description);
        self.send_alert(description);
        self.error_message = Some(error.to_string());
        self.close_fully();
    }

    fn close_core(&mut self) {
        if self.state != ConnectionState::Initial && self.alert_sent.is_none() {
            let description = if self.state == ConnectionState::Handshake {
                AlertDescription::UserCanceled
            } else {
                AlertDescription::CloseNotify
            };
            self.send_alert(description);
        }

        let next = if self.state == ConnectionState::Established {
            ConnectionState::LocallyClosed
        } else {
            ConnectionState::FullClosed
        };
        self.set_state(next);
        self.transport.close();
    }

    fn close_fully(&mut self) {
        self.set_state(ConnectionState::FullClosed);
        self.transport.close();
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!("Connection state {:?} -> {:?}", self.state, state);
        self.state = state;
        if let Some(observer) = self.observer.as_mut() {
            observer.state_changed(state);
        }
    }

    /// Sends an alert unless one was already sent or the state forbids it.
    fn send_alert(&mut self, description: AlertDescription) -> bool {
        if self.alert_sent.is_some() {
            return false;
        }
        if matches!(
            self.state,
            ConnectionState::Initial | ConnectionState::LocallyClosed | ConnectionState::FullClosed
        ) {
            return false;
        }

        self.alert_sent = Some(description);
        let alert = Alert::outgoing(description);
        match self.send_record(ContentType::Alert, &alert.serialize(), LEGACY_VERSION) {
            Ok(sent) => sent,
            Err(e) => {
                warn!("Could not send alert {}: {}", description, e);
                false
            }
        }
    }

    fn send_handshake<M: HandshakeMessage>(&mut self, message: &M) -> Result<bool> {
        let wire = message.to_wire()?;
        if self.state == ConnectionState::Handshake {
            self.transcript.append(&wire)?;
        }
        let version = if message.message_type() == HandshakeType::ClientHello {
            CLIENT_HELLO_RECORD_VERSION
        } else {
            LEGACY_VERSION
        };
        debug!("Sending {:?} ({} bytes)", message.message_type(), wire.len());
        trace!("{:?}: {:02x?}", message.message_type(), wire);
        self.send_record(ContentType::Handshake, &wire, version)
    }

    /// Once keys exist everything except ChangeCipherSpec goes out encrypted.
    fn send_record(&mut self, content_type: ContentType, payload: &[u8], legacy_version: u16) -> Result<bool> {
        if self.state == ConnectionState::FullClosed {
            return Ok(false);
        }

        let protection = match self.protection.as_mut() {
            Some(protection) if content_type != ContentType::ChangeCipherSpec => Some(protection),
            _ => None,
        };
        let encrypted = protection.is_some();
        if content_type == ContentType::ApplicationData && !encrypted {
            return Err(Error::InvalidState(
                "Can't send application data, no encryption keys available".to_string(),
            ));
        }

        let record = match protection {
            Some(protection) => {
                let ciphertext = protection.seal(content_type, payload)?;
                encode_record(ContentType::ApplicationData, legacy_version, &ciphertext)?
            }
            None => encode_record(content_type, legacy_version, payload)?,
        };

        trace!("Sending {:?} record, {} bytes on the wire", content_type, record.len());
        if !self.transport.send(&record) {
            debug!("Transport refused {:?} record", content_type);
            return Ok(false);
        }
        // A refused record never used its sequence number
        if encrypted {
            if let Some(protection) = self.protection.as_mut() {
                protection.commit_write()?;
            }
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.record_sent(content_type, payload, encrypted);
        }
        Ok(true)
    }
}
