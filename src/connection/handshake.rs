use super::TlsClientConnection;
use crate::certificate::ServerCertificate;
use crate::crypto::KeyPair;
use crate::error::{Error, Result};
use crate::handshake::{
    Certificate, CertificateRequest, CertificateVerify, ClientHello, EncryptedExtensions, Finished,
    HandshakeType, ServerHello,
};
use crate::key_schedule::Direction;
use crate::protection::RecordProtection;
use crate::receiver::HandshakeData;
use crate::record::ContentType;
use crate::state::ConnectionState;
use crate::tls::constants::LEGACY_VERSION;
use crate::tls::types::AlertDescription;
use crate::transport::Transport;
use crate::utils;
use log::{debug, info, trace};
use ring::rand::{SecureRandom, SystemRandom};

fn random_bytes<const N: usize>(rng: &SystemRandom) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    rng.fill(&mut out)
        .map_err(|_| Error::CryptoError("Failed to generate random bytes".to_string()))?;
    Ok(out)
}

impl<T: Transport> TlsClientConnection<T> {
    pub(super) fn start_handshake(&mut self) -> Result<()> {
        self.transport.connect()?;
        self.set_state(ConnectionState::Handshake);

        let rng = SystemRandom::new();
        let random = random_bytes::<32>(&rng)?;
        let session_id = random_bytes::<32>(&rng)?.to_vec();
        let key_pair = KeyPair::generate()?;

        let client_hello = ClientHello::for_p256(
            random,
            session_id.clone(),
            key_pair.public_key(),
            self.params.server_name.as_deref(),
            self.params.request_max_fragment_length,
        )?;

        self.session_id = session_id;
        self.key_pair = Some(key_pair);
        if !self.send_handshake(&client_hello)? {
            return Err(Error::TransportError("Failed to send ClientHello".to_string()));
        }
        Ok(())
    }

    pub(super) fn handle_handshake_message(&mut self, message: HandshakeData) -> Result<()> {
        let handshake_type = self.progress.accept(message.msg_type())?;
        debug!("Received {:?} ({} bytes)", handshake_type, message.body.len());

        // Finished is verified against the transcript without itself
        let transcript_before = self.transcript.current_hash();
        self.transcript.append(&message.wire_bytes())?;

        let body = &message.body[..];
        match handshake_type {
            HandshakeType::ServerHello => self.handle_server_hello(body),
            HandshakeType::EncryptedExtensions => {
                let extensions = EncryptedExtensions::parse(body, &mut 0)?;
                if let Some(length) = extensions.max_fragment_length()? {
                    debug!("Server accepted max_fragment_length {}", length);
                    self.max_fragment_length = length;
                }
                Ok(())
            }
            HandshakeType::CertificateRequest => {
                let request = CertificateRequest::parse(body, &mut 0)?;
                self.certificate_request_context = request.certificate_request_context;
                Ok(())
            }
            HandshakeType::Certificate => self.handle_certificate(body),
            HandshakeType::CertificateVerify => {
                self.certificate_verify = Some(CertificateVerify::parse(body, &mut 0)?);
                Ok(())
            }
            HandshakeType::Finished => self.handle_server_finished(body, &transcript_before),
            other => Err(Error::InvalidState(format!(
                "{:?} passed handshake ordering checks",
                other
            ))),
        }
    }

    fn handle_server_hello(&mut self, body: &[u8]) -> Result<()> {
        let server_hello = ServerHello::parse(body, &mut 0)?;
        let server_public_key = server_hello.validate(&self.session_id)?;
        if !self.receiver.at_record_boundary() {
            return Err(Error::alert(
                AlertDescription::UnexpectedMessage,
                "ServerHello does not end on a record boundary",
            ));
        }

        let key_pair = self
            .key_pair
            .take()
            .ok_or_else(|| Error::InvalidState("No key pair for ServerHello".to_string()))?;
        let shared_secret = key_pair.agree(&server_public_key)?;
        trace!("Shared secret: {}", utils::fingerprint(&shared_secret));

        let transcript_hash = self.transcript.current_hash();
        self.key_schedule
            .compute_handshake_keys(&shared_secret, &transcript_hash)?;
        self.protection = Some(RecordProtection::new(
            self.key_schedule.keys(Direction::Client)?,
            self.key_schedule.keys(Direction::Server)?,
        )?);
        debug!("Handshake keys installed");
        Ok(())
    }

    fn handle_certificate(&mut self, body: &[u8]) -> Result<()> {
        let certificate = Certificate::parse(body, &mut 0)?;
        if certificate.certificate_list.is_empty() {
            return Err(Error::ParseError(
                "Server sent an empty certificate list".to_string(),
            ));
        }

        self.server_certificates = certificate
            .certificate_list
            .into_iter()
            .map(|entry| ServerCertificate::from_der(entry.cert_data))
            .collect::<Result<Vec<_>>>()?;
        for cert in &self.server_certificates {
            debug!("Server certificate: subject={}", cert.summary.subject);
        }
        Ok(())
    }

    fn handle_server_finished(&mut self, body: &[u8], transcript_before: &[u8]) -> Result<()> {
        let finished = Finished::parse(body, &mut 0)?;
        let server_finished_key = self.key_schedule.finished_key(Direction::Server)?;
        if !finished.verify(&server_finished_key, transcript_before) {
            return Err(Error::alert(
                AlertDescription::DecryptError,
                "Verification of server Finished message failed",
            ));
        }
        if !self.receiver.at_record_boundary() {
            return Err(Error::alert(
                AlertDescription::UnexpectedMessage,
                "Server Finished does not end on a record boundary",
            ));
        }

        // Application secrets are bound to the transcript up to server Finished
        let application_transcript = self.transcript.current_hash();

        if self.progress.certificate_requested() {
            let empty = Certificate::new(std::mem::take(&mut self.certificate_request_context), Vec::new());
            self.send_handshake(&empty)?;
        }
        self.send_record(ContentType::ChangeCipherSpec, &[1], LEGACY_VERSION)?;

        let client_finished_key = self.key_schedule.finished_key(Direction::Client)?;
        let client_finished = Finished::compute(&client_finished_key, &self.transcript.current_hash());
        self.send_handshake(&client_finished)?;

        self.key_schedule
            .compute_application_keys(&application_transcript)?;
        self.transcript.freeze();

        let protection = self
            .protection
            .as_mut()
            .ok_or_else(|| Error::InvalidState("No record protection after handshake".to_string()))?;
        protection.install_write_keys(self.key_schedule.keys(Direction::Client)?)?;
        protection.install_read_keys(self.key_schedule.keys(Direction::Server)?)?;

        self.receiver.set_allow_interleave(true);
        self.set_state(ConnectionState::Established);
        info!("TLS 1.3 handshake completed");
        Ok(())
    }
}
