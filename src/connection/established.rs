use super::TlsClientConnection;
use crate::alert::Alert;
use crate::error::{Error, Result};
use crate::handshake::{HandshakeType, KeyUpdate, KeyUpdateRequest};
use crate::key_schedule::Direction;
use crate::receiver::HandshakeData;
use crate::record::ContentType;
use crate::state::{client::accept_post_handshake, ConnectionState};
use crate::tls::constants::LEGACY_VERSION;
use crate::tls::types::AlertDescription;
use crate::transport::Transport;
use crate::utils;
use log::{debug, warn};

impl<T: Transport> TlsClientConnection<T> {
    pub(super) fn send_fragments(&mut self, data: &[u8]) -> Result<bool> {
        for fragment in data.chunks(self.max_fragment_length) {
            if !self.update_write_key_if_exhausted()? {
                return Ok(false);
            }
            if !self.send_record(ContentType::ApplicationData, fragment, LEGACY_VERSION)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Ratchets the client key before it is used for more records than the
    /// configured limit. The KeyUpdate itself is the last record under the old key.
    /// Returns false when the transport refused the KeyUpdate.
    fn update_write_key_if_exhausted(&mut self) -> Result<bool> {
        let sequence = self
            .protection
            .as_ref()
            .map(|protection| protection.write_sequence())
            .unwrap_or_default();
        if sequence.saturating_add(1) >= self.params.max_records_per_key {
            debug!("{} records sent under the current key, updating it", sequence);
            return self.send_key_update(KeyUpdateRequest::UpdateNotRequested);
        }
        Ok(true)
    }

    fn send_key_update(&mut self, request: KeyUpdateRequest) -> Result<bool> {
        // The peer only switches keys once it has seen the KeyUpdate
        if !self.send_handshake(&KeyUpdate::new(request))? {
            return Ok(false);
        }
        self.key_schedule.update_keys(Direction::Client)?;
        let protection = self
            .protection
            .as_mut()
            .ok_or_else(|| Error::InvalidState("Key update without record protection".to_string()))?;
        protection.install_write_keys(self.key_schedule.keys(Direction::Client)?)?;
        Ok(true)
    }

    pub(super) fn handle_post_handshake_message(&mut self, message: HandshakeData) -> Result<()> {
        match accept_post_handshake(message.msg_type())? {
            HandshakeType::KeyUpdate => {
                let key_update = KeyUpdate::parse(&message.body)?;
                if !self.receiver.at_record_boundary() {
                    return Err(Error::alert(
                        AlertDescription::UnexpectedMessage,
                        "KeyUpdate does not end on a record boundary",
                    ));
                }
                debug!("Server updated its key ({:?})", key_update.request_update);

                self.key_schedule.update_keys(Direction::Server)?;
                let protection = self
                    .protection
                    .as_mut()
                    .ok_or_else(|| Error::InvalidState("Key update without record protection".to_string()))?;
                protection.install_read_keys(self.key_schedule.keys(Direction::Server)?)?;

                if key_update.request_update == KeyUpdateRequest::UpdateRequested && self.state.can_send() {
                    self.send_key_update(KeyUpdateRequest::UpdateNotRequested)?;
                }
            }
            _ => debug!("Ignoring NewSessionTicket"),
        }
        Ok(())
    }

    pub(super) fn handle_alert(&mut self, payload: &[u8]) -> Result<()> {
        let mut pos = 0;
        let alert = Alert::parse(payload, &mut pos)?;
        utils::expect_end(payload, pos, "Alert")?;
        self.alert_received = Some(alert.description);

        if alert.description == AlertDescription::CloseNotify {
            debug!("Server sent close_notify");
            if self.state == ConnectionState::Established {
                self.set_state(ConnectionState::RemotelyClosed);
            } else {
                self.close_fully();
            }
            return Ok(());
        }

        warn!("Received {:?} alert: {}", alert.level, alert.description);
        self.error_message = Some(format!("Received alert: {}", alert.description));
        self.close_core();
        Ok(())
    }
}
