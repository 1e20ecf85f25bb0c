// Byte-stream transports the connection runs over
use crate::error::{Error, Result};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::rc::Rc;

/// Non-blocking byte stream. `receive` never waits: it returns whatever is
/// available, possibly nothing.
pub trait Transport {
    fn connect(&mut self) -> Result<()>;
    fn send(&mut self, data: &[u8]) -> bool;
    fn has_data(&mut self) -> bool;
    fn receive(&mut self, max_len: usize) -> Vec<u8>;
    fn is_remotely_closed(&mut self) -> bool;
    fn close(&mut self);
}

pub struct TcpTransport {
    address: String,
    stream: Option<TcpStream>,
    pending: VecDeque<u8>,
    remotely_closed: bool,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: None,
            pending: VecDeque::new(),
            remotely_closed: false,
        }
    }

    fn fill(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.remotely_closed = true;
                    return;
                }
                Ok(n) => self.pending.extend(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("TCP read failed: {}", e);
                    self.remotely_closed = true;
                    return;
                }
            }
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        let addr = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::TransportError(format!("Cannot resolve {}", self.address)))?;
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        debug!("connected to {}", addr);
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let mut written = 0;
        while written < data.len() {
            match stream.write(&data[written..]) {
                Ok(0) => return false,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                    std::thread::yield_now();
                }
                Err(e) => {
                    warn!("TCP write failed: {}", e);
                    return false;
                }
            }
        }
        true
    }

    fn has_data(&mut self) -> bool {
        if self.pending.is_empty() {
            self.fill();
        }
        !self.pending.is_empty()
    }

    fn receive(&mut self, max_len: usize) -> Vec<u8> {
        if self.pending.is_empty() {
            self.fill();
        }
        let n = max_len.min(self.pending.len());
        self.pending.drain(..n).collect()
    }

    fn is_remotely_closed(&mut self) -> bool {
        if !self.remotely_closed && self.pending.is_empty() {
            self.fill();
        }
        self.remotely_closed
    }

    // Half-close so the peer's remaining data can still be read.
    fn close(&mut self) {
        if let Some(stream) = self.stream.as_ref() {
            if let Err(e) = stream.shutdown(Shutdown::Write) {
                debug!("TCP shutdown: {}", e);
            }
        }
    }
}

#[derive(Default)]
struct MemoryState {
    connected: bool,
    incoming: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    remotely_closed: bool,
    closed: bool,
    refusing: bool,
}

/// In-memory transport. Clones share the same state so a test can keep a
/// handle while the connection owns another.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_incoming(&self, data: &[u8]) {
        self.state.borrow_mut().incoming.extend(data);
    }

    /// Every `send` call since the last take, one entry per call.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.borrow_mut().sent)
    }

    pub fn set_remotely_closed(&self) {
        self.state.borrow_mut().remotely_closed = true;
    }

    /// While set, `send` refuses data without closing, like a full socket buffer.
    pub fn set_refusing(&self, refusing: bool) {
        self.state.borrow_mut().refusing = refusing;
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<()> {
        self.state.borrow_mut().connected = true;
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> bool {
        let mut state = self.state.borrow_mut();
        if state.closed || state.refusing {
            return false;
        }
        state.sent.push(data.to_vec());
        true
    }

    fn has_data(&mut self) -> bool {
        !self.state.borrow().incoming.is_empty()
    }

    fn receive(&mut self, max_len: usize) -> Vec<u8> {
        let mut state = self.state.borrow_mut();
        let n = max_len.min(state.incoming.len());
        state.incoming.drain(..n).collect()
    }

    fn is_remotely_closed(&mut self) -> bool {
        self.state.borrow().remotely_closed
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed = true;
    }
}
