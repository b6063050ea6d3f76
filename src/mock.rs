//! Scripted serial line recording every call it receives
use std::collections::VecDeque;

use core::time::Duration;

use crate::transport::{LineSettings, SerialLine, TransportError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Apply(LineSettings),
    Write(Vec<u8>),
    Read { capacity: usize, timeout: Duration },
    WaitDrained(Duration),
}

#[derive(Default)]
pub(crate) struct MockLine {
    calls: Vec<Call>,
    /// `None` simulates a read deadline expiring without data
    responses: VecDeque<Option<Vec<u8>>>,
    accept_at_most: Option<usize>,
}

impl MockLine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues the bytes returned by the next unanswered read
    pub(crate) fn respond(mut self, bytes: &[u8]) -> Self {
        self.responses.push_back(Some(bytes.to_vec()));
        self
    }

    /// Queues a read which expires without data
    pub(crate) fn silent(mut self) -> Self {
        self.responses.push_back(None);
        self
    }

    pub(crate) fn accept_at_most(mut self, len: usize) -> Self {
        self.accept_at_most = Some(len);
        self
    }

    pub(crate) fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Every written chunk, in order
    pub(crate) fn writes(&self) -> Vec<&[u8]> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Write(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl SerialLine for MockLine {
    fn apply(&mut self, settings: &LineSettings) -> Result<(), TransportError> {
        self.calls.push(Call::Apply(*settings));
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.calls.push(Call::Write(bytes.to_vec()));
        Ok(self
            .accept_at_most
            .map_or(bytes.len(), |limit| limit.min(bytes.len())))
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        self.calls.push(Call::Read {
            capacity: buf.len(),
            timeout,
        });
        match self.responses.pop_front().flatten() {
            Some(bytes) if !bytes.is_empty() => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            _ => Err(TransportError::TimedOut),
        }
    }

    fn wait_drained(&mut self, timeout: Duration) {
        self.calls.push(Call::WaitDrained(timeout));
    }
}
