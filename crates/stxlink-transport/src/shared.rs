use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, TransportError};
use crate::traits::{AckKind, Channel};

/// A channel handle that can be cloned across threads.
///
/// Every operation takes the inner lock for its own duration only, so a
/// sender thread and a receiver thread can hold clones of the same channel.
#[derive(Debug, Default)]
pub struct SharedChannel<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> Clone for SharedChannel<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Channel> SharedChannel<C> {
    /// Wrap a channel for shared use.
    pub fn new(channel: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(channel)),
        }
    }

    /// Run `f` with exclusive access to the wrapped channel.
    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R> {
        let mut guard = self.lock("with")?;
        Ok(f(&mut guard))
    }

    fn lock(&self, op: &'static str) -> Result<MutexGuard<'_, C>> {
        self.inner
            .lock()
            .map_err(|_| TransportError::Poisoned { op })
    }
}

impl<C: Channel> Channel for SharedChannel<C> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.lock("send")?.send(bytes)
    }

    fn try_receive_byte(&mut self) -> Result<Option<u8>> {
        self.lock("try_receive_byte")?.try_receive_byte()
    }

    fn send_ack(&mut self, kind: AckKind) -> Result<()> {
        self.lock("send_ack")?.send_ack(kind)
    }

    fn try_receive_ack(&mut self) -> Result<Option<AckKind>> {
        self.lock("try_receive_ack")?.try_receive_ack()
    }
}
