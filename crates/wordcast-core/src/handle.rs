//! Connection handles
//!
//! A handle is the registry-side view of one live connection: an identity,
//! a write capability and a liveness flag. The connection's writer owns the
//! matching [`Outbox`].
//!
//! Stream clients get a bounded queue, so every word arrives in order and a
//! stalled reader shows up as [`Error::Lagging`]. Observers get a single
//! latest-value slot: a new count replaces one the writer has not taken yet,
//! so an observer is never behind and only a dead transport fails a write.

use crate::types::ConnectionId;
use crate::{Error, Result};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Marker for the audience a handle belongs to
pub trait HandleKind: Send + Sync + 'static {
    /// Label used in logs and metrics
    const LABEL: &'static str;
}

/// Stream clients: receive periodic word broadcasts
#[derive(Debug)]
pub enum Stream {}

/// Observers: receive connection-count pushes only
#[derive(Debug)]
pub enum Observer {}

impl HandleKind for Stream {
    const LABEL: &'static str = "stream";
}

impl HandleKind for Observer {
    const LABEL: &'static str = "observer";
}

pub type ClientHandle = Handle<Stream>;
pub type ObserverHandle = Handle<Observer>;

enum Writer {
    Queue(mpsc::Sender<Arc<str>>),
    Latest(Arc<watch::Sender<Option<Arc<str>>>>),
}

enum Reader {
    Queue(mpsc::Receiver<Arc<str>>),
    Latest(watch::Receiver<Option<Arc<str>>>),
}

impl Reader {
    async fn recv(&mut self) -> Option<Arc<str>> {
        match self {
            Reader::Queue(rx) => rx.recv().await,
            Reader::Latest(rx) => loop {
                rx.changed().await.ok()?;
                let latest = rx.borrow_and_update().clone();
                if latest.is_some() {
                    return latest;
                }
            },
        }
    }

    fn try_recv(&mut self) -> Option<Arc<str>> {
        match self {
            Reader::Queue(rx) => rx.try_recv().ok(),
            Reader::Latest(rx) => {
                if rx.has_changed().ok()? {
                    rx.borrow_and_update().clone()
                } else {
                    None
                }
            }
        }
    }
}

/// Registry-side handle for one connection
pub struct Handle<K: HandleKind> {
    id: ConnectionId,
    writer: Writer,
    closed: CancellationToken,
    _kind: PhantomData<fn() -> K>,
}

impl Handle<Stream> {
    /// Create a client handle and the outbox its connection writer drains.
    ///
    /// `buffer` is the number of frames that may queue before the
    /// connection counts as lagging.
    pub fn channel(buffer: usize) -> (Self, Outbox) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        Self::pair(Writer::Queue(tx), Reader::Queue(rx))
    }
}

impl Handle<Observer> {
    /// Create an observer handle holding at most the latest undelivered frame
    pub fn channel() -> (Self, Outbox) {
        let (tx, rx) = watch::channel(None);
        Self::pair(Writer::Latest(Arc::new(tx)), Reader::Latest(rx))
    }
}

impl<K: HandleKind> Handle<K> {
    fn pair(writer: Writer, reader: Reader) -> (Self, Outbox) {
        let closed = CancellationToken::new();
        let handle = Self {
            id: ConnectionId::new(),
            writer,
            closed: closed.clone(),
            _kind: PhantomData,
        };
        (handle, Outbox { reader, closed })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Hand one complete frame to the writer without waiting.
    ///
    /// Fails when the liveness flag is down, the writer is gone, or a client
    /// queue is full.
    pub fn deliver(&self, frame: Arc<str>) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(Error::ConnectionClosed(self.id));
        }
        match &self.writer {
            Writer::Queue(tx) => tx.try_send(frame).map_err(|e| match e {
                TrySendError::Full(_) => Error::Lagging(self.id),
                TrySendError::Closed(_) => Error::ConnectionClosed(self.id),
            }),
            Writer::Latest(tx) => tx
                .send(Some(frame))
                .map_err(|_| Error::ConnectionClosed(self.id)),
        }
    }

    /// Drop the liveness flag; the writer stops after its current frame
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
            || match &self.writer {
                Writer::Queue(tx) => tx.is_closed(),
                Writer::Latest(tx) => tx.is_closed(),
            }
    }
}

impl<K: HandleKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        let writer = match &self.writer {
            Writer::Queue(tx) => Writer::Queue(tx.clone()),
            Writer::Latest(tx) => Writer::Latest(Arc::clone(tx)),
        };
        Self {
            id: self.id,
            writer,
            closed: self.closed.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::LABEL)
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Receiving half of a handle, owned by the connection writer
pub struct Outbox {
    reader: Reader,
    closed: CancellationToken,
}

impl Outbox {
    /// Next frame to write, or `None` once the handle is closed
    pub async fn next(&mut self) -> Option<Arc<str>> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            frame = self.reader.recv() => frame,
        }
    }

    /// Next frame if one is already waiting
    pub fn try_next(&mut self) -> Option<Arc<str>> {
        if self.closed.is_cancelled() {
            return None;
        }
        self.reader.try_recv()
    }
}

impl fmt::Debug for Outbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outbox")
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}
