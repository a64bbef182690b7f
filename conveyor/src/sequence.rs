//! Single-producer, single-consumer links between pipeline elements.
//!
//! A sequence is a bounded FIFO channel with close-to-signal-exhaustion
//! semantics. The producer half ([`SequenceSender`]) is consumed by
//! [`SequenceSender::close`] and closes the link when dropped, so sending
//! after close or closing twice cannot be written.

use crate::errors::SendError;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Link capacity used when no configuration says otherwise.
///
/// One slot is the smallest a tokio channel supports; it keeps the number of
/// in-flight items per link as close to a synchronous hand-off as possible.
pub const DEFAULT_CAPACITY: usize = 1;

/// Create a linked producer/consumer pair.
///
/// A `capacity` of zero is rounded up to one.
pub fn sequence<T>(capacity: usize) -> (SequenceSender<T>, Sequence<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SequenceSender { tx }, Sequence { rx })
}

/// Producer half of a sequence.
#[derive(Debug)]
pub struct SequenceSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> SequenceSender<T> {
    /// Hand one item to the consumer, suspending while the link is full.
    ///
    /// Fails only when the consumer half has been dropped; the item is
    /// returned inside the error.
    pub async fn send(&self, item: T) -> Result<(), SendError<T>> {
        self.tx
            .send(item)
            .await
            .map_err(|mpsc::error::SendError(item)| SendError(item))
    }

    /// Returns `true` once the consumer half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Completes when the consumer half is dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Close the sequence. The consumer sees exhaustion after the buffered
    /// items.
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer half of a sequence.
#[derive(Debug)]
pub struct Sequence<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Sequence<T> {
    /// Receive the next item. `None` means the sequence is closed and
    /// drained; every later call returns `None` as well.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Consume and discard items until the producer closes the sequence.
    ///
    /// Returns the number of discarded items.
    pub async fn drain(&mut self) -> u64 {
        let mut discarded = 0;
        while self.rx.recv().await.is_some() {
            discarded += 1;
        }
        discarded
    }

    /// Read the sequence to exhaustion.
    pub async fn into_vec(mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.rx.recv().await {
            items.push(item);
        }
        items
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// Spawn a producer that feeds `items` into a new sequence and closes it.
    ///
    /// The producer stops early if the consumer is dropped.
    pub fn produce<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T> + Send + 'static,
        I::IntoIter: Send,
    {
        let (tx, seq) = sequence(DEFAULT_CAPACITY);
        tokio::spawn(async move {
            for item in items {
                if tx.send(item).await.is_err() {
                    tracing::trace!("producer stopped, consumer is gone");
                    break;
                }
            }
        });
        seq
    }
}

impl<T> Stream for Sequence<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
