//! Counting semaphore bounding the number of synthesis workers alive at once.
//!
//! The semaphore is a bounded channel pre-filled with one token per slot: acquiring a slot
//! receives a token, releasing it sends the token back. The token is returned when the
//! [`WorkerSlot`] guard is dropped, including when the worker unwinds.

use crossbeam_channel::{bounded, Receiver, Sender};

#[derive(Debug, Clone)]
pub struct WorkerSlots {
    release: Sender<()>,
    acquire: Receiver<()>,
    ceiling: usize,
}

/// A held worker slot, released on drop.
#[derive(Debug)]
pub struct WorkerSlot {
    release: Sender<()>,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        // the pool always keeps room for every token it issued
        let _ = self.release.try_send(());
    }
}

impl WorkerSlots {
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        let (release, acquire) = bounded(ceiling);
        for _ in 0..ceiling {
            let _ = release.try_send(());
        }
        WorkerSlots {
            release,
            acquire,
            ceiling,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.acquire.len()
    }

    /// Block until a slot is free and take it.
    pub fn acquire(&self) -> WorkerSlot {
        // `self` owns a sender, so the channel never disconnects while we wait
        let _ = self.acquire.recv();
        WorkerSlot {
            release: self.release.clone(),
        }
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> Option<WorkerSlot> {
        self.acquire.try_recv().ok().map(|_| WorkerSlot {
            release: self.release.clone(),
        })
    }
}
