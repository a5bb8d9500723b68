// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Queue
//!
//! The lock-free, multi-producer multi-consumer channel connecting two
//! adjacent stages. Built on [`crossbeam::queue::SegQueue`] for the item
//! storage and [`tokio::sync::Notify`] for async wakeup, with an optional
//! [`tokio::sync::Semaphore`] providing backpressure when a pipeline is
//! started with a bounded queue capacity.
//!
//! The end-of-stream marker ([`Slot::Eos`]) travels in-band, on the same
//! queue as items, rather than through a side channel — this is what lets
//! any number of workers share one queue without a separate fan-out
//! mechanism for shutdown. See [`crate::worker`] for the re-enqueue
//! discipline that makes this safe with multiple consumers.

use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

use crossbeam::queue::SegQueue;

/// One slot on a queue: either a caller item or the end-of-stream marker.
pub enum Slot<T> {
    Item(T),
    Eos,
}

/// A queue between two pipeline stages.
pub struct Queue<T> {
    items: SegQueue<Slot<T>>,
    ready: Notify,
    capacity: Option<Semaphore>,
}

impl<T> Queue<T> {
    /// Creates a queue. `capacity` bounds the number of items (not the
    /// `Eos` marker, which is never rate-limited) resting on the queue at
    /// once; `None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: SegQueue::new(),
            ready: Notify::new(),
            capacity: capacity.map(Semaphore::new),
        }
    }

    /// Enqueues a slot, waiting for capacity first if the queue is bounded
    /// and `slot` is an item.
    pub async fn enqueue(&self, slot: Slot<T>) {
        if matches!(slot, Slot::Item(_)) {
            if let Some(semaphore) = &self.capacity {
                semaphore
                    .acquire()
                    .await
                    .expect("queue capacity semaphore is never closed")
                    .forget();
            }
        }
        self.items.push(slot);
        self.ready.notify_one();
    }

    /// Dequeues the next slot, waiting if the queue is currently empty.
    pub async fn dequeue(&self) -> Slot<T> {
        loop {
            // Registered before the pop check: a concurrent `enqueue`'s
            // `notify_one` can only land after this point, so it is never
            // missed between the empty check and the await below.
            let ready = self.ready.notified();
            if let Some(slot) = self.items.pop() {
                if matches!(slot, Slot::Item(_)) {
                    if let Some(semaphore) = &self.capacity {
                        semaphore.add_permits(1);
                    }
                }
                return slot;
            }
            ready.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order_is_preserved_single_producer() {
        let queue: Queue<u32> = Queue::new(None);
        for i in 0..5 {
            queue.enqueue(Slot::Item(i)).await;
        }
        for i in 0..5 {
            match queue.dequeue().await {
                Slot::Item(n) => assert_eq!(n, i),
                Slot::Eos => panic!("unexpected eos"),
            }
        }
    }

    #[tokio::test]
    async fn dequeue_waits_for_an_enqueue() {
        let queue: Arc<Queue<u32>> = Arc::new(Queue::new(None));
        let reader = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::task::yield_now().await;
        queue.enqueue(Slot::Item(7)).await;
        match reader.await.unwrap() {
            Slot::Item(n) => assert_eq!(n, 7),
            Slot::Eos => panic!("unexpected eos"),
        }
    }

    #[tokio::test]
    async fn bounded_queue_blocks_until_drained() {
        let queue: Arc<Queue<u32>> = Arc::new(Queue::new(Some(1)));
        queue.enqueue(Slot::Item(1)).await;

        let queue2 = queue.clone();
        let writer = tokio::spawn(async move {
            queue2.enqueue(Slot::Item(2)).await;
        });
        tokio::task::yield_now().await;
        assert!(!writer.is_finished());

        match queue.dequeue().await {
            Slot::Item(n) => assert_eq!(n, 1),
            Slot::Eos => panic!("unexpected eos"),
        }
        writer.await.unwrap();
        match queue.dequeue().await {
            Slot::Item(n) => assert_eq!(n, 2),
            Slot::Eos => panic!("unexpected eos"),
        }
    }
}
