// CaptureRing - lock-free sample ring between capture and render threads
//
// The capture stream's callback pushes microphone samples into an SPSC
// (Single Producer Single Consumer) ring; the render callback pulls them
// without ever blocking. All allocation happens when the ring is created.
//
// Sample flow:
// 1. Capture callback writes as many samples as there are free slots
// 2. Samples that do not fit are dropped and counted
// 3. Render callback reads up to N samples, whatever is ready
// 4. A short read is padded with silence by the caller

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

/// Counters shared between both ends of a capture ring.
#[derive(Debug, Default)]
pub struct CaptureStats {
    pushed: AtomicU64,
    dropped: AtomicU64,
    pulled: AtomicU64,
}

impl CaptureStats {
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Samples discarded because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn pulled(&self) -> u64 {
        self.pulled.load(Ordering::Relaxed)
    }
}

/// Capture-thread end of the ring.
pub struct CaptureProducer {
    producer: Producer<f32>,
    stats: Arc<CaptureStats>,
}

/// Render-thread end of the ring.
pub struct CaptureConsumer {
    consumer: Consumer<f32>,
    stats: Arc<CaptureStats>,
}

/// Factory for a capture ring.
pub struct CaptureRing;

impl CaptureRing {
    /// Create a ring holding up to `capacity` mono samples.
    ///
    /// # Panics
    /// Panics if capacity is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> (CaptureProducer, CaptureConsumer) {
        assert!(capacity > 0, "capacity must be greater than 0");

        let (producer, consumer) = RingBuffer::new(capacity);
        let stats = Arc::new(CaptureStats::default());
        (
            CaptureProducer {
                producer,
                stats: Arc::clone(&stats),
            },
            CaptureConsumer { consumer, stats },
        )
    }
}

impl CaptureProducer {
    /// Push as many samples as fit; returns the number accepted.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        let n = samples.len().min(self.producer.slots());
        if n > 0 {
            if let Ok(mut chunk) = self.producer.write_chunk(n) {
                let (first, second) = chunk.as_mut_slices();
                let split = first.len();
                first.copy_from_slice(&samples[..split]);
                second.copy_from_slice(&samples[split..n]);
                chunk.commit_all();
            }
        }

        self.stats.pushed.fetch_add(n as u64, Ordering::Relaxed);
        let dropped = samples.len() - n;
        if dropped > 0 {
            self.stats
                .dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }
        n
    }

    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }
}

impl CaptureConsumer {
    /// Non-blocking pull of up to `out.len()` samples; returns the count read.
    ///
    /// Slots past the returned count are left untouched.
    pub fn pull(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.consumer.slots());
        if n == 0 {
            return 0;
        }

        match self.consumer.read_chunk(n) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                out[..first.len()].copy_from_slice(first);
                out[first.len()..n].copy_from_slice(second);
                chunk.commit_all();
                self.stats.pulled.fetch_add(n as u64, Ordering::Relaxed);
                n
            }
            Err(_) => 0,
        }
    }

    /// Samples currently waiting in the ring.
    pub fn available(&self) -> usize {
        self.consumer.slots()
    }

    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }
}
