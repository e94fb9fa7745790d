use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use tokio::sync::broadcast;

use super::GpsSample;

/// A push source of location fixes.
///
/// The timing controller calls `start_updates` when a session begins or
/// resumes and `stop_updates` when it pauses or stops. Permission handling
/// and provider errors stay on the host side: a failing provider simply
/// stops publishing.
pub trait GeoSampler: Send + Sync {
    fn start_updates(&self);
    fn stop_updates(&self);
    fn subscribe(&self) -> broadcast::Receiver<GpsSample>;
}

/// Broadcast-backed sampler the host feeds from its location callback.
pub struct ChannelSampler {
    sender: broadcast::Sender<GpsSample>,
    active: AtomicBool,
}

impl ChannelSampler {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Delivers a fix to current subscribers. Returns the number of receivers
    /// reached; fixes published while updates are stopped, or with nobody
    /// listening, are dropped.
    pub fn publish(&self, sample: GpsSample) -> usize {
        if !self.is_active() {
            debug!("location updates stopped, dropping fix at {}", sample.timestamp);
            return 0;
        }
        self.sender.send(sample).unwrap_or(0)
    }
}

impl GeoSampler for ChannelSampler {
    fn start_updates(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    fn stop_updates(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn subscribe(&self) -> broadcast::Receiver<GpsSample> {
        self.sender.subscribe()
    }
}
