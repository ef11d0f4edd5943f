//! Network reachability contract

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Answers whether the remote service is worth trying right now
pub trait NetworkMonitor: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Shared on/off flag flipped by whoever observes connectivity
#[derive(Debug, Clone)]
pub struct NetworkFlag(Arc<AtomicBool>);

impl NetworkFlag {
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    pub fn set_online(&self, online: bool) {
        let previous = self.0.swap(online, Ordering::SeqCst);
        if previous != online {
            log::info!("{} Network is now {}", if online { "📶" } else { "📴" }, if online { "online" } else { "offline" });
        }
    }
}

impl Default for NetworkFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkMonitor for NetworkFlag {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
