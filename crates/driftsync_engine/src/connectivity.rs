//! Network availability signal.

use tokio::sync::watch;

/// Publishes network availability changes.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Records the current availability. Subscribers only see edges.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }

    /// Returns true if the network is reported available.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> Connectivity {
        Connectivity {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of a [`ConnectivityMonitor`].
#[derive(Debug, Clone)]
pub struct Connectivity {
    rx: watch::Receiver<bool>,
}

impl Connectivity {
    /// Returns true if the network is reported available.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for the next availability edge and returns the new state.
    ///
    /// Returns `None` once the monitor is dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Waits until the network is reported available.
    ///
    /// Returns false if the monitor is dropped while offline.
    pub async fn wait_online(&mut self) -> bool {
        self.rx.wait_for(|online| *online).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_edges() {
        let monitor = ConnectivityMonitor::new(true);
        let mut connectivity = monitor.subscribe();
        assert!(connectivity.is_online());

        monitor.set_online(false);
        assert_eq!(connectivity.changed().await, Some(false));
        assert!(!connectivity.is_online());

        monitor.set_online(true);
        assert!(connectivity.wait_online().await);
    }

    #[tokio::test]
    async fn repeated_state_is_not_an_edge() {
        let monitor = ConnectivityMonitor::new(true);
        let connectivity = monitor.subscribe();

        monitor.set_online(true);
        assert!(!connectivity.rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn dropped_monitor_ends_stream() {
        let monitor = ConnectivityMonitor::new(false);
        let mut connectivity = monitor.subscribe();
        drop(monitor);

        assert_eq!(connectivity.changed().await, None);
        assert!(!connectivity.wait_online().await);
    }
}
