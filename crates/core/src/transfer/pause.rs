//! Pause gate shared by the orchestrator and the transfer engine.
//!
//! Pausing never interrupts a chunk in flight: the gate is only consulted
//! between jobs and between chunks.

use tokio::sync::watch;

/// Create a connected control/gate pair, initially running.
pub fn pause_gate() -> (PauseControl, PauseGate) {
    let (tx, rx) = watch::channel(false);
    (PauseControl { tx }, PauseGate { rx })
}

/// Write side of the pause gate.
#[derive(Debug)]
pub struct PauseControl {
    tx: watch::Sender<bool>,
}

impl PauseControl {
    /// Request a pause. Returns true if the state changed.
    pub fn pause(&self) -> bool {
        self.tx.send_if_modified(|paused| !std::mem::replace(paused, true))
    }

    /// Lift a pause. Returns true if the state changed.
    pub fn resume(&self) -> bool {
        self.tx.send_if_modified(|paused| std::mem::replace(paused, false))
    }

    pub fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    /// A new gate observing this control.
    pub fn gate(&self) -> PauseGate {
        PauseGate {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the pause gate.
#[derive(Debug, Clone)]
pub struct PauseGate {
    rx: watch::Receiver<bool>,
}

impl PauseGate {
    /// A gate that is never paused.
    pub fn open() -> Self {
        let (_control, gate) = pause_gate();
        gate
    }

    pub fn is_paused(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the gate is not paused. Returns true if it had to wait.
    ///
    /// A dropped control counts as resumed.
    pub async fn wait_while_paused(&mut self) -> bool {
        if !self.is_paused() {
            return false;
        }
        let _ = self.rx.wait_for(|paused| !*paused).await;
        true
    }
}
