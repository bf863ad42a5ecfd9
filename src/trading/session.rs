//! Handle to a controller running on its worker task.

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use super::controller::TradingController;
use super::events::{ControllerStatus, TradingEvent};
use super::{RunControl, RunState};

pub struct TradingSession {
    control: RunControl,
    status: watch::Receiver<ControllerStatus>,
    events: broadcast::Sender<TradingEvent>,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<TradingController>,
}

impl TradingSession {
    pub(crate) fn new(
        control: RunControl,
        status: watch::Receiver<ControllerStatus>,
        events: broadcast::Sender<TradingEvent>,
        shutdown: oneshot::Sender<()>,
        worker: JoinHandle<TradingController>,
    ) -> Self {
        Self {
            control,
            status,
            events,
            shutdown,
            worker,
        }
    }

    /// Begin trading. Returns `false` if already running.
    pub fn start(&self) -> bool {
        self.control.start()
    }

    /// Stop after the in-flight cycle, if any. Returns `false` if already stopped.
    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    pub fn state(&self) -> RunState {
        self.control.state()
    }

    /// Cloneable control handle, e.g. for a signal handler.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn status(&self) -> ControllerStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradingEvent> {
        self.events.subscribe()
    }

    /// Stop trading, wait for the worker to finish its current cycle and
    /// hand the controller back.
    pub async fn shutdown(self) -> Result<TradingController, JoinError> {
        self.control.stop();
        // The worker may already be gone; its join result reports that.
        let _ = self.shutdown.send(());
        self.worker.await
    }
}
