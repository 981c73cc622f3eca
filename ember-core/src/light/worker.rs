//! The dedicated lighting thread.
//!
//! Producers enqueue update requests on the engine from anywhere; this
//! thread is the only place passes run. It paces itself on the simulation's
//! tick signal and sleeps in short increments when there is nothing to do,
//! so it neither spins nor outruns the renderer sampling the raster.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use super::engine::LightEngine;

/// Handle to the lighting thread. Stops and joins on drop.
pub struct LightWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LightWorker {
    /// Idle sleep granularity.
    const IDLE_SLEEP: Duration = Duration::from_millis(2);

    /// Spawns the lighting thread over the given engine.
    #[must_use]
    pub fn spawn(engine: Arc<LightEngine>) -> Self {
        let running = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("ember-light".to_owned())
            .spawn(move || {
                while flag.load(Ordering::Acquire) {
                    if engine.take_tick() || engine.has_pending() {
                        engine.process_pass();
                    } else {
                        std::thread::sleep(Self::IDLE_SLEEP);
                    }
                }
                log::debug!("lighting thread stopped");
            })
            .unwrap_or_else(|error| panic!("failed to spawn lighting thread: {error}"));

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stops the thread and waits for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LightWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
