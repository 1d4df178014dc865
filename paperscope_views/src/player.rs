//! Year autoplay. The timer lives on its own thread and is joined on
//! drop, so no tick can outlive the dashboard that owns it.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use paperscope_rs::{END_YEAR, START_YEAR};

/// Tick intervals selectable from the controls, slowest first.
pub const SPEED_PRESETS_MS: [u64; 4] = [1200, 800, 400, 200];

/// Advances the playhead. At the final year playback wraps to the year
/// after the start, so the loop never revisits the growth-undefined
/// first year mid-sweep.
pub fn next_loop_year(year: u16) -> u16 {
    if year >= END_YEAR {
        START_YEAR + 1
    } else {
        year + 1
    }
}

pub struct Autoplay {
    ticks: Receiver<()>,
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Autoplay {
    pub fn start(interval: Duration) -> Self {
        let (tick_tx, tick_rx) = bounded::<()>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => match tick_tx.try_send(()) {
                    // A full buffer means the consumer is behind; the
                    // tick is dropped rather than queued up.
                    Ok(()) | Err(TrySendError::Full(())) => {}
                    Err(TrySendError::Disconnected(())) => return,
                },
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        });
        Self {
            ticks: tick_rx,
            stop: stop_tx,
            handle: Some(handle),
        }
    }

    /// Non-blocking poll for an elapsed interval.
    pub fn try_tick(&self) -> bool {
        self.ticks.try_recv().is_ok()
    }
}

impl Drop for Autoplay {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
