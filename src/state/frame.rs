//! Frame scheduling for coalesced renders

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use super::store::StateStore;

/// Arranges for [`StateStore::flush_renders`] to run on the next frame
pub trait FrameScheduler {
    fn request_frame(&self, store: &StateStore);
}

/// Flushes one frame interval later on the current `LocalSet`
#[derive(Debug, Clone, Copy)]
pub struct TokioFrames {
    interval: Duration,
}

impl TokioFrames {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl FrameScheduler for TokioFrames {
    fn request_frame(&self, store: &StateStore) {
        let store = store.clone();
        let interval = self.interval;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(interval).await;
            store.flush_renders();
        });
    }
}

/// Records frame requests and leaves flushing to the caller
#[derive(Debug, Clone, Default)]
pub struct ManualFrames {
    requested: Rc<Cell<usize>>,
}

impl ManualFrames {
    pub fn requested(&self) -> usize {
        self.requested.get()
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&self, _store: &StateStore) {
        self.requested.set(self.requested.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AppState, StateChange};

    #[tokio::test(start_paused = true)]
    async fn tokio_frames_flush_after_one_interval() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let store = StateStore::new(
                    AppState::default(),
                    TokioFrames::new(Duration::from_millis(16)),
                );
                store.set(StateChange::UiRecording(true));
                store.set(StateChange::UiRecording(false));
                assert!(store.render_pending());

                tokio::time::sleep(Duration::from_millis(20)).await;
                assert!(!store.render_pending());
            })
            .await;
    }
}
