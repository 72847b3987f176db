//! Lifecycle enforcement around a device adapter
//!
//! Each operation is a transition to a target state driven by an adapter
//! action. The action runs with the device lock held; the new state is
//! committed only if it succeeds.

use crate::driver::adapter::{Adapter, AudioAdapter, VideoAdapter};
use crate::driver::state::DeviceState;
use crate::error::{Error, Result};
use crate::media::{AudioReader, MediaProperties, VideoReader};
use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use uuid::Uuid;

struct Guarded<A> {
    state: DeviceState,
    adapter: A,
}

/// An adapter wrapped with its state machine
pub struct Lifecycle<A> {
    id: String,
    inner: Mutex<Guarded<A>>,
}

impl<A: Adapter> Lifecycle<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            inner: Mutex::new(Guarded {
                state: DeviceState::Closed,
                adapter,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for any transition in flight
    pub async fn status(&self) -> DeviceState {
        self.inner.lock().await.state
    }

    pub async fn properties(&self) -> Vec<MediaProperties> {
        self.inner.lock().await.adapter.properties()
    }

    pub async fn open(&self) -> Result<()> {
        self.transition(DeviceState::Opened, |adapter| adapter.open())
            .await
    }

    /// Close from any state; closing a closed device does nothing
    pub async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state.is_closed() {
            log::trace!("device {} already closed", self.id);
            return Ok(());
        }
        self.commit(&mut inner, DeviceState::Closed, |adapter| adapter.close())
            .await
    }

    async fn transition<T, F>(&self, target: DeviceState, action: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut A) -> BoxFuture<'a, Result<T>>,
    {
        let mut inner = self.inner.lock().await;
        self.commit(&mut inner, target, action).await
    }

    async fn commit<T, F>(&self, inner: &mut Guarded<A>, target: DeviceState, action: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut A) -> BoxFuture<'a, Result<T>>,
    {
        let from = inner.state;
        if !from.can_transition_to(&target) {
            return Err(Error::InvalidTransition { from, to: target });
        }

        match action(&mut inner.adapter).await {
            Ok(value) => {
                log::debug!("device {}: {} -> {}", self.id, from, target);
                inner.state = target;
                Ok(value)
            }
            Err(e) => {
                log::warn!("device {}: {} -> {} failed: {}", self.id, from, target, e);
                Err(e)
            }
        }
    }
}

impl<A: VideoAdapter> Lifecycle<A> {
    pub async fn video_record(&self, props: MediaProperties) -> Result<VideoReader> {
        self.transition(DeviceState::Running, move |adapter| adapter.video_record(props))
            .await
    }
}

impl<A: AudioAdapter> Lifecycle<A> {
    pub async fn audio_record(&self, props: MediaProperties) -> Result<AudioReader> {
        self.transition(DeviceState::Running, move |adapter| adapter.audio_record(props))
            .await
    }
}

impl<A> std::fmt::Debug for Lifecycle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle").field("id", &self.id).finish()
    }
}
