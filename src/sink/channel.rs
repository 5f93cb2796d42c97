use super::FrameSink;
use crate::frame::ArcFrame;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Sender};
use log::{debug, error};
use std::thread::{self, JoinHandle};

/// Runs another sink on a worker thread behind a bounded channel.
///
/// Sending blocks while the channel is full, so a slow consumer throttles the
/// session instead of frames piling up.
pub struct ChannelSink {
    name: String,
    sender: Option<Sender<ArcFrame>>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl ChannelSink {
    pub fn spawn<S: FrameSink + 'static>(mut inner: S, capacity: usize) -> Result<Self> {
        let name = format!("channel({})", inner.name());
        let (sender, receiver) = bounded::<ArcFrame>(capacity.max(1));
        let worker = thread::Builder::new()
            .name(format!("sink-{}", inner.name()))
            .spawn(move || {
                for frame in receiver.iter() {
                    if let Err(e) = inner.on_frame(frame) {
                        error!("Sink {} failed: {:#}", inner.name(), e);
                        let _ = inner.finish();
                        return Err(e);
                    }
                }
                inner.finish()
            })
            .context("Failed to spawn sink worker thread")?;
        debug!("Spawned {} with capacity {}", name, capacity.max(1));
        Ok(Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn join(&mut self) -> Result<()> {
        drop(self.sender.take());
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| anyhow!("Sink worker thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl FrameSink for ChannelSink {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("{} is already finished", self.name))?;
        if sender.send(frame).is_err() {
            // The worker only hangs up after a failure; surface it.
            self.join()?;
            return Err(anyhow!("{} stopped accepting frames", self.name));
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.join()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            error!("{} failed while shutting down: {:#}", self.name, e);
        }
    }
}
