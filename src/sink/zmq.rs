use super::{FrameSink, FrameSummary};
use crate::frame::ArcFrame;
use anyhow::{Context, Result};
use log::{info, trace};

pub const FRAME_TOPIC: &str = "frame";

/// Publishes a JSON [`FrameSummary`] per frame as `"frame <json>"` on a PUB socket.
pub struct ZmqPublisher {
    publisher: zmq::Socket,
    endpoint: String,
}

impl ZmqPublisher {
    pub fn bind(endpoint: &str) -> Result<Self> {
        let context = zmq::Context::new();
        let publisher = context.socket(zmq::PUB)?;
        publisher
            .bind(endpoint)
            .with_context(|| format!("Failed to bind publisher to {}", endpoint))?;
        info!("Publishing frame summaries on {}", endpoint);
        Ok(Self {
            publisher,
            endpoint: endpoint.to_string(),
        })
    }
}

impl FrameSink for ZmqPublisher {
    fn on_frame(&mut self, frame: ArcFrame) -> Result<()> {
        let payload = serde_json::to_string(&FrameSummary::from(&*frame))?;
        self.publisher
            .send(format!("{} {}", FRAME_TOPIC, payload).as_bytes(), 0)
            .context("Failed to publish frame summary")?;
        trace!("Published frame {} on {}", frame.sequence, self.endpoint);
        Ok(())
    }

    fn name(&self) -> &str {
        "zmq"
    }
}
