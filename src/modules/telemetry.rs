// Measurement events for the telemetry collaborator. Fire-and-forget: nothing
// here waits for, or reads, a response.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Campaign {
    Test,
}

impl Campaign {
    pub fn as_server_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementEvent {
    pub category: String,
    pub action: String,
    pub campaign_id: String,
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl MeasurementEvent {
    pub fn new(category: &str, action: &str, campaign: Campaign, name: &str, value: f64) -> Self {
        Self {
            category: category.to_string(),
            action: action.to_string(),
            campaign_id: campaign.as_server_str().to_string(),
            name: name.to_string(),
            value,
            timestamp: Utc::now(),
        }
    }
}

pub trait MeasurementSink: Send + Sync {
    fn measure_event(&self, event: MeasurementEvent);
}

/// Forwards events to whoever uploads them.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<MeasurementEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MeasurementEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MeasurementSink for ChannelSink {
    fn measure_event(&self, event: MeasurementEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("[Telemetry] Uploader gone, event dropped");
        }
    }
}

/// Logs events instead of uploading them.
pub struct LogSink;

impl MeasurementSink for LogSink {
    fn measure_event(&self, event: MeasurementEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!("[Telemetry] {}", json),
            Err(e) => log::warn!("[Telemetry] Unserialisable event: {}", e),
        }
    }
}

/// The "how long did startup feel" rating, 1 to 5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupTimeFeedback {
    rating: Option<u8>,
}

impl StartupTimeFeedback {
    pub const CATEGORY: &'static str = "user-feedback";
    pub const ACTION: &'static str = "startup-success";
    pub const NAME: &'static str = "perceived_startup_time";

    /// Selects `rating`, replacing any earlier choice. Out-of-range ratings
    /// clear the selection.
    pub fn select(&mut self, rating: u8) {
        self.rating = (1..=5).contains(&rating).then_some(rating);
    }

    /// The recorded value; 0.0 while nothing is selected.
    pub fn value(&self) -> f64 {
        self.rating.map(f64::from).unwrap_or(0.0)
    }

    /// Sends the rating. Without a selection this does nothing and returns false.
    pub fn submit(&self, sink: &dyn MeasurementSink) -> bool {
        if self.rating.is_none() {
            log::debug!("[Telemetry] Feedback submitted without a rating, ignoring");
            return false;
        }
        sink.measure_event(MeasurementEvent::new(
            Self::CATEGORY,
            Self::ACTION,
            Campaign::Test,
            Self::NAME,
            self.value(),
        ));
        true
    }
}
