//! Host interface
//!
//! The engine does not own a clock or a renderer. The host arms a single
//! wake-up for the engine, resolves media lengths, decides bitrate
//! preferences and receives every externally visible effect as an
//! [`EngineEvent`].

use smil_common::EngineEvent;

use crate::tree::NodeId;

/// Bitrate preferences used to choose `switch` alternatives (bits/s)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitRates {
    pub preferred: u32,
    pub max: u32,
}

impl Default for BitRates {
    fn default() -> Self {
        Self {
            preferred: 0,
            max: u32::MAX,
        }
    }
}

/// Callbacks from the engine to its host
pub trait Host {
    /// Wake the engine (call `Document::advance_to`) `delay_ms` from now,
    /// replacing any earlier request.
    fn arm_wake(&mut self, delay_ms: u64) {
        let _ = delay_ms;
    }

    /// Cancel the outstanding wake request
    fn disarm_wake(&mut self) {}

    /// The media element `node` needs the intrinsic length of `src`.
    ///
    /// Answer with `Document::media_length_resolved` or
    /// `Document::media_end_of_content`, now or later.
    fn request_media_length(&mut self, node: NodeId, src: Option<&str>) {
        let _ = (node, src);
    }

    /// Externally visible effect
    fn notify(&mut self, event: &EngineEvent) {
        let _ = event;
    }

    fn bit_rates(&self) -> BitRates {
        BitRates::default()
    }
}

/// Host that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}

/// Host recording every callback, for tests and offline runs
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub events: Vec<EngineEvent>,
    /// Delay of the outstanding wake, if armed
    pub wake: Option<u64>,
    pub wake_requests: usize,
    pub media_requests: Vec<(NodeId, Option<String>)>,
    pub rates: BitRates,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bit_rates(preferred: u32, max: u32) -> Self {
        Self {
            rates: BitRates { preferred, max },
            ..Self::default()
        }
    }

    /// Drain pending media length requests
    pub fn take_media_requests(&mut self) -> Vec<(NodeId, Option<String>)> {
        std::mem::take(&mut self.media_requests)
    }
}

impl Host for RecordingHost {
    fn arm_wake(&mut self, delay_ms: u64) {
        self.wake = Some(delay_ms);
        self.wake_requests += 1;
    }

    fn disarm_wake(&mut self) {
        self.wake = None;
    }

    fn request_media_length(&mut self, node: NodeId, src: Option<&str>) {
        self.media_requests.push((node, src.map(str::to_string)));
    }

    fn notify(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }

    fn bit_rates(&self) -> BitRates {
        self.rates
    }
}
