//! Shared harness for smil-player integration tests
//!
//! `Player` wraps a [`Document`] driven by a [`RecordingHost`] and a simulated
//! clock, and renders the recorded notifications as a compact trace
//! (`"<ms> <what> <label>"`) so tests can assert on ordering.

#![allow(dead_code)]

use smil_common::events::EngineEvent;
use smil_player::{xml, Document, NodeId, NodeState, RecordingHost, TimingState};

pub struct Player {
    pub doc: Document<RecordingHost>,
}

impl Player {
    /// Parse `source` into a fresh document without starting it
    pub fn load(source: &str) -> Self {
        let mut doc = Document::new(RecordingHost::new());
        xml::parse_str(&mut doc, source).expect("test document parses");
        Self { doc }
    }

    pub fn start(source: &str) -> Self {
        let mut player = Self::load(source);
        player.doc.start();
        player
    }

    pub fn id(&self, name: &str) -> NodeId {
        self.doc
            .find_by_id(name)
            .unwrap_or_else(|| panic!("no element with id '{}'", name))
    }

    pub fn state(&self, name: &str) -> NodeState {
        self.doc.state(self.id(name)).expect("live node")
    }

    pub fn timing(&self, name: &str) -> Option<TimingState> {
        self.doc.runtime(self.id(name)).map(|rt| rt.timing_state())
    }

    /// Advance the simulated clock, one host wake at a time
    pub fn run_until(&mut self, until_ms: u64) {
        while let Some(deadline) = self.doc.next_deadline() {
            if deadline > until_ms {
                break;
            }
            self.doc.advance_to(deadline);
        }
        self.doc.advance_to(until_ms);
    }

    /// Fire whatever is due right now (zero-delay follow-ups)
    pub fn settle(&mut self) {
        let now = self.doc.now_ms();
        self.doc.advance_to(now);
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.doc.host().events
    }

    pub fn trace(&self) -> Vec<String> {
        self.events().iter().filter_map(trace_line).collect()
    }

    /// Trace lines mentioning `label`
    pub fn trace_of(&self, label: &str) -> Vec<String> {
        self.events()
            .iter()
            .filter(|e| e.label() == Some(label))
            .filter_map(trace_line)
            .collect()
    }

    /// Position of `line` in the trace
    pub fn position(&self, line: &str) -> usize {
        let trace = self.trace();
        trace
            .iter()
            .position(|l| l == line)
            .unwrap_or_else(|| panic!("'{}' not in trace {:#?}", line, trace))
    }

    pub fn count(&self, what: &str, label: &str) -> usize {
        let suffix = format!(" {} {}", what, label);
        self.trace().iter().filter(|l| l.ends_with(&suffix)).count()
    }
}

/// Render the scheduling-relevant notifications; media and attribute
/// notifications are left to the tests that care about them.
pub fn trace_line(event: &EngineEvent) -> Option<String> {
    let (what, label) = match event {
        EngineEvent::ElementActivated { element, .. } => ("activated", &element.label),
        EngineEvent::ElementStarted { element, .. } => ("started", &element.label),
        EngineEvent::ElementStopped { element, .. } => ("stopped", &element.label),
        EngineEvent::ElementFinished { element, .. } => ("finished", &element.label),
        EngineEvent::ElementDeactivated { element, .. } => ("deactivated", &element.label),
        EngineEvent::DocumentFinished { time_ms } => {
            return Some(format!("{} document finished", time_ms))
        }
        _ => return None,
    };
    Some(format!("{} {} {}", event.time_ms(), what, label))
}
