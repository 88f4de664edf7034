//! Scheduling semantics of the composite groups
//!
//! - `seq` runs its timed children one after another
//! - `par` runs all of them at once
//! - `excl` runs all of them, but a starting child stops its running siblings
//! - `switch` picks one alternative and runs only that

use tracing::{debug, trace};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::signal::EventKind;
use crate::timing::{Fill, TimingState};
use crate::tree::{NodeId, NodeKind, NodeState};

/// Attributes naming the bitrate of a `switch` alternative
const BITRATE_ATTRIBUTES: [&str; 3] = ["systemBitrate", "system-bitrate", "bitrate"];

impl<H: Host> Document<H> {
    // -- seq --

    pub(crate) fn seq_begin(&mut self, id: NodeId) {
        let jump = match &mut self.store[id].kind {
            NodeKind::Seq(data) => data.jump_target.take(),
            _ => None,
        };
        if let Some(target) = jump.filter(|t| self.store.get(*t).and_then(|n| n.parent) == Some(id)) {
            self.seq_fast_forward(id, target);
            return;
        }
        if let Some(first) = self.next_timed(self.store[id].first_child) {
            self.activate(first);
        }
    }

    pub(crate) fn seq_child_done(&mut self, id: NodeId, child: NodeId) {
        let next = self.next_timed(self.store[child].next_sibling);
        match next {
            Some(next) => {
                if self.effective_fill(child) == Fill::Unknown
                    && self.store[child].state.is_active()
                {
                    self.deactivate(child);
                }
                trace!("{} advances to {}", self.element_label(id), self.element_label(next));
                if matches!(
                    self.store[next].state,
                    NodeState::Init | NodeState::Deactivated
                ) {
                    self.activate(next);
                }
            }
            None => self.runtime_propagate_stop(id, false),
        }
    }

    /// Resume `seq` at `target`, skipping everything before it.
    ///
    /// Preceding children are marked finished without running; when the
    /// `seq` has not begun yet the jump takes effect once it does.
    pub fn seq_jump(&mut self, seq: NodeId, target: NodeId) -> Result<()> {
        let Some(node) = self.store.get(seq) else {
            return Err(Error::NotFound(format!("node {seq}")));
        };
        let state = node.state;
        if !matches!(node.kind, NodeKind::Seq(_)) {
            return Err(Error::InvalidInput(format!(
                "{} is not a seq",
                self.element_label(seq)
            )));
        }
        let valid_target = self
            .store
            .get(target)
            .is_some_and(|t| t.parent == Some(seq) && t.kind.is_timed());
        if !valid_target {
            return Err(Error::InvalidInput(format!(
                "{} is not a timed child of {}",
                self.element_label(target),
                self.element_label(seq)
            )));
        }

        match state {
            NodeState::Began | NodeState::Deferred => {
                debug!("{} jumps to {}", self.element_label(seq), self.element_label(target));
                self.seq_fast_forward(seq, target);
                Ok(())
            }
            NodeState::Finished => Err(Error::InvalidState(format!(
                "{} already finished",
                self.element_label(seq)
            ))),
            _ => {
                if let NodeKind::Seq(data) = &mut self.store[seq].kind {
                    data.jump_target = Some(target);
                }
                Ok(())
            }
        }
    }

    fn seq_fast_forward(&mut self, seq: NodeId, target: NodeId) {
        let mut before_target = true;
        for child in self.timed_children(seq) {
            if child == target {
                before_target = false;
            }
            if self.store[child].state.is_active() {
                self.deactivate(child);
            }
            if self.store[child].state != NodeState::Init {
                self.reset(child);
            }
            if before_target {
                // silently done: no runtime, no effects, no childDone
                self.store[child].state = NodeState::Finished;
            }
        }
        self.activate(target);
    }

    // -- par --

    pub(crate) fn par_begin(&mut self, id: NodeId) {
        for child in self.timed_children(id) {
            if matches!(
                self.store[child].state,
                NodeState::Init | NodeState::Deactivated
            ) {
                self.activate(child);
            }
        }
    }

    /// A `par` without its own duration, holding no nested groups, keeps its
    /// children's effects once they finish.
    pub(crate) fn par_freezes_children(&self, id: NodeId) -> bool {
        let Some(node) = self.store.get(id) else {
            return false;
        };
        if !matches!(node.kind, NodeKind::Par) {
            return false;
        }
        let unset = node
            .runtime()
            .is_some_and(|rt| rt.dur.is_unset_timer() && !rt.end.kind.is_event());
        unset && !self.store.children(id).any(|c| self.store[c].kind.is_group())
    }

    // -- excl --

    pub(crate) fn excl_begin(&mut self, id: NodeId) {
        let children = self.timed_children(id);
        for child in &children {
            let connection = self.connect(*child, EventKind::AboutToStart, id);
            if let NodeKind::Excl(data) = &mut self.store[id].kind {
                data.connections.push((*child, connection));
            }
        }
        for child in children {
            if matches!(
                self.store[child].state,
                NodeState::Init | NodeState::Deactivated
            ) {
                self.activate(child);
            }
        }
    }

    /// `starting` is about to start: stop every running sibling first
    pub(crate) fn excl_child_starting(&mut self, id: NodeId, starting: NodeId) {
        for sibling in self.timed_children(id) {
            if sibling == starting {
                continue;
            }
            let running = self
                .runtime(sibling)
                .is_some_and(|rt| rt.timing_state() == TimingState::Started);
            if running {
                debug!(
                    "{} stops {} for {}",
                    self.element_label(id),
                    self.element_label(sibling),
                    self.element_label(starting)
                );
                self.runtime_propagate_stop(sibling, true);
            }
        }
    }

    pub(crate) fn excl_disconnect(&mut self, id: NodeId) {
        let connections = match &mut self.store[id].kind {
            NodeKind::Excl(data) => std::mem::take(&mut data.connections),
            _ => return,
        };
        for (child, connection) in connections {
            self.disconnect(child, connection);
        }
    }

    // -- switch --

    /// Pick the alternative once: the bitrate-tagged child closest to the
    /// preferred rate within the maximum, else the first untagged timed child,
    /// else the first timed child, else the first child.
    pub(crate) fn switch_choose(&mut self, id: NodeId) {
        let already = matches!(&self.store[id].kind, NodeKind::Switch(data) if data.chosen.is_some());
        if already {
            return;
        }
        let rates = self.host().bit_rates();
        let mut chosen = None;
        let mut chosen_rate: Option<u32> = None;
        let mut first_timed = None;

        for child in self.store.children(id) {
            let node = &self.store[child];
            if !node.kind.is_timed() {
                continue;
            }
            first_timed.get_or_insert(child);
            let rate = BITRATE_ATTRIBUTES
                .iter()
                .find_map(|name| node.attribute(name))
                .and_then(|v| v.trim().parse::<u32>().ok());
            match rate {
                None => {
                    if chosen.is_none() {
                        chosen = Some(child);
                    }
                    break;
                }
                Some(rate) if rate <= rates.max => {
                    let closer = chosen_rate.map_or(true, |current| {
                        rate.abs_diff(rates.preferred) < current.abs_diff(rates.preferred)
                    });
                    if closer {
                        chosen = Some(child);
                        chosen_rate = Some(rate);
                    }
                }
                Some(_) => {}
            }
        }

        let chosen = chosen
            .or(first_timed)
            .or_else(|| self.next_element(self.store[id].first_child));
        debug!(
            "{} chose {}",
            self.element_label(id),
            chosen.map_or_else(|| "nothing".to_string(), |c| self.element_label(c))
        );
        if let NodeKind::Switch(data) = &mut self.store[id].kind {
            data.chosen = chosen;
        }
    }

    pub(crate) fn switch_begin(&mut self, id: NodeId) {
        let chosen = match &self.store[id].kind {
            NodeKind::Switch(data) => data.chosen,
            _ => None,
        };
        if let Some(chosen) = chosen {
            if matches!(
                self.store[chosen].state,
                NodeState::Init | NodeState::Deactivated
            ) {
                self.activate(chosen);
            }
        }
    }

    /// Alternative selected by a `switch`
    pub fn switch_choice(&self, id: NodeId) -> Option<NodeId> {
        match &self.store.get(id)?.kind {
            NodeKind::Switch(data) => data.chosen,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use crate::host::RecordingHost;
    use crate::tree::NodeState;

    fn switch_doc(host: RecordingHost, alternatives: &[(&str, Option<&str>)]) -> Document<RecordingHost> {
        let mut doc = Document::new(host);
        let root = doc.root();
        let switch = doc.create_element(root, "switch", &[("id", "sw")]).unwrap();
        for (id, rate) in alternatives {
            let mut attrs = vec![("id", *id), ("dur", "1s")];
            if let Some(rate) = rate {
                attrs.push(("systemBitrate", rate));
            }
            doc.create_element(switch, "video", &attrs).unwrap();
        }
        doc.start();
        doc
    }

    fn chosen(doc: &Document<RecordingHost>) -> Option<String> {
        let sw = doc.find_by_id("sw")?;
        let choice = doc.switch_choice(sw)?;
        doc.node(choice)?.element_id().map(str::to_string)
    }

    #[test]
    fn test_switch_prefers_closest_bitrate_within_max() {
        let doc = switch_doc(
            RecordingHost::with_bit_rates(300_000, 600_000),
            &[
                ("high", Some("1000000")),
                ("mid", Some("400000")),
                ("low", Some("100000")),
            ],
        );
        assert_eq!(chosen(&doc).as_deref(), Some("mid"));
        let mid = doc.find_by_id("mid").unwrap();
        let high = doc.find_by_id("high").unwrap();
        assert_eq!(doc.state(mid), Some(NodeState::Began));
        assert_eq!(doc.state(high), Some(NodeState::Init));
    }

    #[test]
    fn test_switch_untagged_child_ends_search() {
        let doc = switch_doc(
            RecordingHost::with_bit_rates(300_000, 600_000),
            &[("plain", None), ("mid", Some("300000"))],
        );
        assert_eq!(chosen(&doc).as_deref(), Some("plain"));
    }

    #[test]
    fn test_switch_falls_back_to_first_timed_child() {
        let doc = switch_doc(
            RecordingHost::with_bit_rates(300_000, 100_000),
            &[("a", Some("500000")), ("b", Some("900000"))],
        );
        assert_eq!(chosen(&doc).as_deref(), Some("a"));
    }

    #[test]
    fn test_seq_jump_before_begin_applies_on_begin() {
        let mut doc = Document::new(RecordingHost::new());
        let root = doc.root();
        let seq = doc
            .create_element(root, "seq", &[("begin", "1s")])
            .unwrap();
        let a = doc.create_element(seq, "img", &[("dur", "1s")]).unwrap();
        let b = doc.create_element(seq, "img", &[("dur", "1s")]).unwrap();
        doc.start();

        doc.seq_jump(seq, b).unwrap();
        doc.advance_to(1_000);
        assert_eq!(doc.state(a), Some(NodeState::Finished));
        assert_eq!(doc.runtime(a), None);
        assert_eq!(doc.state(b), Some(NodeState::Began));
    }

    #[test]
    fn test_seq_jump_rejects_foreign_child() {
        let mut doc = Document::new(RecordingHost::new());
        let root = doc.root();
        let seq = doc.create_element(root, "seq", &[]).unwrap();
        let par = doc.create_element(root, "par", &[]).unwrap();
        let img = doc.create_element(par, "img", &[]).unwrap();
        assert!(doc.seq_jump(seq, img).is_err());
        assert!(doc.seq_jump(par, img).is_err());
    }
}
