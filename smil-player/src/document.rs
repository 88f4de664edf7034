//! Timed document: node tree, element lifecycle, listeners and the timer queue
//!
//! A [`Document`] owns every node of one presentation together with the
//! document-wide timer queue. The host drives it by calling
//! [`Document::advance_to`] with its own monotonic clock; everything the
//! engine wants the outside world to see goes through the [`Host`] callbacks.
//!
//! All mutation happens on the caller's thread. Lifecycle calls cascade
//! synchronously (a finishing child tells its parent, which may finish in
//! turn) and only timers re-enter the engine later.

use std::collections::HashMap;

use smil_common::events::{ElementRef, EngineEvent};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::host::{Host, NullHost};
use crate::signal::{Connection, ConnectionId, EventKind};
use crate::timer::{Postpone, TimerId, TimerInfo, TimerQueue, TimerTag, Wake};
use crate::timing::{Fill, Runtime, TimingState};
use crate::tree::{Children, Node, NodeId, NodeKind, NodeState, NodeStore};

/// A timed document and its scheduler
pub struct Document<H: Host = NullHost> {
    pub(crate) store: NodeStore,
    root: NodeId,
    /// `id` attribute → element
    pub(crate) ids: HashMap<String, NodeId>,
    timers: TimerQueue,
    host: H,
    now_ms: u64,
    next_connection: u64,
    advancing: bool,
    finished: bool,
}

impl Default for Document<NullHost> {
    fn default() -> Self {
        Self::new(NullHost)
    }
}

impl<H: Host> Document<H> {
    /// Empty document with only its root node
    pub fn new(host: H) -> Self {
        let mut store = NodeStore::new();
        let root = store.insert(Node::new(NodeKind::Document, "#document"));
        Self {
            store,
            root,
            ids: HashMap::new(),
            timers: TimerQueue::new(),
            host,
            now_ms: 0,
            next_connection: 0,
            advancing: false,
            finished: false,
        }
    }

    // -- Accessors --

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Current document clock, milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// The root finished
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.store.get(id)
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.store.get(id).map(|n| n.state)
    }

    pub fn runtime(&self, id: NodeId) -> Option<&Runtime> {
        self.store.get(id).and_then(Node::runtime)
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.store.children(id)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.store.get(id).and_then(|n| n.attribute(name))
    }

    /// Element carrying `id="<name>"`
    pub fn find_by_id(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    /// Timer queue, read-only
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Reference used in notifications and log lines
    pub fn element_ref(&self, id: NodeId) -> ElementRef {
        let (tag, label) = match self.store.get(id) {
            Some(node) => (
                node.tag.clone(),
                node.element_id()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}#{}", node.tag, id.index())),
            ),
            None => (String::new(), format!("stale#{}", id.index())),
        };
        ElementRef {
            node: id.index(),
            tag,
            label,
        }
    }

    pub(crate) fn element_label(&self, id: NodeId) -> String {
        self.element_ref(id).label
    }

    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.host.notify(&event);
    }

    // -- Tree construction and editing --

    /// Create `<tag>` under `parent` using the parent's child factory.
    ///
    /// Tags the parent does not know become opaque [`NodeKind::Unknown`]
    /// placeholders.
    pub(crate) fn open_child(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        let kind = self.store[parent].kind.child_from_tag(tag).unwrap_or_else(|| {
            debug!(
                "Unknown element <{}> inside <{}>, keeping it as placeholder",
                tag, self.store[parent].tag
            );
            NodeKind::Unknown
        });
        let mut node = Node::new(kind, tag);
        node.attributes = attributes;
        let id = self.store.insert(node);
        self.store.append_child(parent, id);
        id
    }

    /// The element's end tag was seen: read typed fields and index its id
    pub(crate) fn close_node(&mut self, id: NodeId) {
        let Some(node) = self.store.get_mut(id) else {
            return;
        };
        node.closed = true;
        node.sync_typed_fields();
        if let Some(name) = node.element_id().map(str::to_string) {
            self.register_id(name, id);
        }
        if matches!(self.store[id].kind, NodeKind::Layout) {
            self.ensure_root_layout(id);
        }
    }

    /// Append character data to `parent`, merging with a trailing text node
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str, cdata: bool) {
        if text.is_empty() {
            return;
        }
        if !cdata {
            if let Some(last) = self.store[parent].last_child {
                if matches!(self.store[last].kind, NodeKind::Text) {
                    self.store[last].text.push_str(text);
                    return;
                }
            }
        }
        let (kind, tag) = if cdata {
            (NodeKind::CData, "#cdata-section")
        } else {
            (NodeKind::Text, "#text")
        };
        let mut node = Node::new(kind, tag);
        node.text = text.to_string();
        node.closed = true;
        let id = self.store.insert(node);
        self.store.append_child(parent, id);
    }

    /// Create and close an element under `parent` in one step
    pub fn create_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<NodeId> {
        self.check_alive(parent)?;
        let attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let id = self.open_child(parent, tag, attributes);
        self.close_node(id);
        Ok(id)
    }

    /// Append a detached node (e.g. from [`Document::clone_subtree`])
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_alive(parent)?;
        self.check_alive(child)?;
        if parent == child || self.store.ancestors(parent).any(|a| a == child) {
            return Err(Error::InvalidInput(format!(
                "{} cannot become a descendant of itself",
                self.element_label(child)
            )));
        }
        self.store.append_child(parent, child);
        for node in self.store.descendants(child) {
            if let Some(name) = self.store[node].element_id().map(str::to_string) {
                self.ids.entry(name).or_insert(node);
            }
        }
        Ok(())
    }

    /// Detach and drop `child` and its subtree.
    ///
    /// Active nodes are deactivated first so their timers and subscriptions
    /// go away with them.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_alive(parent)?;
        self.check_alive(child)?;
        if self.store[child].parent != Some(parent) {
            return Err(Error::InvalidInput(format!(
                "{} is not a child of {}",
                self.element_label(child),
                self.element_label(parent)
            )));
        }
        if self.store[child].state.is_active() {
            self.deactivate(child);
        }
        self.store.unlink(child);
        for node in self.store.descendants(child) {
            self.runtime_dispose(node);
            self.release_deferral(node);
            let wake = self.timers.cancel_node(node, self.now_ms);
            self.apply_wake(wake);
            self.ids.retain(|_, target| *target != node);
            self.store.remove(node);
        }
        Ok(())
    }

    /// Deep copy of a subtree as a detached, inactive tree.
    ///
    /// Copies are not indexed by id until appended.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId> {
        self.check_alive(id)?;
        let copy = {
            let source = &self.store[id];
            let mut node = Node::new(source.kind.pristine(), &source.tag);
            node.attributes = source.attributes.clone();
            node.text = source.text.clone();
            node.auxiliary = source.auxiliary;
            node.closed = source.closed;
            node.sync_typed_fields();
            node
        };
        let copy = self.store.insert(copy);
        for child in self.store.child_ids(id) {
            let child_copy = self.clone_subtree(child)?;
            self.store.append_child(copy, child_copy);
        }
        Ok(copy)
    }

    /// Set an attribute, re-reading typed fields and timing parameters
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.check_alive(id)?;
        let node = &mut self.store[id];
        node.set_attribute(name, value);
        node.sync_typed_fields();
        if name == "id" {
            self.ids.retain(|_, target| *target != id);
            self.register_id(value.to_string(), id);
        }
        self.parse_timing_param(id, name, value);
        Ok(())
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        self.check_alive(id)?;
        let node = &mut self.store[id];
        let previous = node.remove_attribute(name);
        node.sync_typed_fields();
        if name == "id" {
            self.ids.retain(|_, target| *target != id);
        }
        Ok(previous)
    }

    fn register_id(&mut self, name: String, id: NodeId) {
        if let Some(existing) = self.ids.get(&name) {
            if *existing != id && self.store.is_alive(*existing) {
                warn!("Duplicate id '{}', keeping the first element", name);
                return;
            }
        }
        self.ids.insert(name, id);
    }

    fn check_alive(&self, id: NodeId) -> Result<()> {
        if self.store.is_alive(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("node {id}")))
        }
    }

    // -- Lifecycle --

    /// Activate the root: start playing the document
    pub fn start(&mut self) {
        self.finished = false;
        self.activate(self.root);
    }

    /// Activate a node (from `Init` or `Deactivated`)
    pub fn activate(&mut self, id: NodeId) {
        let Some(node) = self.store.get(id) else {
            return;
        };
        if !matches!(node.state, NodeState::Init | NodeState::Deactivated) {
            invariant_violation!(
                "activate() on {} in state {:?}",
                self.element_label(id),
                node.state
            );
            return;
        }
        let timed = node.kind.is_timed();
        let container = node.kind.is_container();
        let switch = matches!(node.kind, NodeKind::Switch(_));
        self.store[id].state = NodeState::Activated;
        trace!("{} activated", self.element_label(id));

        if timed {
            if let Some(timed) = self.store[id].timed.as_mut() {
                timed.started = false;
                timed.ended = false;
            }
            if switch {
                self.switch_choose(id);
            }
            self.runtime_init(id);
            let element = self.element_ref(id);
            self.emit(EngineEvent::ElementActivated {
                element,
                time_ms: self.now_ms,
            });
            self.runtime_begin(id);
        } else if container {
            match self.next_element(self.store[id].first_child) {
                Some(first) => self.activate(first),
                None => self.finish(id),
            }
        } else {
            // static content completes at once
            self.finish(id);
        }
    }

    /// Finish an unfinished node and tell its parent
    pub fn finish(&mut self, id: NodeId) {
        let Some(node) = self.store.get(id) else {
            return;
        };
        if !node.state.is_unfinished() {
            if !node.state.is_active() {
                invariant_violation!(
                    "finish() on inactive {} in state {:?}",
                    self.element_label(id),
                    node.state
                );
            }
            return;
        }
        let timed = node.kind.is_timed();
        let parent = node.parent;
        self.store[id].state = NodeState::Finished;
        trace!("{} finished", self.element_label(id));
        if timed {
            self.finish_timed(id);
        }

        match parent {
            Some(parent) => self.child_done(parent, id),
            None if id == self.root => {
                self.finished = true;
                debug!("Document finished at {}ms", self.now_ms);
                self.emit(EngineEvent::DocumentFinished {
                    time_ms: self.now_ms,
                });
            }
            None => {}
        }
    }

    fn finish_timed(&mut self, id: NodeId) {
        if let Some(timed) = self.store[id].timed.as_mut() {
            timed.finish_time = self.now_ms;
            timed.ended = true;
        }
        self.release_deferral(id);
        self.runtime_halt(id);
        // parent is finished already, so these childDone calls are ignored
        for child in self.store.child_ids(id) {
            if self.store[child].state.is_unfinished() {
                self.finish(child);
            }
        }
        if matches!(self.store[id].kind, NodeKind::Excl(_)) {
            self.excl_disconnect(id);
        }
        if self.effective_fill(id) == Fill::Unknown {
            self.remove_effects(id);
        }
        let element = self.element_ref(id);
        self.emit(EngineEvent::ElementFinished {
            element,
            time_ms: self.now_ms,
        });
        self.notify_listeners(id, EventKind::Stopped);
    }

    /// A child finished; let the parent's scheduling semantics decide
    pub(crate) fn child_done(&mut self, parent: NodeId, child: NodeId) {
        let Some(node) = self.store.get(parent) else {
            return;
        };
        if !node.state.is_unfinished() {
            return;
        }
        match node.kind {
            NodeKind::Seq(_) => self.seq_child_done(parent, child),
            NodeKind::Par | NodeKind::Excl(_) | NodeKind::Switch(_) => {
                self.runtime_propagate_stop(parent, false)
            }
            NodeKind::Document | NodeKind::Smil => {
                let next = self.store[child].next_sibling;
                match self.next_element(next) {
                    Some(next) => self.activate(next),
                    None => self.finish(parent),
                }
            }
            _ => {}
        }
    }

    /// Deactivate an active node and, first, its active children
    pub fn deactivate(&mut self, id: NodeId) {
        let Some(node) = self.store.get(id) else {
            return;
        };
        if !node.state.is_active() {
            invariant_violation!(
                "deactivate() on inactive {} in state {:?}",
                self.element_label(id),
                node.state
            );
            return;
        }
        let timed = node.kind.is_timed();
        self.store[id].state = NodeState::Deactivated;
        for child in self.store.child_ids(id) {
            if self.store[child].state.is_active() {
                self.deactivate(child);
            }
        }
        if timed {
            self.release_deferral(id);
            if matches!(self.store[id].kind, NodeKind::Excl(_)) {
                self.excl_disconnect(id);
            }
            if self.effective_fill(id) != Fill::Hold {
                self.remove_effects(id);
            } else {
                self.forget_effects(id);
            }
            self.runtime_dispose(id);
            let element = self.element_ref(id);
            self.emit(EngineEvent::ElementDeactivated {
                element,
                time_ms: self.now_ms,
            });
        }
        trace!("{} deactivated", self.element_label(id));
    }

    /// Return a subtree to `Init`, cancelling all timers and subscriptions
    pub fn reset(&mut self, id: NodeId) {
        let Some(node) = self.store.get(id) else {
            return;
        };
        let timed = node.kind.is_timed();
        for child in self.store.child_ids(id) {
            if self.store[child].state != NodeState::Init {
                self.reset(child);
            }
        }
        if timed {
            self.release_deferral(id);
            if matches!(self.store[id].kind, NodeKind::Excl(_)) {
                self.excl_disconnect(id);
            }
            if self.effective_fill(id) != Fill::Hold {
                self.remove_effects(id);
            } else {
                self.forget_effects(id);
            }
            self.runtime_dispose(id);
            if let Some(timed) = self.store[id].timed.as_mut() {
                timed.started = false;
                timed.ended = false;
            }
        }
        self.store[id].state = NodeState::Init;
    }

    /// Hold a started element: all document timers freeze until `undefer`
    pub fn defer(&mut self, id: NodeId) -> Result<()> {
        self.check_alive(id)?;
        if self.store[id].state != NodeState::Began {
            return Err(Error::InvalidState(format!(
                "{} is {:?}, only began elements can be deferred",
                self.element_label(id),
                self.store[id].state
            )));
        }
        let token = self.postpone();
        self.store[id].state = NodeState::Deferred;
        if let Some(timed) = self.store[id].timed.as_mut() {
            timed.deferral = Some(token);
        } else {
            self.resume(token);
        }
        debug!("{} deferred", self.element_label(id));
        Ok(())
    }

    /// Release a deferred element
    pub fn undefer(&mut self, id: NodeId) -> Result<()> {
        self.check_alive(id)?;
        if self.store[id].state != NodeState::Deferred {
            return Err(Error::InvalidState(format!(
                "{} is not deferred",
                self.element_label(id)
            )));
        }
        self.store[id].state = NodeState::Began;
        self.release_deferral(id);
        debug!("{} undeferred", self.element_label(id));
        Ok(())
    }

    fn release_deferral(&mut self, id: NodeId) {
        let token = self
            .store
            .get_mut(id)
            .and_then(|n| n.timed.as_mut())
            .and_then(|t| t.deferral.take());
        if let Some(token) = token {
            self.resume(token);
        }
    }

    /// Kind-specific start of content once the runtime started
    pub(crate) fn begin_content(&mut self, id: NodeId) {
        if self.store[id].state == NodeState::Activated {
            self.store[id].state = NodeState::Began;
        }
        match self.store[id].kind {
            NodeKind::Par => self.par_begin(id),
            NodeKind::Seq(_) => self.seq_begin(id),
            NodeKind::Excl(_) => self.excl_begin(id),
            NodeKind::Switch(_) => self.switch_begin(id),
            NodeKind::Media(..) => self.media_begin(id),
            NodeKind::Set(_) => self.set_apply(id),
            _ => {}
        }
    }

    /// Undo content for the next repeat iteration
    pub(crate) fn rewind_content(&mut self, id: NodeId) {
        if self.store[id].kind.is_group() {
            if matches!(self.store[id].kind, NodeKind::Excl(_)) {
                self.excl_disconnect(id);
            }
            for child in self.store.child_ids(id) {
                if self.store[child].state != NodeState::Init {
                    self.reset(child);
                }
            }
        } else {
            for child in self.store.child_ids(id) {
                if self.store[child].state != NodeState::Init {
                    self.reset(child);
                }
            }
            self.remove_effects(id);
        }
    }

    /// Remove visible effects: hide media, revert `set`
    fn remove_effects(&mut self, id: NodeId) {
        match self.store[id].kind {
            NodeKind::Media(..) => self.media_hide(id),
            NodeKind::Set(_) => self.set_revert(id),
            _ => {}
        }
    }

    /// Keep effects for good (fill=hold)
    fn forget_effects(&mut self, id: NodeId) {
        match self.store[id].kind {
            NodeKind::Set(_) => self.set_forget(id),
            NodeKind::Media(..) => self.media_hide(id),
            _ => {}
        }
    }

    /// First element node at or after `from` among its siblings
    pub(crate) fn next_element(&self, from: Option<NodeId>) -> Option<NodeId> {
        let mut current = from;
        while let Some(id) = current {
            if self.store[id].kind.is_element() {
                return Some(id);
            }
            current = self.store[id].next_sibling;
        }
        None
    }

    /// First timed element at or after `from` among its siblings
    pub(crate) fn next_timed(&self, from: Option<NodeId>) -> Option<NodeId> {
        let mut current = from;
        while let Some(id) = current {
            if self.store[id].kind.is_timed() {
                return Some(id);
            }
            current = self.store[id].next_sibling;
        }
        None
    }

    pub(crate) fn timed_children(&self, id: NodeId) -> Vec<NodeId> {
        self.store
            .children(id)
            .filter(|c| self.store[*c].kind.is_timed())
            .collect()
    }

    // -- Listeners --

    pub(crate) fn connect(&mut self, sender: NodeId, kind: EventKind, listener: NodeId) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        if let Some(node) = self.store.get_mut(sender) {
            node.listeners.push(Connection { id, kind, listener });
        }
        id
    }

    pub(crate) fn disconnect(&mut self, sender: NodeId, connection: ConnectionId) {
        if let Some(node) = self.store.get_mut(sender) {
            node.listeners.retain(|c| c.id != connection);
        }
    }

    /// Deliver `kind` from `sender` to its listeners.
    ///
    /// Iterates a snapshot; connections dropped by an earlier listener are
    /// skipped.
    pub(crate) fn notify_listeners(&mut self, sender: NodeId, kind: EventKind) {
        let Some(node) = self.store.get(sender) else {
            return;
        };
        let targets: Vec<(ConnectionId, NodeId)> = node
            .listeners
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| (c.id, c.listener))
            .collect();
        for (connection, listener) in targets {
            let live = self
                .store
                .get(sender)
                .is_some_and(|n| n.listeners.iter().any(|c| c.id == connection));
            if !live || !self.store.is_alive(listener) {
                continue;
            }
            if kind == EventKind::AboutToStart
                && matches!(self.store[listener].kind, NodeKind::Excl(_))
            {
                self.excl_child_starting(listener, sender);
            } else {
                self.runtime_process_event(listener, kind, sender);
            }
        }
    }

    /// Deliver a pointer event (activate, in/out of bounds) to `id`
    pub fn deliver_event(&mut self, id: NodeId, kind: EventKind) -> Result<()> {
        self.check_alive(id)?;
        if !matches!(
            kind,
            EventKind::Activated | EventKind::InBounds | EventKind::OutBounds
        ) {
            return Err(Error::InvalidInput(format!(
                "{kind:?} is raised by the engine, not delivered"
            )));
        }
        debug!("{:?} on {}", kind, self.element_label(id));
        self.notify_listeners(id, kind);
        Ok(())
    }

    /// Start an element waiting for its begin trigger now
    /// (e.g. `begin="indefinite"`)
    pub fn begin_element(&mut self, id: NodeId) -> Result<()> {
        self.check_alive(id)?;
        if !self.store[id].state.is_unfinished() {
            return Err(Error::InvalidState(format!(
                "{} is not active",
                self.element_label(id)
            )));
        }
        match self.runtime(id).map(|rt| rt.timing_state()) {
            Some(TimingState::Began) => {
                self.runtime_propagate_start(id);
                Ok(())
            }
            Some(state) => {
                debug!("{} already {:?}, begin ignored", self.element_label(id), state);
                Ok(())
            }
            None => Err(Error::InvalidState(format!(
                "{} is not a timed element",
                self.element_label(id)
            ))),
        }
    }

    // -- Timers --

    /// Schedule a timer for `node` `delay_ds` deci-seconds from now
    pub fn set_timeout(&mut self, node: NodeId, delay_ds: i64, tag: TimerTag) -> TimerId {
        let (id, wake) = self.timers.schedule(node, delay_ds, tag, self.now_ms);
        self.apply_wake(wake);
        id
    }

    /// Cancel a timer; unknown or already fired ids are ignored
    pub fn cancel_timer(&mut self, id: TimerId) {
        let wake = self.timers.cancel(id, self.now_ms);
        self.apply_wake(wake);
    }

    /// Earliest pending deadline (ms), `None` while postponed or idle
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Freeze all timers until the returned token is resumed
    pub fn postpone(&mut self) -> Postpone {
        let (token, wake) = self.timers.postpone(self.now_ms);
        self.apply_wake(wake);
        token
    }

    /// Release a postponement; the last one shifts all deadlines
    pub fn resume(&mut self, token: Postpone) {
        let wake = self.timers.resume(token, self.now_ms);
        self.apply_wake(wake);
    }

    /// Advance the document clock to `now_ms`, firing every due timer in
    /// deadline order.
    pub fn advance_to(&mut self, now_ms: u64) {
        if self.advancing {
            invariant_violation!("advance_to() re-entered from a timer handler");
            return;
        }
        if now_ms < self.now_ms {
            warn!("Clock went backwards ({}ms < {}ms), ignoring", now_ms, self.now_ms);
        }
        let target = now_ms.max(self.now_ms);
        self.timers.wake_consumed();
        self.advancing = true;
        while let Some(timer) = self.timers.pop_due(target) {
            self.now_ms = self.now_ms.max(timer.deadline_ms);
            self.fire_timer(&timer);
            let wake = self.timers.sync_wake(self.now_ms);
            self.apply_wake(wake);
        }
        self.advancing = false;
        self.now_ms = target;
        let wake = self.timers.sync_wake(self.now_ms);
        self.apply_wake(wake);
    }

    fn fire_timer(&mut self, timer: &TimerInfo) {
        trace!(?timer.tag, node = %timer.node, deadline = timer.deadline_ms, "Timer fired");
        if self.store.is_alive(timer.node) {
            self.runtime_timer(timer.node, timer.tag, timer.id);
        }
    }

    fn apply_wake(&mut self, wake: Wake) {
        match wake {
            Wake::Arm { delay_ms } => self.host.arm_wake(delay_ms),
            Wake::Disarm => self.host.disarm_wake(),
            Wake::Keep => {}
        }
    }
}
