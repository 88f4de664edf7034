//! Runtime state machine of timed elements
//!
//! ```text
//! reset → began → started → stopped ─┬→ (repeat) began
//!                                    └→ finish
//! ```
//!
//! `begin` arms the begin trigger, `started` arms the active duration,
//! `propagate_stop` is the exit gate deciding whether the element may stop,
//! and the zero-delay `stopped` timer either repeats or finishes the element.

use smil_common::events::EngineEvent;
use smil_common::timing::ms_to_ds;
use tracing::{debug, trace, warn};

use super::duration::{parse_time_value, DurationItem, DurationKind, EventSource, TimeValue};
use crate::document::Document;
use crate::host::Host;
use crate::signal::EventKind;
use crate::timer::{TimerId, TimerTag};
use crate::tree::{NodeId, NodeKind, NodeState};

/// Timing state of a runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimingState {
    Reset,
    /// Begin trigger armed
    Began,
    /// Content is live
    Started,
    /// Stopped, waiting for the deferred repeat-or-finish decision
    Stopped,
}

/// What happens to an element's effects once it finishes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Fill {
    /// Effects are removed when the element finishes
    #[default]
    Unknown,
    /// Effects persist until the element is deactivated or reset
    Freeze,
    /// Last modification is kept; the undo path is skipped entirely
    Hold,
}

impl Fill {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "freeze" => Fill::Freeze,
            "hold" => Fill::Hold,
            _ => Fill::Unknown,
        }
    }
}

/// Repeat count of a runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepeatCount {
    Count(u32),
    Indefinite,
}

impl Default for RepeatCount {
    fn default() -> Self {
        RepeatCount::Count(0)
    }
}

impl RepeatCount {
    /// Parse `indefinite` or a non-negative number (fractions truncate)
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("indefinite") {
            return Some(RepeatCount::Indefinite);
        }
        let count: f64 = value.parse().ok()?;
        (count.is_finite() && count >= 0.0).then(|| RepeatCount::Count(count as u32))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Begin,
    Duration,
    End,
}

/// Timing state machine of one timed element
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runtime {
    pub(crate) state: TimingState,
    pub(crate) begin: DurationItem,
    pub(crate) dur: DurationItem,
    pub(crate) end: DurationItem,
    pub(crate) fill: Fill,
    /// Configured repeat count
    pub(crate) repeat: RepeatCount,
    /// Repeats left in the current activation
    pub(crate) repeats_left: RepeatCount,
    pub(crate) begin_timer: Option<TimerId>,
    pub(crate) duration_timer: Option<TimerId>,
    pub(crate) stopped_timer: Option<TimerId>,
    /// Intrinsic content length in deci-seconds, once known
    pub(crate) media_length: Option<i64>,
    /// Content reported its end
    pub(crate) media_ended: bool,
}

impl Runtime {
    /// Runtime with the defaults of `kind`
    pub(crate) fn new(kind: &NodeKind) -> Self {
        let dur = match kind {
            NodeKind::Media(media, _) if !media.is_discrete() => {
                DurationItem::new(DurationKind::Media, 0)
            }
            NodeKind::Set(_) => DurationItem::new(DurationKind::Infinite, 0),
            _ => DurationItem::timer(0),
        };
        Self {
            state: TimingState::Reset,
            begin: DurationItem::timer(0),
            dur,
            end: DurationItem::new(DurationKind::Media, 0),
            fill: Fill::Unknown,
            repeat: RepeatCount::default(),
            repeats_left: RepeatCount::default(),
            begin_timer: None,
            duration_timer: None,
            stopped_timer: None,
            media_length: match kind {
                NodeKind::Media(media, _) if media.is_discrete() => Some(0),
                NodeKind::Media(_, data) => data.intrinsic_length,
                _ => None,
            },
            media_ended: false,
        }
    }

    pub fn timing_state(&self) -> TimingState {
        self.state
    }

    pub fn begin(&self) -> &DurationItem {
        &self.begin
    }

    pub fn duration(&self) -> &DurationItem {
        &self.dur
    }

    pub fn end(&self) -> &DurationItem {
        &self.end
    }

    pub fn fill(&self) -> Fill {
        self.fill
    }

    pub fn repeat_count(&self) -> RepeatCount {
        self.repeat
    }

    pub fn repeats_left(&self) -> RepeatCount {
        self.repeats_left
    }

    pub fn media_length(&self) -> Option<i64> {
        self.media_length
    }

    pub(crate) fn slot_mut(&mut self, slot: Slot) -> &mut DurationItem {
        match slot {
            Slot::Begin => &mut self.begin,
            Slot::Duration => &mut self.dur,
            Slot::End => &mut self.end,
        }
    }

    /// Active duration in deci-seconds when it is known up front: an explicit
    /// `dur`, a resolved media length, or an `end` offset, whichever is
    /// shortest.
    pub(crate) fn active_duration(&self) -> Option<i64> {
        let dur = match self.dur.kind {
            DurationKind::Timer if self.dur.offset > 0 => Some(self.dur.offset),
            DurationKind::Media => self.media_length,
            _ => None,
        };
        let end = (self.end.kind == DurationKind::Timer).then(|| {
            let begin = if self.begin.kind == DurationKind::Timer {
                self.begin.offset.max(0)
            } else {
                0
            };
            (self.end.offset - begin).max(0)
        });
        match (dur, end) {
            (Some(dur), Some(end)) => Some(dur.min(end)),
            (dur, end) => dur.or(end),
        }
    }
}

impl<H: Host> Document<H> {
    pub(crate) fn runtime_mut(&mut self, id: NodeId) -> Option<&mut Runtime> {
        self.store
            .get_mut(id)
            .and_then(|n| n.timed.as_mut())
            .and_then(|t| t.runtime.as_mut())
    }

    /// Fresh runtime from the element's timing attributes
    pub(crate) fn runtime_init(&mut self, id: NodeId) {
        self.runtime_dispose(id);
        let runtime = Runtime::new(&self.store[id].kind);
        if let Some(timed) = self.store[id].timed.as_mut() {
            timed.runtime = Some(runtime);
        }
        let attributes = self.store[id].attributes.clone();
        // endsync depends on dur and end, so it goes last
        let (endsync, rest): (Vec<_>, Vec<_>) = attributes
            .into_iter()
            .partition(|(name, _)| name == "endsync");
        for (name, value) in rest.iter().chain(endsync.iter()) {
            self.parse_timing_param(id, name, value);
        }
    }

    /// Apply one timing attribute to the element's runtime.
    ///
    /// Returns false for attributes the runtime does not handle.
    pub(crate) fn parse_timing_param(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        if self.runtime_mut(id).is_none() {
            return false;
        }
        match name {
            "begin" => self.set_duration_slot(id, Slot::Begin, name, value),
            "dur" => self.set_duration_slot(id, Slot::Duration, name, value),
            "end" => self.set_duration_slot(id, Slot::End, name, value),
            "endsync" => self.parse_endsync(id, value),
            "fill" => {
                if let Some(rt) = self.runtime_mut(id) {
                    rt.fill = Fill::parse(value);
                }
            }
            "repeatCount" | "repeat" => {
                let count = RepeatCount::parse(value).unwrap_or_else(|| {
                    warn!(
                        "Invalid {}=\"{}\" on {}, not repeating",
                        name,
                        value,
                        self.element_label(id)
                    );
                    RepeatCount::default()
                });
                if let Some(rt) = self.runtime_mut(id) {
                    rt.repeat = count;
                    rt.repeats_left = count;
                }
            }
            _ => return false,
        }
        true
    }

    fn set_duration_slot(&mut self, id: NodeId, slot: Slot, name: &str, value: &str) {
        let parsed = parse_time_value(value).unwrap_or_else(|| {
            warn!(
                "Invalid {}=\"{}\" on {}, treating as no constraint",
                name,
                value,
                self.element_label(id)
            );
            TimeValue {
                kind: DurationKind::Timer,
                offset: 0,
                source: None,
            }
        });
        let target = match &parsed.source {
            None => None,
            Some(EventSource::Own) => Some(id),
            Some(EventSource::Id(name)) => {
                let target = self.ids.get(name).copied();
                if target.is_none() {
                    warn!(
                        "{} waits on unknown element '{}', leaving it unresolved",
                        self.element_label(id),
                        name
                    );
                }
                target
            }
        };
        let item = DurationItem {
            kind: parsed.kind,
            offset: parsed.offset,
            target,
            connection: None,
        };
        self.replace_slot(id, slot, item);
    }

    fn replace_slot(&mut self, id: NodeId, slot: Slot, item: DurationItem) {
        let Some(rt) = self.runtime_mut(id) else {
            return;
        };
        let old = std::mem::replace(rt.slot_mut(slot), item);
        if let (Some(sender), Some(connection)) = (old.target, old.connection) {
            self.disconnect(sender, connection);
        }
    }

    /// `endsync="<id>"`: end when that element ends. Only honoured while
    /// neither `dur` nor `end` say otherwise.
    fn parse_endsync(&mut self, id: NodeId, value: &str) {
        let Some(rt) = self.store[id].runtime() else {
            return;
        };
        let overridable = matches!(rt.dur.kind, DurationKind::Media) || rt.dur.is_unset_timer();
        if !overridable || rt.end.kind != DurationKind::Media {
            debug!("Ignoring endsync on {}: duration set explicitly", self.element_label(id));
            return;
        }
        let value = value.trim();
        match self.ids.get(value).copied() {
            Some(target) => {
                let mut item = DurationItem::new(DurationKind::End, 0);
                item.target = Some(target);
                self.replace_slot(id, Slot::End, item);
            }
            None => trace!("endsync=\"{}\" left to default completion rules", value),
        }
    }

    /// Arm the begin trigger
    pub(crate) fn runtime_begin(&mut self, id: NodeId) {
        self.runtime_cancel_triggers(id);
        let now = self.now_ms();
        let Some(rt) = self.runtime_mut(id) else {
            return;
        };
        rt.state = TimingState::Began;
        rt.media_ended = false;
        let begin = rt.begin.clone();

        match begin.kind {
            DurationKind::Timer if begin.offset > 0 => {
                let timer = self.set_timeout(id, begin.offset, TimerTag::Begin);
                if let Some(rt) = self.runtime_mut(id) {
                    rt.begin_timer = Some(timer);
                }
            }
            DurationKind::Timer => self.runtime_propagate_start(id),
            DurationKind::Infinite | DurationKind::Media => {
                trace!("{} waits for an explicit begin", self.element_label(id));
            }
            kind => {
                let Some(target) = begin.target else {
                    return;
                };
                if let Some(happened_at) = self.event_time(target, kind) {
                    // missed the live event: start as if it fired, keeping the
                    // offset relative to when it happened
                    let elapsed = ms_to_ds(now.saturating_sub(happened_at) as i64);
                    let offset = begin.offset.saturating_sub(elapsed);
                    warn!(
                        "{} begins on {:?} of {} which already happened, offset now {}",
                        self.element_label(id),
                        kind,
                        self.element_label(target),
                        offset
                    );
                    if offset > 0 {
                        let timer = self.set_timeout(id, offset, TimerTag::Begin);
                        if let Some(rt) = self.runtime_mut(id) {
                            rt.begin_timer = Some(timer);
                        }
                    } else {
                        self.runtime_propagate_start(id);
                    }
                } else if let Some(event) = kind.event() {
                    let connection = self.connect(target, event, id);
                    if let Some(rt) = self.runtime_mut(id) {
                        rt.begin.connection = Some(connection);
                    }
                }
            }
        }
    }

    /// Clock time (ms) at which `target` already produced the event `kind`
    /// waits for
    fn event_time(&self, target: NodeId, kind: DurationKind) -> Option<u64> {
        let node = self.store.get(target)?;
        // the runtime may be gone already: a seq deactivates finished children
        let timed = node.timed.as_deref()?;
        match kind {
            DurationKind::Start if timed.started => Some(timed.begin_time),
            DurationKind::End if timed.ended && node.state >= NodeState::Finished => {
                Some(timed.finish_time)
            }
            _ => None,
        }
    }

    /// Begin trigger resolved: tell "about to start" listeners, then start
    pub(crate) fn runtime_propagate_start(&mut self, id: NodeId) {
        self.runtime_cancel_begin(id);
        self.notify_listeners(id, EventKind::AboutToStart);
        // a listener may have reset or removed us
        let still_waiting = self
            .store
            .get(id)
            .is_some_and(|n| n.state.is_unfinished())
            && self
                .store
                .get(id)
                .and_then(|n| n.runtime())
                .is_some_and(|rt| rt.state == TimingState::Began);
        if still_waiting {
            self.runtime_started(id);
        }
    }

    fn runtime_started(&mut self, id: NodeId) {
        let now = self.now_ms();
        let Some(rt) = self.runtime_mut(id) else {
            return;
        };
        rt.state = TimingState::Started;
        let active = rt.active_duration();
        let natural_end = rt.dur.is_unset_timer() && rt.end.kind != DurationKind::Timer;
        let end = rt.end.clone();
        if let Some(timed) = self.store[id].timed.as_mut() {
            timed.begin_time = now;
            timed.started = true;
        }

        if let Some(ds) = active.filter(|ds| *ds > 0) {
            let timer = self.set_timeout(id, ds, TimerTag::Duration);
            if let Some(rt) = self.runtime_mut(id) {
                rt.duration_timer = Some(timer);
            }
        }
        self.connect_end_trigger(id, &end);

        debug!("{} started at {}ms", self.element_label(id), now);
        self.begin_content(id);
        let element = self.element_ref(id);
        self.emit(EngineEvent::ElementStarted {
            element,
            time_ms: now,
        });
        self.notify_listeners(id, EventKind::Started);

        let still_started = self
            .store
            .get(id)
            .and_then(|n| n.runtime())
            .is_some_and(|rt| rt.state == TimingState::Started);
        if !still_started {
            return;
        }
        if active == Some(0) {
            self.runtime_propagate_stop(id, true);
        } else if natural_end {
            self.runtime_propagate_stop(id, false);
        }
    }

    fn connect_end_trigger(&mut self, id: NodeId, end: &DurationItem) {
        let (Some(event), Some(target)) = (end.kind.event(), end.target) else {
            return;
        };
        let connection = self.connect(target, event, id);
        if let Some(rt) = self.runtime_mut(id) {
            rt.end.connection = Some(connection);
        }
    }

    /// Exit gate. Unforced stops are refused while something still keeps the
    /// element alive.
    pub(crate) fn runtime_propagate_stop(&mut self, id: NodeId, forced: bool) {
        let Some(node) = self.store.get(id) else {
            return;
        };
        let Some(rt) = node.runtime() else {
            return;
        };
        if matches!(rt.state, TimingState::Reset | TimingState::Stopped) {
            return;
        }
        if !forced {
            let refusal = if rt.dur.kind == DurationKind::Media
                && rt.end.kind == DurationKind::Media
                && rt.media_length.is_none()
                && !rt.media_ended
            {
                Some("waiting for media")
            } else if rt.end.kind.is_event() && rt.state == TimingState::Started {
                Some("waiting for end event")
            } else if rt.dur.kind == DurationKind::Infinite {
                Some("indefinite duration")
            } else if rt.dur.kind.is_event() && rt.state == TimingState::Started {
                Some("waiting for duration event")
            } else if rt.duration_timer.is_some() {
                Some("duration timer pending")
            } else if node.kind.is_group()
                && self
                    .store
                    .children(id)
                    .any(|c| self.store[c].state.is_unfinished())
            {
                Some("children unfinished")
            } else {
                None
            };
            if let Some(reason) = refusal {
                trace!("{} keeps running: {}", self.element_label(id), reason);
                return;
            }
        }

        let was_started = rt.state == TimingState::Started;
        self.runtime_cancel_triggers(id);
        if let Some(rt) = self.runtime_mut(id) {
            rt.state = TimingState::Stopped;
        }

        if was_started {
            let now = self.now_ms();
            debug!("{} stopped at {}ms", self.element_label(id), now);
            let element = self.element_ref(id);
            self.emit(EngineEvent::ElementStopped {
                element,
                time_ms: now,
                forced,
            });
            let timer = self.set_timeout(id, 0, TimerTag::Stopped);
            if let Some(rt) = self.runtime_mut(id) {
                rt.stopped_timer = Some(timer);
            }
        } else if self.store[id].state.is_unfinished() {
            self.finish(id);
        }
    }

    /// Deferred stop handling: repeat or finish
    pub(crate) fn runtime_stopped(&mut self, id: NodeId) {
        if !self.store.get(id).is_some_and(|n| n.state.is_unfinished()) {
            return;
        }
        let Some(rt) = self.runtime_mut(id) else {
            return;
        };
        let repeat = match rt.repeats_left {
            RepeatCount::Indefinite => true,
            RepeatCount::Count(n) if n > 0 => {
                rt.repeats_left = RepeatCount::Count(n - 1);
                true
            }
            RepeatCount::Count(_) => {
                rt.repeats_left = RepeatCount::Count(0);
                false
            }
        };
        if repeat {
            debug!("{} repeats", self.element_label(id));
            self.rewind_content(id);
            self.runtime_begin(id);
        } else {
            self.finish(id);
        }
    }

    /// Event from a node this runtime subscribed to
    pub(crate) fn runtime_process_event(&mut self, id: NodeId, event: EventKind, sender: NodeId) {
        let Some(rt) = self.store.get(id).and_then(|n| n.runtime()) else {
            return;
        };
        let matches = |item: &DurationItem| {
            item.kind.event() == Some(event) && item.target == Some(sender)
        };

        if rt.state == TimingState::Began && matches(&rt.begin) {
            let offset = rt.begin.offset;
            self.runtime_cancel_begin(id);
            if offset > 0 {
                let timer = self.set_timeout(id, offset, TimerTag::Begin);
                if let Some(rt) = self.runtime_mut(id) {
                    rt.begin_timer = Some(timer);
                }
            } else {
                self.runtime_propagate_start(id);
            }
        } else if rt.state == TimingState::Started && (matches(&rt.end) || matches(&rt.dur)) {
            self.runtime_propagate_stop(id, true);
        }
    }

    /// Timer fired for this runtime
    pub(crate) fn runtime_timer(&mut self, id: NodeId, tag: TimerTag, timer: TimerId) {
        let Some(rt) = self.runtime_mut(id) else {
            return;
        };
        let slot = match tag {
            TimerTag::Begin => &mut rt.begin_timer,
            TimerTag::Duration => &mut rt.duration_timer,
            TimerTag::Stopped => &mut rt.stopped_timer,
        };
        if *slot != Some(timer) {
            return;
        }
        *slot = None;
        match tag {
            TimerTag::Begin => self.runtime_propagate_start(id),
            TimerTag::Duration => self.runtime_propagate_stop(id, true),
            TimerTag::Stopped => self.runtime_stopped(id),
        }
    }

    /// Stop without any callbacks, as when the owner is finished from outside
    pub(crate) fn runtime_halt(&mut self, id: NodeId) {
        self.runtime_cancel_triggers(id);
        if let Some(timer) = self.runtime_mut(id).and_then(|rt| rt.stopped_timer.take()) {
            self.cancel_timer(timer);
        }
        if let Some(rt) = self.runtime_mut(id) {
            if rt.state != TimingState::Reset {
                rt.state = TimingState::Stopped;
            }
        }
    }

    /// Cancel every timer and subscription and drop the runtime
    pub(crate) fn runtime_dispose(&mut self, id: NodeId) {
        self.runtime_halt(id);
        if let Some(timed) = self.store.get_mut(id).and_then(|n| n.timed.as_mut()) {
            timed.runtime = None;
        }
    }

    fn runtime_cancel_begin(&mut self, id: NodeId) {
        let Some(rt) = self.runtime_mut(id) else {
            return;
        };
        let timer = rt.begin_timer.take();
        let connection = rt.begin.target.zip(rt.begin.connection.take());
        if let Some(timer) = timer {
            self.cancel_timer(timer);
        }
        if let Some((sender, connection)) = connection {
            self.disconnect(sender, connection);
        }
    }

    /// Cancel begin/duration timers and all event subscriptions
    fn runtime_cancel_triggers(&mut self, id: NodeId) {
        self.runtime_cancel_begin(id);
        let Some(rt) = self.runtime_mut(id) else {
            return;
        };
        let timer = rt.duration_timer.take();
        let connections = [
            rt.dur.target.zip(rt.dur.connection.take()),
            rt.end.target.zip(rt.end.connection.take()),
        ];
        if let Some(timer) = timer {
            self.cancel_timer(timer);
        }
        for (sender, connection) in connections.into_iter().flatten() {
            self.disconnect(sender, connection);
        }
    }

    /// Fill in effect for `id`: its own, or freeze when a parent `par`
    /// without its own duration keeps its finished children on.
    pub(crate) fn effective_fill(&self, id: NodeId) -> Fill {
        let Some(node) = self.store.get(id) else {
            return Fill::Unknown;
        };
        let fill = node.runtime().map(|rt| rt.fill).unwrap_or_default();
        if fill != Fill::Unknown {
            return fill;
        }
        match node.parent {
            Some(parent) if self.par_freezes_children(parent) => Fill::Freeze,
            _ => Fill::Unknown,
        }
    }
}
