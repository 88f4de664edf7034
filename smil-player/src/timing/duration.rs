//! Timing attribute values: `begin`, `dur` and `end`
//!
//! A value is one of
//! - a clock value or offset (`5s`, `1.5`, `01:02.5`, `300ms`)
//! - `indefinite`
//! - `media` (the intrinsic length of the content)
//! - an event on another element: `<id>.<event>[+|-offset]`, or on the
//!   element itself when the `<id>.` prefix is omitted

use smil_common::human_time::parse_time;

use crate::signal::{ConnectionId, EventKind};
use crate::tree::NodeId;

/// Kind of a timing value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DurationKind {
    /// Fixed offset in deci-seconds
    Timer,
    Infinite,
    /// Tied to the intrinsic length of the content
    Media,
    /// Another element started
    Start,
    /// Another element finished
    End,
    /// Pointer activation
    Activated,
    InBounds,
    OutBounds,
}

impl DurationKind {
    /// Event a listener has to subscribe to for this kind
    pub fn event(self) -> Option<EventKind> {
        Some(match self {
            DurationKind::Start => EventKind::Started,
            DurationKind::End => EventKind::Stopped,
            DurationKind::Activated => EventKind::Activated,
            DurationKind::InBounds => EventKind::InBounds,
            DurationKind::OutBounds => EventKind::OutBounds,
            DurationKind::Timer | DurationKind::Infinite | DurationKind::Media => return None,
        })
    }

    pub fn is_event(self) -> bool {
        self.event().is_some()
    }

    fn from_event_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "begin" | "beginevent" => DurationKind::Start,
            "end" | "endevent" => DurationKind::End,
            "activateevent" | "click" => DurationKind::Activated,
            "inboundsevent" | "mouseover" => DurationKind::InBounds,
            "outboundsevent" | "mouseout" => DurationKind::OutBounds,
            _ => return None,
        })
    }
}

/// One of the three timing slots of a runtime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DurationItem {
    pub kind: DurationKind,
    /// Offset in deci-seconds
    pub offset: i64,
    /// Sender of the awaited event
    pub(crate) target: Option<NodeId>,
    /// Live subscription on `target`
    pub(crate) connection: Option<ConnectionId>,
}

impl DurationItem {
    pub fn timer(offset: i64) -> Self {
        Self::new(DurationKind::Timer, offset)
    }

    pub fn new(kind: DurationKind, offset: i64) -> Self {
        Self {
            kind,
            offset,
            target: None,
            connection: None,
        }
    }

    /// Timer slot left at zero, meaning "not specified"
    pub fn is_unset_timer(&self) -> bool {
        self.kind == DurationKind::Timer && self.offset <= 0
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }
}

/// Element whose event a value refers to
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum EventSource {
    /// The element carrying the attribute
    Own,
    /// Element with this `id`
    Id(String),
}

/// Parsed, not yet resolved, timing value
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TimeValue {
    pub(crate) kind: DurationKind,
    pub(crate) offset: i64,
    pub(crate) source: Option<EventSource>,
}

impl TimeValue {
    fn plain(kind: DurationKind, offset: i64) -> Self {
        Self {
            kind,
            offset,
            source: None,
        }
    }
}

/// Parse a timing attribute value. `None` for unsupported syntax.
pub(crate) fn parse_time_value(value: &str) -> Option<TimeValue> {
    let value = value.trim();
    if value.is_empty() {
        return Some(TimeValue::plain(DurationKind::Timer, 0));
    }
    if value.eq_ignore_ascii_case("indefinite") {
        return Some(TimeValue::plain(DurationKind::Infinite, 0));
    }
    if value.eq_ignore_ascii_case("media") {
        return Some(TimeValue::plain(DurationKind::Media, 0));
    }
    if let Some(offset) = parse_time(value) {
        return Some(TimeValue::plain(DurationKind::Timer, offset));
    }

    // <id>.<event>[+|-offset]; ids may contain signs themselves, so try
    // every split point until both halves parse
    let split_points = value
        .char_indices()
        .skip(1)
        .filter(|(_, c)| *c == '+' || *c == '-')
        .map(|(pos, _)| pos)
        .chain(std::iter::once(value.len()));
    for pos in split_points {
        let offset = if pos == value.len() {
            0
        } else {
            match parse_time(&value[pos..]) {
                Some(offset) => offset,
                None => continue,
            }
        };
        if let Some((source, kind)) = parse_event_ref(&value[..pos]) {
            return Some(TimeValue {
                kind,
                offset,
                source: Some(source),
            });
        }
    }
    None
}

fn parse_event_ref(head: &str) -> Option<(EventSource, DurationKind)> {
    let (source, event) = match head.trim().rsplit_once('.') {
        Some((id, event)) if !id.is_empty() => (EventSource::Id(id.to_string()), event),
        Some(_) => return None,
        None => (EventSource::Own, head.trim()),
    };
    DurationKind::from_event_name(event).map(|kind| (source, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &str) -> Option<(DurationKind, i64, Option<EventSource>)> {
        parse_time_value(value).map(|v| (v.kind, v.offset, v.source))
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(parse("5s"), Some((DurationKind::Timer, 50, None)));
        assert_eq!(parse(" 1.5 "), Some((DurationKind::Timer, 15, None)));
        assert_eq!(parse("300ms"), Some((DurationKind::Timer, 3, None)));
        assert_eq!(parse(""), Some((DurationKind::Timer, 0, None)));
        assert_eq!(parse("indefinite"), Some((DurationKind::Infinite, 0, None)));
        assert_eq!(parse("media"), Some((DurationKind::Media, 0, None)));
    }

    #[test]
    fn test_event_values() {
        assert_eq!(
            parse("intro.endEvent"),
            Some((DurationKind::End, 0, Some(EventSource::Id("intro".into()))))
        );
        assert_eq!(
            parse("intro.begin+2s"),
            Some((DurationKind::Start, 20, Some(EventSource::Id("intro".into()))))
        );
        assert_eq!(
            parse("btn.activateEvent-0.5s"),
            Some((
                DurationKind::Activated,
                -5,
                Some(EventSource::Id("btn".into()))
            ))
        );
        assert_eq!(
            parse("click"),
            Some((DurationKind::Activated, 0, Some(EventSource::Own)))
        );
        assert_eq!(
            parse("intro-video.end-1s"),
            Some((
                DurationKind::End,
                -10,
                Some(EventSource::Id("intro-video".into()))
            ))
        );
        assert_eq!(
            parse("a.b.outBoundsEvent"),
            Some((
                DurationKind::OutBounds,
                0,
                Some(EventSource::Id("a.b".into()))
            ))
        );
    }

    #[test]
    fn test_unsupported_values() {
        assert_eq!(parse("wallclock(2024-01-01T00:00)"), None);
        assert_eq!(parse("x.repeatEvent"), None);
        assert_eq!(parse(".endEvent"), None);
        assert_eq!(parse("x.end+soon"), None);
        assert_eq!(parse("99999999999999999:00"), None);
        assert_eq!(parse("x.end+99999999999999999:00"), None);
    }

    #[test]
    fn test_event_kinds_map_to_listener_events() {
        assert_eq!(DurationKind::End.event(), Some(EventKind::Stopped));
        assert_eq!(DurationKind::Start.event(), Some(EventKind::Started));
        assert!(!DurationKind::Media.is_event());
        assert!(DurationItem::timer(0).is_unset_timer());
        assert!(!DurationItem::timer(5).is_unset_timer());
    }
}
