//! Media elements
//!
//! Showing and hiding content is reported to the host as notifications.
//! Continuous media (`video`, `audio`, `ref`, ...) have no length of their
//! own; the engine asks the host, which answers through
//! [`Document::media_length_resolved`] or [`Document::media_end_of_content`].

use smil_common::events::EngineEvent;
use smil_common::timing::ms_to_ds;
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::timer::TimerTag;
use crate::timing::{DurationKind, TimingState};
use crate::tree::{NodeId, NodeKind, NodeState};

impl<H: Host> Document<H> {
    pub(crate) fn media_begin(&mut self, id: NodeId) {
        let (src, region) = match &mut self.store[id].kind {
            NodeKind::Media(_, data) => {
                data.shown = true;
                (data.src.clone(), data.region.clone())
            }
            _ => return,
        };
        let region = region.filter(|name| match self.find_region(name) {
            Some(region) => {
                debug!(
                    "{} shown in region {} at {:?}",
                    self.element_label(id),
                    name,
                    self.region_rect(region)
                );
                true
            }
            None => {
                warn!("{} refers to unknown region '{}'", self.element_label(id), name);
                false
            }
        });
        let element = self.element_ref(id);
        self.emit(EngineEvent::MediaShown {
            element,
            src: src.clone(),
            region,
            time_ms: self.now_ms(),
        });

        for child in self.timed_children(id) {
            if matches!(
                self.store[child].state,
                NodeState::Init | NodeState::Deactivated
            ) {
                self.activate(child);
            }
        }

        let wants_length = self
            .runtime(id)
            .is_some_and(|rt| rt.dur.kind == DurationKind::Media && rt.media_length.is_none());
        let already_asked = match &mut self.store[id].kind {
            NodeKind::Media(_, data) => {
                let asked = data.length_requested;
                data.length_requested |= wants_length;
                asked
            }
            _ => true,
        };
        if wants_length && !already_asked {
            let element = self.element_ref(id);
            self.emit(EngineEvent::MediaLengthRequested {
                element,
                src: src.clone(),
                time_ms: self.now_ms(),
            });
            self.host_mut().request_media_length(id, src.as_deref());
        }
    }

    pub(crate) fn media_hide(&mut self, id: NodeId) {
        let was_shown = match &mut self.store[id].kind {
            NodeKind::Media(_, data) => std::mem::replace(&mut data.shown, false),
            _ => false,
        };
        if was_shown {
            let element = self.element_ref(id);
            self.emit(EngineEvent::MediaHidden {
                element,
                time_ms: self.now_ms(),
            });
        }
    }

    /// The host determined the intrinsic length of `id`'s content
    pub fn media_length_resolved(&mut self, id: NodeId, length_ds: i64) -> Result<()> {
        self.check_media(id)?;
        if let NodeKind::Media(_, data) = &mut self.store[id].kind {
            data.intrinsic_length = Some(length_ds);
            data.length_requested = false;
        }
        let now = self.now_ms();
        let begin_time = self.store[id].timestamps().map_or(now, |(begin, _)| begin);
        let Some(rt) = self.runtime_mut(id) else {
            return Ok(());
        };
        rt.media_length = Some(length_ds);
        if rt.state != TimingState::Started || rt.dur.kind != DurationKind::Media {
            return Ok(());
        }
        // an end offset may have armed a cap already; the new timer covers it
        let cap_timer = rt.duration_timer.take();
        let mut remaining = length_ds - ms_to_ds(now.saturating_sub(begin_time) as i64);
        if rt.end.kind == DurationKind::Timer {
            let begin = if rt.begin.kind == DurationKind::Timer {
                rt.begin.offset.max(0)
            } else {
                0
            };
            let capped = (rt.end.offset - begin).max(0) - ms_to_ds(now.saturating_sub(begin_time) as i64);
            remaining = remaining.min(capped);
        }
        debug!(
            "{} media length {}ds, {}ds left",
            self.element_label(id),
            length_ds,
            remaining
        );
        if let Some(timer) = cap_timer {
            self.cancel_timer(timer);
        }
        if remaining > 0 {
            let timer = self.set_timeout(id, remaining, TimerTag::Duration);
            if let Some(rt) = self.runtime_mut(id) {
                rt.duration_timer = Some(timer);
            }
        } else {
            self.runtime_propagate_stop(id, true);
        }
        Ok(())
    }

    /// The content of `id` played to its end
    pub fn media_end_of_content(&mut self, id: NodeId) -> Result<()> {
        self.check_media(id)?;
        if let NodeKind::Media(_, data) = &mut self.store[id].kind {
            data.length_requested = false;
        }
        let Some(rt) = self.runtime_mut(id) else {
            return Ok(());
        };
        rt.media_ended = true;
        if rt.state == TimingState::Started {
            debug!("{} reached end of content", self.element_label(id));
            self.runtime_propagate_stop(id, false);
        }
        Ok(())
    }

    fn check_media(&self, id: NodeId) -> Result<()> {
        match self.node(id).map(|n| n.kind()) {
            Some(NodeKind::Media(..)) => Ok(()),
            Some(_) => Err(Error::InvalidInput(format!(
                "{} is not a media element",
                self.element_label(id)
            ))),
            None => Err(Error::NotFound(format!("node {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use smil_common::events::EngineEvent;

    use crate::document::Document;
    use crate::host::RecordingHost;
    use crate::timing::TimingState;
    use crate::tree::NodeState;

    fn video_doc(attrs: &[(&str, &str)]) -> (Document<RecordingHost>, crate::tree::NodeId) {
        let mut doc = Document::new(RecordingHost::new());
        let root = doc.root();
        let video = doc.create_element(root, "video", attrs).unwrap();
        (doc, video)
    }

    #[test]
    fn test_continuous_media_asks_for_length_once() {
        let (mut doc, video) = video_doc(&[("src", "clip.mp4")]);
        doc.start();

        let requests = doc.host_mut().take_media_requests();
        assert_eq!(requests, vec![(video, Some("clip.mp4".to_string()))]);
        assert!(doc
            .host()
            .events
            .iter()
            .any(|e| matches!(e, EngineEvent::MediaShown { src: Some(s), .. } if s == "clip.mp4")));
        assert_eq!(doc.next_deadline(), None);
    }

    #[test]
    fn test_length_resolved_after_start_counts_elapsed_time() {
        let (mut doc, video) = video_doc(&[("src", "clip.mp4")]);
        doc.start();
        doc.advance_to(1_000);
        doc.media_length_resolved(video, 30).unwrap();

        assert_eq!(doc.next_deadline(), Some(3_000));
        doc.advance_to(3_000);
        assert_eq!(doc.state(video), Some(NodeState::Finished));
        assert!(doc.is_finished());
    }

    #[test]
    fn test_end_of_content_stops_media() {
        let (mut doc, video) = video_doc(&[]);
        doc.start();
        doc.advance_to(500);
        doc.media_end_of_content(video).unwrap();
        assert_eq!(
            doc.runtime(video).map(|rt| rt.timing_state()),
            Some(TimingState::Stopped)
        );
        doc.advance_to(500);
        assert_eq!(doc.state(video), Some(NodeState::Finished));
        assert!(doc
            .host()
            .events
            .iter()
            .any(|e| matches!(e, EngineEvent::MediaHidden { time_ms: 500, .. })));
    }

    #[test]
    fn test_discrete_media_needs_no_length() {
        let mut doc = Document::new(RecordingHost::new());
        let root = doc.root();
        let img = doc.create_element(root, "img", &[("dur", "media")]).unwrap();
        doc.start();

        assert!(doc.host().media_requests.is_empty());
        doc.advance_to(0);
        assert_eq!(doc.state(img), Some(NodeState::Finished));
    }

    #[test]
    fn test_explicit_dur_outlives_content() {
        let (mut doc, video) = video_doc(&[("dur", "3s")]);
        doc.start();
        doc.advance_to(1_000);
        doc.media_end_of_content(video).unwrap();
        assert_eq!(
            doc.runtime(video).map(|rt| rt.timing_state()),
            Some(TimingState::Started)
        );
        doc.advance_to(3_000);
        assert_eq!(doc.state(video), Some(NodeState::Finished));
    }

    #[test]
    fn test_length_for_non_media_is_rejected() {
        let mut doc = Document::new(RecordingHost::new());
        let root = doc.root();
        let par = doc.create_element(root, "par", &[]).unwrap();
        assert!(doc.media_length_resolved(par, 10).is_err());
    }
}
