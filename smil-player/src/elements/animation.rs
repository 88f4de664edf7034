//! `set` animation element: assigns an attribute of a target element while
//! active and restores the previous value when its effect is removed.

use smil_common::events::EngineEvent;
use tracing::{debug, warn};

use crate::document::Document;
use crate::host::Host;
use crate::tree::{AppliedSet, NodeId, NodeKind};

impl<H: Host> Document<H> {
    pub(crate) fn set_apply(&mut self, id: NodeId) {
        let (target_name, attribute, to) = match &self.store[id].kind {
            NodeKind::Set(data) if data.applied.is_none() => (
                data.target_element.clone(),
                data.attribute_name.clone(),
                data.to.clone(),
            ),
            _ => return,
        };
        let (Some(attribute), Some(to)) = (attribute, to) else {
            warn!(
                "{} needs both attributeName and to",
                self.element_label(id)
            );
            return;
        };
        let target = match target_name {
            Some(name) => match self.find_by_id(&name) {
                Some(target) => target,
                None => {
                    warn!(
                        "{} targets unknown element '{}'",
                        self.element_label(id),
                        name
                    );
                    return;
                }
            },
            None => match self.store[id].parent {
                Some(parent) => parent,
                None => return,
            },
        };

        let previous = self.store[target].attribute(&attribute).map(str::to_string);
        self.write_attribute(target, &attribute, Some(&to));
        if let NodeKind::Set(data) = &mut self.store[id].kind {
            data.applied = Some(AppliedSet { target, previous });
        }
        debug!(
            "{} set {}.{}={}",
            self.element_label(id),
            self.element_label(target),
            attribute,
            to
        );
    }

    /// Restore the attribute value from before `set_apply`
    pub(crate) fn set_revert(&mut self, id: NodeId) {
        let (applied, attribute) = match &mut self.store[id].kind {
            NodeKind::Set(data) => (data.applied.take(), data.attribute_name.clone()),
            _ => return,
        };
        let (Some(applied), Some(attribute)) = (applied, attribute) else {
            return;
        };
        if self.store.is_alive(applied.target) {
            self.write_attribute(applied.target, &attribute, applied.previous.as_deref());
        }
    }

    /// Keep the applied value for good
    pub(crate) fn set_forget(&mut self, id: NodeId) {
        if let NodeKind::Set(data) = &mut self.store[id].kind {
            data.applied = None;
        }
    }

    fn write_attribute(&mut self, target: NodeId, attribute: &str, value: Option<&str>) {
        let node = &mut self.store[target];
        match value {
            Some(value) => node.set_attribute(attribute, value),
            None => {
                node.remove_attribute(attribute);
            }
        }
        node.sync_typed_fields();
        if let Some(value) = value {
            self.parse_timing_param(target, attribute, value);
        }
        let target = self.element_ref(target);
        self.emit(EngineEvent::AttributeChanged {
            target,
            attribute: attribute.to_string(),
            value: value.map(str::to_string),
            time_ms: self.now_ms(),
        });
    }
}
