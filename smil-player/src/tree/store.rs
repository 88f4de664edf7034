//! Arena storage for document nodes

use super::{Node, NodeId};

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena holding every node of a document.
///
/// Nodes are addressed by [`NodeId`] handles. Removed nodes free their slot
/// for reuse; a bumped generation keeps stale handles from reaching the new
/// occupant.
#[derive(Debug, Default)]
pub struct NodeStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    // -- Allocation --

    /// Store a detached node and return its handle
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            return NodeId {
                idx,
                generation: slot.generation,
            };
        }
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId { idx, generation: 0 }
    }

    /// Drop a node from the arena. The node must already be unlinked.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        self.free_list.push(id.idx);
        self.live -= 1;
        Some(node)
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    // -- Topology --

    /// Append `child` as last child of `parent`, unlinking it first if needed
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` under `parent` before `before` (or last when `None`)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        debug_assert_ne!(parent, child, "node cannot be its own child");
        self.unlink(child);

        let prev = match before {
            Some(before) => self[before].prev_sibling,
            None => self[parent].last_child,
        };
        {
            let node = &mut self[child];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = before;
        }
        match prev {
            Some(prev) => self[prev].next_sibling = Some(child),
            None => self[parent].first_child = Some(child),
        }
        match before {
            Some(before) => self[before].prev_sibling = Some(child),
            None => self[parent].last_child = Some(child),
        }
    }

    /// Detach `child` from its parent and siblings
    pub fn unlink(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let node = &self[child];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(prev) => self[prev].next_sibling = next,
            None => self[parent].first_child = next,
        }
        match next {
            Some(next) => self[next].prev_sibling = prev,
            None => self[parent].last_child = prev,
        }
        let node = &mut self[child];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    // -- Traversal --

    /// Iterate the direct children of `parent`
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            store: self,
            next: self.get(parent).and_then(|n| n.first_child),
        }
    }

    /// Snapshot of the direct children, for loops that mutate the tree
    pub fn child_ids(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent).collect()
    }

    /// `id` followed by all its descendants, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.child_ids(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Walk from `id`'s parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).and_then(|n| n.parent), move |current| {
            self.get(*current).and_then(|n| n.parent)
        })
    }
}

impl std::ops::Index<NodeId> for NodeStore {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node handle {id:?}"),
        }
    }
}

impl std::ops::IndexMut<NodeId> for NodeStore {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node handle {id:?}"),
        }
    }
}

/// Iterator over the direct children of a node
pub struct Children<'a> {
    store: &'a NodeStore,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.store.get(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}
