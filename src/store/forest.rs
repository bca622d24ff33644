//! forest.rs
//! Arena of positioned vertex occurrences. Ids are stable slots; removed
//! occurrences stay behind as tombstones until the pending changes are taken.

use super::types::{OccurrenceId, VertexId};
use crate::error::{Result, SurveyError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

pub type Children = SmallVec<[OccurrenceId; 4]>;

/// One placement of a vertex inside the survey forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub vertex: VertexId,
    pub parent: Option<OccurrenceId>,
    /// Ordered; the sibling order is the index in this list.
    pub children: Children,
    // Nested-set bounds, refreshed after every structural operation.
    pub left: u32,
    pub right: u32,
    pub depth: u32,
    pub(crate) removed: bool,
    pub(crate) persisted: bool,
}

impl Occurrence {
    fn new(vertex: VertexId, parent: Option<OccurrenceId>) -> Self {
        Self {
            vertex,
            parent,
            children: Children::new(),
            left: 0,
            right: 0,
            depth: 0,
            removed: false,
            persisted: false,
        }
    }

    pub fn is_root(&self) -> bool { self.parent.is_none() }
}

/// Flat persisted form of an occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    pub id: OccurrenceId,
    pub vertex: VertexId,
    pub parent: Option<OccurrenceId>,
    pub left: u32,
    pub right: u32,
    pub depth: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    pub(crate) nodes: Vec<Occurrence>,
    pub(crate) roots: Vec<OccurrenceId>,
    // Live occurrences per vertex, ascending by id.
    by_vertex: BTreeMap<VertexId, Vec<OccurrenceId>>,
    dirty: BTreeSet<OccurrenceId>,
}

impl Forest {
    pub fn new() -> Self { Self::default() }

    /// Number of slots, tombstones included.
    pub fn count(&self) -> usize { self.nodes.len() }

    pub fn live_count(&self) -> usize { self.nodes.iter().filter(|n| !n.removed).count() }

    pub fn get(&self, id: OccurrenceId) -> Option<&Occurrence> {
        self.nodes.get(id.index()).filter(|n| !n.removed)
    }

    pub fn is_live(&self, id: OccurrenceId) -> bool { self.get(id).is_some() }

    #[inline(always)]
    pub(crate) fn node(&self, id: OccurrenceId) -> &Occurrence { &self.nodes[id.index()] }

    #[inline(always)]
    pub fn vertex_of(&self, id: OccurrenceId) -> VertexId { self.nodes[id.index()].vertex }

    #[inline(always)]
    pub fn parent(&self, id: OccurrenceId) -> Option<OccurrenceId> { self.nodes[id.index()].parent }

    #[inline(always)]
    pub fn children(&self, id: OccurrenceId) -> &[OccurrenceId] { &self.nodes[id.index()].children }

    pub fn roots(&self) -> &[OccurrenceId] { &self.roots }

    pub fn live_ids(&self) -> impl Iterator<Item = OccurrenceId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.removed)
            .map(|(i, _)| OccurrenceId::new(i))
    }

    /// Live occurrences of `vertex`, in creation order.
    pub fn occurrences_of(&self, vertex: VertexId) -> Vec<OccurrenceId> {
        self.by_vertex.get(&vertex).cloned().unwrap_or_default()
    }

    fn track(&mut self, id: OccurrenceId, vertex: VertexId) {
        self.by_vertex.entry(vertex).or_default().push(id);
    }

    fn untrack(&mut self, id: OccurrenceId, vertex: VertexId) {
        if let Some(ids) = self.by_vertex.get_mut(&vertex) {
            ids.retain(|o| *o != id);
            if ids.is_empty() {
                self.by_vertex.remove(&vertex);
            }
        }
    }

    pub fn insert_root(&mut self, vertex: VertexId) -> OccurrenceId {
        let id = OccurrenceId::new(self.nodes.len());
        self.nodes.push(Occurrence::new(vertex, None));
        self.track(id, vertex);
        self.roots.push(id);
        self.dirty.insert(id);
        id
    }

    pub fn insert_child(&mut self, parent: OccurrenceId, vertex: VertexId) -> OccurrenceId {
        let id = OccurrenceId::new(self.nodes.len());
        self.nodes.push(Occurrence::new(vertex, Some(parent)));
        self.track(id, vertex);
        self.nodes[parent.index()].children.push(id);
        self.dirty.insert(id);
        id
    }

    /// Moves `child` (and its sub-tree) to the end of `parent`'s children.
    pub fn attach(&mut self, child: OccurrenceId, parent: OccurrenceId) {
        self.unlink(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        self.dirty.insert(child);
    }

    /// Moves `child` into a specific slot under `parent`, or among the roots.
    pub fn attach_at(&mut self, child: OccurrenceId, parent: Option<OccurrenceId>, index: usize) {
        self.unlink(child);
        self.nodes[child.index()].parent = parent;
        let siblings = match parent {
            Some(p) => &mut self.nodes[p.index()].children,
            None => {
                let at = index.min(self.roots.len());
                self.roots.insert(at, child);
                self.dirty.insert(child);
                return;
            }
        };
        let at = index.min(siblings.len());
        siblings.insert(at, child);
        self.dirty.insert(child);
    }

    /// Detaches `child` from its parent; it becomes the last root.
    pub fn make_root(&mut self, child: OccurrenceId) {
        self.unlink(child);
        self.nodes[child.index()].parent = None;
        self.roots.push(child);
        self.dirty.insert(child);
    }

    /// Soft-removes `id` and everything below it. Returns the removed ids.
    pub fn remove_subtree(&mut self, id: OccurrenceId) -> Vec<OccurrenceId> {
        if !self.is_live(id) {
            return Vec::new();
        }
        self.unlink(id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.index()];
            if node.removed {
                continue;
            }
            node.removed = true;
            node.parent = None;
            let vertex = node.vertex;
            stack.extend(node.children.drain(..));
            self.untrack(current, vertex);
            self.dirty.remove(&current);
            removed.push(current);
        }
        removed
    }

    /// Index of `id` among its siblings (or among the roots).
    pub fn sibling_position(&self, id: OccurrenceId) -> Option<usize> {
        self.siblings(id).iter().position(|&s| s == id)
    }

    pub fn siblings(&self, id: OccurrenceId) -> &[OccurrenceId] {
        match self.parent(id) {
            Some(p) => self.children(p),
            None => &self.roots,
        }
    }

    /// Swaps `id` with the sibling `offset` slots away. No-op when there is none.
    pub fn swap_sibling(&mut self, id: OccurrenceId, offset: isize) -> bool {
        let Some(pos) = self.sibling_position(id) else { return false };
        let Some(target) = pos.checked_add_signed(offset) else { return false };

        let siblings: &mut [OccurrenceId] = match self.parent(id) {
            Some(p) => &mut self.nodes[p.index()].children,
            None => &mut self.roots,
        };
        if target >= siblings.len() {
            return false;
        }
        siblings.swap(pos, target);
        true
    }

    /// Writes fresh nested-set bounds, flagging records whose bounds moved.
    pub(crate) fn set_bounds(&mut self, id: OccurrenceId, left: u32, right: u32, depth: u32) {
        let node = &mut self.nodes[id.index()];
        if (node.left, node.right, node.depth) != (left, right, depth) {
            node.left = left;
            node.right = right;
            node.depth = depth;
            self.dirty.insert(id);
        }
    }

    fn unlink(&mut self, id: OccurrenceId) {
        match self.nodes[id.index()].parent {
            Some(p) => self.nodes[p.index()].children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
    }

    fn record(&self, id: OccurrenceId) -> OccurrenceRecord {
        let n = self.node(id);
        OccurrenceRecord {
            id,
            vertex: n.vertex,
            parent: n.parent,
            left: n.left,
            right: n.right,
            depth: n.depth,
        }
    }

    pub fn records(&self) -> Vec<OccurrenceRecord> {
        self.live_ids().map(|id| self.record(id)).collect()
    }

    /// Records to upsert and ids to delete since the last `take_pending`.
    pub fn pending(&self) -> (Vec<OccurrenceRecord>, Vec<OccurrenceId>) {
        let upserts = self
            .dirty
            .iter()
            .filter(|id| self.is_live(**id))
            .map(|&id| self.record(id))
            .collect();
        let deletes = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.removed && n.persisted)
            .map(|(i, _)| OccurrenceId::new(i))
            .collect();
        (upserts, deletes)
    }

    pub fn take_pending(&mut self) -> (Vec<OccurrenceRecord>, Vec<OccurrenceId>) {
        let pending = self.pending();
        for record in &pending.0 {
            self.nodes[record.id.index()].persisted = true;
        }
        for id in &pending.1 {
            self.nodes[id.index()].persisted = false;
        }
        self.dirty.clear();
        pending
    }

    /// Rebuilds the arena from persisted records. Every record's vertex must
    /// satisfy `has_vertex`; unused ids become tombstones. Children are ordered
    /// by `left`.
    pub fn from_records(
        mut records: Vec<OccurrenceRecord>,
        has_vertex: impl Fn(VertexId) -> bool,
    ) -> Result<Self> {
        records.sort_by_key(|r| r.id);
        if let Some(pair) = records.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(SurveyError::MalformedForest(format!("duplicate occurrence id {:?}", pair[0].id)));
        }

        let slots = records.last().map_or(0, |r| r.id.index() + 1);
        let mut forest = Forest::new();
        forest.nodes = (0..slots)
            .map(|_| {
                let mut tombstone = Occurrence::new(VertexId::default(), None);
                tombstone.removed = true;
                tombstone
            })
            .collect();

        for r in &records {
            if !has_vertex(r.vertex) {
                return Err(SurveyError::UnknownVertex(r.vertex));
            }
            let node = &mut forest.nodes[r.id.index()];
            node.vertex = r.vertex;
            node.parent = r.parent;
            node.left = r.left;
            node.right = r.right;
            node.depth = r.depth;
            node.removed = false;
            node.persisted = true;
            forest.track(r.id, r.vertex);
        }

        let mut ordered: Vec<&OccurrenceRecord> = records.iter().collect();
        ordered.sort_by_key(|r| (r.left, r.id));
        for r in ordered {
            match r.parent {
                Some(p) if p == r.id || !forest.is_live(p) => {
                    return Err(SurveyError::MalformedForest(format!(
                        "occurrence {:?} has invalid parent {:?}",
                        r.id, p
                    )));
                }
                Some(p) => forest.nodes[p.index()].children.push(r.id),
                None => forest.roots.push(r.id),
            }
        }
        Ok(forest)
    }
}
