use crate::analysis::topology;
use crate::error::Result;
use crate::store::{OccurrenceId, Survey, VertexId, VertexKind};

impl Survey {
    /// Moves `answer` one step towards the front. Plain answers swap with the
    /// previous sibling; chained answers swap with the answer above them.
    pub fn move_up(&mut self, answer: VertexId) -> Result<()> {
        let chained = VertexKind::Answer(self.require_answer(answer)?).is_chained();
        self.transact("move_up", |s| {
            s.shift(answer, chained, true);
            Ok(())
        })
    }

    pub fn move_down(&mut self, answer: VertexId) -> Result<()> {
        let chained = VertexKind::Answer(self.require_answer(answer)?).is_chained();
        self.transact("move_down", |s| {
            s.shift(answer, chained, false);
            Ok(())
        })
    }

    /// Position of `answer` among its siblings, or within its chain.
    pub fn sibling_index(&self, answer: VertexId) -> Result<usize> {
        let chained = VertexKind::Answer(self.require_answer(answer)?).is_chained();
        let Some(&first) = self.forest.occurrences_of(answer).first() else {
            return Ok(0);
        };
        if chained {
            let above = topology::ancestors_while(&self.forest, first, |v| self.is_answer(v));
            Ok(above.len().saturating_sub(1))
        } else {
            Ok(self.forest.sibling_position(first).unwrap_or(0))
        }
    }

    /// Moves `answer` step by step until it reaches `index`, or as far as it can.
    pub fn set_sibling_index(&mut self, answer: VertexId, index: usize) -> Result<()> {
        let chained = VertexKind::Answer(self.require_answer(answer)?).is_chained();
        let current = self.sibling_index(answer)?;
        self.transact("set_sibling_index", |s| {
            let up = index < current;
            for _ in 0..current.abs_diff(index) {
                s.shift(answer, chained, up);
            }
            Ok(())
        })
    }

    fn shift(&mut self, answer: VertexId, chained: bool, up: bool) {
        for occ in self.forest.occurrences_of(answer) {
            if !chained {
                self.forest.swap_sibling(occ, if up { -1 } else { 1 });
            } else if up {
                self.rotate_up(occ);
            } else if let Some(below) = self.first_answer_child(occ) {
                self.rotate_up(below);
            }
        }
    }

    fn first_answer_child(&self, occ: OccurrenceId) -> Option<OccurrenceId> {
        self.forest
            .children(occ)
            .iter()
            .copied()
            .find(|&c| self.is_answer(self.forest.vertex_of(c)))
    }

    /// Swaps `occ` with its parent answer: `occ` takes the parent's slot and
    /// the parent takes over `occ`'s children.
    fn rotate_up(&mut self, occ: OccurrenceId) {
        let Some(parent) = self.forest.parent(occ) else { return };
        if !self.is_answer(self.forest.vertex_of(parent)) {
            return;
        }
        let grandparent = self.forest.parent(parent);
        let slot = self.forest.sibling_position(parent).unwrap_or(0);

        self.forest.attach_at(occ, grandparent, slot);
        for child in self.forest.children(occ).to_vec() {
            self.forest.attach(child, parent);
        }
        self.forest.attach(parent, occ);
    }
}
