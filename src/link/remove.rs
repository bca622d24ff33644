use crate::error::{Result, SurveyError};
use crate::store::{OccurrenceId, Survey, VertexId, VertexKind};

impl Survey {
    /// Takes `answer` away from `question`. A plain answer goes with everything
    /// below it; a chained answer is cut out and its chain closes up.
    pub fn remove_answer(&mut self, question: VertexId, answer: VertexId) -> Result<()> {
        self.require_question(question)?;
        let kind = self.require_answer(answer)?;
        if !self.answers(question).contains(&answer) {
            return Err(SurveyError::InvalidArgument(format!(
                "answer {:?} does not belong to question {:?}",
                answer, question
            )));
        }
        self.transact("remove_answer", |s| {
            let occurrences = s.forest.occurrences_of(answer);
            if VertexKind::Answer(kind).is_chained() {
                for &occ in occurrences.iter().rev() {
                    s.splice_out(occ);
                }
            } else {
                for occ in occurrences {
                    let under_question = s.forest.parent(occ).is_some_and(|p| s.forest.vertex_of(p) == question);
                    if under_question {
                        s.forest.remove_subtree(occ);
                    }
                }
            }
            tracing::debug!(question = question.0, answer = answer.0, "answer removed");
            Ok(())
        })
    }

    /// Removes `occ` alone; its children move up to its parent.
    fn splice_out(&mut self, occ: OccurrenceId) {
        let parent = self.forest.parent(occ);
        for child in self.forest.children(occ).to_vec() {
            match parent {
                Some(p) => self.forest.attach(child, p),
                None => self.forest.make_root(child),
            }
        }
        self.forest.remove_subtree(occ);
    }

    /// Breaks the outgoing link of `vertex`.
    ///
    /// For a question this drops the questions hanging directly below it and
    /// then unlinks each of its answers. For an answer, the first placement of
    /// its next question becomes a root and every other placement is removed.
    pub fn remove_link(&mut self, vertex: VertexId) -> Result<()> {
        if self.require_vertex(vertex)?.kind.is_question() {
            self.transact("remove_link", |s| s.unlink_question(vertex))
        } else {
            self.transact("remove_link", |s| s.unlink_answer(vertex))
        }
    }

    fn unlink_question(&mut self, question: VertexId) -> Result<()> {
        if self.next_questions(question).is_empty() {
            return Ok(());
        }
        for occ in self.forest.occurrences_of(question) {
            let followers: Vec<OccurrenceId> = self
                .forest
                .children(occ)
                .iter()
                .copied()
                .filter(|&c| self.is_question(self.forest.vertex_of(c)))
                .collect();
            for follower in followers {
                self.forest.remove_subtree(follower);
            }
        }
        for answer in self.answers(question) {
            self.unlink_answer(answer)?;
        }
        tracing::debug!(question = question.0, "question unlinked");
        Ok(())
    }

    fn unlink_answer(&mut self, answer: VertexId) -> Result<()> {
        let Some(next) = self.next_question(answer) else {
            return Ok(());
        };
        let mut occurrences = self.forest.occurrences_of(next).into_iter();
        if let Some(first) = occurrences.next() {
            if self.forest.parent(first).is_some() {
                self.forest.make_root(first);
            }
        }
        for occ in occurrences {
            self.forest.remove_subtree(occ);
        }
        tracing::debug!(answer = answer.0, next = next.0, "answer unlinked");
        Ok(())
    }

    /// Deletes `vertex` with all of its occurrences. The first occurrence's
    /// children survive on its parent (or as roots); for a question only the
    /// non-answer children survive.
    pub fn delete_vertex(&mut self, vertex: VertexId) -> Result<()> {
        let is_question = self.require_vertex(vertex)?.kind.is_question();
        self.transact("delete_vertex", |s| {
            let occurrences = s.forest.occurrences_of(vertex);
            if let Some(&first) = occurrences.first() {
                let parent = s.forest.parent(first);
                let survivors: Vec<OccurrenceId> = s
                    .forest
                    .children(first)
                    .iter()
                    .copied()
                    .filter(|&c| !(is_question && s.is_answer(s.forest.vertex_of(c))))
                    .collect();
                for child in survivors {
                    match parent {
                        Some(p) => s.forest.attach(child, p),
                        None => s.forest.make_root(child),
                    }
                }
            }
            for occ in occurrences {
                s.forest.remove_subtree(occ);
            }
            s.drop_vertex(vertex);
            tracing::debug!(vertex = vertex.0, "vertex deleted");
            Ok(())
        })
    }
}
