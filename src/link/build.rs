use crate::analysis::topology;
use crate::error::{Result, SurveyError};
use crate::store::{AnswerKind, OccurrenceId, Survey, VertexId, VertexKind};
use std::collections::VecDeque;

impl Survey {
    /// Places `question` as a root unless it already has an occurrence.
    pub fn build_question(&mut self, question: VertexId) -> Result<OccurrenceId> {
        self.require_question(question)?;
        self.transact("build_question", |s| {
            if let Some(&first) = s.forest.occurrences_of(question).first() {
                return Ok(first);
            }
            let root = s.forest.insert_root(question);
            tracing::debug!(question = question.0, occurrence = root.0, "question placed");
            Ok(root)
        })
    }

    /// Hangs `answer` off `question`. Plain answers go below every occurrence of
    /// the question; chained answers go below every occurrence of the chain's end.
    pub fn build_answer(&mut self, question: VertexId, answer: VertexId) -> Result<()> {
        self.require_question(question)?;
        let kind = self.require_answer(answer)?;
        self.transact("build_answer", |s| s.attach_answer(question, answer, kind))
    }

    pub(crate) fn attach_answer(&mut self, question: VertexId, answer: VertexId, kind: AnswerKind) -> Result<()> {
        let existing = self.answers(question);
        if existing.contains(&answer) {
            return Err(SurveyError::InvalidArgument(format!(
                "answer {:?} already belongs to question {:?}",
                answer, question
            )));
        }
        for &other in &existing {
            if let Some(expected) = self.kind_of(other).and_then(|k| k.answer_kind()) {
                if expected != kind {
                    return Err(SurveyError::MixedAnswerType { question, expected, found: kind });
                }
            }
        }

        let mut question_occs = self.forest.occurrences_of(question);
        if question_occs.is_empty() {
            question_occs.push(self.forest.insert_root(question));
        }

        let hosts = if VertexKind::Answer(kind).is_chained() {
            let chain_end = existing.last().copied().unwrap_or(question);
            self.forest.occurrences_of(chain_end)
        } else {
            question_occs
        };

        let mut spare: VecDeque<OccurrenceId> = self
            .forest
            .occurrences_of(answer)
            .into_iter()
            .filter(|&o| self.forest.parent(o).is_none())
            .collect();

        for host in hosts {
            match spare.pop_front() {
                Some(occ) => self.forest.attach(occ, host),
                None => {
                    self.forest.insert_child(host, answer);
                }
            }
        }

        // Questions that followed the host directly now follow the new answer.
        for occ in self.forest.occurrences_of(answer) {
            let Some(parent) = self.forest.parent(occ) else { continue };
            let followers: Vec<OccurrenceId> = self
                .forest
                .children(parent)
                .iter()
                .copied()
                .filter(|&c| c != occ && self.is_question(self.forest.vertex_of(c)))
                .collect();
            for follower in followers {
                self.forest.attach(follower, occ);
            }
        }

        tracing::debug!(question = question.0, answer = answer.0, kind = ?kind, "answer built");
        Ok(())
    }

    /// Links `from` to the question `to`, cloning `to`'s sub-tree so every
    /// occurrence of `from` gets its own copy.
    pub fn build_link(&mut self, from: VertexId, to: VertexId) -> Result<()> {
        self.require_vertex(from)?;
        if !self.require_vertex(to)?.kind.is_question() {
            return Err(SurveyError::InvalidArgument(format!("link target {:?} must be a question", to)));
        }
        if self.is_answer(from) && self.question(from).is_none() {
            return Err(SurveyError::MissingQuestion(from));
        }
        self.transact("build_link", |s| s.link(from, to))
    }

    fn link(&mut self, from: VertexId, to: VertexId) -> Result<()> {
        let limit = self.config().max_depth;
        let from_occs = self.forest.occurrences_of(from);
        if from_occs.is_empty() {
            return Err(SurveyError::InvalidArgument(format!("vertex {:?} is not placed in the survey", from)));
        }
        if from_occs.iter().any(|&o| !self.forest.children(o).is_empty()) {
            return Err(SurveyError::AlreadyLinked(from));
        }

        let mut to_occs = self.forest.occurrences_of(to);
        if to_occs.is_empty() {
            to_occs.push(self.forest.insert_root(to));
        }
        let canonical = to_occs[0];

        let mut targets: Vec<OccurrenceId> =
            to_occs.into_iter().filter(|&o| self.forest.parent(o).is_none()).collect();
        let mut cloned = 0;
        while targets.len() < from_occs.len() {
            targets.push(topology::clone_subtree(&mut self.forest, canonical, limit)?);
            cloned += 1;
        }

        for (&from_occ, &target) in from_occs.iter().zip(&targets) {
            self.forest.attach(target, from_occ);
        }

        for &from_occ in &from_occs {
            if topology::has_cycle(&self.forest, from_occ, limit)? {
                return Err(SurveyError::InfiniteLoop(from));
            }
        }

        tracing::debug!(from = from.0, to = to.0, paths = from_occs.len(), cloned, "link built");
        Ok(())
    }

    /// Retags every answer of `question` and rebuilds them in order. Refused
    /// while any question follows `question`.
    pub fn update_question_type(&mut self, question: VertexId, kind: AnswerKind) -> Result<()> {
        self.require_question(question)?;
        if !self.next_questions(question).is_empty() {
            return Err(SurveyError::InvalidArgument(
                "no questions can follow when changing the question type".into(),
            ));
        }
        self.transact("update_question_type", |s| {
            let answers = s.answers(question);
            for &answer in &answers {
                for occ in s.forest.occurrences_of(answer) {
                    s.forest.remove_subtree(occ);
                }
            }
            for &answer in &answers {
                s.set_kind(answer, VertexKind::Answer(kind));
            }
            for &answer in &answers {
                s.attach_answer(question, answer, kind)?;
            }
            tracing::debug!(question = question.0, kind = ?kind, answers = answers.len(), "question type updated");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::display::outline;
    use crate::error::SurveyError;
    use crate::fixtures;
    use crate::store::{AnswerKind, Survey, SurveyId};

    #[test]
    fn test_build_answer_requires_question_and_answer() {
        let mut s = Survey::new(SurveyId(1));
        let q = s.add_question("Q");
        let a = s.add_answer(AnswerKind::Plain, "A");
        assert!(matches!(s.build_answer(a, q), Err(SurveyError::InvalidArgument(_))));
        assert!(matches!(s.build_answer(q, q), Err(SurveyError::InvalidArgument(_))));
        s.build_answer(q, a).unwrap();
        assert_eq!(outline(&s), "Q\n`-- A\n");
    }

    #[test]
    fn test_mixed_answer_types_are_rejected() {
        let mut s = Survey::new(SurveyId(1));
        let q = s.add_question("Q");
        let a1 = s.add_answer(AnswerKind::Plain, "A1");
        let a2 = s.add_answer(AnswerKind::Boolean, "A2");
        s.build_answer(q, a1).unwrap();

        let before = outline(&s);
        let err = s.build_answer(q, a2).unwrap_err();
        assert!(matches!(
            err,
            SurveyError::MixedAnswerType { expected: AnswerKind::Plain, found: AnswerKind::Boolean, .. }
        ));
        assert_eq!(outline(&s), before);
    }

    #[test]
    fn test_chained_answers_append_to_chain_end() {
        let f = fixtures::chained(AnswerKind::Checkbox, 3);
        assert_eq!(outline(&f.survey), "Q\n`-- C1\n    `-- C2\n        `-- C3\n");
    }

    #[test]
    fn test_chain_end_keeps_next_question() {
        let mut f = fixtures::chained(AnswerKind::Text, 2);
        let next = f.survey.add_question("Next");
        f.survey.build_link(f.chain[1], next).unwrap();

        let extra = f.survey.add_answer(AnswerKind::Text, "C3");
        f.survey.build_answer(f.question, extra).unwrap();
        assert_eq!(f.survey.next_question(extra), Some(next));
        assert_eq!(
            outline(&f.survey),
            "Q\n`-- C1\n    `-- C2\n        `-- C3\n            `-- Next\n"
        );
    }

    #[test]
    fn test_build_link_clones_for_every_path() {
        let f = fixtures::converging();
        // Q1-A3, Q1-A1-Q2-A1, and both Q3 answers under each of Q3's two paths.
        let q4_paths = f.survey.occurrences_of(f.q4).len();
        assert_eq!(q4_paths, 6);
        assert_eq!(f.survey.occurrences_of(f.q3).len(), 2);
        assert!(f.survey.occurrences_of(f.q4).iter().all(|&o| f.survey.forest().parent(o).is_some()));
        assert_eq!(f.survey.forest().roots().len(), 1);
    }

    #[test]
    fn test_second_build_link_fails_and_changes_nothing() {
        let mut f = fixtures::branching();
        let before = outline(&f.survey);
        let pending = f.survey.pending_changes();

        let err = f.survey.build_link(f.a1, f.q3).unwrap_err();
        assert!(matches!(err, SurveyError::AlreadyLinked(v) if v == f.a1));
        assert_eq!(outline(&f.survey), before);
        assert_eq!(f.survey.pending_changes(), pending);
    }

    #[test]
    fn test_link_back_to_ancestor_is_an_infinite_loop() {
        let mut f = fixtures::branching();
        let q2_a1 = f.survey.add_answer(AnswerKind::Plain, "Q2 A1");
        f.survey.build_answer(f.q2, q2_a1).unwrap();
        let before = outline(&f.survey);
        let live = f.survey.forest().live_count();

        let err = f.survey.build_link(q2_a1, f.q1).unwrap_err();
        assert!(matches!(err, SurveyError::InfiniteLoop(v) if v == q2_a1));
        assert_eq!(outline(&f.survey), before);
        assert_eq!(f.survey.forest().live_count(), live);
    }

    #[test]
    fn test_link_target_must_be_question() {
        let mut f = fixtures::branching();
        let err = f.survey.build_link(f.a1, f.a2).unwrap_err();
        assert!(matches!(err, SurveyError::InvalidArgument(_)));
    }

    #[test]
    fn test_answer_without_question_cannot_link() {
        let mut s = Survey::new(SurveyId(1));
        let a = s.add_answer(AnswerKind::Plain, "A");
        let q = s.add_question("Q");
        assert!(matches!(s.build_link(a, q), Err(SurveyError::MissingQuestion(v)) if v == a));
    }

    #[test]
    fn test_update_question_type_rebuilds_as_chain() {
        let mut s = Survey::new(SurveyId(1));
        let q = s.add_question("Q");
        let a1 = s.add_answer(AnswerKind::Plain, "A1");
        let a2 = s.add_answer(AnswerKind::Plain, "A2");
        s.build_answer(q, a1).unwrap();
        s.build_answer(q, a2).unwrap();
        assert_eq!(outline(&s), "Q\n|-- A1\n`-- A2\n");

        s.update_question_type(q, AnswerKind::Rank).unwrap();
        assert_eq!(outline(&s), "Q\n`-- A1\n    `-- A2\n");
        assert_eq!(s.max_rank(a2), 2);
    }

    #[test]
    fn test_update_question_type_refused_with_followers() {
        let mut f = fixtures::branching();
        let err = f.survey.update_question_type(f.q1, AnswerKind::Text).unwrap_err();
        assert!(matches!(err, SurveyError::InvalidArgument(_)));
    }
}
