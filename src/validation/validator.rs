//! Checks a respondent's recorded answers against the survey forest.
use super::error::{ReasonCode, ValidationErrors};
use super::rules::RuleInput;
use crate::analysis::topology;
use crate::store::{RecordedAnswer, Respondent, Survey, VertexId};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ptr;

/// Read-only validator over one survey.
///
/// A recorded answer is admissible when its vertex exists, a chain of answered
/// vertices leads from it back to a root, no other recorded answer shares one
/// of its parents, and the rules on the vertex and on the question above it pass.
pub struct Validator<'a> {
    survey: &'a Survey,
}

impl<'a> Validator<'a> {
    pub fn new(survey: &'a Survey) -> Self {
        Self { survey }
    }

    /// Validates every recorded answer of `respondent`, storing each report on
    /// the answer. Returns whether all of them passed.
    pub fn validate(&self, respondent: &mut Respondent) -> bool {
        let reports: Vec<ValidationErrors> = respondent
            .answers
            .iter()
            .map(|answer| self.validate_answer(respondent, answer))
            .collect();

        let id = respondent.id;
        let mut valid = true;
        for (answer, errors) in respondent.answers.iter_mut().zip(reports) {
            tracing::trace!(
                respondent = id.0,
                vertex = answer.vertex.0,
                errors = errors.nodes.len(),
                "answer validated"
            );
            valid &= errors.is_empty();
            answer.errors = errors;
        }
        valid
    }

    /// The report for one answer, judged against everything else `respondent`
    /// has recorded.
    pub fn validate_answer(&self, respondent: &Respondent, answer: &RecordedAnswer) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let vertex = answer.vertex;
        if self.survey.vertex(vertex).is_none() {
            errors.push(vertex, ReasonCode::InvalidNode);
            return errors;
        }
        if !self.path_to_root(vertex, respondent) {
            errors.push(vertex, ReasonCode::InvalidPath);
        }
        if self.has_duplicate_path(respondent, answer) {
            errors.push(vertex, ReasonCode::DuplicatePath);
        }
        if !self.validate_instance_node(respondent, answer, &mut errors) {
            errors.push(vertex, ReasonCode::Invalid);
        }
        errors
    }

    /// Rule and shape checks on the answer's own vertex, plus the rules of the
    /// question reached by walking up through chained answers.
    pub fn validate_instance_node(
        &self,
        respondent: &Respondent,
        answer: &RecordedAnswer,
        errors: &mut ValidationErrors,
    ) -> bool {
        let vertex = answer.vertex;
        let mut walk = Walk::default();
        let rules_pass = self.check_rules(vertex, respondent, &answer.value, &mut walk, errors);
        let shape_pass = self.survey.accepts_value(vertex, &answer.value);
        let upward_pass = self.upward(vertex, respondent, &answer.value, 0, &mut walk, errors);
        rules_pass && shape_pass && upward_pass
    }

    /// Passes if any occurrence of `vertex` passes its parent check. Errors are
    /// only kept when every occurrence fails.
    fn upward(
        &self,
        vertex: VertexId,
        respondent: &Respondent,
        value: &str,
        depth: usize,
        walk: &mut Walk,
        errors: &mut ValidationErrors,
    ) -> bool {
        let forest = self.survey.forest();
        let occurrences = forest.occurrences_of(vertex);
        if occurrences.is_empty() {
            return true;
        }
        let mut failures = ValidationErrors::new();
        for occ in occurrences {
            let Some(parent) = forest.parent(occ) else { return true };
            match self.parent_check(forest.vertex_of(parent), respondent, value, depth + 1, walk) {
                None => return true,
                Some(found) => failures.merge(found),
            }
        }
        errors.merge(failures);
        false
    }

    /// `None` when `vertex` passes, otherwise the errors found above it.
    fn parent_check(
        &self,
        vertex: VertexId,
        respondent: &Respondent,
        value: &str,
        depth: usize,
        walk: &mut Walk,
    ) -> Option<ValidationErrors> {
        if let Some(known) = walk.checked.get(&vertex) {
            return known.clone();
        }
        if depth >= self.survey.config().max_depth {
            return Some(ValidationErrors::new());
        }
        let mut errors = ValidationErrors::new();
        let passed = if self.survey.is_question(vertex) {
            self.check_rules(vertex, respondent, value, walk, &mut errors)
        } else {
            self.upward(vertex, respondent, value, depth, walk, &mut errors)
        };
        let outcome = (!passed).then_some(errors);
        walk.checked.insert(vertex, outcome.clone());
        outcome
    }

    /// Evaluates the rules attached to `owner`; failures are keyed by `owner`.
    fn check_rules(
        &self,
        owner: VertexId,
        respondent: &Respondent,
        value: &str,
        walk: &mut Walk,
        errors: &mut ValidationErrors,
    ) -> bool {
        let mut rules = self.survey.rules_for(owner).peekable();
        if rules.peek().is_none() {
            return true;
        }
        let answered_count = self.survey.is_question(owner).then(|| {
            *walk
                .answered
                .entry(owner)
                .or_insert_with(|| self.answered_below(owner, respondent))
        });
        let input = RuleInput { value, answered_count };

        let mut passed = true;
        for rule in rules {
            if let Err(code) = rule.kind.evaluate(&input) {
                errors.push(owner, code);
                passed = false;
            }
        }
        passed
    }

    /// Distinct answered answers in the chains directly below each occurrence of `question`.
    fn answered_below(&self, question: VertexId, respondent: &Respondent) -> usize {
        let forest = self.survey.forest();
        let mut answered = BTreeSet::new();
        for occ in forest.occurrences_of(question) {
            for &child in forest.children(occ) {
                for below in topology::descendants_while(forest, child, |v| self.survey.is_answer(v)) {
                    let v = forest.vertex_of(below);
                    if self.survey.is_answered_for(v, respondent) {
                        answered.insert(v);
                    }
                }
            }
        }
        answered.len()
    }

    /// Whether a chain of vertices on the respondent's path leads from `vertex`
    /// to a root occurrence. An answer is on the path when it was recorded; a
    /// question when it was recorded itself or one of its answers was, blank
    /// values included.
    pub fn path_to_root(&self, vertex: VertexId, respondent: &Respondent) -> bool {
        let forest = self.survey.forest();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([vertex]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) || !self.on_path(current, respondent) {
                continue;
            }
            for occ in forest.occurrences_of(current) {
                match forest.parent(occ) {
                    Some(parent) => queue.push_back(forest.vertex_of(parent)),
                    None => return true,
                }
            }
        }
        false
    }

    fn on_path(&self, vertex: VertexId, respondent: &Respondent) -> bool {
        if respondent.count_for(vertex) > 0 {
            return true;
        }
        self.survey.is_question(vertex)
            && self
                .survey
                .answers(vertex)
                .into_iter()
                .any(|answer| respondent.count_for(answer) > 0)
    }

    fn parent_vertices(&self, vertex: VertexId) -> BTreeSet<VertexId> {
        let forest = self.survey.forest();
        forest
            .occurrences_of(vertex)
            .into_iter()
            .filter_map(|occ| forest.parent(occ))
            .map(|parent| forest.vertex_of(parent))
            .collect()
    }

    /// Whether another recorded answer hangs off one of the same parent vertices.
    pub fn has_duplicate_path(&self, respondent: &Respondent, answer: &RecordedAnswer) -> bool {
        let parents = self.parent_vertices(answer.vertex);
        if parents.is_empty() {
            return false;
        }
        respondent
            .answers
            .iter()
            .filter(|other| !ptr::eq(*other, answer))
            .any(|other| !self.parent_vertices(other.vertex).is_disjoint(&parents))
    }
}

/// Memo for one upward walk. Results depend only on the vertex, the
/// respondent and the value, so each vertex is checked once.
#[derive(Default)]
struct Walk {
    // `None` when the vertex passed.
    checked: BTreeMap<VertexId, Option<ValidationErrors>>,
    answered: BTreeMap<VertexId, usize>,
}

/// Validates many respondents against one survey in parallel. Each respondent
/// is independent; one failing never affects another.
pub fn validate_respondents(survey: &Survey, respondents: &mut [Respondent]) -> Vec<bool> {
    let validator = Validator::new(survey);
    respondents.par_iter_mut().map(|r| validator.validate(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::store::{AnswerKind, RespondentId, RuleKind};
    use rstest::rstest;

    fn respondent(answers: &[(VertexId, &str)]) -> Respondent {
        let mut r = Respondent::new(RespondentId(1));
        for &(vertex, value) in answers {
            r.record(vertex, value);
        }
        r
    }

    #[test]
    fn test_answer_on_valid_path_passes() {
        let mut f = fixtures::branching();
        let q2_a = f.survey.add_answer(AnswerKind::Plain, "Q2 A");
        f.survey.build_answer(f.q2, q2_a).unwrap();

        let mut r = respondent(&[(f.a1, ""), (q2_a, "")]);
        assert!(Validator::new(&f.survey).validate(&mut r));
        assert!(r.answers.iter().all(|a| a.errors.is_empty()));
    }

    #[test]
    fn test_skipping_the_branch_is_an_invalid_path() {
        let mut f = fixtures::branching();
        let q2_a = f.survey.add_answer(AnswerKind::Plain, "Q2 A");
        f.survey.build_answer(f.q2, q2_a).unwrap();

        let mut r = respondent(&[(f.a2, ""), (q2_a, "")]);
        assert!(!Validator::new(&f.survey).validate(&mut r));
        assert!(r.answers[0].errors.is_empty());
        assert_eq!(r.answers[1].errors.codes_for(q2_a), &[ReasonCode::InvalidPath]);
    }

    #[test]
    fn test_two_answers_to_one_question_are_duplicates() {
        let f = fixtures::branching();
        let r = respondent(&[(f.a1, ""), (f.a2, "")]);
        let errors = Validator::new(&f.survey).validate_answer(&r, &r.answers[1]);
        assert!(errors.has(f.a2, ReasonCode::DuplicatePath));
        assert!(!errors.has(f.a2, ReasonCode::InvalidPath));
    }

    #[test]
    fn test_candidate_answer_is_checked_against_recorded_ones() {
        let f = fixtures::branching();
        let r = respondent(&[(f.a1, "")]);
        let candidate = RecordedAnswer::new(f.a2, "");
        let errors = Validator::new(&f.survey).validate_answer(&r, &candidate);
        assert!(errors.has(f.a2, ReasonCode::DuplicatePath));
    }

    #[test]
    fn test_unknown_vertex_is_invalid_node() {
        let f = fixtures::branching();
        let ghost = VertexId(99);
        let mut r = respondent(&[(ghost, "x")]);
        assert!(!Validator::new(&f.survey).validate(&mut r));
        assert_eq!(r.answers[0].errors.codes_for(ghost), &[ReasonCode::InvalidNode]);
    }

    #[test]
    fn test_chained_answers_are_not_duplicates() {
        let f = fixtures::chained(AnswerKind::Checkbox, 2);
        let mut r = respondent(&[(f.chain[0], "1"), (f.chain[1], "1")]);
        assert!(Validator::new(&f.survey).validate(&mut r));
    }

    #[rstest]
    #[case(1, false)]
    #[case(2, true)]
    fn test_maximum_answer_count_on_question(#[case] max: usize, #[case] valid: bool) {
        let mut f = fixtures::chained(AnswerKind::Checkbox, 2);
        f.survey.add_rule(f.question, RuleKind::MaximumAnswerCount(max)).unwrap();

        let mut r = respondent(&[(f.chain[0], "1"), (f.chain[1], "1")]);
        assert_eq!(Validator::new(&f.survey).validate(&mut r), valid);

        let second = &r.answers[1].errors;
        assert_eq!(second.has(f.question, ReasonCode::MaximumAnswer), !valid);
        assert_eq!(second.has(f.chain[1], ReasonCode::Invalid), !valid);
        assert!(!second.has(f.chain[1], ReasonCode::DuplicatePath));
    }

    #[test]
    fn test_blank_checkbox_does_not_count_towards_maximum() {
        let mut f = fixtures::chained(AnswerKind::Checkbox, 2);
        f.survey.add_rule(f.question, RuleKind::MaximumAnswerCount(1)).unwrap();
        let r = respondent(&[(f.chain[0], "1"), (f.chain[1], "  ")]);
        let errors = Validator::new(&f.survey).validate_answer(&r, &r.answers[1]);
        assert!(!errors.has(f.question, ReasonCode::MaximumAnswer));
    }

    #[rstest]
    #[case("1", true)]
    #[case("3", true)]
    #[case("", true)]
    #[case("4", false)]
    #[case("0", false)]
    #[case("-1", false)]
    #[case("2a", false)]
    fn test_rank_values(#[case] value: &str, #[case] accepted: bool) {
        let f = fixtures::ranked(3);
        let r = respondent(&[(f.chain[0], value)]);
        let errors = Validator::new(&f.survey).validate_answer(&r, &r.answers[0]);
        assert_eq!(errors.has(f.chain[0], ReasonCode::Invalid), !accepted);
    }

    #[rstest]
    #[case("true", true)]
    #[case("false", true)]
    #[case("TRUE", false)]
    fn test_boolean_values(#[case] value: &str, #[case] accepted: bool) {
        let f = fixtures::chained(AnswerKind::Boolean, 1);
        let r = respondent(&[(f.chain[0], value)]);
        let errors = Validator::new(&f.survey).validate_answer(&r, &r.answers[0]);
        assert_eq!(errors.has(f.chain[0], ReasonCode::Invalid), !accepted);
    }

    #[test]
    fn test_rule_failures_are_keyed_by_owner() {
        let mut f = fixtures::chained(AnswerKind::Text, 1);
        let answer = f.chain[0];
        f.survey.add_rule(answer, RuleKind::MinimumLength(3)).unwrap();
        f.survey.add_rule(f.question, RuleKind::MaximumValue(10.0)).unwrap();

        let r = respondent(&[(answer, "42")]);
        let errors = Validator::new(&f.survey).validate_answer(&r, &r.answers[0]);
        assert_eq!(
            errors.codes_for(answer),
            &[ReasonCode::MinimumLength, ReasonCode::Invalid]
        );
        assert_eq!(errors.codes_for(f.question), &[ReasonCode::MaximumValue]);
    }

    #[rstest]
    #[case(AnswerKind::Rank)]
    #[case(AnswerKind::Text)]
    fn test_blank_answer_under_root_question_passes(#[case] kind: AnswerKind) {
        let f = fixtures::chained(kind, 3);
        let mut r = respondent(&[(f.chain[0], "")]);
        assert!(Validator::new(&f.survey).validate(&mut r));
        assert!(r.answers[0].errors.is_empty());
    }

    #[test]
    fn test_blank_answer_opens_the_path_to_the_next_question() {
        let mut f = fixtures::chained(AnswerKind::Text, 1);
        let next = f.survey.add_question("Next");
        let next_a = f.survey.add_answer(AnswerKind::Plain, "Next A");
        f.survey.build_answer(next, next_a).unwrap();
        f.survey.build_link(f.chain[0], next).unwrap();

        let r = respondent(&[(f.chain[0], ""), (next_a, "")]);
        assert!(Validator::new(&f.survey).path_to_root(next_a, &r));
    }

    #[test]
    fn test_path_to_root_needs_the_question_on_the_path() {
        let f = fixtures::branching();
        let validator = Validator::new(&f.survey);

        let mut r = respondent(&[(f.a1, "")]);
        assert!(!validator.path_to_root(f.q2, &r));
        assert!(validator.path_to_root(f.a1, &r));

        r.record(f.q2, "");
        assert!(validator.path_to_root(f.q2, &r));
        assert!(!validator.path_to_root(f.q3, &r));
    }

    fn converging_with_final_answers() -> (fixtures::Converging, Vec<VertexId>) {
        let mut f = fixtures::converging();
        let finals = ["Q4 A1", "Q4 A2"]
            .into_iter()
            .map(|label| {
                let answer = f.survey.add_answer(AnswerKind::Plain, label);
                f.survey.build_answer(f.q4, answer).unwrap();
                answer
            })
            .collect();
        (f, finals)
    }

    #[test]
    fn test_converging_paths_through_cloned_placements() {
        let (f, finals) = converging_with_final_answers();
        let q1_a = f.survey.answers(f.q1);
        let q2_a = f.survey.answers(f.q2);
        let q3_a = f.survey.answers(f.q3);
        let validator = Validator::new(&f.survey);

        // Q1 A1 -> Q2 A2 -> Q3 A1 -> Q4
        let mut long = respondent(&[(q1_a[0], ""), (q2_a[1], ""), (q3_a[0], ""), (finals[0], "")]);
        assert!(validator.validate(&mut long));

        // Q3 was never reached: neither Q1 A2 nor Q2 A2 was recorded.
        let mut skipped = respondent(&[(q1_a[0], ""), (q3_a[0], ""), (finals[0], "")]);
        assert!(!validator.validate(&mut skipped));
        assert!(skipped.answers[0].errors.is_empty());
        assert_eq!(skipped.answers[1].errors.codes_for(q3_a[0]), &[ReasonCode::InvalidPath]);
        assert_eq!(skipped.answers[2].errors.codes_for(finals[0]), &[ReasonCode::InvalidPath]);
    }

    #[test]
    fn test_duplicates_across_cloned_placements() {
        let (f, finals) = converging_with_final_answers();
        let validator = Validator::new(&f.survey);

        let mut r = respondent(&[(f.q1_a3, ""), (finals[0], ""), (finals[1], "")]);
        assert!(!validator.validate(&mut r));
        assert!(r.answers[0].errors.is_empty());
        for (answer, vertex) in r.answers[1..].iter().zip(&finals) {
            assert_eq!(answer.errors.codes_for(*vertex), &[ReasonCode::DuplicatePath]);
        }
    }

    #[test]
    fn test_rule_above_many_placements_fails_once() {
        let mut s = Survey::new(crate::store::SurveyId(1));
        let entry = s.add_question("Entry");
        let ranked = s.add_question("Ranked");
        let chain: Vec<VertexId> = (1..=9)
            .map(|i| {
                let answer = s.add_answer(AnswerKind::Rank, format!("R{i}"));
                s.build_answer(ranked, answer).unwrap();
                answer
            })
            .collect();
        s.add_rule(ranked, RuleKind::MaximumAnswerCount(0)).unwrap();
        let entries: Vec<VertexId> = (1..=4)
            .map(|i| {
                let answer = s.add_answer(AnswerKind::Plain, format!("E{i}"));
                s.build_answer(entry, answer).unwrap();
                s.build_link(answer, ranked).unwrap();
                answer
            })
            .collect();
        assert_eq!(s.occurrences_of(chain[8]).len(), 4);

        let mut r = respondent(&[(entries[0], "")]);
        for (i, &answer) in chain.iter().enumerate() {
            r.record(answer, (i + 1).to_string());
        }

        let errors = Validator::new(&s).validate_answer(&r, &r.answers[9]);
        assert_eq!(errors.codes_for(ranked), &[ReasonCode::MaximumAnswer]);
        assert_eq!(errors.codes_for(chain[8]), &[ReasonCode::Invalid]);
        assert_eq!(errors.nodes.len(), 2);
    }

    #[test]
    fn test_validate_respondents_in_parallel() {
        let f = fixtures::branching();
        let mut batch = vec![
            respondent(&[(f.a1, "")]),
            respondent(&[(f.a1, ""), (f.a2, "")]),
            respondent(&[]),
        ];
        assert_eq!(validate_respondents(&f.survey, &mut batch), vec![true, false, true]);
        assert!(batch[1].answers[1].errors.has(f.a2, ReasonCode::DuplicatePath));
    }
}
