//! Survey builders shared by the unit tests.
use crate::store::{AnswerKind, Survey, SurveyId, VertexId};

pub struct Branching {
    pub survey: Survey,
    pub q1: VertexId,
    pub a1: VertexId,
    pub a2: VertexId,
    pub q2: VertexId,
    pub q3: VertexId,
}

/// `Q1 -> {A1 -> Q2, A2 -> Q3}`
pub fn branching() -> Branching {
    let mut survey = Survey::new(SurveyId(1));
    let q1 = survey.add_question("Q1");
    let a1 = survey.add_answer(AnswerKind::Plain, "A1");
    let a2 = survey.add_answer(AnswerKind::Plain, "A2");
    let q2 = survey.add_question("Q2");
    let q3 = survey.add_question("Q3");

    survey.build_answer(q1, a1).unwrap();
    survey.build_answer(q1, a2).unwrap();
    survey.build_link(a1, q2).unwrap();
    survey.build_link(a2, q3).unwrap();
    Branching { survey, q1, a1, a2, q2, q3 }
}

pub struct Chained {
    pub survey: Survey,
    pub question: VertexId,
    pub chain: Vec<VertexId>,
}

/// Question `Q` with `n` chained answers `C1..Cn` of `kind`.
pub fn chained(kind: AnswerKind, n: usize) -> Chained {
    let mut survey = Survey::new(SurveyId(1));
    let question = survey.add_question("Q");
    let chain = (1..=n)
        .map(|i| {
            let answer = survey.add_answer(kind, format!("C{i}"));
            survey.build_answer(question, answer).unwrap();
            answer
        })
        .collect();
    Chained { survey, question, chain }
}

pub fn ranked(n: usize) -> Chained {
    chained(AnswerKind::Rank, n)
}

pub struct Converging {
    pub survey: Survey,
    pub q1: VertexId,
    pub q2: VertexId,
    pub q3: VertexId,
    pub q4: VertexId,
    pub q1_a3: VertexId,
}

/// Several paths meeting in the same questions:
///
/// ```text
/// Q1 -> {A1 -> Q2, A2 -> Q3, A3 -> Q4}
/// Q2 -> {A1 -> Q4, A2 -> Q3}
/// Q3 -> {A1 -> Q4, A2 -> Q4}
/// ```
pub fn converging() -> Converging {
    let mut survey = Survey::new(SurveyId(1));
    let q1 = survey.add_question("Q1");
    let q2 = survey.add_question("Q2");
    let q3 = survey.add_question("Q3");
    let q4 = survey.add_question("Q4");

    fn answers(survey: &mut Survey, question: VertexId, prefix: &str, n: usize) -> Vec<VertexId> {
        (1..=n)
            .map(|i| {
                let answer = survey.add_answer(AnswerKind::Plain, format!("{prefix} A{i}"));
                survey.build_answer(question, answer).unwrap();
                answer
            })
            .collect()
    }
    let q1_answers = answers(&mut survey, q1, "Q1", 3);
    let q2_answers = answers(&mut survey, q2, "Q2", 2);
    let q3_answers = answers(&mut survey, q3, "Q3", 2);

    survey.build_link(q1_answers[0], q2).unwrap();
    survey.build_link(q1_answers[1], q3).unwrap();
    survey.build_link(q1_answers[2], q4).unwrap();
    survey.build_link(q2_answers[0], q4).unwrap();
    survey.build_link(q2_answers[1], q3).unwrap();
    survey.build_link(q3_answers[0], q4).unwrap();
    survey.build_link(q3_answers[1], q4).unwrap();

    Converging { survey, q1, q2, q3, q4, q1_a3: q1_answers[2] }
}
