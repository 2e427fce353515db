//! Built-in surveys used by the seed tool, the terminal app and tests.

use crate::model::{
    Answer, AnswerId, Branch, Condition, Question, QuestionId, Survey, SurveyError, SurveyId,
    Target,
};

/// Two questions: a required yes/no followed by optional comments (max 10 chars).
///
/// # Errors
///
/// Never fails in practice; the definition is static.
pub fn vaccination_survey(id: SurveyId) -> Result<Survey, SurveyError> {
    Survey::linear(
        id,
        "Vaccination",
        vec![
            Question::boolean(QuestionId::new(1), "Have you been vaccinated?"),
            Question::text(QuestionId::new(2), "Any comments?", 10).optional(),
        ],
    )
}

/// One question of every kind, with a branch that skips the symptom block for
/// respondents who feel fine.
///
/// # Errors
///
/// Never fails in practice; the definition is static.
pub fn wellbeing_survey(id: SurveyId) -> Result<Survey, SurveyError> {
    let feeling_well = Question::boolean(QuestionId::new(1), "Are you feeling well today?")
        .with_branch(Branch::new(
            Condition::equals(true),
            Target::Question(QuestionId::new(4)),
        ))
        .with_next(QuestionId::new(2));

    let symptoms = Question::checklist(
        QuestionId::new(2),
        "Which symptoms do you have?",
        vec![
            "cough".into(),
            "fever".into(),
            "headache".into(),
            "fatigue".into(),
        ],
    )
    .with_next(QuestionId::new(3));

    let severity = Question::range(
        QuestionId::new(3),
        "How bad is it, from 0 to 10?",
        0.0,
        10.0,
        1.0,
    )
    .with_next(QuestionId::new(4));

    let activity = Question::choice(
        QuestionId::new(4),
        "How did you move today?",
        vec![
            Answer::new(AnswerId::new(1), "Walking"),
            Answer::new(AnswerId::new(2), "Cycling"),
            Answer::new(AnswerId::new(3), "Running"),
            Answer::new(AnswerId::new(4), "Not at all"),
        ],
    )
    .with_next(QuestionId::new(5));

    let steps = Question::number(
        QuestionId::new(5),
        "Roughly how many steps?",
        Some(0.0),
        Some(100_000.0),
    )
    .optional()
    .with_next(QuestionId::new(6));

    let comments = Question::text(QuestionId::new(6), "Anything else?", 140).optional();

    Survey::new(
        id,
        "Daily wellbeing",
        Some(QuestionId::new(1)),
        vec![feeling_well, symptoms, severity, activity, steps, comments],
    )
}
