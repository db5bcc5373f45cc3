//! Wire-exact quiz payload produced by the generative adapter.
//!
//! The shape is a compatibility contract: twenty multiple-choice items with
//! four options each, five fill-in-the-blank items, and an answer key that
//! carries literal answer text rather than indices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required number of multiple-choice items.
pub const MULTIPLE_CHOICE_COUNT: usize = 20;
/// Required number of options per multiple-choice item.
pub const OPTION_COUNT: usize = 4;
/// Required number of fill-in-the-blank items.
pub const FILL_IN_THE_BLANKS_COUNT: usize = 5;
/// Literal placeholder every fill-in-the-blank question must contain.
pub const BLANK_PLACEHOLDER: &str = "____";

/// Violations of the quiz shape contract.
#[derive(Debug, Error)]
pub enum QuizShapeError {
    /// Wrong number of multiple-choice items.
    #[error("expected {MULTIPLE_CHOICE_COUNT} multiple choice items, got {0}")]
    MultipleChoiceCount(usize),
    /// A multiple-choice item carries the wrong number of options.
    #[error("question {index} has {got} options, expected {OPTION_COUNT}")]
    OptionCount {
        /// Zero-based item index.
        index: usize,
        /// Number of options found.
        got: usize,
    },
    /// A correct-answer index points outside the option list.
    #[error("question {index} has correct_answer_index {got} out of range")]
    AnswerIndexOutOfRange {
        /// Zero-based item index.
        index: usize,
        /// Offending index value.
        got: usize,
    },
    /// Wrong number of fill-in-the-blank items.
    #[error("expected {FILL_IN_THE_BLANKS_COUNT} fill-in-the-blank items, got {0}")]
    FillInTheBlanksCount(usize),
    /// A fill-in-the-blank question lacks the literal `____` placeholder.
    #[error("fill-in-the-blank question {0} is missing the '____' placeholder")]
    MissingPlaceholder(usize),
    /// Answer key lengths do not match the question lists.
    #[error("answer key lengths {multiple_choice}/{fill_in_the_blanks} do not match question counts")]
    AnswerKeyMismatch {
        /// Answer-key entries for multiple choice.
        multiple_choice: usize,
        /// Answer-key entries for fill-in-the-blanks.
        fill_in_the_blanks: usize,
    },
}

/// One multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleChoiceItem {
    /// Question text.
    pub question: String,
    /// Candidate answers, exactly four.
    pub options: Vec<String>,
    /// Index of the correct answer within `options`.
    pub correct_answer_index: usize,
}

/// One fill-in-the-blank question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillInTheBlankItem {
    /// Question text containing the literal `____` placeholder.
    pub question: String,
    /// Correct word or phrase for the blank.
    pub answer: String,
}

/// Literal correct-answer text for every question, in question order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerKey {
    /// Correct answers for the multiple-choice questions, as text.
    pub multiple_choice: Vec<String>,
    /// Correct answers for the fill-in-the-blank questions.
    pub fill_in_the_blanks: Vec<String>,
}

/// Full quiz artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    /// Exactly twenty multiple-choice questions.
    pub multiple_choice: Vec<MultipleChoiceItem>,
    /// Exactly five fill-in-the-blank questions.
    pub fill_in_the_blanks: Vec<FillInTheBlankItem>,
    /// Answer key carrying literal answer text.
    pub answer_key: AnswerKey,
}

impl Quiz {
    /// Check the shape contract; a violation is a hard generation failure.
    pub fn validate(&self) -> Result<(), QuizShapeError> {
        if self.multiple_choice.len() != MULTIPLE_CHOICE_COUNT {
            return Err(QuizShapeError::MultipleChoiceCount(self.multiple_choice.len()));
        }
        for (index, item) in self.multiple_choice.iter().enumerate() {
            if item.options.len() != OPTION_COUNT {
                return Err(QuizShapeError::OptionCount {
                    index,
                    got: item.options.len(),
                });
            }
            if item.correct_answer_index >= item.options.len() {
                return Err(QuizShapeError::AnswerIndexOutOfRange {
                    index,
                    got: item.correct_answer_index,
                });
            }
        }
        if self.fill_in_the_blanks.len() != FILL_IN_THE_BLANKS_COUNT {
            return Err(QuizShapeError::FillInTheBlanksCount(
                self.fill_in_the_blanks.len(),
            ));
        }
        for (index, item) in self.fill_in_the_blanks.iter().enumerate() {
            if !item.question.contains(BLANK_PLACEHOLDER) {
                return Err(QuizShapeError::MissingPlaceholder(index));
            }
        }
        if self.answer_key.multiple_choice.len() != MULTIPLE_CHOICE_COUNT
            || self.answer_key.fill_in_the_blanks.len() != FILL_IN_THE_BLANKS_COUNT
        {
            return Err(QuizShapeError::AnswerKeyMismatch {
                multiple_choice: self.answer_key.multiple_choice.len(),
                fill_in_the_blanks: self.answer_key.fill_in_the_blanks.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A shape-valid quiz for tests.
    pub fn valid_quiz() -> Quiz {
        let multiple_choice: Vec<MultipleChoiceItem> = (0..MULTIPLE_CHOICE_COUNT)
            .map(|n| MultipleChoiceItem {
                question: format!("Question {n}?"),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer_index: n % OPTION_COUNT,
            })
            .collect();
        let fill_in_the_blanks: Vec<FillInTheBlankItem> = (0..FILL_IN_THE_BLANKS_COUNT)
            .map(|n| FillInTheBlankItem {
                question: format!("Blank {n} is ____."),
                answer: format!("answer-{n}"),
            })
            .collect();
        let answer_key = AnswerKey {
            multiple_choice: multiple_choice
                .iter()
                .map(|item| item.options[item.correct_answer_index].clone())
                .collect(),
            fill_in_the_blanks: fill_in_the_blanks
                .iter()
                .map(|item| item.answer.clone())
                .collect(),
        };
        Quiz {
            multiple_choice,
            fill_in_the_blanks,
            answer_key,
        }
    }
}
