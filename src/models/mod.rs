pub mod answer;
pub mod attempt;
pub mod persona;
pub mod question;

pub use answer::{Answer, AnswerValue, ConstraintViolation};
pub use attempt::{AttemptOutcome, AttemptResult, FailureReason, TimeoutKind};
pub use persona::{Persona, REQUIRED_TRAITS};
pub use question::{
    Constraints, FormModel, NumericRange, Question, QuestionKind, TextLength, UnsupportedQuestion,
};
