// Data models shared by the API, the survey wizard and the stores

pub mod evaluation;
pub mod question;
pub mod user;

pub use evaluation::{
    Evaluation, EvaluationDetail, EvaluationStatus, EvaluationStore, EvaluationSummary,
    NewEvaluation, Phase, Response, ResponseDetail, StoreError,
};
pub use question::{Question, QuestionKind};
pub use user::{Identity, PublicUser, User};
