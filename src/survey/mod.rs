// Survey taking: setup, stepwise answering, and submission

pub mod codec;
pub mod draft;
pub mod registry;
pub mod setup;
pub mod submission;
pub mod wizard;

pub use codec::{AnswerValue, DisplayAnswer};
pub use draft::{AnswerDraft, ValidationErrors};
pub use registry::{SurveyRegistry, SurveySession, SurveyView};
pub use setup::{EvaluationHeader, SetupRequest};
pub use submission::{SubmissionCoordinator, SubmissionError, Submitter};
pub use wizard::{Progress, SurveyWizard, WizardError, WizardState};
