//! Multiple-choice question options and prompt composition.

pub mod composer;
pub mod dispatch;
pub mod profile;
pub mod spec;

pub use composer::compose;
pub use dispatch::{DispatchPrompt, ModerationStatus};
pub use profile::{FormProfile, OTHER_LEVEL};
pub use spec::{DistractorDifficulty, OutputFormat, QuestionForm, QuestionSpec};
