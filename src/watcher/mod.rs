// File watching and the autonomous learner built on it

pub mod filter;
pub mod learner;
pub mod monitor;
pub mod session;

pub use filter::{is_user_code, CodeFilter};
pub use learner::{analysis_prompt, evaluate_doc_trigger, AutonomousLearner, DocTrigger, DocUpdateRequest};
pub use monitor::{classify, scan_existing, ChangeEvent, ChangeKind, FileMonitor};
pub use session::{Handoff, LearningRecord, Session, SessionStatus};
