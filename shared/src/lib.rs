pub mod error;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod object_id;
pub mod tally;
pub mod validation;

pub use error::{Error, ErrorCode, ErrorResponse, Result};
pub use events::{ElectionEvent, GroupEvent};
pub use lifecycle::{ClosedRound, ElectionPhase, TransitionError};
pub use models::*;
pub use object_id::ObjectId;
pub use tally::{RoundTally, TallyError, TallyOutcome};
pub use validation::*;
