pub mod clock;
pub mod controller;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use controller::{Collaborators, SessionController};
pub use state::{Session, SessionSnapshot, SessionStatus, StopOutcome};
