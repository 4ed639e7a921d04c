// Session exports
pub mod debounce;
#[allow(clippy::module_inception)]
pub mod session;
pub mod store;

pub use debounce::{DebounceScheduler, DebounceState, Ticket, DEFAULT_QUIESCENCE};
pub use session::{SearchSession, SessionError, SessionOptions, SessionView};
pub use store::{CriteriaError, CriteriaStore};
