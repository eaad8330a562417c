//! Session state: the aggregate model and the concurrent store.

pub mod model;
pub mod store;

pub use model::{
    CallbackOutcome, CallbackPayload, EngagementState, Intelligence, Message, Sender, Session,
    SessionMeta, SessionSummary, Verdict,
};
pub use store::SessionStore;
