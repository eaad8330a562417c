//! Scambait — scam-engagement honeypot core.
//!
//! Receives messages purportedly from scammers, classifies scam
//! intent, keeps the sender engaged with an automated persona while
//! harvesting payment identifiers, phone numbers and links, and
//! reports each completed session to an evaluation endpoint exactly
//! once.

pub mod callback;
pub mod classify;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod persona;
pub mod reply;
pub mod routes;
pub mod session;
