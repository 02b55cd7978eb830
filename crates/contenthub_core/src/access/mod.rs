//! Authorization seam in front of the core use-cases.
//!
//! The core never sees credentials. Callers translate whatever they hold
//! (a session cookie, a local shell) into a context value and a gate
//! answers yes or no for it.

pub mod gate;
