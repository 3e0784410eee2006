//! Reports computed from decoded replays.
//!
//! Everything here is pure: the caller selects the matches, the functions
//! fold them into report types from [`common`].

pub mod aggregate;
pub mod scoreboard;

pub use aggregate::aggregate;
