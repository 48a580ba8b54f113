//! Data the portal displays and edits. The booking backend is authoritative
//! for all of it.

pub mod booking;
pub mod hotel;
pub mod invite;
pub mod principal;
pub mod room;
pub mod user;

pub use booking::*;
pub use hotel::*;
pub use invite::*;
pub use principal::*;
pub use room::*;
pub use user::*;
