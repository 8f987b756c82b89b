//! Media classification module
//!
//! Assigns each candidate a media kind from its content and derives the
//! canonical path it is stored under inside the library.

mod detect;
mod kinds;
mod layout;

pub use detect::*;
pub use kinds::*;
pub use layout::*;
