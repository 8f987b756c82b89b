//! File system layer
//!
//! Path validation, source discovery, and the atomic transfer engine that
//! publishes files into the library.

mod resolve;
mod scan;
mod transfer;

pub use resolve::*;
pub use scan::*;
pub use transfer::*;
