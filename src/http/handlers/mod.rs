//! REST handlers organized by resource.

pub mod edl;
pub mod exclusions;
pub mod iocs;
pub mod lists;
pub mod stats;
