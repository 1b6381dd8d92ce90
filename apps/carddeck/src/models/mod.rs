pub mod card;

pub use card::{CategoryRecord, ThreatRecord};
