//! Rebound Scanner
//!
//! Screens concept sectors for oversold conditions confirmed by a volume
//! spike. Runs independently of the lifecycle classifier.

pub mod scanner;

pub use scanner::ReboundScanner;
