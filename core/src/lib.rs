pub mod error;
mod rule;
mod sensor;
mod weather;

pub use rule::*;
pub use sensor::*;
pub use weather::*;

pub static CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
