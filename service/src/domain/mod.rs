//! Domain definitions.

pub mod payment;
pub mod sale;

pub use self::sale::Sale;
