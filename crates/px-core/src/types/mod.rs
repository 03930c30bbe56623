//! Core data types flowing through the gateway.

pub mod account;
pub mod candle;
pub mod instrument;
pub mod market;

pub use account::*;
pub use candle::*;
pub use instrument::*;
pub use market::*;
