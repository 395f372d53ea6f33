//! Domain types shared across the engine and runner.

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use position::OpenPosition;
pub use trade::{ClosedTrade, Direction, EquityPoint};
