//! Data layer — the bar source seam and the read-only market snapshot.

pub mod csv_source;
pub mod snapshot;
pub mod source;
pub mod synthetic;

pub use csv_source::CsvSource;
pub use snapshot::{load_snapshot, MarketSnapshot};
pub use source::{BarSource, FeedError, Interval};
pub use synthetic::SyntheticSource;
