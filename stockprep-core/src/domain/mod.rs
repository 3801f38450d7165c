//! Domain types for the dataset pipeline.

pub mod ids;
pub mod price_point;
pub mod window;

pub use ids::DatasetHash;
pub use price_point::{PricePoint, RawPoint};
pub use window::{DateWindow, WindowError};

