pub mod config;
pub mod error;
pub mod load;
pub mod output;
pub mod window;

pub use config::RunConfig;
pub use error::{Result, WindowError};
pub use window::{Sample, SlidingWindowAverage, WindowSnapshot, WindowValue};
