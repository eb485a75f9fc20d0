pub mod average;
pub mod value;

pub use average::{Sample, SlidingWindowAverage, WindowSnapshot};
pub use value::WindowValue;
