//! Console helpers shared by the `qpx` binary: styled messages and progress bars.

mod output;
mod progress;

pub use output::{Output, Verbosity};
pub use progress::ProgressManager;
