pub mod config;
pub mod error;
pub mod export;
pub mod flatten;
pub mod ids;
pub mod io;
pub mod lookup;
pub mod model;
pub mod pipeline;
pub mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod throttle;

pub use error::{ReportError, Result};
