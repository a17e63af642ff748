mod config;
pub use config::*;

mod error;
pub use error::*;

mod pool;
pub use pool::*;
