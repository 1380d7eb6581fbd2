pub mod config;
pub mod error;
pub mod export;
pub mod io;
pub mod load;
pub mod logging;
pub mod model;
pub mod sync;

pub use error::{Result, RosterError};
