pub mod config;
pub mod error;
pub mod profile;
pub mod resolution;
pub mod session;

pub use config::*;
pub use error::*;
pub use profile::*;
pub use resolution::*;
pub use session::*;
