pub mod config;
pub mod lookup;
pub mod resolver;
pub mod session;
pub mod store;

#[cfg(feature = "server")]
pub mod db;

#[cfg(feature = "server")]
pub mod error_convert;

#[cfg(feature = "server")]
pub mod telemetry;

pub use config::ResolverConfig;
pub use resolver::IdentityResolver;
pub use session::{LocalSessionProvider, SessionProvider, TokenSessionProvider};
pub use store::{MemoryProfileStore, ProfileStore};

#[cfg(feature = "server")]
pub use store::PgProfileStore;
