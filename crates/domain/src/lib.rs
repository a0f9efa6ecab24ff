//! Fleet DNS Domain Layer
pub mod config;
pub mod errors;
pub mod hostname;
pub mod resolution;
pub mod server;

pub use config::ResolverConfig;
pub use errors::ResolveError;
pub use hostname::{host_key, is_valid_hostname};
pub use resolution::{AddressFamily, FamilyAnswer, Resolution, ResolveStatus};
pub use server::ServerAddr;
