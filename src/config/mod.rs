pub mod config_base;
pub mod connection;
pub mod group;
pub mod user;

pub use config_base::Config;
pub use connection::{ConnectionParameters, Credentials, SslMode};
pub use group::Group;
pub use user::{AuthMethod, AuthMethodKind, ConnectionLimit, User};
