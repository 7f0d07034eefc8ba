pub mod authenticator;
pub mod migrations;
pub mod password;
pub mod registry;
pub mod tokens;

pub use authenticator::*;
pub use migrations::*;
pub use password::*;
pub use registry::*;
pub use tokens::*;
