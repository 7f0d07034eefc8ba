pub mod daemon;
pub mod http_client;

pub use daemon::*;
pub use http_client::*;
