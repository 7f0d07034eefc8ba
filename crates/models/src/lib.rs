pub mod config;
pub mod error;
pub mod export;
pub mod release;
pub mod user;

pub use config::*;
pub use error::*;
pub use export::*;
pub use release::*;
pub use user::*;
