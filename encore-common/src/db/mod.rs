//! Database connection, models, and file-reference bookkeeping

pub mod init;
pub mod models;
pub mod relations;

pub use init::*;
pub use models::*;
