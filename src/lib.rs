pub mod api;
pub mod config;
pub mod database;
pub mod generator;
pub mod sync;
pub mod types;
pub mod utils;

pub use api::*;
pub use database::*;
pub use generator::*;
pub use sync::*;
pub use types::*;
