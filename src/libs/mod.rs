pub mod config;
pub mod definition;
pub mod error;
pub mod http;
pub mod ident;
pub mod introspector;
pub mod memory;
pub mod postgres;
pub mod query_builder;
pub mod rows;
pub mod schema;
pub mod store;
pub mod tables;

// Re-export them for easier access from main.rs
pub use config::*;
pub use definition::*;
pub use error::*;
pub use self::http::{ApiError, AppState, build_router};
pub use ident::*;
pub use introspector::*;
pub use memory::*;
pub use postgres::*;
pub use rows::*;
pub use schema::*;
pub use store::*;
pub use tables::*;
