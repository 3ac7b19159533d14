//! Schema-driven admin panel for Postgres.
//!
//! Every table is handled the same way: its structure is read from the
//! catalog on each request, and rows are listed, inserted, updated and
//! deleted through statements assembled from those catalog names with all
//! values bound as parameters.

pub mod libs;

pub use libs::*;
