//! Seminar bag engine.
//!
//! Builders accumulate named filter fragments for one record type, compile
//! them into a single ordered, limited query and return the rows as a
//! [`Bag`]. Queries run against a [`store::RecordStore`]: the in-memory
//! store evaluates them directly, the PostgreSQL store renders them to SQL.

pub mod bag;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use bag::{Bag, BagBuilder};
pub use error::{BagError, BagResult, ErrorCode, StoreError};
