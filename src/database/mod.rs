pub mod collection;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod repository;
pub mod store;

pub use collection::Collection;
pub use manager::{DatabaseError, DatabaseManager};
pub use query::{DocQuery, FilterOp, SortDirection, SortKind};
pub use record::{apply_patch, from_api_input, Entity, Meta, RecordError};
pub use repository::Repository;
pub use store::DocumentStore;
