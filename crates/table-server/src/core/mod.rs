pub mod connection;
pub mod export;
pub mod format;
pub mod limits;
pub mod paging;
pub mod schema;
pub mod types;
