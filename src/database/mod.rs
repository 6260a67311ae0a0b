pub mod db;
pub mod error;
pub mod models;

pub use db::store::{Collection, Order, RecordStore};
pub use error::StoreError;
