//! PostgREST-style HTTP backend.

mod config;
mod error;
mod store;

pub use config::RestConfig;
pub use error::RestDaoError;
pub use store::RestGameStore;

use crate::dao::storage::StorageError;

impl From<RestDaoError> for StorageError {
    fn from(err: RestDaoError) -> Self {
        match err {
            RestDaoError::DecodeResponse { .. } => StorageError::malformed(err.to_string(), err),
            _ => StorageError::unavailable(err.to_string(), err),
        }
    }
}
