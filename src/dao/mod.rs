/// Read access to the remote game store.
pub mod game_store;
/// Store row definitions.
pub mod models;
/// Storage error types.
pub mod storage;
