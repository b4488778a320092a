// Adapters layer: concrete implementations for external systems (files on disk, export formats).

pub mod source;
pub mod storage;

pub use storage::LocalStorage;
