// State management module
// Handles SQLite persistence and image file storage

pub mod db;
pub mod models;
pub mod queries;
pub mod storage;

pub use db::{describe_schema, init_db, open_in_memory, DbConnection, DbError, DbResult};
pub use models::{Category, ClothingItem, Outfit, OutfitItemSnapshot, TableInfo};
pub use queries::{ItemRepository, OutfitRepository};
pub use storage::{image_filename, ImageStore, StorageError};
