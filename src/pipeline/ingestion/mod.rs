// Pipeline ingestion: reading the establishments feed from disk

pub mod loader;

pub use loader::load_feed;
