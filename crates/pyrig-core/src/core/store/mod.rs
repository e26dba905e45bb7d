mod cache;

pub(crate) use cache::resolve_cache_store_path;
pub use cache::{cache_file_name, CacheEntry, CacheLocation, ContentCache};
