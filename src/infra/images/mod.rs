// Implementations of the image relay ports, plus housekeeping for the cache directory.

pub mod cache_janitor;
pub mod http_fetcher;
pub mod sqlite_image_store;

pub use http_fetcher::HttpImageFetcher;
pub use sqlite_image_store::SqliteImageStore;
