// Response cache module
// Author: kelexine (https://github.com/kelexine)

mod manager;
mod models;

pub use manager::ResponseCache;
pub use models::{CacheConfig, CacheStats};
