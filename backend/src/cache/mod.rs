pub mod backend;
pub mod keys;
pub mod memory;
pub mod profile_index;
pub mod ttl;

pub use backend::{connect_redis, CacheBackend, RedisCache};
pub use keys::IndexKeys;
pub use memory::MemoryCache;
pub use profile_index::{IndexSizes, IndexSnapshot, ProfileIndexCache};
