pub mod keys;
pub mod manager;
pub mod redis_cache;
pub mod secondary;

pub use keys::generate_cache_key;
pub use manager::{
    CacheConfig, CacheEntry, CacheManager, CacheStats, JsonCache, MAX_TTL, global_cache,
    init_global_cache, with_cache,
};
pub use redis_cache::RedisCache;
pub use secondary::{InMemorySecondary, SecondaryCache};
