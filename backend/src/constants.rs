// =============================================================================
// Matchmaker Backend Constants
// =============================================================================
// Policy values and tunables shared by the swipe engine, the profile index
// cache and the candidate selector.

// =============================================================================
// SWIPE POLICY
// =============================================================================

/// Maximum Like/SuperLike swipes a non-premium user may record per day
pub const DAILY_LIKE_QUOTA: i64 = 10;

// =============================================================================
// PROFILE INDEX CACHE
// =============================================================================

/// Rolling TTL of the matched-profiles index, re-armed on every write
pub const MATCH_INDEX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Lower bound applied to any computed TTL so keys never get a zero expiry
pub const MIN_INDEX_TTL_SECS: u64 = 1;

/// Default namespace for every cache key
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "matchmaker";

/// Index names appended to the per-user key
pub const LIKES_COUNT_INDEX: &str = "likes:count";
pub const LIKES_PROFILES_INDEX: &str = "likes:profiles";
pub const MATCH_PROFILES_INDEX: &str = "match:profiles";

// =============================================================================
// CANDIDATE SELECTION
// =============================================================================

/// Extra rows requested from the directory to absorb directory-side filtering
pub const CANDIDATE_OVERSAMPLE: usize = 10;

/// Batch size used when the caller does not ask for one
pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

/// Upper bound on a single candidate batch
pub const MAX_CANDIDATE_LIMIT: usize = 50;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default timezone that defines "today" for quotas and index expiry
pub const DEFAULT_SWIPE_TIMEZONE: &str = "UTC";

/// Header carrying the caller id, set by the authenticating gateway
pub const USER_ID_HEADER: &str = "x-user-id";
