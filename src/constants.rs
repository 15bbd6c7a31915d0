//! Shared constants.

use chrono::TimeDelta;

/// Default HTTP port for `poststage serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "poststage.toml";

/// Environment variable that overrides `server.base_url`.
pub const BASE_URL_ENV: &str = "POSTSTAGE_BASE_URL";

/// Default environment variable holding the sweep trigger secret.
pub const DEFAULT_SECRET_ENV: &str = "CRON_SECRET";

/// Default sweep schedule: daily at 03:00.
pub const DEFAULT_SWEEP_SCHEDULE: &str = "0 0 3 * * *";

/// Root prefix for every post's objects.
pub const POSTS_PREFIX: &str = "posts/";

/// File name of the metadata object inside a post's prefix.
pub const META_FILE: &str = "meta.json";

/// Maximum accepted length of a post id or topic token, in bytes.
pub const MAX_ID_LEN: usize = 200;

/// Request timeout for the HTTP API.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How long the CLI waits for a running server to answer `/health`.
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 1500;

/// How many metadata objects are fetched concurrently while listing.
pub const LIST_CONCURRENCY: usize = 16;

/// Lifetime of a freshly created post.
pub const INITIAL_TTL: TimeDelta = TimeDelta::days(7);

/// Lifetime granted by the complete transition, counted from completion.
pub const COMPLETED_TTL: TimeDelta = TimeDelta::days(5);
