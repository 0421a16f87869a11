//! Configuration constants.
//!
//! Timeouts, limits and product-tuned thresholds used across the pipeline.
//! Values that operators may want to tune are also exposed on [`Config`](super::Config);
//! the constants here are their defaults.

use std::time::Duration;

pub const DB_PATH: &str = "./takedown_pipeline.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Default User-Agent string for page fetches.
///
/// Infringing storefronts frequently block obvious bots, so evidence fetches
/// present themselves as a desktop Chrome browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Evidence collection time boxes
/// HTML fetch timeout used by excerpt extraction
pub const HTML_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Screenshot API timeout (rendering is slow)
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(15);
/// Re-upload of a captured screenshot to durable storage
pub const SCREENSHOT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);
/// Whole redirect trace, all hops included
pub const REDIRECT_TRACE_TIMEOUT: Duration = Duration::from_secs(15);
/// Single redirect hop
pub const REDIRECT_HOP_TIMEOUT: Duration = Duration::from_secs(5);
/// Wayback Machine save request
pub const WAYBACK_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_WAYBACK_URL: &str = "https://web.archive.org";

/// Maximum number of redirect hops to follow
pub const MAX_REDIRECT_HOPS: usize = 10;
/// Maximum response body size read for excerpt extraction (2MB)
pub const MAX_RESPONSE_BODY_SIZE: usize = 2 * 1024 * 1024;
/// Maximum number of unique excerpts kept per page
pub const MAX_EXCERPTS: usize = 5;
/// Characters of context kept on each side of a matched term
pub const EXCERPT_CONTEXT_CHARS: usize = 100;

// Bulk queue
/// Delay between consecutive email sends within one batch (3 minutes)
pub const STAGGER_INTERVAL_SECS: u64 = 180;
/// Minimum time between two batches created by the same user (5 minutes)
pub const BATCH_COOLDOWN_SECS: u64 = 300;
/// Maximum number of notices in one batch
pub const MAX_BATCH_ITEMS: usize = 50;
/// Delivery attempts before a failed item stays failed
pub const MAX_DELIVERY_ATTEMPTS: i64 = 3;
/// Due items claimed per processing cycle
pub const QUEUE_PROCESS_LIMIT: i64 = 25;
/// Interval of the periodic queue sweep
pub const QUEUE_POLL_INTERVAL_SECS: u64 = 60;
/// Backoff before a failed item is retried
pub const RETRY_BACKOFF_SECS: u64 = 300;
/// A claimed item still `processing` after this long is released for another attempt
pub const CLAIM_LEASE_SECS: u64 = 600;

// AI filter
/// Results sent to the LLM concurrently per chunk
pub const FILTER_CHUNK_SIZE: usize = 5;
/// Pause between chunks to respect LLM rate limits
pub const FILTER_CHUNK_DELAY_MS: u64 = 1000;
/// Default confidence required for a confirmed pass
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.75;
/// Lower edge of the "uncertain, let a human decide" band
pub const UNCERTAIN_CONFIDENCE_FLOOR: f64 = 0.5;
/// Sampling temperature for classification calls
pub const LLM_TEMPERATURE: f64 = 0.1;
/// Few-shot examples in the filter prompt, verified and rejected combined
pub const MAX_FEW_SHOT_EXAMPLES: usize = 5;
pub const LLM_TIMEOUT: Duration = Duration::from_secs(30);

// Intelligence
/// Patterns fetched per type when building intelligence for a scan
pub const INTELLIGENCE_TOP_N: i64 = 10;
pub const KEYWORD_REFRESH_COOLDOWN_HOURS: i64 = 24;
pub const KEYWORD_REFRESH_MIN_FEEDBACK: i64 = 5;

// Infrastructure lookups
pub const WHOIS_TIMEOUT: Duration = Duration::from_secs(15);
/// WHOIS data changes rarely; cached lookups are reused for 7 days
pub const WHOIS_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Interval between status polls of a bulk WHOIS request
pub const WHOIS_BULK_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Status polls before a bulk WHOIS request is abandoned
pub const WHOIS_BULK_MAX_POLLS: u32 = 60;

// Timestamping
pub const DEFAULT_NOTARY_CALENDAR_URL: &str = "https://a.pool.opentimestamps.org";
pub const DEFAULT_ESPLORA_URL: &str = "https://blockstream.info/api";
pub const NOTARY_TIMEOUT: Duration = Duration::from_secs(20);
pub const TIMESTAMP_UPGRADE_INTERVAL_SECS: u64 = 3600;

// HTTP API
/// Header carrying the caller identity, set by the upstream auth layer
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the shared secret for the internal queue trigger
pub const QUEUE_SECRET_HEADER: &str = "x-queue-secret";

// Retry strategy for outbound calls
/// Initial delay in milliseconds before first retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 5;
/// Maximum number of retries
pub const RETRY_MAX_ATTEMPTS: usize = 2;

pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Audit entries buffered before an automatic flush
pub const AUDIT_BUFFER_SIZE: usize = 20;
