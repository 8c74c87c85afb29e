/// Constants used by the detail request client and its pacing.
pub mod request {
    /// Production detail endpoint root (version segment included).
    pub const DEFAULT_API_BASE_URL: &str = "https://api.themoviedb.org/3";
    /// Query parameter carrying the API key on every detail request.
    pub const API_KEY_PARAM: &str = "api_key";
    /// Maximum number of GET attempts per identifier before giving up.
    pub const MAX_ATTEMPTS: usize = 3;
    /// Request ceiling used to derive the minimum inter-request pause.
    pub const MAX_DOWNLOADS_PER_SECOND: u32 = 4;
    /// Extra cooldown applied after a rate-limited response.
    pub const RATE_LIMITER_DELAY_SECONDS: u64 = 10;
    /// Pause applied after any non-success response before the next attempt.
    pub const FAILURE_BACKOFF_SECONDS: u64 = 1;
    /// Whole-request timeout for a single GET.
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    /// Status code the provider returns when the request quota is exceeded.
    pub const RATE_LIMIT_EXCEEDED_STATUS_CODE: u16 = 429;
    /// Status code of a clean detail response.
    pub const SUCCESSFUL_CALL_STATUS_CODE: u16 = 200;
}

/// Constants used when normalizing detail records into tabular rows.
pub mod export {
    /// Number of successful fetches between disk writes.
    pub const DOWNLOADS_PER_DISK_WRITE: usize = 40;
    /// Identifier column in detail records and the primary output.
    pub const ID_COLUMN: &str = "id";
    /// Administrative and media fields dropped from the primary output.
    pub const KEYS_TO_DROP: &[&str] = &[
        "adult",
        "backdrop_path",
        "belongs_to_collection",
        "imdb_id",
        "poster_path",
        "profile_path",
        "video",
    ];
    /// List-of-object columns serialized to JSON text for flat storage.
    pub const JSON_COLUMNS: &[&str] = &[
        "genres",
        "keywords",
        "production_countries",
        "production_companies",
        "spoken_languages",
    ];
}

/// Constants used to locate and filter the daily identifier snapshot.
pub mod snapshot {
    /// Root URL hosting the daily gzip snapshots.
    pub const DEFAULT_SNAPSHOT_BASE_URL: &str = "http://files.tmdb.org/p/exports";
    /// Title column inspected by the collection filter.
    pub const TITLE_COLUMN: &str = "original_title";
    /// Title suffix marking collection entries rather than individual records.
    pub const COLLECTION_SUFFIX: &str = " Collection";
    /// Flag column marking adult content.
    pub const ADULT_COLUMN: &str = "adult";
    /// Whole-download timeout for one snapshot file.
    pub const SNAPSHOT_TIMEOUT_SECONDS: u64 = 600;
}

/// File naming for the local cache and output tables.
pub mod files {
    /// Default credential file holding `{"api_key": "..."}`.
    pub const DEFAULT_CREDENTIALS_PATH: &str = "./apiKey.json";
    /// Suffix of the cached identifier table.
    pub const IDS_SUFFIX: &str = "_ids.csv";
    /// Suffix of the primary output table.
    pub const DATA_SUFFIX: &str = "_data.csv";
    /// Suffix of the sub-entity output table.
    pub const CREDITS_SUFFIX: &str = "_credits.csv";
}
