//! gpttui centralized constants.
//! Endpoints, defaults and limits live here.

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
    pub const CHATSONIC_URL: &str =
        "https://api.writesonic.com/v2/business/content/chatsonic?engine=premium";
    pub const COLOSSAL_URL: &str = "https://service.colossalai.org/generate";
}

// ─── Credentials ──────────────────────────────────────────────────────────────

pub mod env {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_ORG: &str = "OPENAI_ORG";
    pub const CHATSONIC_API_KEY: &str = "CHATSONIC_API_KEY";
}

// ─── Default Settings ─────────────────────────────────────────────────────────

pub mod defaults {
    pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";
    pub const SESSION: &str = "default_session";
    pub const CONTEXT: &str = "You are an AI assistant";
    pub const THEME: &str = "gruvbox";
    pub const DATABASE_FILE: &str = "database.sqlite";
    pub const CONFIG_DIR: &str = "gpttui";
    pub const CONFIG_FILE: &str = "config.toml";
    pub const LOG_FILE: &str = "gpttui.log";
}

// ─── Network ──────────────────────────────────────────────────────────────────

pub mod network {
    pub const TIMEOUT_SECS: u64 = 60;
    pub const COLOSSAL_TIMEOUT_SECS: u64 = 30;
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_DELAY_MS: u64 = 500;
    /// Upper bound for the backoff exponent so the delay cannot overflow.
    pub const MAX_BACKOFF_EXPONENT: u32 = 10;
    /// HTTP statuses that are retried like a timeout.
    pub const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];
}

// ─── Colossal generation parameters ───────────────────────────────────────────

pub mod colossal {
    pub const REPETITION_PENALTY: f32 = 1.2;
    pub const TOP_K: u32 = 40;
    pub const TOP_P: f32 = 0.5;
    pub const TEMPERATURE: f32 = 0.7;
    pub const MAX_NEW_TOKENS: u32 = 512;
}

// ─── Storage ──────────────────────────────────────────────────────────────────

pub mod storage {
    pub const MAX_SESSION_NAME_LEN: usize = 64;
    /// SQLite reserves this prefix for its own tables.
    pub const RESERVED_PREFIX: &str = "sqlite_";
}
