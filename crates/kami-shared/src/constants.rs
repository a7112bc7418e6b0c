//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";
pub const TOKEN_TYPE_BEARER: &str = "bearer";
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 1800;
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: i64 = 604800;

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Upper bound for a single activation-code generation batch.
pub const MAX_CODES_PER_BATCH: u32 = 1000;

/// Upper bound for order listing pages.
pub const MAX_ORDER_PAGE: i64 = 100;

pub const VERIFICATION_CODE_LENGTH: usize = 6;
pub const VERIFICATION_CODE_TTL_SECS: u64 = 300;

/// Format used when rendering time ranges in revenue reports.
pub const REPORT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
