pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{best_short_name, compact_whitespace, safe_truncate_chars, slugify};
pub use url_utils::{ensure_scheme, normalize_url, resolve_url, same_site};
