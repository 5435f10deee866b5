//! Utility functions.

pub mod env;
pub mod format;
pub mod normalize;
pub mod time;

pub use format::{format_amount, format_fraction, format_percent, format_used_percent};
pub use normalize::{normalize_bool, normalize_number, normalize_string};
pub use time::{format_reset_label, format_reset_label_at, parse_timestamp};
