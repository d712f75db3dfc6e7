pub use annot_config::MAX_RESULT_WINDOW;

pub const LIMIT_DEFAULT: u64 = 20;
/// `offset + limit` must stay within the index engine's 10,000 result window.
pub const LIMIT_MAX: u64 = 200;
pub const OFFSET_MAX: u64 = 9_800;
pub const REPLIES_LIMIT: u64 = 200;
pub const AGGREGATION_SIZE: u32 = 10;

/// Pagination bounds owned by one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
	pub limit_default: u64,
	pub limit_max: u64,
	/// Enforced by [`crate::validate_params`] only. The limiter never caps the offset.
	pub offset_max: u64,
	pub replies_limit: u64,
}
impl Default for SearchLimits {
	fn default() -> Self {
		Self {
			limit_default: LIMIT_DEFAULT,
			limit_max: LIMIT_MAX,
			offset_max: OFFSET_MAX,
			replies_limit: REPLIES_LIMIT,
		}
	}
}
impl From<&annot_config::Search> for SearchLimits {
	fn from(cfg: &annot_config::Search) -> Self {
		Self {
			limit_default: cfg.limit_default,
			limit_max: cfg.limit_max,
			offset_max: cfg.offset_max,
			replies_limit: cfg.replies_limit,
		}
	}
}
