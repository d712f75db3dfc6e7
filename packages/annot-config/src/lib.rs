mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Index, Instrumentation, Search, Service};

use std::{fs, path::Path};

/// Hard ceiling on `offset + limit` imposed by the index engine.
pub const MAX_RESULT_WINDOW: u64 = 10_000;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.index.url.is_empty() {
		return Err(Error::Validation { message: "index.url must be non-empty.".to_string() });
	}
	if cfg.index.name.trim().is_empty() {
		return Err(Error::Validation { message: "index.name must be non-empty.".to_string() });
	}
	if cfg.index.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "index.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.search.limit_max == 0 {
		return Err(Error::Validation {
			message: "search.limit_max must be greater than zero.".to_string(),
		});
	}
	if cfg.search.limit_default > cfg.search.limit_max {
		return Err(Error::Validation {
			message: "search.limit_default must not exceed search.limit_max.".to_string(),
		});
	}
	if cfg.search.offset_max.saturating_add(cfg.search.limit_max) > MAX_RESULT_WINDOW {
		return Err(Error::Validation {
			message: format!(
				"search.offset_max plus search.limit_max must not exceed {MAX_RESULT_WINDOW}."
			),
		});
	}
	if cfg.search.replies_limit == 0 {
		return Err(Error::Validation {
			message: "search.replies_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.replies_limit > cfg.search.limit_max {
		return Err(Error::Validation {
			message: "search.replies_limit must not exceed search.limit_max.".to_string(),
		});
	}
	if cfg.search.aggregation_size == 0 {
		return Err(Error::Validation {
			message: "search.aggregation_size must be greater than zero.".to_string(),
		});
	}
	if cfg.instrumentation.enabled && cfg.instrumentation.prefix.is_empty() {
		return Err(Error::Validation {
			message: "instrumentation.prefix must be non-empty when instrumentation is enabled."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let url = cfg.index.url.trim().trim_end_matches('/');

	cfg.index.url = url.to_string();
	cfg.instrumentation.prefix = cfg.instrumentation.prefix.trim().to_string();
}
