use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::FixedOffset;

use board_badges::sweeper::DEFAULT_SWEEP_INTERVAL;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub sweep_interval: Duration,
    /// Offset at whose midnight streak days begin.
    pub day_offset: FixedOffset,
    pub max_image_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("BOARD_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_var(&lookup, "BOARD_PORT", 3000)?;
        let db_path: PathBuf = lookup("BOARD_DB_PATH")
            .unwrap_or_else(|| "board.db".into())
            .into();
        let upload_dir: PathBuf = lookup("BOARD_UPLOAD_DIR")
            .unwrap_or_else(|| "./uploads".into())
            .into();

        let sweep_secs: u64 = parse_var(
            &lookup,
            "BOARD_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )?;
        if sweep_secs == 0 {
            bail!("BOARD_SWEEP_INTERVAL_SECS must be positive");
        }

        let offset_minutes: i32 = parse_var(&lookup, "BOARD_UTC_OFFSET_MINUTES", 0)?;
        let day_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("BOARD_UTC_OFFSET_MINUTES={offset_minutes} is out of range"))?;

        let max_image_bytes: usize = parse_var(&lookup, "BOARD_MAX_IMAGE_BYTES", 10 * 1024 * 1024)?;

        Ok(Self {
            host,
            port,
            db_path,
            upload_dir,
            sweep_interval: Duration::from_secs(sweep_secs),
            day_offset,
            max_image_bytes,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
