//! Command line / environment configuration for the audiogram GUI.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use audiogram_core::tone::DEFAULT_TONE_DURATION;

/// Name of the key-value store file inside the data directory.
pub const STORE_FILE_NAME: &str = "audiogram_store.json";

/// Log filter used when neither `--log` nor `RUST_LOG` is given.
pub const DEFAULT_LOG_FILTER: &str = "audiogram_gui=info,audiogram_core=info";

/// Command-line arguments for the audiogram app
#[derive(Parser, Debug, Clone)]
#[command(name = "audiogram")]
#[command(about = "Self-administered hearing threshold test")]
#[command(version)]
pub struct Args {
    /// Directory holding saved sessions and exports
    #[arg(short, long, default_value = ".", env = "AUDIOGRAM_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Log filter, e.g. "audiogram_core=debug"
    #[arg(long, env = "AUDIOGRAM_LOG")]
    pub log: Option<String>,

    /// Length of each test tone in seconds
    #[arg(long, default_value_t = 1.0)]
    pub tone_duration: f32,
}

impl Args {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    /// Test tone length; non-positive or unparsable values fall back to
    /// the default of one second.
    pub fn tone_duration(&self) -> Duration {
        if self.tone_duration > 0.0 {
            Duration::try_from_secs_f32(self.tone_duration).unwrap_or(DEFAULT_TONE_DURATION)
        } else {
            DEFAULT_TONE_DURATION
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["audiogram"]);
        assert_eq!(args.tone_duration(), Duration::from_secs(1));
        assert!(args.store_path().ends_with(STORE_FILE_NAME));
    }

    #[test]
    fn tone_duration_flag() {
        let args = Args::parse_from(["audiogram", "--tone-duration", "1.5", "-d", "/tmp/hearing"]);
        assert_eq!(args.tone_duration(), Duration::from_millis(1500));
        assert_eq!(args.store_path(), PathBuf::from("/tmp/hearing").join(STORE_FILE_NAME));
    }

    #[test]
    fn bad_tone_duration_falls_back() {
        let args = Args::parse_from(["audiogram", "--tone-duration=-2"]);
        assert_eq!(args.tone_duration(), DEFAULT_TONE_DURATION);
    }
}
