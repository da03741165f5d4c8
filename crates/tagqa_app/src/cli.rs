use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tagqa_core::{CoreSettings, LanguageCode};
use tagqa_engine::{BrowserMode, DriverBackend, DriverSettings, RunSettings};

/// Runs a keyword capture sweep over a list of pages and reports per-keyword verdicts.
#[derive(Debug, Parser)]
#[command(name = "tagqa", version, about)]
pub struct Cli {
    /// Session file with URLs and keywords. Defaults to the last one used.
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Extra URL, either bare or as `[num] [lang] url`. Repeatable.
    #[arg(long = "url")]
    pub urls: Vec<String>,

    /// Extra keyword, either bare or as `[num] [lang] text {id}`. Repeatable.
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// Language for bare `--url`/`--keyword` values.
    #[arg(long, default_value = "tc", value_parser = parse_language)]
    pub lang: LanguageCode,

    /// Sequence number for bare `--url`/`--keyword` values.
    #[arg(long, default_value_t = 1)]
    pub num: u32,

    /// Folder that holds `Tag_QA_Files`. Defaults to the last one used.
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Move `Tag_QA_Files` under this folder before doing anything else.
    #[arg(long)]
    pub relocate_to: Option<PathBuf>,

    /// Browser mode: `incognito` or `normal`.
    #[arg(long, default_value = "incognito", value_parser = parse_mode)]
    pub mode: BrowserMode,

    /// Browser driver: `http` (no rendering, no screenshots) or `chrome`.
    #[arg(long, default_value = "http", value_parser = parse_driver)]
    pub driver: DriverBackend,

    /// Show the Chrome window instead of running headless.
    #[arg(long)]
    pub headed: bool,

    /// Chrome binary to launch instead of the one found on `PATH`.
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Quiet period that counts as network idle.
    #[arg(long)]
    pub idle_interval_ms: Option<u64>,

    /// Stop waiting for network idle after this many seconds; 0 waits forever.
    #[arg(long)]
    pub idle_cap_secs: Option<u64>,

    /// Debounce window for recomputing keyword matches.
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Click every button and link on the first URL instead of running keywords.
    #[arg(long)]
    pub sweep: bool,

    /// Write the captured network log as CSV when done.
    #[arg(long)]
    pub export_log: bool,

    /// Save the URL and keyword lists as a session file when done.
    #[arg(long)]
    pub save_session: bool,

    /// Log at debug level.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    pub fn run_settings(&self) -> RunSettings {
        let mut settings = RunSettings {
            mode: self.mode,
            ..RunSettings::default()
        };
        if let Some(ms) = self.idle_interval_ms {
            settings.idle_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.idle_cap_secs {
            settings.idle_cap = (secs > 0).then(|| Duration::from_secs(secs));
        }
        settings
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            backend: self.driver,
            headed: self.headed,
            chrome_executable: self.chrome_path.clone(),
            ..DriverSettings::default()
        }
    }

    pub fn core_settings(&self) -> CoreSettings {
        let mut settings = CoreSettings::default();
        if let Some(ms) = self.debounce_ms {
            settings.debounce = Duration::from_millis(ms);
        }
        settings
    }
}

fn parse_mode(value: &str) -> Result<BrowserMode, String> {
    BrowserMode::from_name(value).ok_or_else(|| format!("unknown browser mode '{value}'"))
}

fn parse_driver(value: &str) -> Result<DriverBackend, String> {
    DriverBackend::from_name(value).ok_or_else(|| format!("unknown driver '{value}'"))
}

fn parse_language(value: &str) -> Result<LanguageCode, String> {
    LanguageCode::from_code(value)
        .or_else(|| LanguageCode::from_display_name(value))
        .ok_or_else(|| format!("unknown language '{value}'"))
}
