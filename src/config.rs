use std::path::PathBuf;

const DEFAULT_GATEWAY_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `studio.db`
    pub data_dir: PathBuf,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Read configuration from the environment (and `.env`, if present).
    ///
    /// - `HEADSHOT_DATA_DIR`: storage directory
    /// - `HEADSHOT_GATEWAY_URL`: generation API base URL
    /// - `HEADSHOT_MODEL`: generation model name
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            data_dir: non_empty("HEADSHOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            gateway: GatewayConfig {
                base_url: non_empty("HEADSHOT_GATEWAY_URL")
                    .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
                model: non_empty("HEADSHOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
        }
    }

    /// Path of the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("studio.db")
    }
}

/// The user's data directory:
/// - Linux: ~/.local/share/headshot-studio
/// - macOS: ~/Library/Application Support/headshot-studio
/// - Windows: %APPDATA%\headshot-studio
fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    path.push("headshot-studio");
    path
}
