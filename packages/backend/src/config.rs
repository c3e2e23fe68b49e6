use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_APP_ID: &str = "default-app-id";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Daily rolling log files are written here when set.
    pub log_dir: Option<PathBuf>,
    /// Deployment namespace prefixed to every document path.
    pub app_id: String,
    pub session_secret: Option<String>,
    pub session_ttl_hours: i64,
    pub accounts_file: Option<PathBuf>,
    pub seed_demo_accounts: bool,
    pub snapshot_path: Option<PathBuf>,
    pub bcrypt_cost: u32,
    pub llm_mock: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            host,
            port,
            log_level,
            log_dir: log_dir_from_env(),
            app_id: env_string("APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            session_secret: env_string("SESSION_SECRET"),
            session_ttl_hours: env_string("SESSION_TTL_HOURS")
                .and_then(|v| v.parse().ok())
                .filter(|hours: &i64| *hours > 0)
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS),
            accounts_file: env_string("ACCOUNTS_FILE").map(PathBuf::from),
            seed_demo_accounts: env_bool("SEED_DEMO_ACCOUNTS").unwrap_or(false),
            snapshot_path: env_string("STORE_SNAPSHOT_PATH").map(PathBuf::from),
            bcrypt_cost: env_string("BCRYPT_COST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BCRYPT_COST),
            llm_mock: env_bool("LLM_MOCK").unwrap_or(false),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            log_level: "info".to_string(),
            log_dir: None,
            app_id: DEFAULT_APP_ID.to_string(),
            session_secret: None,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            accounts_file: None,
            seed_demo_accounts: false,
            snapshot_path: None,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            llm_mock: false,
        }
    }
}

/// `LOG_DIR` wins; `ENABLE_FILE_LOGS` alone writes to `./logs`.
fn log_dir_from_env() -> Option<PathBuf> {
    env_string("LOG_DIR")
        .map(PathBuf::from)
        .or_else(|| env_bool("ENABLE_FILE_LOGS").filter(|on| *on).map(|_| PathBuf::from("./logs")))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}
