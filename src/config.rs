use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub lottery: LotteryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 未配置 url 时使用进程内参与集合（仅适合单实例部署）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryConfig {
    /// 分享链接前缀，如 https://hashfans.io
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,
    /// 生成唯一抽奖码的最大尝试次数
    #[serde(default = "default_code_max_attempts")]
    pub code_max_attempts: u32,
    /// DRAWING 超过该秒数视为卡住
    #[serde(default = "default_stale_draw_after_secs")]
    pub stale_draw_after_secs: i64,
    /// 卡住巡检间隔（秒）
    #[serde(default = "default_stale_check_interval_secs")]
    pub stale_check_interval_secs: u64,
}

fn default_share_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_code_max_attempts() -> u32 {
    10
}

fn default_stale_draw_after_secs() -> i64 {
    600
}

fn default_stale_check_interval_secs() -> u64 {
    300
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            share_base_url: default_share_base_url(),
            code_max_attempts: default_code_max_attempts(),
            stale_draw_after_secs: default_stale_draw_after_secs(),
            stale_check_interval_secs: default_stale_check_interval_secs(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                Self::parse(&config_str)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    redis: RedisConfig::default(),
                    lottery: LotteryConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();

        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config = toml::from_str(config_str).map_err(|e| format!("解析配置文件失败: {e}"))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("REDIS_URL") {
            self.redis.url = Some(v);
        }

        // Lottery
        if let Ok(v) = env::var("LOTTERY_SHARE_BASE_URL") {
            self.lottery.share_base_url = v;
        }
        if let Ok(v) = env::var("LOTTERY_CODE_MAX_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            self.lottery.code_max_attempts = n;
        }
        if let Ok(v) = env::var("LOTTERY_STALE_DRAW_AFTER_SECS")
            && let Ok(n) = v.parse()
        {
            self.lottery.stale_draw_after_secs = n;
        }
        if let Ok(v) = env::var("LOTTERY_STALE_CHECK_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.lottery.stale_check_interval_secs = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/lottery"
            max_connections = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(config.redis.url.is_none());
        assert_eq!(config.lottery.code_max_attempts, 10);
        assert_eq!(config.lottery.stale_draw_after_secs, 600);
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "postgres://localhost/lottery"
            max_connections = 10

            [redis]
            url = "redis://127.0.0.1:6379"

            [lottery]
            share_base_url = "https://hashfans.io"
            code_max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.redis.url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.lottery.share_base_url, "https://hashfans.io");
        assert_eq!(config.lottery.code_max_attempts, 3);
        assert_eq!(config.lottery.stale_check_interval_secs, 300);
    }

    #[test]
    fn test_parse_rejects_missing_database() {
        assert!(Config::parse("[server]\nhost = \"h\"\nport = 1\n").is_err());
    }
}
