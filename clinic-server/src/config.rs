//! 配置管理
//!
//! 加载顺序：内置默认值、可选的 TOML 配置文件、`CLINIC__` 前缀的环境变量，
//! 后者覆盖前者。命令行参数在 main 中最后覆盖。

use clinic_core::{ClinicError, PagingLimits, Result};
use clinic_database::DatabaseSettings;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// 系统完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 连接字符串，为空时使用内存存储
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// 获取连接超时（秒）
    pub acquire_timeout_secs: u64,
    /// 单次查询超时（秒）
    pub query_timeout_secs: u64,
    /// 启动时建表
    pub bootstrap_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 5,
            query_timeout_secs: 10,
            bootstrap_schema: true,
        }
    }
}

/// 分页配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        let limits = PagingLimits::default();
        Self {
            default_page_size: limits.default_page_size,
            max_page_size: limits.max_page_size,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl ClinicConfig {
    /// 从可选配置文件和环境变量加载
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_with(config_path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("CLINIC")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(config_path: Option<&str>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(environment)
            .build()
            .map_err(|e| ClinicError::Config(e.to_string()))?;

        let config: ClinicConfig = settings
            .try_deserialize()
            .map_err(|e| ClinicError::Config(format!("Failed to deserialize configuration: {}", e)))?;

        if let Some(path) = config_path {
            info!("Configuration loaded successfully from: {}", path);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ClinicError::Config("server.port must be non-zero".to_string()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ClinicError::Config(
                "database.min_connections exceeds database.max_connections".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ClinicError::Config(
                "database.max_connections must be non-zero".to_string(),
            ));
        }
        if self.database.acquire_timeout_secs == 0 || self.database.query_timeout_secs == 0 {
            return Err(ClinicError::Config("database timeouts must be non-zero".to_string()));
        }
        if self.query.default_page_size == 0 || self.query.max_page_size == 0 {
            return Err(ClinicError::Config("page sizes must be non-zero".to_string()));
        }
        if self.query.default_page_size > self.query.max_page_size {
            return Err(ClinicError::Config(
                "query.default_page_size exceeds query.max_page_size".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ClinicError::Config(format!("invalid listen address: {}", e)))
    }

    pub fn paging_limits(&self) -> PagingLimits {
        PagingLimits {
            default_page_size: self.query.default_page_size,
            max_page_size: self.query.max_page_size,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.database.query_timeout_secs)
    }

    pub fn database_settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            acquire_timeout: Duration::from_secs(self.database.acquire_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClinicConfig::environment().source(Some(map))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ClinicConfig::load_with(None, env(&[])).unwrap();
        assert_eq!(config, ClinicConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.paging_limits(), PagingLimits::default());
        assert_eq!(config.query_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_file_then_environment() {
        let path = std::env::temp_dir().join(format!("clinic-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[server]\nport = 9000\n\n[query]\nmax_page_size = 50\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = ClinicConfig::load_with(
            path.to_str(),
            env(&[
                ("CLINIC__SERVER__PORT", "9100"),
                ("CLINIC__DATABASE__URL", "postgres://localhost/clinic"),
            ]),
        )
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.query.max_page_size, 50);
        assert_eq!(config.query.default_page_size, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.database.url, "postgres://localhost/clinic");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ClinicConfig::load_with(Some("/nonexistent/clinic.toml"), env(&[])).unwrap_err();
        assert!(matches!(err, ClinicError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_inconsistent_values() {
        let mut config = ClinicConfig::default();
        config.query.default_page_size = 200;
        assert!(matches!(config.validate(), Err(ClinicError::Config(_))));

        let mut config = ClinicConfig::default();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());

        let mut config = ClinicConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listen_addr() {
        let mut config = ClinicConfig::default();
        config.server.host = "127.0.0.1".to_string();
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:8080");

        config.server.host = "not a host".to_string();
        assert!(config.listen_addr().is_err());
    }
}
