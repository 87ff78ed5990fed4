//! 诊所服务器主程序

mod config;

use anyhow::Context;
use clap::Parser;
use clinic_database::{
    DatabasePool, EntityQueryEngine, EntityStore, MemoryEntityStore, PgEntityStore,
};
use clinic_web::{AppState, WebMetrics, WebServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ClinicConfig, LogFormat};

/// 诊所服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "MiniClinic 实体管理服务器")]
struct Args {
    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// PostgreSQL 连接字符串
    #[arg(short, long)]
    database_url: Option<String>,

    /// 使用内存存储（不连接数据库）
    #[arg(short, long)]
    memory: bool,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    /// 命令行参数覆盖配置
    fn apply(&self, config: &mut ClinicConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn init_logging(config: &ClinicConfig) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn open_store(config: &ClinicConfig, memory: bool) -> anyhow::Result<Arc<dyn EntityStore>> {
    if memory || config.database.url.is_empty() {
        if !memory {
            warn!("未配置数据库连接，使用内存存储");
        }
        return Ok(Arc::new(MemoryEntityStore::new()));
    }

    let pool = DatabasePool::connect(&config.database_settings())
        .await
        .context("连接数据库失败")?;
    let store = PgEntityStore::new(pool);

    if config.database.bootstrap_schema {
        store.create_tables().await.context("初始化数据库表失败")?;
    }

    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ClinicConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    // 初始化日志
    init_logging(&config);

    info!("启动诊所服务器...");

    let addr = config.listen_addr()?;
    let store = open_store(&config, args.memory).await?;

    info!("诊所服务器配置:");
    info!("  监听地址: {}", addr);
    info!("  存储后端: {}", store.name());
    info!(
        "  分页大小: 默认 {} / 最大 {}",
        config.query.default_page_size, config.query.max_page_size
    );

    let engine = EntityQueryEngine::new(store)
        .with_limits(config.paging_limits())
        .with_query_timeout(config.query_timeout());

    let state = Arc::new(AppState {
        engine,
        metrics: WebMetrics::new()?,
    });

    // 启动Web服务器
    let server = WebServer::new(addr, state);
    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e.into());
    }

    Ok(())
}
