use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ServiceConfig;

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// JSON（生产环境）
    Json,
    /// Pretty（开发环境）
    Pretty,
    /// Compact（默认）
    Compact,
}

/// 解析配置中的格式标签，未知标签回退到 Compact
fn resolve_format(tag: Option<&str>) -> LogFormat {
    match tag {
        Some("json") => LogFormat::Json,
        Some("pretty") | Some("dev") => LogFormat::Pretty,
        _ => LogFormat::Compact,
    }
}

/// 按服务配置初始化日志系统（RUST_LOG 优先于配置的级别）
pub fn init_logging(config: &ServiceConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match resolve_format(config.log_format.as_deref()) {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
