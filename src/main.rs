use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trustchain_web::{api, client::BackendClient, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ----------------------------------------------------------------
    // 0. 日志 & 配置
    // ----------------------------------------------------------------
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trustchain_web=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "⚙️  配置加载完成: Host={}:{}, Backend={}, Timeout={}s",
        config.host, config.port, config.backend_url, config.request_timeout_secs
    );

    // ----------------------------------------------------------------
    // 1. 后端客户端 & 外链
    // ----------------------------------------------------------------
    info!("🛡️ [TrustChain] 深度伪造取证前端启动中...");
    let backend = BackendClient::new(&config.backend_url, config.request_timeout())?;
    let links = config.links()?;
    info!("🔗 区块浏览器: {}", config.explorer_tx_url);

    // ----------------------------------------------------------------
    // 2. 状态共享容器
    // ----------------------------------------------------------------
    let shared_state = Arc::new(api::AppState { backend, links });

    // ----------------------------------------------------------------
    // 3. 启动 HTTP 服务
    // ----------------------------------------------------------------
    let app = api::app(shared_state, config.max_upload_bytes);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 服务已运行在: http://{}", addr);
    info!("   - GET  /              : 上传页");
    info!("   - POST /upload        : 提交证据");
    info!("   - GET  /results/{{id}} : 检测结果与责任分摊");
    info!("   - GET  /verify        : 完整性校验");

    axum::serve(listener, app).await?;

    Ok(())
}
