use qr_upload::shutdown::drain_with_timeout;
use qr_upload::{AppConfig, AppState, ShutdownManager, build_app};

#[tokio::main]
async fn main() {
    // 与本地开发习惯一致：存在 .env 时先载入
    let dotenv_path = dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qr_upload=info,tower_http=info".into()),
        )
        .init();
    if let Some(path) = dotenv_path {
        tracing::info!("已载入环境文件: {}", path.display());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Config init failed: {}", e);
            std::process::exit(1);
        }
    };

    // Blob 客户端在启动时创建一次，随状态注入处理器
    let app_state = match AppState::from_azure_config(&config.azure) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Azure Blob 客户端初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_app(app_state, &config.cors);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Generate QR: POST http://{}/generate-qr/?url=...", addr);
    tracing::info!(
        "Blob 容器: {} (account={})",
        config.azure.container_name,
        config.azure.account
    );

    let shutdown_manager = ShutdownManager::new();
    shutdown_manager.listen_for_signals();

    let shutdown_timeout = config.shutdown.timeout_duration();
    let signal_manager = shutdown_manager.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = signal_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        res = &mut server => {
            exit_on_server_error(res);
            return;
        }
        _ = shutdown_manager.wait_for_shutdown() => {}
    }

    // 在途请求（含进行中的上传）的收尾时间以 shutdown.timeout_secs 为上限
    if !drain_with_timeout(&mut server, shutdown_timeout).await {
        std::process::exit(1);
    }
    tracing::info!("服务器已优雅关闭");
}

fn exit_on_server_error(res: Result<std::io::Result<()>, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!("服务器运行错误: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("服务器任务异常退出: {}", e);
            std::process::exit(1);
        }
    }
}
