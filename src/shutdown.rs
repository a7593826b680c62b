//! 优雅退出
//!
//! 监听 SIGINT/SIGTERM（Windows 下为 Ctrl+C），触发后 HTTP 服务器停止接收新连接，
//! 在途请求（包括正在进行的 Blob 上传）继续执行直至完成或超时。

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
    /// 应用请求退出
    Application,
}

/// 退出信号的发送端；克隆后可在任意任务中触发。
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// 触发退出；仅第一次生效。
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        let first = self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
        if first {
            info!("触发优雅退出: {:?}", reason);
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// 等待退出信号并返回首个退出原因。
    pub async fn wait_for_shutdown(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(reason) => reason.unwrap_or(ShutdownReason::Application),
            Err(_) => ShutdownReason::Application,
        }
    }

    /// 注册系统信号处理任务。
    pub fn listen_for_signals(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            let reason = os_signal().await;
            manager.trigger_shutdown(reason);
        });
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn os_signal() -> ShutdownReason {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(i), Ok(t)) => (i, t),
        (Err(e), _) | (_, Err(e)) => {
            warn!("信号处理器注册失败，回退为 Ctrl+C: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return ShutdownReason::Interrupt;
        }
    };

    tokio::select! {
        _ = sigint.recv() => {
            info!("接收到SIGINT信号 (Ctrl+C)");
            ShutdownReason::Interrupt
        }
        _ = sigterm.recv() => {
            info!("接收到SIGTERM信号");
            ShutdownReason::Terminate
        }
    }
}

#[cfg(not(unix))]
async fn os_signal() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("监听Ctrl+C信号失败: {}", e);
    }
    info!("接收到Ctrl+C信号");
    ShutdownReason::Interrupt
}

/// 给在途请求的收尾时间设上限：`drain` 超时后返回 `false`。
pub async fn drain_with_timeout<F>(drain: F, timeout: Duration) -> bool
where
    F: Future,
{
    match tokio::time::timeout(timeout, drain).await {
        Ok(_) => true,
        Err(_) => {
            warn!("优雅退出超时（{}秒），强制退出", timeout.as_secs());
            false
        }
    }
}
