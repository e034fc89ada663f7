//! 运行时相关的工具函数

use rat_logger::warn;
use std::future::Future;
use tokio::task::AbortHandle;

/// 在当前 tokio 运行时上派生后台任务
///
/// 同步代码路径（例如 `Drop`）可能在运行时之外执行，此时不派生任务并返回 `None`
pub fn spawn_detached<F>(future: F) -> Option<AbortHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn(future).abort_handle()),
        Err(_) => {
            warn!("当前线程没有可用的tokio运行时，后台任务未启动");
            None
        }
    }
}
