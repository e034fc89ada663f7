//! 任务与事务协议模块
//!
//! 在资源池之上提供任务（租用一个资源执行一段工作）与事务（BEGIN/COMMIT/ROLLBACK、
//! 嵌套复用、序列化冲突重试、提交后步骤）。SQL 的执行由资源实现的
//! [`TransactionDriver`] 完成。

pub mod types;
pub mod task;
pub mod database;

pub use types::{IsolationLevel, PostCommitStep, TransactionDriver, TransactionOptions};
pub use task::{Task, Transaction};
pub use database::Database;
