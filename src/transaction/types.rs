//! 事务协议类型定义

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{QuickPoolError, QuickPoolResult};

/// 事务隔离级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// 对应的 SQL 关键字
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// 事务选项
///
/// 只在最外层事务上生效，嵌套事务沿用外层事务。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    /// 隔离级别，`None` 使用驱动默认值
    pub isolation_level: Option<IsolationLevel>,
    /// 是否只读
    pub read_only: bool,
    /// 遇到序列化冲突时从 BEGIN 开始重新执行整个事务
    pub retry_serialization_failures: bool,
    /// 序列化冲突的最大重试次数，`None` 表示不限
    pub max_serialization_retries: Option<u32>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 可串行化且自动重试冲突
    pub fn serializable_with_retry() -> Self {
        Self {
            isolation_level: Some(IsolationLevel::Serializable),
            retry_serialization_failures: true,
            ..Self::default()
        }
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn retry_serialization_failures(mut self, retry: bool) -> Self {
        self.retry_serialization_failures = retry;
        self
    }

    pub fn max_serialization_retries(mut self, max: u32) -> Self {
        self.max_serialization_retries = Some(max);
        self
    }

    /// 生成 BEGIN 语句，供驱动实现参考
    pub fn begin_statement(&self) -> String {
        let mut statement = String::from("BEGIN");
        if let Some(level) = self.isolation_level {
            statement.push_str(" ISOLATION LEVEL ");
            statement.push_str(level.as_sql());
        }
        if self.read_only {
            statement.push_str(" READ ONLY");
        }
        statement
    }
}

/// 事务驱动：由被池化的资源（通常是数据库连接）实现
///
/// 资源池与事务协议本身不执行 SQL，BEGIN/COMMIT/ROLLBACK 都委托给驱动。
#[async_trait]
pub trait TransactionDriver: Send + Sync {
    /// 开启事务
    async fn begin_transaction(&self, options: &TransactionOptions) -> QuickPoolResult<()>;

    /// 提交事务
    async fn commit(&self) -> QuickPoolResult<()>;

    /// 回滚事务
    async fn rollback(&self) -> QuickPoolResult<()>;

    /// 判断错误是否为序列化冲突
    ///
    /// 默认按 SQLSTATE `40001` 判断
    fn is_serialization_conflict(&self, error: &QuickPoolError) -> bool {
        error.code() == Some("40001")
    }
}

/// 提交后步骤
pub type PostCommitStep = Box<dyn FnOnce() -> BoxFuture<'static, QuickPoolResult<()>> + Send>;
