//! RatQuickPool 基本使用示例
//!
//! 用一个内存中的模拟连接展示资源池、事务、提交后步骤、按键锁与推拉流适配。

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use rat_quickpool::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 只打印语句的模拟连接
struct DemoConnection {
    id: usize,
}

impl DemoConnection {
    async fn execute(&self, sql: &str) -> QuickPoolResult<()> {
        println!("  [连接 {}] {}", self.id, sql);
        Ok(())
    }
}

#[async_trait]
impl TransactionDriver for DemoConnection {
    async fn begin_transaction(&self, options: &TransactionOptions) -> QuickPoolResult<()> {
        self.execute(&options.begin_statement()).await
    }

    async fn commit(&self) -> QuickPoolResult<()> {
        self.execute("COMMIT").await
    }

    async fn rollback(&self) -> QuickPoolResult<()> {
        self.execute("ROLLBACK").await
    }
}

#[derive(Default)]
struct DemoManager {
    next_id: AtomicUsize,
}

#[async_trait]
impl ResourceManager for DemoManager {
    type Resource = DemoConnection;

    async fn open(&self) -> QuickPoolResult<DemoConnection> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        println!("  打开连接 {}", id);
        Ok(DemoConnection { id })
    }

    async fn close(&self, resource: &DemoConnection) -> QuickPoolResult<()> {
        println!("  关闭连接 {}", resource.id);
        Ok(())
    }
}

/// 一次推送完所有数据的模拟数据源
struct DemoSource;

impl PushSource for DemoSource {
    fn pause(&mut self) {
        println!("  数据源暂停");
    }

    fn resume(&mut self) {
        println!("  数据源恢复");
    }

    fn dispose(&mut self) {
        println!("  数据源释放");
    }

    fn high_water_mark(&self) -> usize {
        2
    }
}

#[tokio::main]
async fn main() -> QuickPoolResult<()> {
    rat_quickpool::init();
    println!("=== RatQuickPool 基本使用示例 ===");
    println!("库版本: {}", rat_quickpool::get_info());

    // 1. 创建资源池和数据库句柄
    println!("\n1. 创建资源池...");
    let pool = create_resource_pool(DemoManager::default(), guarded_pool_config(4, 30_000)?)?;
    let db = Database::new(pool);

    // 2. 普通任务
    println!("\n2. 执行任务...");
    db.task(|task| async move { task.execute("SELECT 1").await }.boxed())
        .await?;

    // 3. 嵌套事务与提交后步骤
    println!("\n3. 执行嵌套事务...");
    let committed = Arc::new(AtomicUsize::new(0));
    let counter = committed.clone();
    db.tx(
        move |tx| {
            let counter = counter.clone();
            async move {
                tx.execute("INSERT INTO users VALUES (1)").await?;
                tx.add_post_commit_step(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    println!("  提交后步骤执行");
                    Ok(())
                });
                tx.tx(|inner| {
                    async move { inner.execute("INSERT INTO audit VALUES (1)").await }.boxed()
                })
                .await
            }
            .boxed()
        },
        TransactionOptions::serializable_with_retry(),
    )
    .await?;
    println!("  提交后步骤执行次数: {}", committed.load(Ordering::SeqCst));

    // 4. 按键加锁
    println!("\n4. 按键加锁...");
    let locks = LockPool::new();
    let keyed: KeyedLocks<String> = create_locks_by_key(&locks, Some(1_000));
    keyed
        .with_lock(&"user:1".to_string(), || async {
            println!("  持有 user:1 的锁");
            Ok::<(), QuickPoolError>(())
        })
        .await?;

    // 5. 推拉流适配
    println!("\n5. 推拉流适配...");
    let mut stream = push_to_stream(|sink: PushSink<u32, QuickPoolError>| {
        for value in 1..=4 {
            sink.data(value);
        }
        sink.end();
        DemoSource
    });
    while let Some(item) = stream.next().await {
        println!("  收到: {}", item?);
    }

    // 6. 排空资源池
    println!("\n6. 排空资源池...");
    println!("  排空前: {:?}", db.stats());
    db.drain().await?;
    println!("  排空后: {:?}", db.stats());

    println!("\n=== 示例完成 ===");
    Ok(())
}
