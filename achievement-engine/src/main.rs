use std::path::Path;
use std::sync::Arc;

use achievement_engine::{AchievementService, IngestWorker, import_directory, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 数据目录, 日志)
    let config = setup_environment()?;
    tracing::info!(
        data_directory = %config.data_directory,
        rebuild_from_scratch = config.rebuild_from_scratch,
        "Achievement engine starting"
    );

    // 2. 打开数据库
    let service = Arc::new(AchievementService::open(&config)?);

    // 3. 重放事件日志 (必须在接受新事件之前完成)
    let replay_service = service.clone();
    let report = tokio::task::spawn_blocking(move || replay_service.rebuild()).await??;
    tracing::info!(
        events = report.events,
        evaluated = report.evaluated,
        unlocked = report.unlocked,
        "State rebuilt from event log"
    );

    // 4. 启动评估 worker
    let (handle, worker) = IngestWorker::spawn(service.clone(), config.ingest_queue_capacity);

    // 5. 可选: 导入 webhook 归档目录
    if let Some(dir) = config.import_directory.as_deref() {
        let report = import_directory(&handle, Path::new(dir)).await?;
        tracing::info!(
            files = report.files,
            accepted = report.accepted,
            rejected = report.rejected,
            "Webhook archive imported"
        );
    }

    drop(handle);
    worker.await?;

    let info = service.event_log_info()?;
    tracing::info!(
        count = info.count,
        most_recent_timestamp = ?info.most_recent_timestamp,
        users = service.list_users()?.len(),
        "Event log summary"
    );

    Ok(())
}
