use std::sync::Arc;

use corkboard_core::domain::{DragEnd, DragKind, DraggableLocation, TaskLocation};
use corkboard_core::impls::InMemoryRemoteStore;
use corkboard_core::ports::RemoteStore;
use corkboard_core::{BoardClient, ClientBuilder, CorkboardError, SyncConfig};
use tokio::time::{Duration, sleep};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 2 つのクライアントを 1 つのインメモリストアにつないで、台本どおりに操作する
async fn run(config: SyncConfig) -> Result<(), CorkboardError> {
    // (A) 共有ストアとクライアント 2 つ
    let store: Arc<dyn RemoteStore> =
        Arc::new(InMemoryRemoteStore::with_capacity(config.channel_capacity));
    let mut alice = ClientBuilder::new(Arc::clone(&store))
        .config(config.clone())
        .build()?;
    let mut bob = ClientBuilder::new(Arc::clone(&store)).config(config).build()?;
    alice.connect().await?;
    bob.connect().await?;

    // (B) alice がボードを作る
    let (todo, _) = alice.add_column("To Do").await?;
    let (task, _) = alice.add_task(todo, "Write docs", "User guide").await?;
    let (done, _) = alice.add_column("Done").await?;

    // (C) bob はドラッグでタスクを Done へ移動してコメントする
    settle().await;
    let drag = DragEnd {
        source: DraggableLocation {
            droppable_id: todo.key(),
            index: 0,
        },
        destination: Some(DraggableLocation {
            droppable_id: done.key(),
            index: 0,
        }),
        draggable_id: task.key(),
        kind: DragKind::Task,
    };
    bob.handle_drag_end(&drag).await?;
    bob.add_comment(task, "Done, please review").await?;
    print_status("after bob's edits", &alice).await;

    // (D) alice が取り消して、やり直す
    settle().await;
    alice.undo().await;
    print_status("after alice undo", &bob).await;
    alice.redo().await;
    print_status("after alice redo", &bob).await;

    // (E) 空のタイトルは拒否される（ボードは変わらない）
    if let Err(e) = alice.update_column(done, "  ").await {
        tracing::info!(error = %e, "rejected as expected");
    }

    // (F) 元の位置に戻して終了
    bob.reorder_tasks(TaskLocation::new(done, 0), TaskLocation::new(todo, 0), task)
        .await?;
    print_status("final", &alice).await;

    alice.disconnect().await?;
    bob.disconnect().await?;
    Ok(())
}

/// 他クライアントの書き込みが購読経由で届くのを待つ
async fn settle() {
    sleep(Duration::from_millis(20)).await;
}

async fn print_status(label: &str, client: &BoardClient) {
    settle().await;
    let status = client.status().await;
    match serde_json::to_string(&status) {
        Ok(json) => println!("{label}: {json}"),
        Err(e) => tracing::error!(error = %e, "failed to encode status"),
    }
    let board = client.board().await;
    for column in board.ordered_columns() {
        println!("  {}: {} task(s)", column.title, column.task_ids.len());
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corkboard_core=debug,corkboard_cli=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env();
    tracing::info!(?config, "corkboard demo starting");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}
