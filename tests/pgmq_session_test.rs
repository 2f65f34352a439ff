//! Integration tests against a real PostgreSQL database with the pgmq
//! extension. Skipped when DATABASE_URL is not provided.

use dotenvy::dotenv;
use std::sync::Arc;
use uuid::Uuid;

use pgmq_fluent::{PgmqSession, QueueBuilder, QueueConfig, QueueSession};

async fn test_session() -> Option<(PgmqSession, String)> {
    dotenv().ok();

    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        println!("Skipping pgmq integration test - no DATABASE_URL provided");
        return None;
    };

    let session = match PgmqSession::new(&database_url, QueueConfig::default()).await {
        Ok(session) => session,
        Err(e) => {
            println!("Skipping pgmq integration test - connection failed: {e:?}");
            return None;
        }
    };

    let test_id = Uuid::new_v4().to_string()[..8].to_string();
    let queue_name = format!("fluent_test_{test_id}");
    Some((session, queue_name))
}

#[tokio::test]
async fn test_resolve_creates_and_finds_queue() {
    let Some((session, queue_name)) = test_session().await else {
        return;
    };

    let handle = session.resolve(&queue_name).await.expect("resolve failed");
    assert_eq!(handle.name(), queue_name);

    // Second resolve finds the existing queue
    session
        .resolve(&queue_name)
        .await
        .expect("re-resolve failed");

    session.drop_queue(&queue_name).await.expect("cleanup failed");
}

#[tokio::test]
async fn test_builder_send_lands_on_queue() {
    let Some((session, queue_name)) = test_session().await else {
        return;
    };

    let session = Arc::new(session);
    let builder = QueueBuilder::new(Arc::clone(&session) as Arc<dyn QueueSession>)
        .destination(&queue_name)
        .expect("invalid queue name");

    builder
        .send_text("integration hello")
        .await
        .expect("send failed")
        .send_object(&serde_json::json!({"order_id": 1001}))
        .await
        .expect("send failed");

    let metrics = session
        .queue_metrics(&queue_name)
        .await
        .expect("metrics failed");
    assert_eq!(metrics.queue_name, queue_name);
    assert_eq!(metrics.message_count, 2);

    session.drop_queue(&queue_name).await.expect("cleanup failed");
}
