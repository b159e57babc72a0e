//! Object store integration tests.
//!
//! Run against a live MinIO/S3 endpoint:
//!   cargo test -p sitesense-storage --test storage_integration -- --ignored

use std::io::Write;

use sitesense_storage::{upload_processed_video, ObjectStoreClient};

#[tokio::test]
#[ignore = "requires object store credentials"]
async fn connectivity_check() {
    dotenvy::dotenv().ok();

    let client = ObjectStoreClient::from_env()
        .await
        .expect("Failed to create store client");

    client
        .check_connectivity()
        .await
        .expect("Connectivity check failed");
}

#[tokio::test]
#[ignore = "requires object store credentials"]
async fn upload_exists_delete_cycle() {
    dotenvy::dotenv().ok();

    let client = ObjectStoreClient::from_env()
        .await
        .expect("Failed to create store client");

    let mut temp = tempfile::Builder::new()
        .prefix("processed_test_")
        .suffix(".mp4")
        .tempfile()
        .expect("Failed to create temp file");
    temp.write_all(&[0u8; 2048]).expect("write failed");

    let upload = upload_processed_video(&client, temp.path())
        .await
        .expect("upload failed");
    assert!(upload.url.contains(&upload.key));

    assert!(client.object_exists(&upload.key).await.expect("head failed"));

    client
        .delete_object(&upload.key)
        .await
        .expect("delete failed");
    assert!(!client.object_exists(&upload.key).await.expect("head failed"));
}

#[tokio::test]
#[ignore = "requires object store credentials"]
async fn presigned_url_contains_signature() {
    dotenvy::dotenv().ok();

    let client = ObjectStoreClient::from_env()
        .await
        .expect("Failed to create store client");

    let url = client
        .presign_get(
            "processed_test.mp4",
            std::time::Duration::from_secs(3600),
        )
        .await
        .expect("presign failed");
    assert!(url.contains("X-Amz-Signature"));
}
