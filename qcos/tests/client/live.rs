use super::init_logger;
use bytes::Bytes;
use http::StatusCode;
use log::warn;
use qcos::{Acl, Client, Credential, Expiration, HeadObject, Result, UploadOptions};
use std::env;
use std::time::Duration;

struct Live {
    client: Client,
    bucket: String,
}

fn live() -> Option<Live> {
    init_logger();
    let _ = dotenv::dotenv();
    if env::var("QCOS_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let var = |k: &str| env::var(k).unwrap_or_else(|_| panic!("env {k} must set"));
    let client = Client::builder()
        .region(var("QCOS_REGION"))
        .credential(Credential::new(
            var("QCOS_APPID"),
            var("QCOS_SECRET_ID"),
            var("QCOS_SECRET_KEY"),
        ))
        .build()
        .expect("client must build");
    Some(Live {
        client,
        bucket: var("QCOS_BUCKET"),
    })
}

#[tokio::test]
async fn test_live_multipart_roundtrip() -> Result<()> {
    let Some(live) = live() else {
        warn!("QCOS_TEST is not set, skipped");
        return Ok(());
    };

    let key = "qcos-test/multipart.bin";
    let data = Bytes::from(vec![7u8; 3 * 1024 * 1024 + 5]);
    live.client
        .upload(&live.bucket, key, data.clone(), Acl::Private, UploadOptions::default())
        .await?;

    let req = live.client.execute_operation(HeadObject::new(&live.bucket, key)?)?;
    let resp = live.client.dispatch(req).await?;
    assert_eq!(
        resp.headers()["content-length"],
        data.len().to_string().as_str()
    );
    Ok(())
}

#[tokio::test]
async fn test_live_presigned_head_not_exist_object() -> Result<()> {
    let Some(live) = live() else {
        warn!("QCOS_TEST is not set, skipped");
        return Ok(());
    };

    let req = live
        .client
        .execute_operation(HeadObject::new(&live.bucket, "not_exist_file")?)?;
    let url = live
        .client
        .presigned_url(&req, Expiration::In(Duration::from_secs(300)))?;

    let ctx = live.client.context();
    let resp = ctx
        .http_send(
            http::Request::builder()
                .method(http::Method::HEAD)
                .uri(url)
                .body(Bytes::new())?,
        )
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
