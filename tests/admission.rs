//! End-to-end admission tests: real sockets, real RSA signatures.

use serde_json::Value;

mod common;

const WEBHOOK_PATH: &str = "/webhook/bank-notification";

#[tokio::test]
async fn signed_batch_is_accepted() {
    let key_file = common::write_public_key_pem();
    let addr = common::spawn_gateway(common::test_config(key_file.path())).await;

    let mut payload = common::sample_payload("BATCH_OK_001", "TXN_OK_001");
    common::sign_payload(&mut payload);

    let res = common::http_client()
        .post(format!("http://{}{}", addr, WEBHOOK_PATH))
        .json(&payload)
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["batchId"], "BATCH_OK_001");
    assert_eq!(body["code"], "200");
    assert_eq!(body["data"][0]["transactionId"], "TXN_OK_001");
    assert_eq!(body["data"][0]["errorCode"], "01");
}

#[tokio::test]
async fn forged_signature_is_unauthorized() {
    let key_file = common::write_public_key_pem();
    let addr = common::spawn_gateway(common::test_config(key_file.path())).await;

    let mut payload = common::sample_payload("BATCH_FORGED", "TXN_F_001");
    common::sign_payload(&mut payload);
    // Signed over a different amount than the one sent.
    payload["data"][0]["amount"] = Value::from(999999.0);

    let res = common::http_client()
        .post(format!("http://{}{}", addr, WEBHOOK_PATH))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "401");
    assert_eq!(body["batchId"], "BATCH_FORGED");
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_signature_is_unauthorized() {
    let key_file = common::write_public_key_pem();
    let addr = common::spawn_gateway(common::test_config(key_file.path())).await;

    let payload = common::sample_payload("BATCH_NOSIG", "TXN_N_001");

    let res = common::http_client()
        .post(format!("http://{}{}", addr, WEBHOOK_PATH))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn non_whitelisted_source_is_forbidden() {
    let key_file = common::write_public_key_pem();
    let addr = common::spawn_gateway(common::test_config(key_file.path())).await;

    let mut payload = common::sample_payload("BATCH_IP", "TXN_IP_001");
    common::sign_payload(&mut payload);

    // X-Forwarded-For takes precedence over the loopback peer address.
    let res = common::http_client()
        .post(format!("http://{}{}", addr, WEBHOOK_PATH))
        .header("x-forwarded-for", "203.0.113.50")
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 403);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "403");
}

#[tokio::test]
async fn burst_over_limit_is_throttled() {
    let key_file = common::write_public_key_pem();
    let mut config = common::test_config(key_file.path());
    config.security.rate_limit_requests = 3;
    let addr = common::spawn_gateway(config).await;

    let client = common::http_client();
    let url = format!("http://{}{}", addr, WEBHOOK_PATH);

    for i in 0..3 {
        let mut payload = common::sample_payload("BATCH_RATE", &format!("TXN_R_{i}"));
        common::sign_payload(&mut payload);
        let res = client.post(&url).json(&payload).send().await.unwrap();
        assert_eq!(res.status(), 200, "request {} should be admitted", i);
    }

    let mut payload = common::sample_payload("BATCH_RATE", "TXN_R_LAST");
    common::sign_payload(&mut payload);
    let res = client.post(&url).json(&payload).send().await.unwrap();

    assert_eq!(res.status(), 429);
    assert_eq!(
        res.headers().get("x-ratelimit-remaining").unwrap(),
        "0"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "429");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let key_file = common::write_public_key_pem();
    let addr = common::spawn_gateway(common::test_config(key_file.path())).await;

    let res = common::http_client()
        .post(format!("http://{}{}", addr, WEBHOOK_PATH))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "400");
    assert_eq!(body["message"], "Invalid JSON format");
}

#[tokio::test]
async fn duplicate_transaction_fails_second_batch() {
    let key_file = common::write_public_key_pem();
    let addr = common::spawn_gateway(common::test_config(key_file.path())).await;

    let client = common::http_client();
    let url = format!("http://{}{}", addr, WEBHOOK_PATH);

    let mut first = common::sample_payload("BATCH_DUP_1", "TXN_DUP");
    common::sign_payload(&mut first);
    let res = client.post(&url).json(&first).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let mut second = common::sample_payload("BATCH_DUP_2", "TXN_DUP");
    common::sign_payload(&mut second);
    let res = client.post(&url).json(&second).send().await.unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "400");
    assert_eq!(body["data"][0]["errorCode"], "02");
}

#[tokio::test]
async fn health_reports_processor_stats() {
    let key_file = common::write_public_key_pem();
    let addr = common::spawn_gateway(common::test_config(key_file.path())).await;

    let res = common::http_client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["webhook"].get("processed").is_some());
}
