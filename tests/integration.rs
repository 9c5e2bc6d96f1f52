//! Integration tests for the identity status service

mod common;

use serde_json::{json, Value};

use identity_status::memory::{derive_channel_address, Step};
use identity_status::providers::IdentityStore;
use identity_status::types::{Address, Earnings, RegistrationStatus};

use common::{hermes, start_test_server, CHAIN_ID};

async fn create_identity(client: &common::TestClient, passphrase: &str) -> Address {
    let resp = client
        .post("/identities", &json!({ "passphrase": passphrase }))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (client, _backend) = start_test_server().await;

    let resp = client.get("/health").await;
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["chain_id"], CHAIN_ID);
    assert_eq!(body["identities_count"], 0);
}

#[tokio::test]
async fn test_list_identities_empty() {
    let (client, _backend) = start_test_server().await;

    let resp = client.get("/identities").await;
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert!(body["identities"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_identity_matches_store() {
    let (client, backend) = start_test_server().await;

    let address = create_identity(&client, "secret").await;

    let stored = backend.keystore.identities().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].address, address);

    let body: Value = client.get("/identities").await.json().await.unwrap();
    assert_eq!(body["identities"][0]["id"], address.to_string());
}

#[tokio::test]
async fn test_create_identity_requires_passphrase() {
    let (client, backend) = start_test_server().await;

    for payload in [json!({}), json!({ "passphrase": "" })] {
        let resp = client.post("/identities", &payload).await;
        assert_eq!(resp.status(), 422);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["passphrase"][0]["code"], "required");
    }
    assert!(backend.keystore.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (client, _backend) = start_test_server().await;

    let resp = client.put_raw("/identities/current", "{not json").await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_status_unknown_identity_is_not_found() {
    let (client, backend) = start_test_server().await;
    let unknown = Address::from_bytes([0xab; 20]);

    for path in [
        format!("/identities/{}", unknown),
        format!("/identities/{}/status", unknown),
        format!("/identities/{}/registration", unknown),
        "/identities/nonexistent".to_string(),
    ] {
        let resp = client.get(&path).await;
        assert_eq!(resp.status(), 404, "{}", path);
    }
    assert_eq!(backend.chain.total_calls(), 0);
}

#[tokio::test]
async fn test_status_unregistered_identity() {
    let (client, backend) = start_test_server().await;
    let address = create_identity(&client, "secret").await;

    let resp = client.get(&format!("/identities/{}/status", address)).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let channel = derive_channel_address(CHAIN_ID, &hermes(), &address);
    assert_eq!(
        body,
        json!({
            "id": address.to_string(),
            "registration_status": "Unregistered",
            "channel_address": channel.to_string(),
            "balance": 0,
            "earnings": 0,
            "earnings_total": 0,
            "stake": 0,
        })
    );
    assert_eq!(backend.chain.calls(Step::Ledger), 0);
}

#[tokio::test]
async fn test_status_registered_identity() {
    let (client, backend) = start_test_server().await;
    let address = create_identity(&client, "secret").await;

    let chain = &backend.chain;
    chain.set_registration(CHAIN_ID, address, RegistrationStatus::Registered);
    chain.set_stake(CHAIN_ID, address, 1000);
    chain.set_balance(CHAIN_ID, address, 500);
    chain.set_earnings(
        CHAIN_ID,
        address,
        Earnings {
            unsettled_balance: 10,
            lifetime_balance: 110,
        },
    );

    let body: Value = client
        .get(&format!("/identities/{}", address))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["registration_status"], "Registered");
    assert_eq!(body["stake"], 1000);
    assert_eq!(body["balance"], 500);
    assert_eq!(body["earnings"], 10);
    assert_eq!(body["earnings_total"], 110);
    assert_eq!(
        body["channel_address"],
        derive_channel_address(CHAIN_ID, &hermes(), &address).to_string()
    );
}

#[tokio::test]
async fn test_status_upstream_failure_has_no_partial_body() {
    let (client, backend) = start_test_server().await;
    let address = create_identity(&client, "secret").await;
    backend.chain.fail(Step::Earnings, "settlement db offline");

    let resp = client.get(&format!("/identities/{}/status", address)).await;
    assert_eq!(resp.status(), 500);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("failed to get earnings"));
    assert!(body.get("balance").is_none());
}

#[tokio::test]
async fn test_unlock_identity() {
    let (client, backend) = start_test_server().await;
    let address = create_identity(&client, "secret").await;
    let path = format!("/identities/{}/unlock", address);

    let resp = client.put(&path, &json!({ "passphrase": "wrong" })).await;
    assert_eq!(resp.status(), 403);
    assert!(!backend.keystore.is_unlocked(&address, CHAIN_ID));

    let resp = client.put(&path, &json!({ "passphrase": "secret" })).await;
    assert_eq!(resp.status(), 202);
    assert!(resp.text().await.unwrap().is_empty());
    assert!(backend.keystore.is_unlocked(&address, CHAIN_ID));

    let resp = client.put(&path, &json!({})).await;
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_unlock_unknown_identity_is_not_found() {
    let (client, _backend) = start_test_server().await;

    let resp = client
        .put(
            &format!("/identities/{}/unlock", Address::from_bytes([1; 20])),
            &json!({ "passphrase": "secret" }),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_unlock_unknown_identity_ignores_body() {
    let (client, backend) = start_test_server().await;
    let path = format!("/identities/{}/unlock", Address::from_bytes([2; 20]));

    let resp = client.put(&path, &json!({})).await;
    assert_eq!(resp.status(), 404);

    let resp = client.put_raw(&path, "{not json").await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Identity not found");

    let resp = client.put_raw("/identities/nonexistent/unlock", "{not json").await;
    assert_eq!(resp.status(), 404);
    assert!(backend.keystore.is_empty());
}

#[tokio::test]
async fn test_current_identity_creates_then_reuses() {
    let (client, backend) = start_test_server().await;

    let resp = client
        .put("/identities/current", &json!({ "passphrase": "secret" }))
        .await;
    assert_eq!(resp.status(), 200);
    let first: Value = resp.json().await.unwrap();
    let address: Address = first["id"].as_str().unwrap().parse().unwrap();
    assert!(backend.keystore.is_unlocked(&address, CHAIN_ID));

    let again: Value = client
        .put(
            "/identities/current",
            &json!({ "address": address.to_string(), "passphrase": "secret" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(again["id"], first["id"]);
    assert_eq!(backend.keystore.len(), 1);

    let resp = client
        .put("/identities/current", &json!({ "address": "0x12" }))
        .await;
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["errors"]["address"].is_array());
    assert!(body["errors"]["passphrase"].is_array());
}

#[tokio::test]
async fn test_registration_endpoint() {
    let (client, backend) = start_test_server().await;
    let address = create_identity(&client, "secret").await;
    backend
        .chain
        .set_registration(CHAIN_ID, address, RegistrationStatus::InProgress);

    let body: Value = client
        .get(&format!("/identities/{}/registration", address))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "InProgress", "registered": false }));
}

#[tokio::test]
async fn test_beneficiary_for_any_address() {
    let (client, backend) = start_test_server().await;
    let stranger = Address::from_bytes([0x33; 20]);
    let payout = Address::from_bytes([0x44; 20]);
    backend.chain.set_beneficiary(stranger, payout);

    let resp = client
        .get(&format!("/identities/{}/beneficiary", stranger))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["beneficiary"], payout.to_string());

    let resp = client.get("/identities/0xbad/beneficiary").await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_referral_endpoints() {
    let (client, backend) = start_test_server().await;
    let address = Address::from_bytes([0x55; 20]);

    let resp = client
        .get(&format!("/identities/{}/referral-available", address))
        .await;
    assert_eq!(resp.status(), 500);

    backend.chain.set_referral_token(address, "ref-token");

    let resp = client
        .get(&format!("/identities/{}/referral-available", address))
        .await;
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().is_empty());

    let body: Value = client
        .get(&format!("/identities/{}/referral", address))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "token": "ref-token" }));
}
