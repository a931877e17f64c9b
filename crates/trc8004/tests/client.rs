//! Client-level flows over scripted gateways and ledger receipts.

use serde_json::json;
use trc8004::fetch::MemoryHttpClient;
use trc8004::{
    commitment_for, BackoffPolicy, CancellationToken, ClientConfig, ClientError,
    ContractAddresses, FetchConfig, RegistryClient, TransactionReceipt,
};

const IDENTITY: &str = "a614f803b6fd780986a42c78ec9c7f77e6ded13c";
const GATEWAY: &str = "https://gw.test/ipfs";
const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
const UPLOAD: &str = "https://pin.test/upload";

const AGENT_REGISTERED_TOPIC: &str =
    "0d063c6022bff16d09991a9f91882ffa112f5fb2529136f65eb4c77bbd047e43";
const VALIDATION_REQUESTED_TOPIC: &str =
    "1da27d3c3b0ba9add8fe60913e37f94eaf1e26b524c6663bb01df799fc19e4fd";
const TRANSFER_TOPIC: &str = "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// ABI encoding of the single string `ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG`.
const TOKEN_URI_DATA: &str = concat!(
    "0000000000000000000000000000000000000000000000000000000000000020",
    "0000000000000000000000000000000000000000000000000000000000000035",
    "697066733a2f2f516d597741504a7a7635435a736e4136323573335866326e65",
    "6d7459675070486457457a37396f6a576e506264470000000000000000000000",
);

fn client(http: &MemoryHttpClient) -> RegistryClient<MemoryHttpClient> {
    let config = ClientConfig::from_json(&format!(
        r#"{{"contracts": {{"identity": "{IDENTITY}"}}}}"#
    ))
    .unwrap()
    .with_fetch(
        FetchConfig::default()
            .with_gateways([GATEWAY])
            .with_backoff(BackoffPolicy::immediate(2))
            .with_upload_endpoint(UPLOAD),
    );
    RegistryClient::with_client(http.clone(), config)
}

fn registration_receipt(emitter: &str) -> TransactionReceipt {
    let json = json!({
        "id": "9f1c",
        "blockNumber": 4_815_162,
        "log": [
            {
                "address": emitter,
                "topics": [TRANSFER_TOPIC],
                "data": ""
            },
            {
                "address": emitter,
                "topics": [
                    AGENT_REGISTERED_TOPIC,
                    "000000000000000000000000000000000000000000000000000000000000002a",
                    "000000000000000000000000b2a0f1c8e3d4a5b6c7d8e9f0a1b2c3d4e5f60718"
                ],
                "data": TOKEN_URI_DATA
            }
        ]
    });
    TransactionReceipt::from_json(json.to_string().as_bytes()).unwrap()
}

#[test]
fn agent_id_is_read_from_registration_receipt() -> anyhow::Result<()> {
    let client = client(&MemoryHttpClient::new());
    let receipt = registration_receipt(IDENTITY);

    assert_eq!(client.agent_id_from_receipt(&receipt)?, 42);

    let events: Vec<_> = client.events(&receipt, None).collect::<Result<_, _>>()?;
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].string("tokenURI"),
        Some(format!("ipfs://{CID}").as_str())
    );
    Ok(())
}

#[test]
fn registration_from_another_contract_is_not_found() {
    let client = client(&MemoryHttpClient::new());
    let receipt = registration_receipt("00000000000000000000000000000000000000ff");

    let err = client.agent_id_from_receipt(&receipt).unwrap_err();
    assert!(matches!(
        err,
        ClientError::EventNotFound {
            event: "AgentRegistered"
        }
    ));
}

#[test]
fn agent_id_falls_back_to_node_decoded_events() -> anyhow::Result<()> {
    let client = client(&MemoryHttpClient::new());

    let receipt = TransactionReceipt::from_json(
        br#"{"id": "9f1c", "events": [{"name": "AgentRegistered", "result": {"agentId": "42"}}]}"#,
    )?;
    assert_eq!(client.agent_id_from_receipt(&receipt)?, 42);

    let receipt = TransactionReceipt::from_json(
        br#"{"events": [{"name": "Transfer", "result": {}}, {"name": "AgentRegistered", "result": {"agent_id": 9}}]}"#,
    )?;
    assert_eq!(client.agent_id_from_receipt(&receipt)?, 9);

    // Decoded logs win over the node's view.
    let mut receipt = registration_receipt(IDENTITY);
    receipt.events = TransactionReceipt::from_json(
        br#"{"events": [{"name": "AgentRegistered", "result": {"agentId": 1}}]}"#,
    )?
    .events;
    assert_eq!(client.agent_id_from_receipt(&receipt)?, 42);

    let receipt = TransactionReceipt::from_json(
        br#"{"events": [{"name": "AgentRegistered", "result": {"owner": "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb"}}]}"#,
    )?;
    assert!(matches!(
        client.agent_id_from_receipt(&receipt),
        Err(ClientError::EventNotFound { .. })
    ));
    Ok(())
}

#[test]
fn validation_request_id_is_read_from_receipt() -> anyhow::Result<()> {
    let request_id = "5adac62d109fffbdb33383f3d0e94a5d119de8413f1c5db806cc8eae3b857f5e";
    let data = format!(
        "{}{}{}",
        "0000000000000000000000000000000000000000000000000000000000000040",
        "0000000000000000000000000000000000000000000000000000000000000000",
        &TOKEN_URI_DATA[64..]
    );
    let json = json!({
        "log": [{
            "address": IDENTITY,
            "topics": [
                VALIDATION_REQUESTED_TOPIC,
                request_id,
                "0000000000000000000000000000000000000000000000000000000000000007",
                "000000000000000000000000b2a0f1c8e3d4a5b6c7d8e9f0a1b2c3d4e5f60718"
            ],
            "data": data
        }]
    });
    let receipt = TransactionReceipt::from_json(json.to_string().as_bytes())?;

    let client = client(&MemoryHttpClient::new());
    let id = client.validation_request_id_from_receipt(&receipt)?;
    assert_eq!(id.to_hex(), request_id);

    let empty = TransactionReceipt::default();
    assert!(matches!(
        client.validation_request_id_from_receipt(&empty),
        Err(ClientError::EventNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn metadata_is_verified_against_commitment() -> anyhow::Result<()> {
    let http = MemoryHttpClient::new();
    http.respond(
        format!("{GATEWAY}/{CID}"),
        200,
        r#"{ "version": "1.0.0", "name": "MyAgent" }"#,
    );
    let client = client(&http);
    let cancel = CancellationToken::new();

    let metadata = client
        .fetch_agent_metadata(
            &format!("ipfs://{CID}"),
            Some("0x11953128ae3f273a3ba3ac1f429a858e92a27fdd61f56f8bdcd55801055ce657"),
            &cancel,
        )
        .await?;
    assert_eq!(metadata["name"], "MyAgent");

    // A zero commitment skips verification.
    let unverified = client
        .fetch_agent_metadata(CID, Some("0".repeat(64).as_str()), &cancel)
        .await?;
    assert_eq!(unverified, metadata);

    let err = client
        .fetch_agent_metadata(
            CID,
            Some("0xb48d38f93eaa084033fc5970bf96e559c33c4cdc07d889ab00b4d63f9590739d"),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Load(trc8004::fetch::LoadError::Verification { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn request_data_matches_its_commitment() -> anyhow::Result<()> {
    let data = json!({"task": "check", "input": 7});
    let commitment = commitment_for(Some(&data))?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("request.json");
    let pretty = serde_json::to_string_pretty(&data)?;
    std::fs::write(&path, &pretty)?;

    let http = MemoryHttpClient::new();
    let client = client(&http);
    let text = client
        .load_request_data(
            &format!("file://{}", path.display()),
            Some(commitment.to_hex().as_str()),
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(text, pretty);
    assert_eq!(http.request_count(), 0);

    let tampered = json!({"task": "check", "input": 8});
    std::fs::write(&path, tampered.to_string())?;
    let err = client
        .load_request_data(
            &format!("file://{}", path.display()),
            Some(commitment.to_hex().as_str()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Load(trc8004::fetch::LoadError::Verification { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn cancelled_load_reports_cancellation() {
    let client = client(&MemoryHttpClient::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .fetch_agent_metadata(CID, None, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn upload_returns_reference_and_commitment() -> anyhow::Result<()> {
    let http = MemoryHttpClient::new();
    http.respond(UPLOAD, 200, r#"{"cid": "QmNewAgent"}"#);
    let client = client(&http);

    let uploaded = client
        .upload_metadata(
            &json!({"name": "MyAgent", "version": "1.0.0"}),
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(uploaded.reference.to_string(), "ipfs://QmNewAgent");
    assert_eq!(
        uploaded.digest.to_hex(),
        "0x11953128ae3f273a3ba3ac1f429a858e92a27fdd61f56f8bdcd55801055ce657"
    );
    Ok(())
}

#[tokio::test]
async fn upload_without_endpoint_is_a_config_error() {
    let config = ClientConfig::default().with_contracts(ContractAddresses::default());
    let client = RegistryClient::with_client(MemoryHttpClient::new(), config);

    let err = client
        .upload_metadata(&json!({}), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UploadNotConfigured));
}
