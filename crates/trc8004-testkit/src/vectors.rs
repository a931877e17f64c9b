//! Golden test vectors for deterministic verification.
//!
//! These vectors pin canonical encoding and commitment hashing so that
//! every client, in any language, commits to the same digest for the same
//! document.

use trc8004_core::{canonicalize_json_bytes, hash_bytes, keccak256, KNOWN_EVENTS};

/// A golden canonicalization vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input JSON, in arbitrary key order and formatting.
    pub input: &'static str,
    /// Expected canonical form.
    pub canonical: &'static str,
    /// Expected Keccak-256 commitment of the canonical form.
    pub digest: &'static str,
}

/// Get all golden canonicalization vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "minimal metadata",
            input: r#"{"version": "1.0.0", "name": "MyAgent"}"#,
            canonical: r#"{"name":"MyAgent","version":"1.0.0"}"#,
            digest: "0x11953128ae3f273a3ba3ac1f429a858e92a27fdd61f56f8bdcd55801055ce657",
        },
        GoldenVector {
            name: "empty object",
            input: "{ }",
            canonical: "{}",
            digest: "0xb48d38f93eaa084033fc5970bf96e559c33c4cdc07d889ab00b4d63f9590739d",
        },
        GoldenVector {
            name: "empty array",
            input: "[\n]",
            canonical: "[]",
            digest: "0x518674ab2b227e5f11e9084f615d57663cde47bce1ba168b4c19c7ee22a73d70",
        },
        GoldenVector {
            name: "nested with null, bool and float",
            input: r#"{
                "version": "2.1.0",
                "skills": ["forecast", "alerts"],
                "rating": 4.5,
                "name": "Weather Agent",
                "endpoints": {"a2a": "https://agent.example/a2a"},
                "capacity": null,
                "active": true
            }"#,
            canonical: r#"{"active":true,"capacity":null,"endpoints":{"a2a":"https://agent.example/a2a"},"name":"Weather Agent","rating":4.5,"skills":["forecast","alerts"],"version":"2.1.0"}"#,
            digest: "0xed6dfad002b810a18e44b31894450d44b0e3db059acb5c099e24a85b09c5d52b",
        },
        GoldenVector {
            name: "unicode and escapes",
            input: r#"{"tags": ["天气", "☀"], "note": "line\nbreak \"q\"", "name": "Météo Agent"}"#,
            canonical: r#"{"name":"Météo Agent","note":"line\nbreak \"q\"","tags":["天气","☀"]}"#,
            digest: "0x8791168f61645736e4fdfcda13414ab1a56f67ec8c0f13bd40c714e7c836550d",
        },
        GoldenVector {
            name: "sorting inside arrays of objects",
            input: r#"{"c": "é", "b": [1, 2, {"z": null, "a": false}], "a": -0.5}"#,
            canonical: r#"{"a":-0.5,"b":[1,2,{"a":false,"z":null}],"c":"é"}"#,
            digest: "0x2f65cfc5541699307e753867bd7098133baa3c8a21f251c0bf531d78b79e374e",
        },
        GoldenVector {
            name: "registration file",
            input: r#"{
                "type": "https://eips.ethereum.org/EIPS/eip-8004#registration-v1",
                "name": "Weather Agent",
                "description": "Forecasts",
                "endpoints": [{
                    "name": "A2A",
                    "endpoint": "https://agent.example/.well-known/agent-card.json",
                    "version": "0.3.0"
                }],
                "supportedTrust": ["reputation", "validation"]
            }"#,
            canonical: r#"{"description":"Forecasts","endpoints":[{"endpoint":"https://agent.example/.well-known/agent-card.json","name":"A2A","version":"0.3.0"}],"name":"Weather Agent","supportedTrust":["reputation","validation"],"type":"https://eips.ethereum.org/EIPS/eip-8004#registration-v1"}"#,
            digest: "0x5e84e488534e4c661b1473b5bc4cc46b46f09eda3c445cbd8b69cc860170806f",
        },
    ]
}

/// Expected topic hashes for the known registry events.
pub const TOPIC_VECTORS: &[(&str, &str)] = &[
    (
        "AgentRegistered(uint256,address,string)",
        "0d063c6022bff16d09991a9f91882ffa112f5fb2529136f65eb4c77bbd047e43",
    ),
    (
        "AgentWalletSet(uint256,address)",
        "c1b62bacf2a2f4363c2190e00f2370f3b563001a0c56c73eae69619e58e9624c",
    ),
    (
        "ValidationRequested(bytes32,uint256,address,string,bytes32)",
        "1da27d3c3b0ba9add8fe60913e37f94eaf1e26b524c6663bb01df799fc19e4fd",
    ),
    (
        "ValidationCompleted(bytes32,string,bytes32)",
        "5c988a171c8d2c41c24afe88b964eeb871bc6d20afe6aa0cdde11dc80bff8f29",
    ),
    (
        "ValidationRejected(bytes32,string,bytes32)",
        "d75b42ad47932df07d86459596e7777e0a385d02710b7667d18cd16d5d27c12c",
    ),
    (
        "ValidationCancelled(bytes32)",
        "a82dbc6d31f563bf32e197519500b35a8eafe3aafb4cbbb284fc21bd2e11c6bf",
    ),
    (
        "FeedbackGiven(uint256,address,uint256,uint8)",
        "055f1190b365cb98a91221b2467433b8c2c5baea77e7c3c18f3a3e2b08bdcf0e",
    ),
    (
        "FeedbackRevoked(uint256,uint256)",
        "f346dae79d931d158de7fb0877e8a04ad6e97a4fcdd2508d4756295aa9fe7f77",
    ),
    (
        "ResponseAppended(uint256,uint256,string)",
        "aa1cb82f136ff8ff3d13096f98a476b93518efdac2f6944ee75d3af0815bdb35",
    ),
];

/// Check one vector. Returns a description of the first mismatch.
pub fn check_vector(vector: &GoldenVector) -> Result<(), String> {
    let canonical = canonicalize_json_bytes(vector.input.as_bytes()).map_err(|e| e.to_string())?;
    if canonical != vector.canonical.as_bytes() {
        return Err(format!(
            "canonical form differs: got {}",
            String::from_utf8_lossy(&canonical)
        ));
    }

    let digest = hash_bytes(&canonical);
    if !digest.matches_hex(vector.digest) {
        return Err(format!("digest differs: got {digest}"));
    }
    Ok(())
}

/// Verify all vectors.
///
/// Returns `(name, passed, detail)` for each vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match check_vector(v) {
            Ok(()) => (v.name.to_string(), true, String::new()),
            Err(detail) => (v.name.to_string(), false, detail),
        })
        .chain(TOPIC_VECTORS.iter().map(|(signature, expected)| {
            let actual = hex::encode(keccak256(signature.as_bytes()).as_bytes());
            let known = KNOWN_EVENTS.iter().any(|e| e.signature() == *signature);
            let passed = actual == *expected && known;
            (signature.to_string(), passed, actual)
        }))
        .collect()
}
