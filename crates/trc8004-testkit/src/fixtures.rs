//! Test fixtures and helpers.
//!
//! ABI encoding for building receipt logs, plus a scripted multi-gateway
//! setup for fetch and load scenarios.

use bytes::Bytes;
use trc8004_core::{
    Address, BackoffPolicy, ContentReference, DecodedValue, EventSignature, FailureKind,
    LogEntry, ParamKind, TransactionReceipt, Word, KNOWN_EVENTS,
};
use trc8004::{ClientConfig, ContractAddresses, RegistryClient};
use trc8004_fetch::{FetchConfig, GatewayFetcher, MemoryHttpClient, VerifiedLoader};

/// A well-formed content identifier used across fixtures.
pub const TEST_CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

/// Look up a known event by name.
pub fn known_event(name: &str) -> EventSignature {
    KNOWN_EVENTS
        .iter()
        .copied()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("unknown event {name}"))
}

/// Encode a dynamic string as an ABI tail: length word, then padded bytes.
pub fn encode_string(s: &str) -> Vec<u8> {
    let mut out = Word::from_u128(s.len() as u128).0.to_vec();
    out.extend_from_slice(s.as_bytes());
    let pad = (32 - s.len() % 32) % 32;
    out.resize(out.len() + pad, 0);
    out
}

fn encode_static(value: &DecodedValue) -> Word {
    match value {
        DecodedValue::Uint(v) => Word::from_u128(*v),
        DecodedValue::Address(a) => a.to_word(),
        DecodedValue::Hash(h) => *h,
        DecodedValue::String(s) => trc8004_core::keccak256(s.as_bytes()).to_word(),
    }
}

/// Build a log entry emitting `event` with `values` in declaration order.
///
/// Panics if the number of values does not match the signature.
pub fn encode_log(contract: Address, event: &EventSignature, values: &[DecodedValue]) -> LogEntry {
    assert_eq!(
        event.params.len(),
        values.len(),
        "{} takes {} values",
        event.name,
        event.params.len()
    );

    let mut topics = vec![event.topic()];
    let data_params: Vec<_> = event
        .params
        .iter()
        .zip(values)
        .filter(|(param, value)| {
            if param.indexed {
                topics.push(encode_static(value));
            }
            !param.indexed
        })
        .collect();

    let head_len = data_params.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (param, value) in data_params {
        match (param.kind, value) {
            (ParamKind::String, DecodedValue::String(s)) => {
                head.extend_from_slice(&Word::from_u128((head_len + tail.len()) as u128).0);
                tail.extend(encode_string(s));
            }
            _ => head.extend_from_slice(&encode_static(value).0),
        }
    }

    head.extend(tail);
    LogEntry {
        address: contract,
        topics,
        data: Bytes::from(head),
    }
}

/// A log entry whose signature no decoder knows.
pub fn unknown_log(contract: Address) -> LogEntry {
    LogEntry {
        address: contract,
        topics: vec![
            trc8004_core::keccak256(b"Transfer(address,address,uint256)").to_word(),
            Address::from_account([0x01; 20]).to_word(),
            Address::from_account([0x02; 20]).to_word(),
        ],
        data: Bytes::copy_from_slice(&Word::from_u128(1_000).0),
    }
}

/// `AgentRegistered(agentId, owner, tokenURI)`.
pub fn agent_registered(contract: Address, agent_id: u128, owner: Address, uri: &str) -> LogEntry {
    encode_log(
        contract,
        &known_event("AgentRegistered"),
        &[
            DecodedValue::Uint(agent_id),
            DecodedValue::Address(owner),
            DecodedValue::String(uri.to_string()),
        ],
    )
}

/// `ValidationRequested(requestId, agentId, validator, requestURI, requestDataHash)`.
pub fn validation_requested(
    contract: Address,
    request_id: Word,
    agent_id: u128,
    validator: Address,
    uri: &str,
    data_hash: Word,
) -> LogEntry {
    encode_log(
        contract,
        &known_event("ValidationRequested"),
        &[
            DecodedValue::Hash(request_id),
            DecodedValue::Uint(agent_id),
            DecodedValue::Address(validator),
            DecodedValue::String(uri.to_string()),
            DecodedValue::Hash(data_hash),
        ],
    )
}

/// A receipt with the given logs.
pub fn receipt(logs: Vec<LogEntry>) -> TransactionReceipt {
    TransactionReceipt::from_logs(logs)
}

/// A scripted set of gateways serving one content identifier.
pub struct GatewayFixture {
    pub client: MemoryHttpClient,
    pub gateways: Vec<String>,
    pub cid: String,
}

impl GatewayFixture {
    /// Create `count` gateways named `https://gw<i>.test/ipfs`.
    pub fn new(count: usize) -> Self {
        Self {
            client: MemoryHttpClient::new(),
            gateways: (0..count)
                .map(|i| format!("https://gw{i}.test/ipfs"))
                .collect(),
            cid: TEST_CID.to_string(),
        }
    }

    /// The reference every gateway serves.
    pub fn reference(&self) -> ContentReference {
        ContentReference::Content {
            cid: self.cid.clone(),
            path: None,
        }
    }

    /// The URL requested from gateway `index`.
    pub fn url(&self, index: usize) -> String {
        format!("{}/{}", self.gateways[index], self.cid)
    }

    /// Script gateway `index` to answer with `body`.
    pub fn serve(&self, index: usize, body: impl Into<Bytes>) -> &Self {
        self.client.respond(self.url(index), 200, body);
        self
    }

    /// Script gateway `index` to fail with `kind`.
    pub fn fail(&self, index: usize, kind: FailureKind) -> &Self {
        self.client.fail(self.url(index), kind);
        self
    }

    /// Fetch configuration over these gateways with `backoff`.
    pub fn config(&self, backoff: BackoffPolicy) -> FetchConfig {
        FetchConfig::default()
            .with_gateways(self.gateways.clone())
            .with_backoff(backoff)
    }

    pub fn fetcher(&self, backoff: BackoffPolicy) -> GatewayFetcher<MemoryHttpClient> {
        GatewayFetcher::with_client(self.client.clone(), self.config(backoff))
    }

    pub fn loader(&self, backoff: BackoffPolicy) -> VerifiedLoader<MemoryHttpClient> {
        VerifiedLoader::from_fetcher(self.fetcher(backoff))
    }

    /// A registry client over these gateways.
    pub fn client(
        &self,
        backoff: BackoffPolicy,
        contracts: ContractAddresses,
    ) -> RegistryClient<MemoryHttpClient> {
        let config = ClientConfig::default()
            .with_contracts(contracts)
            .with_fetch(self.config(backoff));
        RegistryClient::with_client(self.client.clone(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trc8004_core::EventDecoder;

    #[test]
    fn test_encoded_log_decodes() {
        let contract = Address::from_account([0x11; 20]);
        let owner = Address::from_account([0x22; 20]);
        let log = agent_registered(contract, 7, owner, "ipfs://QmA");

        let receipt = receipt(vec![log]);
        let decoder = EventDecoder::standard();
        let event = decoder.decode(&receipt, None).next().unwrap().unwrap();

        assert_eq!(event.uint("agentId"), Some(7));
        assert_eq!(event.address("owner"), Some(&owner));
        assert_eq!(event.string("tokenURI"), Some("ipfs://QmA"));
    }

    #[test]
    fn test_encode_string_padding() {
        assert_eq!(encode_string("").len(), 32);
        assert_eq!(encode_string("a").len(), 64);
        assert_eq!(encode_string(&"b".repeat(32)).len(), 64);
        assert_eq!(encode_string(&"c".repeat(33)).len(), 96);
    }

    #[test]
    fn test_gateway_fixture_urls() {
        let fixture = GatewayFixture::new(2);
        assert_eq!(fixture.url(1), format!("https://gw1.test/ipfs/{TEST_CID}"));
        assert_eq!(fixture.config(BackoffPolicy::no_retry()).gateways.len(), 2);
    }
}
