//! Proptest generators for property-based testing.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Number, Value};

use trc8004_core::{Address, BackoffPolicy, DigestCommitment, FailureKind, Word};

/// Generate a random Word.
pub fn word() -> impl Strategy<Value = Word> {
    any::<[u8; 32]>().prop_map(Word::from_bytes)
}

/// Generate a random DigestCommitment.
pub fn commitment() -> impl Strategy<Value = DigestCommitment> {
    any::<[u8; 32]>().prop_map(DigestCommitment::from_bytes)
}

/// Generate a random ledger address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_account)
}

/// Generate an agent id.
pub fn agent_id() -> impl Strategy<Value = u128> {
    any::<u128>()
}

/// Generate a retry policy, including degenerate ones.
pub fn backoff_policy() -> impl Strategy<Value = BackoffPolicy> {
    (0u32..12, 0u64..5_000, 0.0f64..4.0, 0u64..60_000, 0.0f64..1.0).prop_map(
        |(max_attempts, base_delay_ms, multiplier, max_delay_ms, jitter)| BackoffPolicy {
            max_attempts,
            base_delay_ms,
            multiplier,
            max_delay_ms,
            jitter,
        },
    )
}

/// Generate a transient failure.
pub fn transient_failure() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Timeout),
        Just(FailureKind::ConnectionRefused),
        Just(FailureKind::Unreachable),
        Just(FailureKind::Truncated),
        Just(FailureKind::RateLimited),
        (500u16..600).prop_map(FailureKind::ServerError),
    ]
}

/// Generate a permanent failure.
pub fn permanent_failure() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::NotFound),
        Just(FailureKind::MalformedReference),
        Just(FailureKind::VerificationFailed),
        Just(FailureKind::Unauthorized(401)),
        Just(FailureKind::Unauthorized(403)),
        (400u16..500)
            .prop_filter("classified elsewhere", |s| !matches!(s, 401 | 403 | 404 | 408 | 410 | 429))
            .prop_map(FailureKind::ClientError),
    ]
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        // Quarter steps are exact in binary and survive a text round trip.
        (-4_000i32..4_000).prop_filter_map("finite", |n| {
            Number::from_f64(f64::from(n) / 4.0 + 0.25).map(Value::Number)
        }),
        "\\PC{0,12}".prop_map(Value::String),
    ]
}

/// Generate an arbitrary JSON document.
pub fn json_value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("\\PC{0,8}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate a JSON object, the shape every metadata document has.
pub fn json_document() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-zA-Z_]{1,10}", json_value(), 0..8)
        .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>()))
}

/// Render `value` as JSON text with shuffled object keys and random
/// whitespace. Parsing the result yields a value equal to `value`.
pub fn render_shuffled(value: &Value, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::new();
    render_into(&mut out, value, &mut rng);
    out
}

fn render_into(out: &mut String, value: &Value, rng: &mut StdRng) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                whitespace(out, rng);
                render_into(out, item, rng);
            }
            whitespace(out, rng);
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.shuffle(rng);

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                whitespace(out, rng);
                out.push_str(&Value::String(key.clone()).to_string());
                whitespace(out, rng);
                out.push(':');
                whitespace(out, rng);
                render_into(out, item, rng);
            }
            whitespace(out, rng);
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn whitespace(out: &mut String, rng: &mut StdRng) {
    const BLANKS: [char; 4] = [' ', '\n', '\t', '\r'];
    for _ in 0..rng.gen_range(0..3) {
        out.push(BLANKS[rng.gen_range(0..BLANKS.len())]);
    }
}
