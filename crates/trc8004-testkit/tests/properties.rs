//! Property tests across canonical hashing, retry policy, event decoding
//! and gateway fallback.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use trc8004_core::{
    canonical_bytes, canonicalize_json_bytes, compute_metadata_hash, hash_bytes, Address,
    BackoffPolicy, Decision, EventDecoder, FailureKind, GiveUpReason,
};
use trc8004_fetch::CancellationToken;
use trc8004_testkit::fixtures::{agent_registered, receipt, unknown_log, GatewayFixture};
use trc8004_testkit::generators::{
    address, backoff_policy, json_document, json_value, permanent_failure, render_shuffled,
    transient_failure,
};

proptest! {
    #[test]
    fn canonical_form_ignores_key_order_and_whitespace(value in json_value(), seed: u64) {
        let shuffled = canonicalize_json_bytes(render_shuffled(&value, seed).as_bytes()).unwrap();
        let direct = canonical_bytes(&value).unwrap();
        prop_assert_eq!(shuffled, direct);
    }

    #[test]
    fn canonical_form_is_a_fixed_point(value in json_value()) {
        let once = canonical_bytes(&value).unwrap();
        let twice = canonicalize_json_bytes(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn metadata_hash_is_hash_of_canonical_bytes(doc in json_document(), seed: u64) {
        let expected = hash_bytes(&canonical_bytes(&doc).unwrap());
        prop_assert_eq!(compute_metadata_hash(&doc).unwrap(), expected);

        let reparsed: serde_json::Value =
            serde_json::from_str(&render_shuffled(&doc, seed)).unwrap();
        prop_assert_eq!(compute_metadata_hash(&reparsed).unwrap(), expected);
    }

    #[test]
    fn backoff_terminates_within_budget(
        policy in backoff_policy(),
        failure in transient_failure(),
        seed: u64,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = policy.start();
        let mut decisions = 0u32;
        let mut previous = None;

        loop {
            decisions += 1;
            prop_assert!(decisions <= policy.attempt_budget());

            match state.decide_with_rng(failure, &mut rng) {
                Decision::Retry { wait, next } => {
                    let ceiling = policy.max_delay().mul_f64(1.0 + policy.jitter.clamp(0.0, 1.0));
                    prop_assert!(wait <= ceiling);

                    let base = policy.delay_for(state.attempt());
                    if let Some(previous) = previous {
                        prop_assert!(base >= previous);
                    }
                    previous = Some(base);
                    state = next;
                }
                Decision::GiveUp(reason) => {
                    prop_assert_eq!(
                        reason,
                        GiveUpReason::Exhausted { attempts: policy.attempt_budget(), last: failure }
                    );
                    break;
                }
            }
        }
        prop_assert_eq!(decisions, policy.attempt_budget());
    }

    #[test]
    fn permanent_failures_are_never_retried(policy in backoff_policy(), failure in permanent_failure()) {
        prop_assert_eq!(
            policy.start().decide(failure),
            Decision::GiveUp(GiveUpReason::Permanent(failure))
        );
    }

    #[test]
    fn decoder_yields_exactly_the_registrations(
        contract in address(),
        other in address(),
        ids in prop::collection::vec(any::<u128>(), 0..5),
        noise in prop::collection::vec(any::<bool>(), 0..8),
    ) {
        prop_assume!(contract != other);
        let owner = Address::from_account([0x33; 20]);

        let mut logs = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            if noise.get(i).copied().unwrap_or(false) {
                logs.push(unknown_log(contract));
            }
            logs.push(agent_registered(other, id.wrapping_add(1), owner, "ipfs://QmOther"));
            logs.push(agent_registered(contract, *id, owner, &format!("ipfs://Qm{i}")));
        }
        let receipt = receipt(logs);
        let decoder = EventDecoder::standard();

        let decoded: Vec<u128> = decoder
            .decode(&receipt, Some(&contract))
            .map(|event| event.unwrap().uint("agentId").unwrap())
            .collect();
        prop_assert_eq!(decoded, ids.clone());

        let everything = decoder.decode(&receipt, None).count();
        prop_assert_eq!(everything, ids.len() * 2);
    }

    #[test]
    fn first_healthy_gateway_serves(
        healthy in 0usize..4,
        failures in prop::collection::vec(
            prop_oneof![transient_failure(), permanent_failure()],
            4,
        ),
    ) {
        let fixture = GatewayFixture::new(4);
        for (i, failure) in failures.iter().enumerate().take(healthy) {
            fixture.fail(i, *failure);
        }
        fixture.serve(healthy, r#"{"name":"MyAgent"}"#);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let fetched = runtime
            .block_on(
                fixture
                    .fetcher(BackoffPolicy::immediate(2))
                    .fetch(&fixture.reference(), &CancellationToken::new()),
            )
            .unwrap();

        prop_assert_eq!(&fetched.backend, &fixture.gateways[healthy]);
        prop_assert_eq!(&fetched.bytes[..], br#"{"name":"MyAgent"}"#);

        for (i, failure) in failures.iter().enumerate() {
            let expected = match i.cmp(&healthy) {
                std::cmp::Ordering::Less if failure.is_transient() => 2,
                std::cmp::Ordering::Less | std::cmp::Ordering::Equal => 1,
                std::cmp::Ordering::Greater => 0,
            };
            prop_assert_eq!(fixture.client.requests_to(&fixture.url(i)), expected);
        }
    }
}

#[test]
fn failure_kinds_split_into_two_classes() {
    assert!(FailureKind::from_status(503).unwrap().is_transient());
    assert!(FailureKind::from_status(404).unwrap().is_permanent());
    assert_eq!(FailureKind::from_status(200), None);
}
