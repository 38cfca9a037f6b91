//! # Policy Engine Dispatch Benchmarks
//!
//! | Area | Operation | Scales with |
//! |------|-----------|-------------|
//! | pe-01 Block Tree | compile + resolve routes | blocks in the policy |
//! | shared-bus Dispatcher | trigger through a relay chain | chain length |
//! | policy-runtime | `set_data` request → send → mint | - |

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pe_01_block_tree::{BlockTree, PolicyConfig};
use policy_runtime::{builtin, INTERFACE_CONTAINER_BLOCK};
use policy_tests::fixtures::{alice, report, Harness, IssuancePolicy, SUBMIT_TAG};
use serde_json::json;
use shared_bus::{BlockEventHandler, Dispatcher, Handled, ObserverBus, RoutingTable};
use shared_types::{
    Actor, BlockActionError, BlockDescriptor, BlockId, EventRoute, EventState, EventType,
    PolicyEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("benchmark runtime")
}

// ============================================================================
// BLOCK TREE
// ============================================================================

fn send_chain_policy(blocks: usize) -> PolicyConfig {
    let children: Vec<_> = (0..blocks)
        .map(|i| json!({ "id": format!("send-{i}"), "blockType": "sendToLedgerBlock", "tag": format!("send_{i}") }))
        .collect();
    PolicyConfig::from_value(json!({
        "id": "bench",
        "root": { "id": "root", "blockType": INTERFACE_CONTAINER_BLOCK, "tag": "root", "children": children }
    }))
    .expect("bench policy")
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("pe-01-block-tree");
    let registry = builtin();

    for blocks in [10, 100, 1000] {
        let policy = send_chain_policy(blocks);
        group.throughput(Throughput::Elements(blocks as u64));
        group.bench_with_input(BenchmarkId::new("compile_and_route", blocks), &policy, |b, policy| {
            b.iter(|| {
                let tree = BlockTree::compile(black_box(policy), &registry).expect("compiles");
                black_box(tree.resolve_routes().routes.len())
            })
        });
    }
    group.finish();
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Passes every RunEvent straight on.
struct Relay {
    id: BlockId,
}

#[async_trait]
impl BlockEventHandler for Relay {
    async fn on_event(
        &self,
        event: PolicyEvent,
        dispatcher: &Dispatcher,
    ) -> Result<Handled, BlockActionError> {
        Ok(dispatcher
            .trigger(&self.id, EventType::RunEvent, &event.actor, event.payload)
            .await
            .into())
    }
}

fn relay_chain(length: usize) -> (Dispatcher, BlockId) {
    let descriptor = Arc::new(
        BlockDescriptor::new("relayBlock")
            .event()
            .inputs([EventType::RunEvent])
            .outputs([EventType::RunEvent]),
    );
    let ids: Vec<BlockId> = (0..=length).map(|i| BlockId::new(format!("relay-{i}"))).collect();

    let mut table = RoutingTable::new();
    for id in &ids {
        table.add_block(id.clone(), descriptor.clone());
    }
    for pair in ids.windows(2) {
        table.add_route(EventRoute {
            source: pair[0].clone(),
            output: EventType::RunEvent,
            target: pair[1].clone(),
            input: EventType::RunEvent,
        });
    }

    let dispatcher = Dispatcher::new(table, Arc::new(ObserverBus::new()));
    for id in ids.iter().skip(1) {
        dispatcher.register_handler(id.clone(), Arc::new(Relay { id: id.clone() }));
    }
    (dispatcher, ids[0].clone())
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-bus-dispatcher");
    let rt = runtime();
    let actor = Actor::new("bench").with_did("did:example:bench");

    for length in [1, 10, 50] {
        let (dispatcher, source) = relay_chain(length);
        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::new("relay_chain", length), &length, |b, _| {
            b.iter(|| {
                let report = rt.block_on(dispatcher.trigger(
                    &source,
                    EventType::RunEvent,
                    &actor,
                    EventState::empty(),
                ));
                black_box(report.completed())
            })
        });
    }
    group.finish();
}

// ============================================================================
// ENGINE
// ============================================================================

fn bench_issuance_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy-runtime");
    group.measurement_time(Duration::from_secs(10));
    let rt = runtime();

    let harness = Harness::new();
    let policy = rt
        .block_on(harness.engine.publish(IssuancePolicy::default().build()))
        .expect("publishes");
    let actor = alice();

    group.bench_function("set_data_request_send_mint", |b| {
        b.iter(|| {
            let outcome = rt
                .block_on(policy.set_data(SUBMIT_TAG, &actor, report(json!(5))))
                .expect("accepted");
            black_box(outcome.is_accepted())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_compile, bench_dispatch, bench_issuance_flow);
criterion_main!(benches);
