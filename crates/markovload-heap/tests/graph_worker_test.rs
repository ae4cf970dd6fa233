use std::collections::HashMap;

use markovload_core::config::GraphPreset;
use markovload_core::graph::GraphOperation;
use markovload_core::trace::SkipReason;
use markovload_core::{GraphConfig, GraphWorker, MAX_EDGES, ManagedHeap, StepOutcome};
use markovload_heap::{GcHeap, GcRef};

fn config(ops: u64) -> GraphConfig {
    GraphConfig::with_ops(ops).seed(0x5EED)
}

#[test]
fn recreated_vertex_starts_without_edges() {
    let mut worker = GraphWorker::new(config(0), GcHeap::new()).unwrap();
    let slot = (0..worker.slot_count())
        .find(|&s| worker.vertex_at(s).is_some_and(|v| v.edge_count() > 0))
        .expect("setup builds at least one vertex with edges");

    assert_eq!(
        worker.apply_at(GraphOperation::RemoveVertex, slot),
        StepOutcome::Applied
    );
    assert!(worker.vertex_at(slot).is_none());
    assert_eq!(
        worker.apply_at(GraphOperation::CreateVertex, slot),
        StepOutcome::Applied
    );
    assert_eq!(worker.vertex_at(slot).unwrap().edge_count(), 0);
}

#[test]
fn every_vertex_created_by_the_chain_starts_empty() {
    let mut worker = GraphWorker::new(
        config(30_000).preset(GraphPreset::GcHeavy).record_trace(true),
        GcHeap::new(),
    )
    .unwrap();
    let mut checked = 0;
    for _ in 0..30_000 {
        let before = worker.journal().map_or(0, |j| j.len());
        if worker.step() != Some(GraphOperation::CreateVertex) {
            continue;
        }
        let event = &worker.journal().unwrap().events()[before];
        if event.outcome == StepOutcome::Applied {
            let slot = event.slot.unwrap();
            assert_eq!(worker.vertex_at(slot).unwrap().edge_count(), 0);
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[test]
fn teardown_reclaims_cycles() {
    let mut worker = GraphWorker::new(config(20_000), GcHeap::new()).unwrap();
    let report = worker.run();
    assert_eq!(report.steps, 20_000);
    assert!(report.setup_vertices > 0);
    assert!(report.setup_edges > 0);
    assert_eq!(report.live_after_teardown, 0);
    assert_eq!(worker.heap().live_objects(), 0);
    assert_eq!(worker.rooted_slots(), 0);
    assert_eq!(worker.heap().stats().stale_accesses, 0);
}

#[test]
fn same_seed_same_counters() {
    let run = || {
        let mut worker =
            GraphWorker::new(config(25_000).record_trace(true), GcHeap::new()).unwrap();
        let report = worker.run();
        let digest = worker.journal().unwrap().digest();
        (report, digest)
    };
    let (ra, da) = run();
    let (rb, db) = run();
    assert_eq!(ra, rb);
    assert_eq!(da, db);
}

#[test]
fn setup_edges_stay_inside_their_cluster() {
    let worker = GraphWorker::new(config(0), GcHeap::new()).unwrap();
    let per_cluster = worker.slot_count() / 9;
    let slot_of: HashMap<GcRef, usize> = (0..worker.slot_count())
        .filter_map(|s| worker.root_at(s).map(|r| (r, s)))
        .collect();
    let mut edges = 0;
    for (&r, &slot) in &slot_of {
        let vertex = worker.heap().vertex(r).unwrap();
        for target in vertex.edges().iter().flatten() {
            let target_slot = slot_of[target];
            assert_eq!(slot / per_cluster, target_slot / per_cluster);
            edges += 1;
        }
    }
    assert_eq!(edges as u64, worker.report().setup_edges);
    // The remainder slots past the last full cluster stay empty.
    for s in per_cluster * 9..worker.slot_count() {
        assert!(worker.root_at(s).is_none());
    }
}

#[test]
fn density_extremes() {
    let empty = GraphWorker::new(config(0).densities(1.0, 0.0), GcHeap::new()).unwrap();
    assert_eq!(empty.rooted_slots(), 0);
    assert_eq!(empty.heap().live_objects(), 0);

    let full = GraphWorker::new(config(0).densities(0.0, 1.0), GcHeap::new()).unwrap();
    assert_eq!(full.rooted_slots(), (full.slot_count() / 9) * 9);
    assert_eq!(full.report().setup_edges, 0);
}

#[test]
fn edge_ops_on_an_empty_graph_are_skipped() {
    let mut worker = GraphWorker::new(config(0).densities(1.0, 0.0), GcHeap::new()).unwrap();
    for op in [
        GraphOperation::CreateEdge,
        GraphOperation::RemoveEdge,
        GraphOperation::WriteData,
        GraphOperation::ReadData,
    ] {
        assert_eq!(
            worker.apply(op),
            StepOutcome::Skipped(SkipReason::NoLiveVertex),
            "{}",
            op.as_str()
        );
    }
    assert_eq!(
        worker.apply(GraphOperation::RemoveVertex),
        StepOutcome::Skipped(SkipReason::EmptySlot)
    );
}

#[test]
fn lone_vertex_is_found_by_the_forward_scan() {
    let mut worker = GraphWorker::new(config(0).densities(1.0, 0.0), GcHeap::new()).unwrap();
    assert_eq!(
        worker.apply_at(GraphOperation::CreateVertex, 700),
        StepOutcome::Applied
    );
    // Whatever slot is drawn, the scan wraps around to slot 700.
    assert_eq!(worker.apply(GraphOperation::CreateEdge), StepOutcome::Applied);
    let v = worker.vertex_at(700).unwrap();
    assert_eq!(v.edge_count(), 1);
    assert_eq!(v.edges()[0], worker.root_at(700));
    assert_eq!(worker.apply(GraphOperation::WriteData), StepOutcome::Applied);
    assert_ne!(
        worker.vertex_at(700).unwrap().payload(),
        markovload_core::boundary::VERTEX_PAYLOAD_INIT
    );
    // The scan never copies the root into the drawn slot.
    assert_eq!(worker.rooted_slots(), 1);
}

#[test]
fn full_vertex_ignores_new_edges() {
    let mut worker = GraphWorker::new(config(0).densities(1.0, 0.0), GcHeap::new()).unwrap();
    worker.apply_at(GraphOperation::CreateVertex, 1);
    worker.apply_at(GraphOperation::CreateVertex, 2);
    for _ in 0..MAX_EDGES {
        assert_eq!(worker.link_slots(1, 2), StepOutcome::Applied);
    }
    assert_eq!(
        worker.link_slots(1, 2),
        StepOutcome::Skipped(SkipReason::NoVacantEdge)
    );
    assert_eq!(worker.heap().ref_counts(worker.root_at(2).unwrap()), Some((1, 32)));
}

#[test]
fn removed_root_survives_while_referenced() {
    let mut worker = GraphWorker::new(config(0).densities(1.0, 0.0), GcHeap::new()).unwrap();
    worker.apply_at(GraphOperation::CreateVertex, 10);
    worker.apply_at(GraphOperation::CreateVertex, 11);
    worker.link_slots(10, 11);
    worker.link_slots(11, 10);
    worker.apply_at(GraphOperation::RemoveVertex, 10);
    worker.apply_at(GraphOperation::RemoveVertex, 11);
    assert_eq!(worker.heap().live_objects(), 2);
    assert_eq!(worker.apply(GraphOperation::CollectGarbage), StepOutcome::Applied);
    assert_eq!(worker.heap().live_objects(), 0);
    assert_eq!(worker.report().gc_invocations, 1);
    assert_eq!(worker.report().collected, 2);
}

#[test]
fn gc_invocations_match_journal() {
    let mut worker = GraphWorker::new(
        config(50_000).preset(GraphPreset::GcHeavy).record_trace(true),
        GcHeap::new(),
    )
    .unwrap();
    let report = worker.run();
    let journal = worker.journal().unwrap();
    let collects = journal
        .events()
        .iter()
        .filter(|e| e.operation == "collect_garbage")
        .count() as u64;
    assert!(collects > 0);
    assert_eq!(report.gc_invocations, collects);
    assert_eq!(journal.len() as u64, report.steps);
    assert_eq!(worker.heap().stats().collections, collects + 1);
}

#[test]
fn heap_lifecycle_log_sees_collections() {
    let mut worker = GraphWorker::new(
        config(10_000).preset(GraphPreset::GcHeavy),
        GcHeap::with_lifecycle_log(1 << 16),
    )
    .unwrap();
    worker.run();
    let logs: Vec<_> = worker.heap().lifecycle_logs().collect();
    assert_eq!(logs.first().map(|r| r.event), Some("initialize"));
    assert_eq!(logs.last().map(|r| r.event), Some("finalize"));
    assert!(logs.iter().any(|r| r.event == "collect"));
}
