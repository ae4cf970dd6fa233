use markovload_core::{
    GraphConfig, LinearPreset, MarkovChain, MarkovState, Operation, RngStream, StreamId,
    TransitionMatrix, VecAllocator, Worker, WorkerConfig,
};
use markovload_core::config::GraphPreset;
use markovload_core::graph::GraphOperation;

fn never_unmatched<S: MarkovState<N>, const N: usize>(
    initial: S,
    rows: [[f64; N]; N],
    seed: u64,
) {
    let matrix = TransitionMatrix::new(rows, S::WORKLOAD).unwrap();
    let rng = RngStream::derive(seed, StreamId::Transitions);
    let mut chain = MarkovChain::new(initial, matrix, rng);
    for draw in 0..1_000_000u32 {
        assert!(chain.advance().is_some(), "unmatched draw {draw}");
    }
}

#[test]
fn preset_matrices_never_leave_a_draw_unmatched() {
    never_unmatched(Operation::AllocSingle, LinearPreset::Ver1.matrix(), 1);
    never_unmatched(Operation::AllocSingle, LinearPreset::Ver2.matrix(), 2);
    never_unmatched(GraphOperation::CreateVertex, GraphPreset::NormWorkload.matrix(), 3);
    never_unmatched(GraphOperation::CreateVertex, GraphPreset::GcHeavy.matrix(), 4);
}

#[test]
fn linear_counters_repeat_for_every_preset() {
    for preset in [LinearPreset::Ver1, LinearPreset::Ver2] {
        let config = WorkerConfig::with_ops(20_000)
            .preset(preset)
            .memory_budget(8 << 20);
        let first = Worker::new(config.clone(), VecAllocator::new())
            .unwrap()
            .run();
        let second = Worker::new(config, VecAllocator::new()).unwrap().run();
        assert_eq!(first, second, "{} diverged", preset.as_str());
    }
}

#[test]
fn small_slot_tables_still_cover_every_slot() {
    // Prime and composite sizes both get a full-period alloc cursor.
    for slots in [1usize, 2, 6, 30, 97, 210] {
        let mut alloc = VecAllocator::new();
        {
            let mut worker =
                Worker::new(WorkerConfig::with_ops(5_000).slots(slots), &mut alloc).unwrap();
            let report = worker.run();
            assert!(report.peak_live <= slots);
            assert_eq!(report.steps, 5_000);
        }
        assert_eq!(alloc.live_count(), 0, "slots={slots}");
    }
}

#[test]
fn graph_config_default_matches_documented_shape() {
    let c = GraphConfig::default();
    assert_eq!(c.slots, 1024);
    assert_eq!(c.clusters, 9);
    assert_eq!(c.total_ops, 131_072);
    assert_eq!(c.matrix, GraphPreset::NormWorkload.matrix());
}
