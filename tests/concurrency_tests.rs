//! One estimator shared by many threads, as a parallel plan search would.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread;

use parcost::{
    CostEstimator, DefaultLeafModel, ExecType, Measure, NodeKind, ParamType, PlanNode, PlanTree,
};

fn candidate(k: u32) -> PlanTree {
    let body = PlanNode::new(NodeKind::Generic)
        .with_child(PlanNode::new(NodeKind::Generic))
        .with_child(
            PlanNode::new(NodeKind::If)
                .with_child(PlanNode::new(NodeKind::Generic))
                .with_child(PlanNode::new(NodeKind::Generic)),
        );
    let root = PlanNode::new(NodeKind::Parfor)
        .with_k(NonZeroU32::new(k).unwrap())
        .with_param(ParamType::NumIterations, "64")
        .with_child(body);
    PlanTree::new(root)
}

#[test]
fn test_shared_estimator_across_threads() {
    let est = Arc::new(CostEstimator::new(DefaultLeafModel::default()));
    let tree = Arc::new(candidate(4));
    let expected = est.estimate_tree(Measure::ExecTime, &tree, None).unwrap();
    // 64 * (5 + 5) / 4
    assert_eq!(expected, 160.0);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let est = Arc::clone(&est);
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                (0..100)
                    .map(|_| est.estimate_tree(Measure::ExecTime, &tree, None).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for h in handles {
        for v in h.join().expect("worker panicked") {
            assert_eq!(v, expected);
        }
    }
}

#[test]
fn test_parallel_search_over_degrees() {
    let est = CostEstimator::new(DefaultLeafModel::default());
    let results: Vec<(u32, f64, f64)> = thread::scope(|s| {
        let handles: Vec<_> = [1u32, 2, 4, 8]
            .into_iter()
            .map(|k| {
                let est = &est;
                s.spawn(move || {
                    let tree = candidate(k);
                    let time = est.estimate_tree(Measure::ExecTime, &tree, None).unwrap();
                    let mem = est
                        .estimate_tree(Measure::MemoryUsage, &tree, Some(ExecType::InProcess))
                        .unwrap();
                    (k, time, mem)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (k, time, mem) in results {
        assert_eq!(time, 640.0 / f64::from(k));
        assert_eq!(mem, 1024.0 * f64::from(k));
    }
}
