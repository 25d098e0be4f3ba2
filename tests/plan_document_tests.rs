//! YAML plan documents: parsing, verification, leaf tables, explain, hashing.

use parcost::{
    explain_estimates, hash_plan, parse_plan_document, CostEstimator, Error, EstimatorConfig,
    ExecType, Fallback, Measure, NodeKind, ParamType, ParsedPlan, PlanNode, TableLeafModel,
};

const PARFOR_PLAN: &str = r#"
ck: 16
cm: 8192
root:
  kind: parfor
  k: 4
  exec_type: in_process
  params: { num_iterations: "20" }
  children:
    - { id: 7, kind: generic }
    - { id: 8, kind: generic }
leaf_costs:
  - { node: 7, measure: exec_time, value: 2.0 }
  - { node: 8, measure: exec_time, value: 6.0 }
  - { node: 8, measure: memory_usage, exec_type: distributed, value: 4096 }
"#;

fn estimator(src: &str, fallback: Fallback) -> (ParsedPlan, CostEstimator<TableLeafModel>) {
    let parsed = parse_plan_document(src).expect("plan parses");
    let mut cfg = EstimatorConfig::default();
    parsed.config.apply_to(&mut cfg);
    let model = parsed.leaf_model(&cfg, fallback).expect("leaf table");
    let est = CostEstimator::with_config(model, cfg).expect("valid config");
    (parsed, est)
}

#[test]
fn test_document_exec_time() {
    let (parsed, est) = estimator(PARFOR_PLAN, Fallback::Fail);
    assert_eq!(parsed.tree.ck.get(), 16);
    assert_eq!(parsed.tree.cm, Some(8192));
    // 20 * (2 + 6) / 4
    assert_eq!(
        est.estimate_tree(Measure::ExecTime, &parsed.tree, None)
            .unwrap(),
        40.0
    );
}

#[test]
fn test_document_memory_with_fallback_and_forced_type() {
    let (parsed, est) = estimator(PARFOR_PLAN, Fallback::DefaultEstimate);
    // Both leaves fall back to 1KB in-process, times k.
    assert_eq!(
        est.estimate_tree(Measure::MemoryUsage, &parsed.tree, None)
            .unwrap(),
        4096.0
    );
    // Forcing distributed picks up the profiled 4096 for node 8.
    assert_eq!(
        est.estimate_tree(Measure::MemoryUsage, &parsed.tree, Some(ExecType::Distributed))
            .unwrap(),
        16384.0
    );
}

#[test]
fn test_document_strict_memory_fails_on_missing_entry() {
    let (parsed, est) = estimator(PARFOR_PLAN, Fallback::Fail);
    assert!(matches!(
        est.estimate_tree(Measure::MemoryUsage, &parsed.tree, None),
        Err(Error::LeafEstimation { .. })
    ));
}

#[test]
fn test_document_config_is_applied() {
    let src = r#"
config: { default_iterations: 2, default_time_ms: 1.5 }
root:
  kind: for
  children: [ { kind: generic } ]
"#;
    let (_, est) = estimator(src, Fallback::DefaultEstimate);
    assert_eq!(est.config().default_iterations, 2);
    let parsed = parse_plan_document(src).unwrap();
    assert_eq!(
        est.estimate_tree(Measure::ExecTime, &parsed.tree, None)
            .unwrap(),
        3.0
    );
}

#[test]
fn test_document_rejects_invalid_config() {
    let src = "config: { while_iterations: 0 }\nroot: { kind: generic }\n";
    assert!(matches!(parse_plan_document(src), Err(Error::Config(_))));
}

#[test]
fn test_document_rejects_zero_parallelism() {
    let src = "root: { kind: parfor, k: 0, children: [ { kind: generic } ] }\n";
    assert!(matches!(parse_plan_document(src), Err(Error::Document(_))));
}

#[test]
fn test_document_rejects_malformed_iterations_up_front() {
    let src = r#"
root:
  kind: for
  params: { num_iterations: "abc" }
  children: [ { kind: generic } ]
"#;
    assert!(matches!(
        parse_plan_document(src),
        Err(Error::MalformedIterationCount { .. })
    ));
}

#[test]
fn test_document_rejects_if_with_three_branches() {
    let src = r#"
root:
  kind: if
  children: [ { kind: generic }, { kind: generic }, { kind: generic } ]
"#;
    assert!(matches!(parse_plan_document(src), Err(Error::InvalidPlan(_))));
}

#[test]
fn test_explain_lists_estimates_per_node() {
    let (parsed, est) = estimator(PARFOR_PLAN, Fallback::DefaultEstimate);
    let text = explain_estimates(&est, Measure::ExecTime, &parsed.tree, None).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "PLAN TREE (size=3, depth=2, ck=16, cm=8192)");
    assert_eq!(lines[1], "ESTIMATE EXEC_TIME (forced=none): 40.000");
    assert_eq!(
        lines[2],
        "--PARFOR (id=9, k=4, exec=IN_PROCESS, num_iterations=20) [40.000]"
    );
    assert_eq!(lines[3], "  --GENERIC (id=7, exec=IN_PROCESS) [2.000]");
    assert_eq!(lines[4], "  --GENERIC (id=8, exec=IN_PROCESS) [6.000]");
    assert_eq!(lines.len(), 5);
}

#[test]
fn test_explain_reports_memory_budget() {
    let (parsed, est) = estimator(PARFOR_PLAN, Fallback::DefaultEstimate);
    let fits = explain_estimates(&est, Measure::MemoryUsage, &parsed.tree, None).unwrap();
    assert!(fits.ends_with("FITS cm: yes\n"));
    let over = explain_estimates(
        &est,
        Measure::MemoryUsage,
        &parsed.tree,
        Some(ExecType::Distributed),
    )
    .unwrap();
    assert!(over.ends_with("FITS cm: no\n"));
}

#[test]
fn test_plan_hash_is_stable_and_content_sensitive() {
    let a = parse_plan_document(PARFOR_PLAN).unwrap();
    let b = parse_plan_document(PARFOR_PLAN).unwrap();
    assert_eq!(hash_plan(&a.tree.root), hash_plan(&b.tree.root));

    let changed = PARFOR_PLAN.replace("k: 4", "k: 8");
    let c = parse_plan_document(&changed).unwrap();
    assert_ne!(hash_plan(&a.tree.root), hash_plan(&c.tree.root));
}

#[test]
fn test_plan_hash_ignores_param_insertion_order() {
    let x = PlanNode::new(NodeKind::Parfor)
        .with_param(ParamType::NumIterations, "8")
        .with_param(ParamType::TaskPartitioner, "FIXED")
        .with_child(PlanNode::new(NodeKind::Generic));
    let y = PlanNode::new(NodeKind::Parfor)
        .with_param(ParamType::TaskPartitioner, "FIXED")
        .with_param(ParamType::NumIterations, "8")
        .with_child(PlanNode::new(NodeKind::Generic));
    assert_eq!(hash_plan(&x), hash_plan(&y));
}

#[test]
fn test_config_defaults_match_documented_constants() {
    let cfg = EstimatorConfig::default();
    assert_eq!(parcost::default_estimate(Measure::ExecTime), 5.0);
    assert_eq!(parcost::default_estimate(Measure::MemoryUsage), 1024.0);
    assert_eq!(cfg.default_estimate(Measure::ExecTime), 5.0);
    assert_eq!(cfg.default_estimate(Measure::MemoryUsage), 1024.0);
}
