//! Graph reasoning over the in-memory graph and stub backends.
//!
//! Run with: `cargo test -p scholae-core --test graph_reasoning_test`

mod common;

use common::{caps_over, caps_with, CountingGraph, DownGraph};
use scholae_core::adapters::{InMemoryGraph, PaperNode};
use scholae_core::reasoning::{Analogy, LifecycleStage, SynthesisPath};
use scholae_core::GraphReasoningEngine;
use std::sync::Arc;

/// `root` is cited directly by `a` and `b`; `c`, `d`, `e` cite `a`.
fn citation_graph() -> InMemoryGraph {
    let mut g = InMemoryGraph::new();
    g.add_paper(
        PaperNode::new("root", "Foundations", 2016)
            .concepts(&["transformers"])
            .methods(&["ablation study"])
            .authors(&["Ada", "Bo"]),
    )
    .add_paper(
        PaperNode::new("a", "Follow-up A", 2018)
            .concepts(&["transformers"])
            .authors(&["Ada", "Bo"])
            .cites(&["root"]),
    )
    .add_paper(PaperNode::new("b", "Follow-up B", 2019).concepts(&["transformers"]).cites(&["root"]))
    .add_paper(PaperNode::new("c", "Second wave C", 2021).concepts(&["transformers"]).cites(&["a"]))
    .add_paper(PaperNode::new("d", "Second wave D", 2022).concepts(&["transformers"]).cites(&["a"]))
    .add_paper(PaperNode::new("e", "Second wave E", 2023).concepts(&["transformers"]).cites(&["a"]))
    .add_paper(
        PaperNode::new("prot", "Protein Ablations", 2022)
            .concepts(&["protein structure"])
            .methods(&["ablation study", "cryo-em"]),
    );
    g
}

#[tokio::test]
async fn influence_decays_with_citation_distance() {
    let (caps, _store, _dir) = caps_over(citation_graph());
    let report = GraphReasoningEngine::new(caps)
        .influence_propagation("root", 3)
        .await
        .expect("influence");

    assert_eq!(report.direct_citations, 2);
    assert_eq!(report.indirect_citations, 3);
    assert_eq!(report.max_depth_reached, 2);
    assert_eq!(report.influence_score, 3.06);
    assert_eq!(report.influence_by_distance.get("depth_1"), Some(&2));
    assert_eq!(report.influence_by_distance.get("depth_2"), Some(&3));
}

#[tokio::test]
async fn influence_respects_max_depth() {
    let (caps, _store, _dir) = caps_over(citation_graph());
    let report = GraphReasoningEngine::new(caps)
        .influence_propagation("root", 1)
        .await
        .expect("influence");
    assert_eq!(report.direct_citations, 2);
    assert_eq!(report.indirect_citations, 0);
    assert_eq!(report.influence_score, 2.0);
}

#[tokio::test]
async fn lifecycle_stages_and_missing_data() {
    let (caps, _store, _dir) = caps_over(citation_graph());
    let engine = GraphReasoningEngine::new(caps);

    let lifecycle = engine.concept_lifecycle("transformers").await.expect("lifecycle");
    assert_eq!(lifecycle.first_appeared, 2016);
    assert_eq!(lifecycle.total_years, 6);
    assert_eq!(lifecycle.growth_rate, 3.0);
    assert_eq!(lifecycle.lifecycle_stage, LifecycleStage::RapidGrowth);

    // One year of data is always emerging.
    let young = engine.concept_lifecycle("protein structure").await.expect("lifecycle");
    assert_eq!(young.lifecycle_stage, LifecycleStage::Emerging);

    let err = engine.concept_lifecycle("alchemy").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn synthesis_needs_two_distinct_concepts_before_querying() {
    let graph = Arc::new(CountingGraph::default());
    let (caps, _store, _dir) = caps_with(graph.clone());
    let engine = GraphReasoningEngine::new(caps);

    assert!(engine.synthesis_paths(&[]).await.is_empty());
    assert!(engine.synthesis_paths(&["x".to_string()]).await.is_empty());
    assert!(engine
        .synthesis_paths(&["x".to_string(), " x ".to_string(), "".to_string()])
        .await
        .is_empty());
    assert_eq!(graph.calls(), 0);

    engine.synthesis_paths(&["x".to_string(), "y".to_string()]).await;
    assert_eq!(graph.calls(), 2);
}

#[tokio::test]
async fn synthesis_falls_back_to_shared_methodology() {
    let (caps, _store, _dir) = caps_over(citation_graph());
    let paths = GraphReasoningEngine::new(caps)
        .synthesis_paths(&["transformers".to_string(), "protein structure".to_string()])
        .await;
    assert_eq!(paths.len(), 1);
    match &paths[0] {
        SynthesisPath::MethodologicalSynthesis { shared_method, concepts_covered, .. } => {
            assert_eq!(shared_method, "ablation study");
            assert_eq!(concepts_covered.len(), 2);
        }
        other => panic!("unexpected path {other:?}"),
    }
}

#[tokio::test]
async fn analogies_contradictions_and_communities() {
    let (caps, _store, _dir) = caps_over(citation_graph());
    let engine = GraphReasoningEngine::new(caps);

    let analogies = engine.analogies("transformers", "protein structure", 3).await;
    assert!(matches!(
        analogies.first(),
        Some(Analogy::Methodological { shared_method, .. }) if shared_method == "ablation study"
    ));

    let contradictions = engine.contradictions("transformers").await;
    assert_eq!(contradictions.len(), 5);
    assert!(contradictions.iter().all(|c| c.requires_investigation));

    let communities = engine.communities(2).await;
    assert_eq!(communities.len(), 1);
    assert_eq!(communities[0].members, vec!["Ada", "Bo"]);
    assert_eq!(communities[0].cohesion, "high");
    assert!(engine.communities(3).await.is_empty());
}

#[tokio::test]
async fn research_gaps_list_unapplied_methods() {
    let (caps, _store, _dir) = caps_over(citation_graph());
    let gaps = GraphReasoningEngine::new(caps).research_gaps("transformers").await;
    let methods: Vec<&str> = gaps.under_explored_methods.iter().map(|m| m.method.as_str()).collect();
    assert_eq!(methods, vec!["cryo-em"]);
}

#[tokio::test]
async fn unreachable_graph_degrades_lists_and_fails_lifecycle() {
    let (caps, _store, _dir) = caps_with(Arc::new(DownGraph));
    let engine = GraphReasoningEngine::new(caps);

    assert!(engine.analogies("a", "b", 5).await.is_empty());
    assert!(engine.contradictions("a").await.is_empty());
    assert!(engine.communities(3).await.is_empty());
    assert_eq!(engine.research_gaps("a").await, Default::default());
    assert!(engine.synthesis_paths(&["a".into(), "b".into()]).await.is_empty());

    let err = engine.concept_lifecycle("a").await.unwrap_err();
    assert_eq!(err.kind(), "capability_unavailable");
    let err = engine.influence_propagation("p", 2).await.unwrap_err();
    assert_eq!(err.kind(), "capability_unavailable");
}
