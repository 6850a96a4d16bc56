//! Memory-graph fusion: views, discovery, load, learning paths and explanations.
//!
//! Run with: `cargo test -p scholae-core --test fusion_test`

mod common;

use chrono::{Duration, Utc};
use common::{caps_over, caps_with, reading, CannedText, DownGraph, FailingText};
use scholae_core::adapters::{InMemoryGraph, PaperNode};
use scholae_core::fusion::{Discovery, IntuitionConfidence, LoadLevel, LoadRecommendation, ViewNode};
use scholae_core::{FusionLayer, MemoryStore, PaperRecord, ResearchMemory};
use std::sync::Arc;

/// pretraining - transformers - attention - protein structure, one hop per paper.
fn chain_graph() -> InMemoryGraph {
    let mut g = InMemoryGraph::new();
    g.add_paper(PaperNode::new("g1", "Pretrained Transformers", 2017).concepts(&["pretraining", "transformers"]))
        .add_paper(PaperNode::new("g2", "Attention Mechanisms", 2018).concepts(&["transformers", "attention"]))
        .add_paper(PaperNode::new("g3", "Attention for Proteins", 2020).concepts(&["attention", "protein structure"]))
        .mark_read("r1", "g3", Some("2026-10-01"), None);
    g
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

#[tokio::test]
async fn learning_path_skips_known_concepts() {
    let (caps, store, _dir) = caps_over(chain_graph());
    store.put("r1", reading("m1", &now(), &["transformers"])).await.unwrap();

    let path = FusionLayer::new(caps)
        .learning_path("r1", "protein structure")
        .await
        .expect("learning path");

    assert_eq!(path.starting_point, "transformers");
    assert_eq!(path.path.nodes, vec!["transformers", "attention", "protein structure"]);
    let concepts: Vec<&str> = path.learning_path.iter().map(|s| s.concept.as_str()).collect();
    assert_eq!(concepts, vec!["attention", "protein structure"]);
    assert_eq!(path.total_steps, 2);
    assert_eq!(path.estimated_duration, "4 hours");
    assert_eq!(path.success_probability, 0.8);
}

#[tokio::test]
async fn learning_path_not_found_when_nothing_connects() {
    let (caps, store, _dir) = caps_over(chain_graph());
    let fusion = FusionLayer::new(caps);

    store.put("r1", reading("m1", &now(), &["transformers"])).await.unwrap();
    let err = fusion.learning_path("r1", "alchemy").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");

    // No memories means no starting point either.
    let err = fusion.learning_path("r2", "attention").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");

    let err = fusion.learning_path("r1", "  ").await.unwrap_err();
    assert_eq!(err.kind(), "malformed_input");
}

#[tokio::test]
async fn learning_path_surfaces_graph_outage() {
    let (caps, store, _dir) = caps_with(Arc::new(DownGraph));
    store.put("r1", reading("m1", &now(), &["transformers"])).await.unwrap();
    let err = FusionLayer::new(caps).learning_path("r1", "attention").await.unwrap_err();
    assert_eq!(err.kind(), "capability_unavailable");
}

#[tokio::test]
async fn personalized_view_combines_memory_and_graph() {
    let (caps, store, _dir) = caps_over(chain_graph());
    store.put("r1", reading("m1", &now(), &["pretraining"])).await.unwrap();
    store.put("r1", reading("m2", &now(), &["attention"])).await.unwrap();

    let view = FusionLayer::new(caps).personalized_view("r1").await.expect("view");

    assert_eq!(view.graph_statistics.total_concepts, 2);
    assert_eq!(view.graph_statistics.strong_concepts, 2);
    assert_eq!(view.graph_statistics.papers_read, 1);
    let papers: Vec<&ViewNode> = view
        .nodes
        .iter()
        .filter(|n| matches!(n, ViewNode::Paper { .. }))
        .collect();
    assert_eq!(papers.len(), 1);
    assert_eq!(view.edges.len(), 1);
    assert_eq!(view.edges[0].bridge_concepts, vec!["transformers"]);
}

#[tokio::test]
async fn personalized_view_survives_graph_outage() {
    let (caps, store, _dir) = caps_with(Arc::new(DownGraph));
    store.put("r1", reading("m1", &now(), &["pretraining", "attention"])).await.unwrap();

    let view = FusionLayer::new(caps).personalized_view("r1").await.expect("view");
    assert_eq!(view.nodes.len(), 2);
    assert!(view.edges.is_empty());
    assert_eq!(view.graph_statistics.papers_read, 0);
}

#[tokio::test]
async fn serendipity_finds_distant_concepts() {
    let (caps, store, _dir) = caps_over(chain_graph());
    store.put("r1", reading("m1", &now(), &["pretraining"])).await.unwrap();

    let found = FusionLayer::new(caps).serendipity("r1").await.expect("serendipity");
    assert_eq!(found.len(), 1);
    match &found[0] {
        Discovery::DistantConnection { discovered_concept, path, .. } => {
            assert_eq!(discovered_concept, "protein structure");
            assert_eq!(path.len(), 4);
        }
        other => panic!("unexpected discovery {other:?}"),
    }
    assert_eq!(found[0].serendipity_score(), 0.8);
}

#[tokio::test]
async fn intuition_follows_frequent_concepts() {
    let (caps, store, _dir) = caps_over(chain_graph());
    for i in 0..3 {
        store
            .put("r1", reading(&format!("m{i}"), &now(), &["transformers"]))
            .await
            .unwrap();
    }
    let fusion = FusionLayer::new(caps);

    let aligned = fusion.intuition("r1", "Transformers for protein design").await.unwrap();
    assert_eq!(aligned.confidence, IntuitionConfidence::High);
    assert_eq!(aligned.intuitive_concepts, vec!["transformers"]);
    assert!(aligned.warning.is_none());

    let outside = fusion.intuition("r1", "marine ecology").await.unwrap();
    assert_eq!(outside.confidence, IntuitionConfidence::Exploratory);
}

#[tokio::test]
async fn cognitive_load_levels_and_review() {
    let (caps, store, _dir) = caps_over(chain_graph());
    let fusion = FusionLayer::new(caps);

    let fresh = fusion.cognitive_load("idle").await.unwrap();
    assert_eq!(fresh.current_load.load_level, LoadLevel::Optimal);
    assert!(matches!(fresh.recommendations[0], LoadRecommendation::Engagement { .. }));
    assert_eq!(fresh.optimal_schedule.papers_per_day, 3);

    for i in 0..7 {
        store.put("busy", reading(&format!("b{i}"), &now(), &["x"])).await.unwrap();
    }
    let busy = fusion.cognitive_load("busy").await.unwrap();
    assert_eq!(busy.current_load.papers_today, 7);
    assert_eq!(busy.current_load.load_level, LoadLevel::Overload);
    assert!(matches!(busy.recommendations[0], LoadRecommendation::OverloadWarning { .. }));

    let old = (Utc::now() - Duration::days(400)).to_rfc3339();
    for i in 0..11 {
        store.put("stale", reading(&format!("s{i}"), &old, &["y"])).await.unwrap();
    }
    let stale = fusion.cognitive_load("stale").await.unwrap();
    assert_eq!(stale.current_load.load_level, LoadLevel::Optimal);
    assert!(stale.memory_health.needs_review);
    let review = stale
        .recommendations
        .iter()
        .find_map(|r| match r {
            LoadRecommendation::ReviewNeeded { papers_to_review, .. } => Some(papers_to_review.len()),
            _ => None,
        });
    assert_eq!(review, Some(5));
}

#[tokio::test]
async fn explanation_uses_generator_when_present() {
    let (caps, _store, _dir) = caps_over(chain_graph());

    let plain = FusionLayer::new(caps.clone())
        .explain_connection("pretraining", "attention")
        .await
        .unwrap();
    assert!(!plain.generated);
    assert!(plain.explanation.contains("pretraining -> transformers -> attention"));

    let with_text = caps.with_text(Arc::new(CannedText("  Attention builds on pretraining.  ".into())));
    let generated = FusionLayer::new(with_text)
        .explain_connection("pretraining", "attention")
        .await
        .unwrap();
    assert!(generated.generated);
    assert_eq!(generated.explanation, "Attention builds on pretraining.");
    assert_eq!(generated.path.path_length, 2);
}

#[tokio::test]
async fn explanation_without_path_is_not_found() {
    let (caps, _store, _dir) = caps_over(chain_graph());
    let err = FusionLayer::new(caps)
        .explain_connection("pretraining", "alchemy")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn equally_short_paths_keep_the_first_known_concept() {
    let mut graph = InMemoryGraph::new();
    graph
        .add_paper(PaperNode::new("t1", "Alpha Meets Mid", 2019).concepts(&["alpha", "mid"]))
        .add_paper(PaperNode::new("t2", "Beta Meets Mid", 2019).concepts(&["beta", "mid"]))
        .add_paper(PaperNode::new("t3", "Mid To Goal", 2020).concepts(&["mid", "goal"]));
    let (caps, store, _dir) = caps_over(graph);
    let ago = |hours: i64| (Utc::now() - Duration::hours(hours)).to_rfc3339();

    // Newest memory first: beta is seen before alpha.
    store.put("r1", reading("a", &ago(2), &["alpha"])).await.unwrap();
    store.put("r1", reading("b", &ago(1), &["beta"])).await.unwrap();
    store.put("r2", reading("b", &ago(2), &["beta"])).await.unwrap();
    store.put("r2", reading("a", &ago(1), &["alpha"])).await.unwrap();

    let fusion = FusionLayer::new(caps);
    let first = fusion.learning_path("r1", "goal").await.unwrap();
    assert_eq!(first.starting_point, "beta");
    assert_eq!(first.path.path_length, 2);
    let second = fusion.learning_path("r2", "goal").await.unwrap();
    assert_eq!(second.starting_point, "alpha");
}

#[tokio::test]
async fn moderate_load_counts_papers_past_busy_annotations() {
    let (caps, store, _dir) = caps_over(chain_graph());
    let earlier = (Utc::now() - Duration::hours(1)).to_rfc3339();
    store.put("r1", reading("p1", &earlier, &["attention"])).await.unwrap();
    store.put("r1", reading("p2", &earlier, &["attention"])).await.unwrap();
    let memory = ResearchMemory::new(caps.clone());
    for i in 0..120 {
        memory
            .store_annotation("r1", "p1", &format!("note {i}"), "note")
            .await
            .unwrap();
    }

    let load = FusionLayer::new(caps).cognitive_load("r1").await.unwrap();
    assert_eq!(load.current_load.papers_today, 2);
    assert_eq!(load.current_load.load_level, LoadLevel::Moderate);
    assert!(!load
        .recommendations
        .iter()
        .any(|r| matches!(r, LoadRecommendation::OverloadWarning { .. } | LoadRecommendation::Engagement { .. })));
}

async fn seed_library(memory: &ResearchMemory) {
    let papers = [
        ("p1", "Attention Is All You Need", "Sequence transduction built on attention alone.", vec!["attention", "transformers"]),
        ("p2", "Protein Folding at Scale", "Structure prediction from sequence.", vec!["biology"]),
    ];
    for (id, title, abstract_text, concepts) in papers {
        memory
            .store_paper_memory(
                "r1",
                &PaperRecord {
                    paper_id: id.to_string(),
                    title: Some(title.to_string()),
                    abstract_text: Some(abstract_text.to_string()),
                    concepts: concepts.into_iter().map(String::from).collect(),
                },
            )
            .await
            .unwrap();
    }
    // Matches the query but is not a paper reading.
    memory
        .store_annotation("r1", "p1", "attention heads look redundant", "note")
        .await
        .unwrap();
}

#[tokio::test]
async fn research_query_answers_from_matching_papers() {
    let (caps, _store, _dir) = caps_over(chain_graph());
    seed_library(&ResearchMemory::new(caps.clone())).await;
    let caps = caps.with_text(Arc::new(CannedText("  Attention replaces recurrence [1].  ".into())));

    let answer = FusionLayer::new(caps)
        .research_query("r1", "attention mechanisms")
        .await
        .unwrap();
    assert!(answer.generated);
    assert_eq!(answer.answer, "Attention replaces recurrence [1].");
    assert_eq!(answer.confidence, 0.85);
    assert_eq!(answer.relevant_papers, vec!["p1"]);
    assert_eq!(answer.concepts_used, vec!["attention", "transformers"]);
    let sources: Vec<&str> = answer.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(sources, vec!["Attention Is All You Need"]);
}

#[tokio::test]
async fn research_query_falls_back_when_generation_fails() {
    let (caps, _store, _dir) = caps_over(chain_graph());
    seed_library(&ResearchMemory::new(caps.clone())).await;
    let fusion = FusionLayer::new(caps.clone().with_text(Arc::new(FailingText)));

    let failed = fusion.research_query("r1", "attention").await.unwrap();
    assert!(!failed.generated);
    assert_eq!(failed.confidence, 0.0);
    assert!(failed.answer.starts_with("I apologize"));
    assert!(failed.sources.is_empty());
    assert_eq!(failed.relevant_papers, vec!["p1"]);

    let offline = FusionLayer::new(caps).research_query("r1", "attention").await.unwrap();
    assert!(!offline.generated);
    assert_eq!(offline.confidence, 0.0);
    assert!(offline.answer.contains("Attention Is All You Need"));

    let err = fusion.research_query("r1", "   ").await.unwrap_err();
    assert_eq!(err.kind(), "malformed_input");
}
