//! Memory service + consolidation over a real sled store.
//!
//! Run with: `cargo test -p scholae-core --test memory_consolidation_test`

mod common;

use chrono::{Duration, Utc};
use common::{caps_over, caps_with, reading, DownGraph};
use scholae_core::adapters::{InMemoryGraph, PaperNode};
use scholae_core::config::ConsolidationConfig;
use scholae_core::memory::Mastery;
use scholae_core::{ConsolidationEngine, MemoryFilter, MemoryKind, MemoryStore, PaperRecord, ResearchMemory};
use std::sync::Arc;

fn paper(id: &str, concepts: &[&str]) -> PaperRecord {
    PaperRecord {
        paper_id: id.to_string(),
        title: Some(format!("Paper {id}")),
        abstract_text: Some(format!("Abstract of {id}")),
        concepts: concepts.iter().map(|c| c.to_string()).collect(),
    }
}

#[tokio::test]
async fn twelve_exposures_make_an_expert() {
    let (caps, _store, _dir) = caps_over(InMemoryGraph::new());
    let memory = ResearchMemory::new(caps.clone());
    for i in 0..12 {
        memory
            .store_paper_memory("r1", &paper(&format!("t{i}"), &["transformers", "attention"]))
            .await
            .expect("store paper");
    }
    memory
        .store_paper_memory("r1", &paper("bio", &["protein folding"]))
        .await
        .expect("store paper");

    let report = ConsolidationEngine::new(caps)
        .evolution("r1", "transformers")
        .await
        .expect("evolution");

    assert_eq!(report.total_exposures, 12);
    assert_eq!(report.mastery_level, Mastery::Expert);
    assert_eq!(report.evolution_score, 1.0);
    assert!(report.first_encountered.is_some());
    assert_eq!(report.timeline.len(), 12);
    assert!(report.timeline.iter().all(|e| e.context.starts_with("Abstract of t")));
}

#[tokio::test]
async fn evolution_of_unseen_concept_is_novice() {
    let (caps, _store, _dir) = caps_over(InMemoryGraph::new());
    let report = ConsolidationEngine::new(caps)
        .evolution("r1", "quantum chemistry")
        .await
        .expect("evolution");
    assert_eq!(report.total_exposures, 0);
    assert_eq!(report.mastery_level, Mastery::Novice);
    assert_eq!(report.evolution_score, 0.0);
    assert!(report.first_encountered.is_none());
}

#[tokio::test]
async fn consolidation_groups_flags_and_persists_summary() {
    let (caps, store, _dir) = caps_over(InMemoryGraph::new());
    let now = Utc::now();
    let ago = |days: i64| (now - Duration::days(days)).to_rfc3339();

    store.put("r1", reading("p3", &ago(200), &["biology"])).await.unwrap();
    store.put("r1", reading("p2", &ago(2), &["attention", "scaling"])).await.unwrap();
    store.put("r1", reading("p1", &ago(1), &["attention", "transformers"])).await.unwrap();
    // Annotations are not paper readings and stay out of consolidation.
    ResearchMemory::new(caps.clone())
        .store_annotation("r1", "p1", "check the ablation", "note")
        .await
        .unwrap();

    let engine = ConsolidationEngine::new(caps).with_config(ConsolidationConfig {
        persist_summary: true,
        ..ConsolidationConfig::default()
    });
    let report = engine.consolidate_at("r1", 7, now).await.expect("consolidate");

    assert_eq!(report.total_memories, 3);
    assert_eq!(report.recent_memories, 2);
    assert_eq!(report.strong_memories, 2);
    assert_eq!(report.weak_memories, 1);
    assert_eq!(report.flagged_for_review.len(), 1);
    assert_eq!(report.concept_groups, 4);
    assert_eq!(report.cross_references, 2);
    assert_eq!(report.top_concepts[0].concept, "attention");
    assert_eq!(report.top_concepts[0].frequency, 2);
    assert!(report.consolidation_summary.contains("- attention: 2 memories"));

    let summary_id = report.summary_memory_id.expect("summary persisted");
    let summaries = store
        .query("r1", &MemoryFilter::kind(MemoryKind::ConsolidationSummary), 10)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, summary_id);

    // Pruning is advisory: the flagged memory is still stored.
    let flagged = store.get("r1", &report.flagged_for_review[0]).unwrap();
    assert_eq!(flagged.and_then(|m| m.content.paper_id).as_deref(), Some("p3"));
}

#[tokio::test]
async fn empty_namespace_consolidates_to_nothing() {
    let (caps, store, _dir) = caps_over(InMemoryGraph::new());
    let engine = ConsolidationEngine::new(caps).with_config(ConsolidationConfig {
        persist_summary: true,
        ..ConsolidationConfig::default()
    });
    let report = engine.consolidate("nobody", 7).await.expect("consolidate");
    assert_eq!(report.total_memories, 0);
    assert_eq!(report.concept_groups, 0);
    assert!(report.summary_memory_id.is_none());
    assert_eq!(store.count("nobody").unwrap(), 0);
}

#[tokio::test]
async fn memory_gaps_are_emerging_concepts_not_yet_read() {
    let mut graph = InMemoryGraph::new();
    graph
        .add_paper(PaperNode::new("n1", "Diffusion Everywhere", 2024).concepts(&["diffusion", "transformers"]))
        .add_paper(PaperNode::new("n2", "State Spaces", 2024).concepts(&["state space models", "diffusion"]))
        .add_paper(PaperNode::new("o1", "Old Work", 2015).concepts(&["svm"]));
    let (caps, store, _dir) = caps_over(graph);
    store
        .put("r1", reading("t1", &Utc::now().to_rfc3339(), &["Transformers"]))
        .await
        .unwrap();

    let gaps = ConsolidationEngine::new(caps).memory_gaps("r1").await.expect("gaps");
    let names: Vec<&str> = gaps.iter().map(|g| g.concept.as_str()).collect();
    assert_eq!(names, vec!["diffusion", "state space models"]);
    assert_eq!(gaps[0].importance, 2);
}

#[tokio::test]
async fn health_report_degrades_gaps_when_graph_is_down() {
    let (caps, store, _dir) = caps_with(Arc::new(DownGraph));
    let now = Utc::now();
    store
        .put("r1", reading("p1", &(now - Duration::days(90)).to_rfc3339(), &["attention"]))
        .await
        .unwrap();

    let report = ConsolidationEngine::new(caps).report_at("r1", now).await.expect("report");
    assert_eq!(report.total_memories, 1);
    assert!(report.knowledge_gaps.is_empty());
    assert!(report.average_memory_strength < 0.5);
    assert_eq!(report.recommendations[0], "Review older papers to strengthen memories");
}

#[tokio::test]
async fn blank_researcher_is_rejected() {
    let (caps, _store, _dir) = caps_over(InMemoryGraph::new());
    let err = ResearchMemory::new(caps)
        .store_paper_memory(" ", &paper("p1", &[]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_input");
}
