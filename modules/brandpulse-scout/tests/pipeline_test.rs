//! End-to-end pipeline: aggregate → analyze → score → rank.
//!
//! Sources are MockSources and the model is a ScriptedCompletion, so every
//! run is deterministic. Sequential runs keep the script aligned with
//! aggregator order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Age, Utc};

use brandpulse_common::{Mention, ReplyContext, RiskLevel, Sentiment, SourceType};
use brandpulse_scout::testing::{mention_aged, MockSource, ScriptedCompletion};
use brandpulse_scout::{
    Aggregator, AnalysisStrategy, LlmAnalyzer, MentionSource, Pipeline, ReplyAssistant,
};

const HIGH: &str = r#"{"sentiment": "Negative", "sentimentScore": 0.05, "tone": "Angry", "intent": "Complaint", "keyPhrases": ["broken", "refund"], "riskLevel": "High", "isOffensive": false}"#;
const MEDIUM: &str = r#"{"sentiment": "Negative", "sentimentScore": 0.35, "tone": "Annoyed", "intent": "Complaint", "keyPhrases": ["late"], "riskLevel": "Medium", "isOffensive": false}"#;
const LOW: &str = r#"{"sentiment": "Positive", "sentimentScore": 0.9, "tone": "Happy", "intent": "Praise", "keyPhrases": ["tasty"], "riskLevel": "Low", "isOffensive": false}"#;

fn reddit(id: &str, text: &str, popularity: i64, age: Age) -> Mention {
    mention_aged(SourceType::Reddit, id, text, popularity, Utc::now(), age)
}

fn src(source: MockSource) -> Arc<dyn MentionSource> {
    Arc::new(source)
}

fn pipeline(
    sources: Vec<Arc<dyn MentionSource>>,
    ai: Arc<ScriptedCompletion>,
    strategy: AnalysisStrategy,
) -> Pipeline {
    let aggregator = sources
        .into_iter()
        .fold(Aggregator::new(), |agg, s| agg.with_source(s));
    Pipeline::builder()
        .aggregator(aggregator)
        .analyzer(Arc::new(LlmAnalyzer::new(ai)))
        .strategy(strategy)
        .build()
}

fn sequential(delay_ms: u64) -> AnalysisStrategy {
    AnalysisStrategy::Sequential {
        delay: Duration::from_millis(delay_ms),
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ranks_by_risk_with_recency_breaking_ties() {
    let source = MockSource::fixed(
        SourceType::Reddit,
        vec![
            reddit("a", "love this soda", 0, Age::hours(1)),
            reddit("b", "my can exploded", 0, Age::hours(2)),
            reddit("c", "pretty good", 0, Age::hours(30)),
            reddit("d", "fine i guess", 0, Age::hours(40)),
        ],
    );
    // Aggregator order is a, b, c, d (newest first).
    let ai = Arc::new(ScriptedCompletion::sequence(&[LOW, HIGH, LOW, LOW], LOW));

    let ranked = pipeline(vec![src(source)], ai.clone(), sequential(0))
        .get_ranked_mentions("olipop", None)
        .await
        .unwrap();

    let order: Vec<(&str, u8)> = ranked.iter().map(|m| (m.id(), m.risk_score)).collect();
    assert_eq!(
        order,
        vec![("reddit_b", 90), ("reddit_a", 35), ("reddit_c", 30), ("reddit_d", 30)]
    );
    assert_eq!(ai.calls(), 4);
    assert!(ranked.windows(2).all(|w| w[0].risk_score >= w[1].risk_score));
}

#[tokio::test]
async fn high_risk_popular_recent_mention_scores_100() {
    let source = MockSource::fixed(
        SourceType::Reddit,
        vec![reddit("viral", "this product made me sick", 120, Age::zero())],
    );
    let ai = Arc::new(ScriptedCompletion::always(HIGH));

    let ranked = pipeline(vec![src(source)], ai, AnalysisStrategy::default())
        .get_ranked_mentions("olipop", None)
        .await
        .unwrap();

    assert_eq!(ranked.len(), 1);
    let m = &ranked[0];
    assert_eq!(m.risk_score, 100);
    assert_eq!(m.risk_level, Some(RiskLevel::High));
    assert_eq!(m.sentiment, Sentiment::Negative);
    assert_eq!(m.tone, "Angry");
    assert_eq!(m.key_phrases, vec!["broken", "refund"]);
    assert!(m.analysis_error.is_none());
}

#[tokio::test]
async fn parallel_mode_scores_every_mention() {
    let mentions: Vec<Mention> = (0..8)
        .map(|i| reddit(&format!("p{i}"), "same text", i * 10, Age::hours(48)))
        .collect();
    let source = MockSource::fixed(SourceType::Reddit, mentions);
    let ai = Arc::new(ScriptedCompletion::always(MEDIUM));

    let ranked = pipeline(
        vec![src(source)],
        ai.clone(),
        AnalysisStrategy::Parallel {
            max_in_flight: Some(3),
        },
    )
    .get_ranked_mentions("olipop", None)
    .await
    .unwrap();

    assert_eq!(ranked.len(), 8);
    assert_eq!(ai.calls(), 8);
    // Medium 60 + floor(popularity / 10), popularity 70 first
    assert_eq!(ranked[0].id(), "reddit_p7");
    assert_eq!(ranked[0].risk_score, 67);
    assert_eq!(ranked[7].risk_score, 60);
}

// ---------------------------------------------------------------------------
// Degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prose_response_degrades_instead_of_failing() {
    let source = MockSource::fixed(
        SourceType::Reddit,
        vec![
            reddit("old", "meh", 5, Age::hours(25)),
            reddit("new", "hmm", 80, Age::hours(1)),
        ],
    );
    let ai = Arc::new(ScriptedCompletion::always(
        "Sorry, I can't help classify that post.",
    ));

    let ranked = pipeline(vec![src(source)], ai, AnalysisStrategy::default())
        .get_ranked_mentions("olipop", None)
        .await
        .unwrap();

    assert_eq!(ranked.len(), 2);
    for m in &ranked {
        assert_eq!(m.tone, "Parse Error");
        assert_eq!(m.sentiment, Sentiment::Neutral);
        assert!(m.analysis_error.is_some());
    }
    // 50 + min(8, 15) + 5 and 50 + 0 + 0
    assert_eq!((ranked[0].id(), ranked[0].risk_score), ("reddit_new", 63));
    assert_eq!((ranked[1].id(), ranked[1].risk_score), ("reddit_old", 50));
}

#[tokio::test]
async fn backend_errors_keep_the_mention() {
    let source = MockSource::fixed(
        SourceType::Reddit,
        vec![
            reddit("a", "first", 0, Age::hours(30)),
            reddit("b", "second", 0, Age::hours(31)),
            reddit("c", "third", 0, Age::hours(32)),
        ],
    );
    let ai = Arc::new(ScriptedCompletion::sequence(&[HIGH], LOW).then_fail(429));

    let ranked = pipeline(vec![src(source)], ai, sequential(0))
        .get_ranked_mentions("olipop", None)
        .await
        .unwrap();

    let by_id = |id: &str| ranked.iter().find(|m| m.id() == id).unwrap();
    assert_eq!(by_id("reddit_a").risk_score, 90);
    assert_eq!(by_id("reddit_b").tone, "API Error");
    assert_eq!(by_id("reddit_b").risk_score, 50);
    assert_eq!(by_id("reddit_c").risk_score, 30);
}

#[tokio::test]
async fn failing_source_does_not_fail_the_search() {
    let good = MockSource::fixed(
        SourceType::Reddit,
        vec![reddit("ok", "great flavor", 0, Age::hours(2))],
    );
    let bad = MockSource::failing(SourceType::Twitter, "invalid token");
    let ai = Arc::new(ScriptedCompletion::always(LOW));

    let ranked = pipeline(vec![src(good), src(bad)], ai, AnalysisStrategy::default())
        .get_ranked_mentions("olipop", None)
        .await
        .unwrap();

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].id(), "reddit_ok");
}

#[tokio::test]
async fn no_mentions_is_an_empty_result() {
    let empty = MockSource::fixed(SourceType::Reddit, Vec::new());
    let bad = MockSource::failing(SourceType::Twitter, "network down");
    let ai = Arc::new(ScriptedCompletion::always(LOW));

    let ranked = pipeline(vec![src(empty), src(bad)], ai.clone(), AnalysisStrategy::default())
        .get_ranked_mentions("olipop", None)
        .await
        .unwrap();

    assert!(ranked.is_empty());
    assert_eq!(ai.calls(), 0);
}

#[tokio::test]
async fn blank_query_is_rejected_before_fetching() {
    let source = Arc::new(MockSource::fixed(SourceType::Reddit, Vec::new()));
    let ai = Arc::new(ScriptedCompletion::always(LOW));

    let err = pipeline(vec![source.clone() as Arc<dyn MentionSource>], ai, AnalysisStrategy::default())
        .get_ranked_mentions("  \t", None)
        .await
        .unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(source.searches(), 0);
}

// ---------------------------------------------------------------------------
// Rate-limited sequential mode
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn sequential_mode_spaces_out_backend_calls() {
    let source = MockSource::fixed(
        SourceType::Reddit,
        vec![
            reddit("a", "one", 0, Age::hours(1)),
            reddit("b", "two", 0, Age::hours(2)),
            reddit("c", "three", 0, Age::hours(3)),
        ],
    );
    let ai = Arc::new(ScriptedCompletion::always(LOW));
    let p = pipeline(vec![src(source)], ai.clone(), sequential(4500));

    assert_eq!(p.estimated_analysis_duration(3), Duration::from_millis(13_500));

    let started = tokio::time::Instant::now();
    let ranked = p.get_ranked_mentions("olipop", None).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(ranked.len(), 3);
    assert_eq!(ai.calls(), 3);
    // Two gaps between three dispatches.
    assert!(elapsed >= Duration::from_millis(9_000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(13_500), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn rate_limited_run_reports_its_estimate() {
    let mentions = || {
        vec![
            reddit("a", "one", 0, Age::hours(1)),
            reddit("b", "two", 0, Age::hours(2)),
        ]
    };
    let ai = Arc::new(ScriptedCompletion::always(LOW));

    let slow = pipeline(
        vec![src(MockSource::fixed(SourceType::Reddit, mentions()))],
        ai.clone(),
        sequential(5),
    )
    .rank_mentions("olipop", None)
    .await
    .unwrap();
    assert_eq!(slow.mentions.len(), 2);
    assert!(slow.is_rate_limited());
    assert_eq!(slow.estimated_analysis, Duration::from_millis(10));

    let fast = pipeline(
        vec![src(MockSource::fixed(SourceType::Reddit, mentions()))],
        ai,
        AnalysisStrategy::default(),
    )
    .rank_mentions("olipop", None)
    .await
    .unwrap();
    assert!(!fast.is_rate_limited());
}

// ---------------------------------------------------------------------------
// Output shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_record_serializes_required_fields() {
    let source = MockSource::fixed(
        SourceType::Twitter,
        vec![mention_aged(
            SourceType::Twitter,
            "42",
            "is olipop worth it?",
            3,
            Utc::now(),
            Age::hours(3),
        )],
    );
    let ai = Arc::new(ScriptedCompletion::always(MEDIUM));

    let ranked = pipeline(vec![src(source)], ai, AnalysisStrategy::default())
        .get_ranked_mentions("olipop", None)
        .await
        .unwrap();

    let json = serde_json::to_value(&ranked).unwrap();
    let record = &json[0];
    for key in ["id", "sourceType", "text", "sentiment", "tone", "intent", "riskScore"] {
        assert!(record.get(key).is_some(), "missing {key}");
    }
    assert!(record["metadata"]["createdAt"].is_string());
    assert_eq!(record["sourceType"], "twitter");
    assert_eq!(record["riskLevel"], "Medium");
    assert_eq!(record["metadata"]["twitterLikeCount"], 3);
}

// ---------------------------------------------------------------------------
// Follow-up: reply drafting from a ranked mention
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ranked_mention_feeds_reply_assistant() {
    let source = MockSource::fixed(
        SourceType::Reddit,
        vec![reddit("r1", "my can was flat", 10, Age::hours(30))],
    );
    let ranked = pipeline(
        vec![src(source)],
        Arc::new(ScriptedCompletion::always(HIGH)),
        AnalysisStrategy::default(),
    )
    .get_ranked_mentions("olipop", None)
    .await
    .unwrap();

    let ai = Arc::new(ScriptedCompletion::always(
        r#"{"suggestion": "Sorry! DM us.", "strategy": "Apologize"}"#,
    ));
    let context = ReplyContext::from(&ranked[0]);
    let draft = ReplyAssistant::new(ai.clone())
        .draft_reply(&context)
        .await
        .unwrap();

    assert_eq!(draft.suggestion, "Sorry! DM us.");
    let prompt = &ai.prompts()[0];
    assert!(prompt.contains("my can was flat"));
    assert!(prompt.contains("Overall Risk Score: 91"));
    assert!(prompt.contains("Key Phrases: broken, refund"));
}
