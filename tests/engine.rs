//! Integration tests for the streaming engine.
//!
//! A scripted rewriter stands in for the LLM so every run is deterministic
//! and no network access is needed.

use async_trait::async_trait;
use edgequake_paraphrase::{
    ParaphraseConfig, ParaphraseEngine, ProgressEvent, RewriteError, Rewriter, StyleConfig,
};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replays canned responses in order and records every chunk it was given.
/// Once the script runs out it echoes the input back.
#[derive(Default)]
struct ScriptedRewriter {
    responses: Mutex<VecDeque<Result<String, RewriteError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRewriter {
    fn new(responses: Vec<Result<String, RewriteError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn echo() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rewriter for ScriptedRewriter {
    async fn rewrite(&self, text: &str, _style: &StyleConfig) -> Result<String, RewriteError> {
        self.calls.lock().unwrap().push(text.to_string());
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(text.to_string()))
    }
}

/// Takes five seconds per chunk and counts finished calls.
#[derive(Default)]
struct SlowRewriter {
    finished: AtomicUsize,
}

#[async_trait]
impl Rewriter for SlowRewriter {
    async fn rewrite(&self, text: &str, _style: &StyleConfig) -> Result<String, RewriteError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_string())
    }
}

fn config(max: usize, overlap: usize, delay_ms: u64) -> ParaphraseConfig {
    ParaphraseConfig::builder()
        .max_chunk_size(max)
        .overlap_size(overlap)
        .chunk_delay_ms(delay_ms)
        .build()
        .unwrap()
}

async fn collect(engine: &ParaphraseEngine, text: &str) -> Vec<ProgressEvent> {
    engine
        .paraphrase(text, &StyleConfig::default())
        .collect()
        .await
}

const THREE_PARAGRAPHS: &str =
    "First paragraph is here.\n\nSecond paragraph is here.\n\nThird paragraph is here.";

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_chunk_document() {
    let rewriter = ScriptedRewriter::new(vec![Ok("A brief document.".into())]);
    let engine = ParaphraseEngine::new(rewriter.clone(), &config(4000, 200, 0));

    let events = collect(&engine, "A short document.").await;
    assert_eq!(
        events,
        vec![
            ProgressEvent::Progress {
                percent: 100,
                current_chunk: 1,
                total_chunks: 1
            },
            ProgressEvent::Complete {
                result: "A brief document.".into()
            },
        ]
    );
    assert_eq!(rewriter.calls(), vec!["A short document.".to_string()]);
}

#[tokio::test]
async fn empty_input_completes_without_calls() {
    let rewriter = ScriptedRewriter::echo();
    let engine = ParaphraseEngine::new(rewriter.clone(), &config(4000, 200, 0));

    let events = collect(&engine, "").await;
    assert_eq!(
        events,
        vec![ProgressEvent::Complete {
            result: String::new()
        }]
    );
    assert!(rewriter.calls().is_empty());
}

#[tokio::test]
async fn overlap_is_removed_when_stitching() {
    let rewriter = ScriptedRewriter::new(vec![
        Ok("Rewritten A. Rewritten B. Rewritten C.".into()),
        Ok("Rewritten C. Rewritten D.".into()),
    ]);
    let engine = ParaphraseEngine::new(rewriter.clone(), &config(36, 12, 0));

    let events = collect(&engine, "Sentence A. Sentence B. Sentence C. Sentence D.").await;

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], ProgressEvent::progress(1, 2));
    assert_eq!(events[0].percent(), Some(50));
    assert_eq!(events[1], ProgressEvent::progress(2, 2));
    assert_eq!(
        events[2],
        ProgressEvent::Complete {
            result: "Rewritten A. Rewritten B. Rewritten C.\n\nRewritten D.".into()
        }
    );

    // The second chunk was sent with the overlap seed in front.
    let calls = rewriter.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].starts_with("Sentence C."), "got {:?}", calls[1]);
}

#[tokio::test]
async fn failure_stops_the_run() {
    let rewriter = ScriptedRewriter::new(vec![
        Ok("Paragraph one rewritten.".into()),
        Err(RewriteError::Api {
            detail: "rate limited".into(),
        }),
    ]);
    let engine = ParaphraseEngine::new(rewriter.clone(), &config(40, 0, 0));
    assert_eq!(engine.chunk(THREE_PARAGRAPHS).len(), 3);

    let events = collect(&engine, THREE_PARAGRAPHS).await;

    assert_eq!(events.len(), 2, "events: {events:?}");
    assert_eq!(events[0], ProgressEvent::progress(1, 3));
    match &events[1] {
        ProgressEvent::Error { message } => {
            assert!(message.starts_with("Failed at chunk 2/3"), "got {message}");
            assert!(message.contains("rate limited"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
    // The third chunk is never attempted.
    assert_eq!(rewriter.calls().len(), 2);
}

#[tokio::test]
async fn percent_is_monotonic_and_terminal_is_last() {
    let text = (1..=6)
        .map(|i| format!("Paragraph number {i} has some words."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let engine = ParaphraseEngine::new(ScriptedRewriter::echo(), &config(40, 0, 0));

    let events = collect(&engine, &text).await;
    let (last, progress) = events.split_last().unwrap();

    assert!(matches!(last, ProgressEvent::Complete { .. }));
    assert_eq!(progress.len(), 6);
    assert!(progress.iter().all(|e| !e.is_terminal()));

    let percents: Vec<u8> = progress.iter().filter_map(|e| e.percent()).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn stream_is_lazy() {
    let rewriter = ScriptedRewriter::echo();
    let engine = ParaphraseEngine::new(rewriter.clone(), &config(40, 0, 0));

    let mut events = engine.paraphrase(THREE_PARAGRAPHS, &StyleConfig::default());
    assert!(rewriter.calls().is_empty());

    let first = events.next().await.unwrap();
    assert_eq!(first, ProgressEvent::progress(1, 3));
    assert_eq!(rewriter.calls().len(), 1);

    // Abandoning the stream means no further chunks are sent.
    drop(events);
    assert_eq!(rewriter.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn in_flight_call_finishes_after_stream_is_dropped() {
    let rewriter = Arc::new(SlowRewriter::default());
    let engine = ParaphraseEngine::new(rewriter.clone(), &config(40, 0, 0));

    let mut events = engine.paraphrase(THREE_PARAGRAPHS, &StyleConfig::default());
    let first = tokio::time::timeout(Duration::from_secs(1), events.next()).await;
    assert!(first.is_err(), "first chunk should still be in flight");
    drop(events);

    tokio::time::sleep(Duration::from_secs(10)).await;
    // The dispatched call completed; no later chunk was started.
    assert_eq!(rewriter.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn chunks_are_spaced_by_the_configured_delay() {
    let engine = ParaphraseEngine::new(ScriptedRewriter::echo(), &config(40, 0, 1000));

    let start = tokio::time::Instant::now();
    let events = collect(&engine, THREE_PARAGRAPHS).await;
    let elapsed = start.elapsed();

    assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
    // Two pauses between three chunks, none after the last.
    assert!(elapsed >= Duration::from_millis(2000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3000), "{elapsed:?}");
}

#[tokio::test]
async fn one_engine_serves_concurrent_runs() {
    let engine = ParaphraseEngine::new(ScriptedRewriter::echo(), &config(40, 0, 0));

    let (a, b) = tokio::join!(
        collect(&engine, THREE_PARAGRAPHS),
        collect(&engine, "Only one paragraph.")
    );

    assert_eq!(
        a.last(),
        Some(&ProgressEvent::Complete {
            result: THREE_PARAGRAPHS.to_string()
        })
    );
    assert_eq!(
        b.last(),
        Some(&ProgressEvent::Complete {
            result: "Only one paragraph.".to_string()
        })
    );
}

#[test]
fn engine_can_be_driven_from_sync_code() {
    let engine = ParaphraseEngine::new(ScriptedRewriter::echo(), &config(4000, 200, 0));
    let events = tokio_test::block_on(collect(&engine, "Plain sentence."));
    assert_eq!(events.len(), 2);
}
