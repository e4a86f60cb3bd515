use super::*;
use crate::error::Error;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Page source that replays a fixed script of responses, then repeats `fallback`
struct ScriptedSource {
    script: Mutex<Vec<std::result::Result<String, String>>>,
    fallback: String,
    polls: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Vec<std::result::Result<&str, &str>>, fallback: &str) -> Self {
        let mut script: Vec<_> = script
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        script.reverse();
        Self {
            script: Mutex::new(script),
            fallback: fallback.to_string(),
            polls: AtomicUsize::new(0),
        }
    }

    fn always(page: &str) -> Self {
        Self::new(vec![], page)
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self) -> Result<String> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop() {
            Some(Ok(page)) => Ok(page),
            Some(Err(msg)) => Err(Error::Other(msg)),
            None => Ok(self.fallback.clone()),
        }
    }
}

const PAGE_A: &str = r#"[\x22http://x/a.jpg\x22,\x22Ann\x22]"#;
const PAGE_B: &str = r#"[\x22http://x/b.jpg\x22,\x22Bob\x22]"#;
const PAGE_AB: &str = r#"[\x22http://x/a.jpg\x22,\x22Ann\x22][\x22http://x/b.jpg\x22,\x22Bob\x22]"#;

#[tokio::test]
async fn discover_once_parses_a_single_poll() {
    let discovery = Discovery::new(ScriptedSource::always(PAGE_AB), Quality::High);

    let batch = discovery.discover_once().await.unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].author(), "Ann");
    assert_eq!(discovery.source().polls(), 1);
}

#[tokio::test]
async fn discover_once_propagates_fetch_errors() {
    let source = ScriptedSource::new(vec![Err("connection reset")], "");
    let discovery = Discovery::new(source, Quality::High);

    assert!(discovery.discover_once().await.is_err());
}

#[tokio::test]
async fn identical_polls_do_not_grow_the_working_set() {
    let discovery =
        Discovery::new(ScriptedSource::always(PAGE_A), Quality::High).with_limits(2, 5);

    let set = discovery.discover_all().await;

    assert_eq!(discovery.source().polls(), 2);
    assert_eq!(set.len(), 1);
}

#[tokio::test]
async fn merges_overlapping_polls_in_first_seen_order() {
    let source = ScriptedSource::new(vec![Ok(PAGE_B), Ok(PAGE_AB), Ok(PAGE_A)], PAGE_AB);
    let discovery = Discovery::new(source, Quality::High);

    let set = discovery.discover_all().await;

    let names: Vec<String> = set.iter().map(Entry::canonical_name).collect();
    assert_eq!(names, ["b.jpg", "a.jpg"]);
}

#[tokio::test]
async fn runs_to_the_iteration_cap_while_polls_return_entries() {
    let discovery = Discovery::new(ScriptedSource::always(PAGE_AB), Quality::High);

    let set = discovery.discover_all().await;

    assert_eq!(discovery.source().polls(), MAX_ITERATIONS);
    assert_eq!(set.len(), 2);
}

#[tokio::test]
async fn stops_early_after_repeated_empty_polls() {
    let discovery = Discovery::new(ScriptedSource::always("<html></html>"), Quality::High);

    let set = discovery.discover_all().await;

    // The loop continues while the streak is at most the threshold
    assert_eq!(discovery.source().polls(), EMPTY_THRESHOLD + 1);
    assert!(discovery.source().polls() < MAX_ITERATIONS);
    assert!(set.is_empty());
}

#[tokio::test]
async fn fetch_errors_count_as_empty_polls() {
    let source = ScriptedSource::new(
        vec![Err("timeout"), Ok(PAGE_A), Err("timeout")],
        "",
    );
    let discovery = Discovery::new(source, Quality::High);

    let set = discovery.discover_all().await;

    // 2 errors + 4 empty fallbacks reach the streak limit of 6; plus the one good poll
    assert_eq!(discovery.source().polls(), EMPTY_THRESHOLD + 2);
    assert_eq!(set.len(), 1);
}

#[tokio::test]
async fn non_empty_polls_do_not_reset_the_empty_counter() {
    // Empty polls interleaved with productive ones still accumulate
    let source = ScriptedSource::new(
        vec![
            Ok(""),
            Ok(PAGE_A),
            Ok(""),
            Ok(PAGE_A),
            Ok(""),
            Ok(PAGE_B),
            Ok(""),
            Ok(PAGE_A),
            Ok(""),
            Ok(PAGE_A),
            Ok(""),
        ],
        PAGE_A,
    );
    let discovery = Discovery::new(source, Quality::High);

    let set = discovery.discover_all().await;

    assert_eq!(discovery.source().polls(), 11);
    assert_eq!(set.len(), 2);
}

#[tokio::test]
async fn limits_come_from_config() {
    let config = Config {
        max_iterations: 3,
        empty_threshold: 0,
        quality: Quality::Low,
        ..Config::default()
    };
    let source = ScriptedSource::always("[http://x/s1280-w1280-c-h720/a.jpg,Ann]");
    let discovery = Discovery::from_config(source, &config);

    let set = discovery.discover_all().await;

    assert_eq!(discovery.source().polls(), 3);
    assert_eq!(set.as_slice()[0].source_ref(), "http://x/s720/a.jpg");
}

#[tokio::test]
async fn zero_threshold_stops_after_first_empty_poll() {
    let discovery =
        Discovery::new(ScriptedSource::always(""), Quality::High).with_limits(30, 0);

    discovery.discover_all().await;

    assert_eq!(discovery.source().polls(), 1);
}
