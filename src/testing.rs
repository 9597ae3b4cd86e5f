//! Fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::app::{PresswireError, Result};
use crate::fetcher::{FeedSource, Fetcher, RetryPolicy};
use crate::normalizer::Normalizer;

pub const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
    <title>Pressemitteilungen Stadt Köln</title>
    <link>https://www.stadt-koeln.de</link>
    <description>RSS Feed der Pressemitteilungen</description>
    <item>
        <title>Stadt Köln informiert über Baustellen</title>
        <link>/pressemeldungen/123</link>
        <description><![CDATA[<p>Köln, den 15. Oktober 2024</p><p>Neue Baustellen in der Innenstadt</p>]]></description>
        <pubDate>Tue, 15 Oct 2024 10:30:00 +0200</pubDate>
        <category>Verkehr</category>
        <category>Baustellen</category>
        <guid isPermaLink="false">item-123</guid>
    </item>
    <item>
        <title>Neue Kulturveranstaltungen im November</title>
        <link>/pressemeldungen/124</link>
        <description>Köln präsentiert neue Kulturtermine für den November</description>
        <pubDate>Mon, 14 Oct 2024 14:15:00 +0200</pubDate>
        <category>Kultur</category>
        <guid isPermaLink="false">item-124</guid>
    </item>
    <item>
        <title>Kölner Zoo öffnet neue Anlage</title>
        <link>https://www.stadt-koeln.de/pressemeldungen/125</link>
        <content:encoded><![CDATA[<p>Moderne Anlage für afrikanische Tiere</p>]]></content:encoded>
        <pubDate>Sun, 13 Oct 2024 09:00:00 +0200</pubDate>
        <category>Tierpark</category>
        <guid isPermaLink="false">item-125</guid>
    </item>
</channel>
</rss>"#;

/// Minimal RSS document with one item per `(guid, title, category, pubDate)`.
pub fn rss(items: &[(&str, &str, &str, &str)]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Test</title>"#,
    );
    for (guid, title, category, date) in items {
        body.push_str(&format!(
            "<item><title>{title}</title><link>https://example.com/{guid}</link>\
             <guid>{guid}</guid><category>{category}</category>\
             <pubDate>{date}</pubDate></item>"
        ));
    }
    body.push_str("</channel></rss>");
    body
}

#[derive(Debug, Clone)]
pub enum Step {
    Body(String),
    Status(u16),
}

/// In-memory [`Fetcher`] replaying a fixed script of responses.
pub struct ScriptedFetcher {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedFetcher {
    pub fn always(body: impl Into<String>) -> Self {
        Self::script(Vec::new(), Step::Body(body.into()))
    }

    pub fn script(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Every call waits for (and consumes) a permit before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            Step::Body(body) => Ok(body.into_bytes()),
            Step::Status(code) => Err(PresswireError::UpstreamStatus(code)),
        }
    }
}

pub fn source(fetcher: Arc<ScriptedFetcher>, attempts: u32) -> FeedSource {
    FeedSource::new(
        fetcher,
        Normalizer::default(),
        RetryPolicy::new(attempts, Duration::from_millis(1)),
        "https://example.com/feed.xml",
    )
}
