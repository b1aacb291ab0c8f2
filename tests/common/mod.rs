#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use url::Url;
use zipfips::{Error, Fetcher, MergedRecord, Result, Sink};

pub const GAZETTEER_URL: &str = "https://fips.test/fips.txt";
pub const CROSSWALK_TEMPLATE: &str = "https://hud.test/ZIP_COUNTY_{month}{year}.csv";

pub fn init_test_logging() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,zipfips=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Serves canned bodies by URL; anything else is a 404-style network error.
#[derive(Default)]
pub struct StubFetcher {
    bodies: HashMap<String, Vec<u8>>,
    pub calls: RefCell<Vec<String>>,
}

impl StubFetcher {
    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| u.as_str() == url).count()
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.calls.borrow_mut().push(url.to_string());
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network {
                url: url.to_string(),
                reason: "HTTP status 404 Not Found".into(),
            })
    }
}

/// Keeps every `persist` call in memory.
#[derive(Default)]
pub struct CaptureSink {
    pub batches: Vec<Vec<MergedRecord>>,
}

impl Sink for CaptureSink {
    fn persist(&mut self, records: &[MergedRecord]) -> Result<()> {
        self.batches.push(records.to_vec());
        Ok(())
    }
}

pub fn crosswalk_url(year: i32, month: &str) -> String {
    format!("https://hud.test/ZIP_COUNTY_{}{}.csv", month, year)
}

pub fn gazetteer_text(counties: &[(&str, &str)]) -> String {
    let mut s = String::from(
        "     state-level    place\n     FIPS code      name\n\n    01        ALABAMA\n\n  FIPS code        name\n\n",
    );
    for (code, name) in counties {
        s.push_str(&format!("    {}        {}\n", code, name));
    }
    s
}
