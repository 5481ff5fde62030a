//! Shared setup for the scenario suites.

#![allow(dead_code)]

use std::sync::Arc;
use todomvc_probe::prelude::*;
use todomvc_probe::sim::SimDriver;

/// Budgets small enough to keep failing assertions quick
pub fn fast_config() -> SuiteConfig {
    SuiteConfig {
        action_timeout_ms: 1_000,
        expect_timeout_ms: 1_000,
        poll_interval_ms: 10,
        ..SuiteConfig::default()
    }
}

/// A loaded app on a fresh simulated session
pub struct Harness {
    pub driver: Arc<SimDriver>,
    pub sink: Arc<MemorySink>,
    pub fixture: WebAppFixture,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(fast_config()).await
    }

    pub async fn with_config(config: SuiteConfig) -> Self {
        init_tracing();
        let driver = Arc::new(SimDriver::new());
        let sink = Arc::new(MemorySink::new());
        let fixture = WebAppFixture::setup(driver.clone(), sink.clone(), &config)
            .await
            .unwrap();
        Self {
            driver,
            sink,
            fixture,
        }
    }

    /// Same as [`Harness::new`] with every read lagging `frames` calls behind
    pub async fn settling(frames: usize) -> Self {
        let harness = Self::new().await;
        harness.driver.set_settle_frames(frames);
        harness
    }

    pub fn todos(&self) -> &TodoPage {
        self.fixture.todo_page()
    }

    pub fn page(&self) -> &Page {
        self.fixture.page()
    }

    /// Titles in the model, bypassing the DOM
    pub fn titles(&self) -> Vec<String> {
        self.driver.todos().into_iter().map(|t| t.title).collect()
    }
}
