//! Scripted driver for engine tests.
//!
//! Pages are described as selector → element trees, containers as scripted
//! height sequences, and feeds as element batches revealed per scroll. The
//! mock performs no waiting, so tests run at full speed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Driver, Wait};
use crate::error::{DriverError, DriverResult};

/// A scripted DOM element.
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    pub text: String,
    pub attrs: HashMap<String, String>,
    /// Child lookups by selector.
    pub children: HashMap<String, Vec<MockElement>>,
}

impl MockElement {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, selector: &str, element: MockElement) -> Self {
        self.children
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }
}

#[derive(Default)]
struct MockState {
    url: String,
    /// Always-visible elements by selector.
    elements: HashMap<String, Vec<MockElement>>,
    /// Per-URL element overrides; a selector scripted for a page shadows the
    /// global entry while that page is current.
    pages: HashMap<String, HashMap<String, Vec<MockElement>>>,
    /// Per-URL titles, shadowing the global title.
    page_titles: HashMap<String, String>,
    /// Elements revealed progressively: batch `i` becomes visible after `i`
    /// scrolls (batch 0 is visible immediately).
    staged: HashMap<String, Vec<Vec<MockElement>>>,
    /// Container height script: `heights[n]` is the height observed after
    /// `n` scrolls; the last value repeats once exhausted.
    heights: Vec<i64>,
    scrolls: usize,
    clicks: usize,
    navigations: Vec<String>,
}

#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().unwrap().url = url.to_string();
    }

    pub fn put(&self, selector: &str, elements: Vec<MockElement>) {
        self.state
            .lock()
            .unwrap()
            .elements
            .insert(selector.to_string(), elements);
    }

    /// Script `selector` for one URL only; takes effect after navigating
    /// there.
    pub fn put_on(&self, url: &str, selector: &str, elements: Vec<MockElement>) {
        self.state
            .lock()
            .unwrap()
            .pages
            .entry(url.to_string())
            .or_default()
            .insert(selector.to_string(), elements);
    }

    pub fn set_title_on(&self, url: &str, title: &str) {
        self.state
            .lock()
            .unwrap()
            .page_titles
            .insert(url.to_string(), title.to_string());
    }

    pub fn stage(&self, selector: &str, batches: Vec<Vec<MockElement>>) {
        self.state
            .lock()
            .unwrap()
            .staged
            .insert(selector.to_string(), batches);
    }

    pub fn set_heights(&self, heights: Vec<i64>) {
        let mut state = self.state.lock().unwrap();
        state.heights = heights;
        state.scrolls = 0;
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn click_count(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    /// True when no navigation, scroll, or click ever happened.
    pub fn untouched(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.navigations.is_empty() && state.scrolls == 0 && state.clicks == 0
    }

    fn visible(state: &MockState, selector: &str) -> Vec<MockElement> {
        if let Some(page) = state.pages.get(&state.url) {
            if let Some(elements) = page.get(selector) {
                return elements.clone();
            }
        }
        let mut out = state.elements.get(selector).cloned().unwrap_or_default();
        if let Some(batches) = state.staged.get(selector) {
            for batch in batches.iter().take(state.scrolls + 1) {
                out.extend(batch.iter().cloned());
            }
        }
        out
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Handle = MockElement;

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    async fn find(&self, selector: &str) -> DriverResult<Option<MockElement>> {
        let state = self.state.lock().unwrap();
        Ok(Self::visible(&state, selector).into_iter().next())
    }

    async fn find_all(&self, selector: &str) -> DriverResult<Vec<MockElement>> {
        let state = self.state.lock().unwrap();
        Ok(Self::visible(&state, selector))
    }

    async fn find_in(
        &self,
        scope: &MockElement,
        selector: &str,
    ) -> DriverResult<Option<MockElement>> {
        Ok(scope.children.get(selector).and_then(|v| v.first()).cloned())
    }

    async fn find_all_in(
        &self,
        scope: &MockElement,
        selector: &str,
    ) -> DriverResult<Vec<MockElement>> {
        Ok(scope.children.get(selector).cloned().unwrap_or_default())
    }

    async fn wait_until(&self, wait: Wait<'_>, timeout: Duration) -> DriverResult<MockElement> {
        match self.find(wait.selector()).await? {
            Some(el) => Ok(el),
            None => Err(DriverError::timeout(wait.selector().to_string(), timeout)),
        }
    }

    async fn scroll_to_bottom(&self, _container: &MockElement) -> DriverResult<()> {
        self.state.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn scroll_height(&self, _container: &MockElement) -> DriverResult<i64> {
        let state = self.state.lock().unwrap();
        if state.heights.is_empty() {
            return Ok(0);
        }
        let idx = state.scrolls.min(state.heights.len() - 1);
        Ok(state.heights[idx])
    }

    async fn read_attribute(
        &self,
        handle: &MockElement,
        name: &str,
    ) -> DriverResult<Option<String>> {
        Ok(handle.attrs.get(name).cloned())
    }

    async fn read_text(&self, handle: &MockElement) -> DriverResult<String> {
        Ok(handle.text.clone())
    }

    async fn click(&self, _handle: &MockElement) -> DriverResult<()> {
        self.state.lock().unwrap().clicks += 1;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn title(&self) -> DriverResult<String> {
        let state = self.state.lock().unwrap();
        Ok(state.page_titles.get(&state.url).cloned().unwrap_or_default())
    }

    async fn pause(&self, _duration: Duration) {}
}
