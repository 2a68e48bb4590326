// In-memory page with scripted rendering, for unit tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::page::{Key, Page};

pub(crate) const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FakeHandle {
    pub index: usize,
    pub locator: String,
}

enum Appearance {
    Always,
    Never,
    /// Rendered `delay` after an element matching `trigger` is clicked
    AfterClick { trigger: String, delay: Duration },
}

struct FakeElement {
    selectors: Vec<String>,
    appearance: Appearance,
}

#[derive(Default)]
struct FakeState {
    url: Option<String>,
    clicked: HashMap<String, Instant>,
    values: HashMap<usize, String>,
    events: Vec<String>,
}

pub(crate) struct FakePage {
    elements: Vec<FakeElement>,
    failing_clicks: Vec<String>,
    failing_scrolls: Vec<String>,
    ready: bool,
    failing_capture: bool,
    closed: Arc<AtomicBool>,
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            failing_clicks: Vec::new(),
            failing_scrolls: Vec::new(),
            ready: true,
            failing_capture: false,
            closed: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(FakeState::default()),
        }
    }

    fn push(mut self, selectors: &[&str], appearance: Appearance) -> Self {
        self.elements.push(FakeElement {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            appearance,
        });
        self
    }

    /// Always-visible element
    pub fn element(self, selector: &str) -> Self {
        self.push(&[selector], Appearance::Always)
    }

    /// Present in the DOM but never visible
    pub fn hidden_element(self, selector: &str) -> Self {
        self.push(&[selector], Appearance::Never)
    }

    pub fn element_after_click(self, selector: &str, trigger: &str, delay: Duration) -> Self {
        self.push(
            &[selector],
            Appearance::AfterClick {
                trigger: trigger.to_string(),
                delay,
            },
        )
    }

    pub fn failing_click(mut self, selector: &str) -> Self {
        self.failing_clicks.push(selector.to_string());
        self
    }

    pub fn failing_scroll(mut self, selector: &str) -> Self {
        self.failing_scrolls.push(selector.to_string());
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn failing_capture(mut self) -> Self {
        self.failing_capture = true;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        let index = self
            .elements
            .iter()
            .position(|e| e.selectors.iter().any(|s| s == selector))?;
        self.state.lock().unwrap().values.get(&index).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stays readable after the page itself has been dropped
    pub fn close_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    fn is_visible(&self, element: &FakeElement, state: &FakeState) -> bool {
        match &element.appearance {
            Appearance::Always => true,
            Appearance::Never => false,
            Appearance::AfterClick { trigger, delay } => state
                .clicked
                .get(trigger)
                .is_some_and(|at| Instant::now() >= *at + *delay),
        }
    }

    fn record(&self, event: String) {
        self.state.lock().unwrap().events.push(event);
    }
}

#[async_trait]
impl Page for FakePage {
    type Element = FakeHandle;

    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.url = Some(url.to_string());
        state.events.push(format!("goto {url}"));
        Ok(())
    }

    async fn is_ready(&self) -> Result<bool> {
        Ok(self.ready)
    }

    async fn find_visible(&self, locator: &str) -> Result<Option<FakeHandle>> {
        if locator.starts_with("!!") {
            anyhow::bail!("invalid selector: {}", locator);
        }
        let state = self.state.lock().unwrap();
        Ok(self
            .elements
            .iter()
            .enumerate()
            .find(|(_, e)| e.selectors.iter().any(|s| s == locator) && self.is_visible(e, &state))
            .map(|(index, _)| FakeHandle {
                index,
                locator: locator.to_string(),
            }))
    }

    async fn scroll_into_view(&self, element: &FakeHandle) -> Result<()> {
        if self.failing_scrolls.contains(&element.locator) {
            anyhow::bail!("element {} is detached", element.locator);
        }
        self.record(format!("scroll {}", element.locator));
        Ok(())
    }

    async fn click(&self, element: &FakeHandle) -> Result<()> {
        if self.failing_clicks.contains(&element.locator) {
            anyhow::bail!("element {} is not interactable", element.locator);
        }
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        for selector in &self.elements[element.index].selectors {
            state.clicked.insert(selector.clone(), now);
        }
        state.events.push(format!("click {}", element.locator));
        Ok(())
    }

    async fn fill(&self, element: &FakeHandle, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.values.insert(element.index, text.to_string());
        state.events.push(format!("fill {} {}", element.locator, text));
        Ok(())
    }

    async fn press_key(&self, target: Option<&FakeHandle>, key: Key) -> Result<()> {
        let target = target.map_or("active", |t| t.locator.as_str());
        self.record(format!("key {target} {key:?}"));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        if self.failing_capture {
            anyhow::bail!("screenshot failed");
        }
        self.record("screenshot".to_string());
        Ok(FAKE_PNG.to_vec())
    }

    async fn html(&self) -> Result<String> {
        if self.failing_capture {
            anyhow::bail!("page source unavailable");
        }
        let state = self.state.lock().unwrap();
        let mut body = String::new();
        for (index, element) in self.elements.iter().enumerate() {
            if self.is_visible(element, &state) {
                let value = state.values.get(&index).map(String::as_str).unwrap_or("");
                body.push_str(&format!(
                    "<div data-sel=\"{}\">{}</div>",
                    element.selectors.join(" | "),
                    value
                ));
            }
        }
        Ok(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            state.url.as_deref().unwrap_or("about:blank"),
            body
        ))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.record("close".to_string());
        Ok(())
    }
}
