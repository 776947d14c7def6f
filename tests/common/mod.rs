//! Scripted browser driver for integration tests.
//!
//! A `MockDriver` serves a sequence of canned pages: the snapshot, button
//! and consent scans, page-state captures and mutation counters all come
//! from the current page; every click advances to the next page in the
//! queue and delivers that page's responses into the capture buffer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use autoform::dom::{scripts, BoundingBox, ElementDescriptor};
use autoform::driver::{BrowserDriver, ElementState, LoadState, ResponseRecord, SelectTarget};
use autoform::errors::DriverError;

#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub url: String,
    pub title: String,
    pub body_text: String,
    pub content: String,
    pub snapshot: serde_json::Value,
    pub buttons: serde_json::Value,
    pub consent: serde_json::Value,
    pub page_state: serde_json::Value,
    pub mutations: serde_json::Value,
    pub responses: Vec<ResponseRecord>,
}

impl MockPage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: "Contact".into(),
            content: "<html><body></body></html>".into(),
            snapshot: serde_json::json!({"url": url, "elements": []}),
            buttons: serde_json::json!([]),
            consent: serde_json::json!([]),
            page_state: serde_json::json!({"url": url}),
            mutations: serde_json::json!({"mutations": 0, "significant": 0}),
            ..Default::default()
        }
    }
}

struct MockState {
    current: MockPage,
    queue: Vec<MockPage>,
    captured: Vec<ResponseRecord>,
    capture_armed: bool,
    filled: HashMap<String, String>,
    checked: HashMap<String, bool>,
    clicks: Vec<String>,
    goto_status: u16,
    closed: bool,
}

pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new(initial: MockPage) -> Self {
        Self {
            state: Mutex::new(MockState {
                current: initial,
                queue: Vec::new(),
                captured: Vec::new(),
                capture_armed: false,
                filled: HashMap::new(),
                checked: HashMap::new(),
                clicks: Vec::new(),
                goto_status: 200,
                closed: false,
            }),
        }
    }

    /// Queues the page served after the next click.
    pub fn push_page(&self, page: MockPage) {
        self.state.lock().unwrap().queue.push(page);
    }

    pub fn set_goto_status(&self, status: u16) {
        self.state.lock().unwrap().goto_status = status;
    }

    pub fn filled_value(&self, selector: &str) -> Option<String> {
        self.state.lock().unwrap().filled.get(selector).cloned()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn was_checked(&self, selector: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .checked
            .get(selector)
            .copied()
            .unwrap_or(false)
    }

    fn advance(state: &mut MockState) {
        if !state.queue.is_empty() {
            state.current = state.queue.remove(0);
            if state.capture_armed {
                let responses = state.current.responses.clone();
                state.captured.extend(responses);
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<u16, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.current.url = url.to_string();
        Ok(state.goto_status)
    }

    async fn wait_for_load_state(
        &self,
        _state: LoadState,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn evaluate(
        &self,
        script: &str,
        _args: serde_json::Value,
    ) -> Result<serde_json::Value, DriverError> {
        let state = self.state.lock().unwrap();
        let value = if script == scripts::COLLECT_SNAPSHOT {
            state.current.snapshot.clone()
        } else if script == scripts::SCAN_BUTTONS {
            state.current.buttons.clone()
        } else if script == scripts::SCAN_CONSENT {
            state.current.consent.clone()
        } else if script == scripts::PAGE_STATE {
            state.current.page_state.clone()
        } else if script == scripts::POLL_MUTATIONS {
            state.current.mutations.clone()
        } else if script == scripts::ARM_MUTATION_OBSERVER
            || script == scripts::DISARM_MUTATION_OBSERVER
        {
            serde_json::json!(true)
        } else if script == scripts::CLICK_ELEMENT {
            serde_json::json!(true)
        } else {
            serde_json::Value::Null
        };
        Ok(value)
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().current.url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().current.title.clone())
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().current.body_text.clone())
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().current.content.clone())
    }

    async fn count(&self, _selector: &str) -> Result<usize, DriverError> {
        Ok(0)
    }

    async fn is_visible(&self, _selector: &str) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn is_enabled(&self, _selector: &str) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn is_checked(&self, selector: &str) -> Result<bool, DriverError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .checked
            .get(selector)
            .copied()
            .unwrap_or(false))
    }

    async fn bounding_box(&self, _selector: &str) -> Result<Option<BoundingBox>, DriverError> {
        Ok(None)
    }

    async fn text_content(&self, _selector: &str) -> Result<Option<String>, DriverError> {
        Ok(None)
    }

    async fn get_attribute(
        &self,
        _selector: &str,
        _name: &str,
    ) -> Result<Option<String>, DriverError> {
        Ok(None)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .filled
            .insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn check(&self, selector: &str) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .checked
            .insert(selector.to_string(), true);
        Ok(())
    }

    async fn uncheck(&self, selector: &str) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .checked
            .insert(selector.to_string(), false);
        Ok(())
    }

    async fn select_option(
        &self,
        selector: &str,
        target: SelectTarget,
    ) -> Result<(), DriverError> {
        let rendered = match target {
            SelectTarget::Value(v) => v,
            SelectTarget::Label(l) => l,
            SelectTarget::Index(i) => i.to_string(),
        };
        self.state
            .lock()
            .unwrap()
            .filled
            .insert(selector.to_string(), rendered);
        Ok(())
    }

    async fn click(&self, selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(selector.to_string());
        Self::advance(&mut state);
        Ok(())
    }

    async fn scroll_into_view(&self, _selector: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for(
        &self,
        _selector: &str,
        _state: ElementState,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn begin_response_capture(&self) {
        let mut state = self.state.lock().unwrap();
        state.capture_armed = true;
        state.captured.clear();
    }

    async fn collect_responses(&self) -> Vec<ResponseRecord> {
        let mut state = self.state.lock().unwrap();
        state.capture_armed = false;
        std::mem::take(&mut state.captured)
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Visible input descriptor with a stable selector.
pub fn input_el(name: &str, ty: &str) -> ElementDescriptor {
    ElementDescriptor {
        tag_name: "input".into(),
        input_type: ty.into(),
        name: name.into(),
        selector: format!("input[name=\"{name}\"]"),
        visible: true,
        enabled: true,
        ..Default::default()
    }
}

pub fn textarea_el(name: &str) -> ElementDescriptor {
    ElementDescriptor {
        tag_name: "textarea".into(),
        name: name.into(),
        selector: format!("textarea[name=\"{name}\"]"),
        visible: true,
        enabled: true,
        ..Default::default()
    }
}

/// Snapshot JSON in the shape the collect script produces.
pub fn snapshot_json(url: &str, elements: &[ElementDescriptor]) -> serde_json::Value {
    serde_json::json!({
        "url": url,
        "formSelector": "form",
        "formBounds": {"x": 0.0, "y": 0.0, "width": 800.0, "height": 600.0},
        "elements": elements,
        "labelFor": {},
        "dtddIndex": [],
        "thtdIndex": [],
        "textNodes": []
    })
}

pub fn button_json(text: &str, selector: &str) -> serde_json::Value {
    serde_json::json!([{
        "selector": selector,
        "tagName": "button",
        "type": "submit",
        "text": text,
        "visible": true,
        "enabled": true,
        "boundingBox": {"x": 100.0, "y": 500.0, "width": 120.0, "height": 40.0}
    }])
}

pub fn page_state_json(url: &str, submit_present: bool) -> serde_json::Value {
    serde_json::json!({
        "url": url,
        "title": "Contact",
        "formCount": 1,
        "visibleInputs": 4,
        "fieldValues": [],
        "submitPresent": submit_present,
        "submitDisabled": false
    })
}

/// The client record used across the scenario tests.
pub fn client_json() -> serde_json::Value {
    serde_json::json!({
        "client": {
            "company_name": "株式会社テスト",
            "last_name": "山田",
            "first_name": "太郎",
            "last_name_kana": "ヤマダ",
            "first_name_kana": "タロウ",
            "email_1": "taro@example.com",
            "phone_1": "03",
            "phone_2": "1234",
            "phone_3": "5678",
            "message": "テスト送信"
        },
        "targeting": {"id": 1}
    })
}
