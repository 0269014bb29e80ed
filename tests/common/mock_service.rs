//! Scripted mock of the query/mutation services.
//!
//! Pages are served from a queue in order; every request and mutation call
//! is recorded so tests can assert on exactly what went over the wire.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use adbook::{
    AdbookError, Campaign, ExportStatus, Exportation, LineItem, LineItemPage, MutationService,
    PageRequest, QueryService, Result,
};

use super::mock_data::{mock_campaign, mock_line_item};

#[derive(Default)]
struct MockInner {
    pages: VecDeque<LineItemPage>,
    exportations: VecDeque<Exportation>,
    fail_next_fetch: bool,
    fail_mutations: bool,

    fetch_requests: Vec<PageRequest>,
    adjustment_calls: Vec<(u64, f64)>,
    review_calls: Vec<(u64, bool)>,
    campaign_review_calls: Vec<(u64, bool)>,
    export_calls: Vec<Option<u64>>,
}

#[derive(Clone, Default)]
pub struct MockService {
    inner: Arc<Mutex<MockInner>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_page(&self, page: LineItemPage) {
        self.inner.lock().pages.push_back(page);
    }

    pub fn enqueue_exportation(&self, status: ExportStatus, url: Option<&str>) {
        self.inner.lock().exportations.push_back(Exportation {
            token: "tok-1".to_string(),
            status,
            url: url.map(str::to_string),
        });
    }

    pub fn fail_next_fetch(&self) {
        self.inner.lock().fail_next_fetch = true;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.inner.lock().fail_mutations = fail;
    }

    pub fn fetch_requests(&self) -> Vec<PageRequest> {
        self.inner.lock().fetch_requests.clone()
    }

    pub fn adjustment_calls(&self) -> Vec<(u64, f64)> {
        self.inner.lock().adjustment_calls.clone()
    }

    pub fn review_calls(&self) -> Vec<(u64, bool)> {
        self.inner.lock().review_calls.clone()
    }

    pub fn campaign_review_calls(&self) -> Vec<(u64, bool)> {
        self.inner.lock().campaign_review_calls.clone()
    }

    pub fn export_calls(&self) -> Vec<Option<u64>> {
        self.inner.lock().export_calls.clone()
    }
}

impl QueryService for MockService {
    async fn fetch_line_items(&self, request: &PageRequest) -> Result<LineItemPage> {
        let mut inner = self.inner.lock();
        inner.fetch_requests.push(request.clone());
        if inner.fail_next_fetch {
            inner.fail_next_fetch = false;
            return Err(AdbookError::Service("scripted fetch failure".to_string()));
        }
        inner
            .pages
            .pop_front()
            .ok_or_else(|| AdbookError::Service("no scripted page".to_string()))
    }

    async fn fetch_exportation(&self, token: &str) -> Result<Exportation> {
        self.inner
            .lock()
            .exportations
            .pop_front()
            .ok_or_else(|| AdbookError::ExportNotFound(token.to_string()))
    }
}

impl MutationService for MockService {
    async fn update_adjustments(&self, id: u64, value: f64) -> Result<LineItem> {
        let mut inner = self.inner.lock();
        inner.adjustment_calls.push((id, value));
        if inner.fail_mutations {
            return Err(AdbookError::Service("scripted mutation failure".to_string()));
        }
        let mut item = mock_line_item(id);
        item.adjustments = value;
        Ok(item)
    }

    async fn review_line_item(&self, id: u64, revoke: bool) -> Result<LineItem> {
        let mut inner = self.inner.lock();
        inner.review_calls.push((id, revoke));
        if inner.fail_mutations {
            return Err(AdbookError::Service("scripted mutation failure".to_string()));
        }
        let mut item = mock_line_item(id);
        item.reviewed = !revoke;
        Ok(item)
    }

    async fn review_campaign(&self, id: u64, revoke: bool) -> Result<Campaign> {
        let mut inner = self.inner.lock();
        inner.campaign_review_calls.push((id, revoke));
        if inner.fail_mutations {
            return Err(AdbookError::Service("scripted mutation failure".to_string()));
        }
        Ok(mock_campaign(id, "Mock campaign", !revoke))
    }

    async fn export(&self, campaign_id: Option<u64>) -> Result<String> {
        self.inner.lock().export_calls.push(campaign_id);
        Ok("tok-1".to_string())
    }
}
