//! In-memory reference backend.
//!
//! Implements [`QueryService`] and [`MutationService`] against records held
//! in process, reproducing the server semantics the client core depends on:
//! all-terms name search, ordering with the record-identity tie-break that
//! keeps pagination a total order, opaque offset cursors, the reviewed
//! guard on adjustment updates, both review cascades, and the asynchronous
//! CSV export job. Used by the CLI and by integration tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{AdbookError, Result};
use crate::query::{Direction, OrderBy, QueryVariables, SearchField, SortField};
use crate::types::{Campaign, ExportStatus, Exportation, LineItem};

use super::{LineItemEdge, LineItemPage, MutationService, PageInfo, PageRequest, QueryService};

const CURSOR_PREFIX: &str = "offset:";

fn encode_cursor(offset: usize) -> String {
    format!("{CURSOR_PREFIX}{offset}")
}

fn decode_cursor(cursor: &str) -> Result<usize> {
    cursor
        .strip_prefix(CURSOR_PREFIX)
        .and_then(|rest| rest.parse().ok())
        .ok_or_else(|| AdbookError::InvalidCursor(cursor.to_string()))
}

/// Case-insensitive all-terms match, standing in for the full-text index's
/// `operator: and` query.
fn matches_all_terms(haystack: &str, query: &str) -> bool {
    let haystack = haystack.to_lowercase();
    query
        .split_whitespace()
        .all(|term| haystack.contains(&term.to_lowercase()))
}

#[derive(Debug, Default)]
struct Inner {
    campaigns: Vec<Campaign>,
    line_items: Vec<LineItem>,
    exportations: HashMap<String, Exportation>,
}

impl Inner {
    fn campaign_name(&self, id: u64) -> &str {
        self.campaigns
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
            .unwrap_or("")
    }

    fn recompute_campaign_flag(&mut self, campaign_id: u64) {
        let reviewed = {
            let mut siblings = self.line_items.iter().filter(|i| i.campaign_id == campaign_id);
            let mut any = false;
            let all = siblings.all(|i| {
                any = true;
                i.reviewed
            });
            any && all
        };
        if let Some(campaign) = self.campaigns.iter_mut().find(|c| c.id == campaign_id) {
            campaign.reviewed = reviewed;
        }
    }

    fn matching_indices(&self, variables: &QueryVariables) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.line_items.len())
            .filter(|&idx| {
                let item = &self.line_items[idx];
                if let Some(campaign_id) = variables.campaign {
                    return item.campaign_id == campaign_id;
                }
                if let Some(search) = &variables.search {
                    return match search.field {
                        SearchField::LineItem => matches_all_terms(&item.name, &search.value),
                        SearchField::Campaign => {
                            matches_all_terms(self.campaign_name(item.campaign_id), &search.value)
                        }
                    };
                }
                true
            })
            .collect();

        self.sort_indices(&mut indices, variables.order_by);
        indices
    }

    /// Order matching records. An explicit sort always carries the `id`
    /// secondary key so the order is total; without one, records come back
    /// most-recent-first by identity.
    fn sort_indices(&self, indices: &mut [usize], order_by: Option<OrderBy>) {
        match order_by {
            Some(OrderBy { field, direction }) => {
                indices.sort_by(|&a, &b| {
                    let ordering = self.compare_field(&self.line_items[a], &self.line_items[b], field);
                    let ordering = match direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    };
                    ordering.then(self.line_items[a].id.cmp(&self.line_items[b].id))
                });
            }
            None => {
                indices.sort_by(|&a, &b| self.line_items[b].id.cmp(&self.line_items[a].id));
            }
        }
    }

    fn compare_field(&self, a: &LineItem, b: &LineItem, field: SortField) -> Ordering {
        match field {
            SortField::Name => a.name.cmp(&b.name),
            SortField::BookedAmount => a.booked_amount.total_cmp(&b.booked_amount),
            SortField::ActualAmount => a.actual_amount.total_cmp(&b.actual_amount),
            SortField::Adjustments => a.adjustments.total_cmp(&b.adjustments),
            SortField::CampaignName => self
                .campaign_name(a.campaign_id)
                .cmp(self.campaign_name(b.campaign_id)),
            SortField::BillableAmount => a.billable_amount().total_cmp(&b.billable_amount()),
        }
    }
}

/// Shared-state in-memory service. Cloning shares the same records, so the
/// export job and its poller observe one another.
#[derive(Clone)]
pub struct InMemoryService {
    inner: Arc<Mutex<Inner>>,
    export_dir: PathBuf,
}

impl InMemoryService {
    pub fn new(campaigns: Vec<Campaign>, line_items: Vec<LineItem>, export_dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                campaigns,
                line_items,
                exportations: HashMap::new(),
            })),
            export_dir,
        }
    }

    /// Seeded demo dataset for the CLI.
    pub fn with_sample_data() -> Self {
        const CAMPAIGN_NAMES: [&str; 6] = [
            "Satterfield-Turcotte : Multi-channeled next generation analyzer",
            "Haley-Bins : Ergonomic fault-tolerant challenge",
            "Koss & Sons : Streamlined full-range instruction set",
            "Mante Group : Future-proofed zero tolerance focus group",
            "Erdman Inc : Universal well-modulated customer loyalty",
            "Rolfson LLC : Open-source methodical productivity",
        ];
        const ADJECTIVES: [&str; 5] = ["Awesome", "Incredible", "Sleek", "Rustic", "Small"];
        const MATERIALS: [&str; 4] = ["Plastic", "Granite", "Cotton", "Steel"];
        const PRODUCTS: [&str; 5] = ["Car", "Chair", "Lamp", "Table", "Keyboard"];

        let campaigns: Vec<Campaign> = CAMPAIGN_NAMES
            .iter()
            .enumerate()
            .map(|(idx, name)| Campaign {
                id: idx as u64 + 1,
                name: (*name).to_string(),
                reviewed: false,
            })
            .collect();

        let line_items: Vec<LineItem> = (0..120u64)
            .map(|n| {
                let id = n + 1;
                let name = format!(
                    "{} {} {}",
                    ADJECTIVES[(n % 5) as usize],
                    MATERIALS[(n / 5 % 4) as usize],
                    PRODUCTS[(n / 20 % 5) as usize],
                );
                // Deterministic pseudo-spread, no RNG dependency
                let booked = 50_000.0 + (id * 7919 % 100_000) as f64;
                let actual = booked * (0.8 + (id * 31 % 40) as f64 / 100.0);
                LineItem {
                    id,
                    name,
                    booked_amount: (booked * 100.0).round() / 100.0,
                    actual_amount: (actual * 100.0).round() / 100.0,
                    adjustments: 0.0,
                    reviewed: false,
                    campaign_id: n % 6 + 1,
                    created_at: "2026-08-01T00:00:00Z".to_string(),
                    updated_at: "2026-08-01T00:00:00Z".to_string(),
                }
            })
            .collect();

        Self::new(
            campaigns,
            line_items,
            std::env::temp_dir().join("adbook-exports"),
        )
    }

    fn write_export_csv(&self, token: &str, campaign_id: Option<u64>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join(format!("{token}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record([
            "id",
            "name",
            "campaign_id",
            "campaign_name",
            "booked_amount",
            "actual_amount",
            "adjustments",
        ])?;

        let inner = self.inner.lock();
        for item in &inner.line_items {
            if campaign_id.is_some_and(|id| item.campaign_id != id) {
                continue;
            }
            writer.write_record([
                item.id.to_string(),
                item.name.clone(),
                item.campaign_id.to_string(),
                inner.campaign_name(item.campaign_id).to_string(),
                item.booked_amount.to_string(),
                item.actual_amount.to_string(),
                item.adjustments.to_string(),
            ])?;
        }
        drop(inner);

        writer.flush()?;
        Ok(path)
    }
}

impl QueryService for InMemoryService {
    async fn fetch_line_items(&self, request: &PageRequest) -> Result<LineItemPage> {
        let inner = self.inner.lock();

        let campaign = match request.variables.campaign {
            Some(id) => Some(
                inner
                    .campaigns
                    .iter()
                    .find(|c| c.id == id)
                    .cloned()
                    .ok_or_else(|| AdbookError::CampaignNotFound(id.to_string()))?,
            ),
            None => None,
        };

        let indices = inner.matching_indices(&request.variables);
        let total: f64 = indices
            .iter()
            .map(|&idx| inner.line_items[idx].billable_amount())
            .sum();

        let offset = match &request.after {
            Some(cursor) => decode_cursor(cursor)?,
            None => 0,
        };
        let page_size = request.page_size() as usize;

        let edges: Vec<LineItemEdge> = indices
            .iter()
            .enumerate()
            .skip(offset)
            .take(page_size)
            .map(|(position, &idx)| LineItemEdge {
                cursor: encode_cursor(position + 1),
                node: inner.line_items[idx].clone(),
            })
            .collect();

        let loaded = offset + edges.len();
        let page_info = PageInfo {
            has_next_page: loaded < indices.len(),
            end_cursor: (!edges.is_empty()).then(|| encode_cursor(loaded)),
        };

        Ok(LineItemPage {
            edges,
            page_info,
            total,
            campaign,
        })
    }

    async fn fetch_exportation(&self, token: &str) -> Result<Exportation> {
        self.inner
            .lock()
            .exportations
            .get(token)
            .cloned()
            .ok_or_else(|| AdbookError::ExportNotFound(token.to_string()))
    }
}

impl MutationService for InMemoryService {
    async fn update_adjustments(&self, id: u64, value: f64) -> Result<LineItem> {
        let mut inner = self.inner.lock();
        let item = inner
            .line_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AdbookError::LineItemNotFound(id.to_string()))?;
        if item.reviewed {
            return Err(AdbookError::LineItemReviewed);
        }
        item.adjustments = value;
        Ok(item.clone())
    }

    async fn review_line_item(&self, id: u64, revoke: bool) -> Result<LineItem> {
        let mut inner = self.inner.lock();
        let item = inner
            .line_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AdbookError::LineItemNotFound(id.to_string()))?;
        item.reviewed = !revoke;
        let (updated, campaign_id) = (item.clone(), item.campaign_id);
        inner.recompute_campaign_flag(campaign_id);
        Ok(updated)
    }

    async fn review_campaign(&self, id: u64, revoke: bool) -> Result<Campaign> {
        let mut inner = self.inner.lock();
        let campaign = inner
            .campaigns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AdbookError::CampaignNotFound(id.to_string()))?;
        campaign.reviewed = !revoke;
        let updated = campaign.clone();
        for item in inner.line_items.iter_mut().filter(|i| i.campaign_id == id) {
            item.reviewed = !revoke;
        }
        Ok(updated)
    }

    async fn export(&self, campaign_id: Option<u64>) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.inner.lock().exportations.insert(
            token.clone(),
            Exportation {
                token: token.clone(),
                status: ExportStatus::Waiting,
                url: None,
            },
        );

        // Background job: write the file, then flip waiting -> finished
        let service = self.clone();
        let job_token = token.clone();
        tokio::spawn(async move {
            let result = service.write_export_csv(&job_token, campaign_id);
            let mut inner = service.inner.lock();
            if let Some(exportation) = inner.exportations.get_mut(&job_token) {
                match result {
                    Ok(path) => {
                        exportation.status = ExportStatus::Finished;
                        exportation.url = Some(path.display().to_string());
                    }
                    Err(e) => {
                        tracing::warn!("export job {job_token} failed: {e}");
                    }
                }
            }
        });

        Ok(token)
    }
}
