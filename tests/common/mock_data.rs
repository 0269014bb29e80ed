//! Mock data builders for line items, campaigns, and pages.

#![allow(dead_code)]

use adbook::{Campaign, LineItem, LineItemEdge, LineItemPage, PageInfo};

/// Builder for test line items
pub struct LineItemBuilder {
    item: LineItem,
}

impl LineItemBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            item: LineItem {
                id,
                name: format!("Line item {id}"),
                booked_amount: 1000.0,
                actual_amount: 900.0,
                adjustments: 0.0,
                reviewed: false,
                campaign_id: 1,
                created_at: "2026-08-01T00:00:00Z".to_string(),
                updated_at: "2026-08-01T00:00:00Z".to_string(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.item.name = name.to_string();
        self
    }

    pub fn campaign(mut self, campaign_id: u64) -> Self {
        self.item.campaign_id = campaign_id;
        self
    }

    pub fn adjustments(mut self, adjustments: f64) -> Self {
        self.item.adjustments = adjustments;
        self
    }

    pub fn reviewed(mut self, reviewed: bool) -> Self {
        self.item.reviewed = reviewed;
        self
    }

    pub fn build(self) -> LineItem {
        self.item
    }
}

pub fn mock_line_item(id: u64) -> LineItem {
    LineItemBuilder::new(id).build()
}

pub fn mock_campaign(id: u64, name: &str, reviewed: bool) -> Campaign {
    Campaign {
        id,
        name: name.to_string(),
        reviewed,
    }
}

pub fn edge(item: LineItem) -> LineItemEdge {
    LineItemEdge {
        cursor: format!("c{}", item.id),
        node: item,
    }
}

/// Page of plain items `ids`, with `total` and an optional continuation.
pub fn mock_page(ids: &[u64], total: f64, end_cursor: Option<&str>) -> LineItemPage {
    LineItemPage {
        edges: ids.iter().map(|&id| edge(mock_line_item(id))).collect(),
        page_info: PageInfo {
            has_next_page: end_cursor.is_some(),
            end_cursor: end_cursor.map(str::to_string),
        },
        total,
        campaign: None,
    }
}

/// Page of pre-built items, for tests that need specific field values.
pub fn mock_page_items(items: Vec<LineItem>, total: f64, end_cursor: Option<&str>) -> LineItemPage {
    LineItemPage {
        edges: items.into_iter().map(edge).collect(),
        page_info: PageInfo {
            has_next_page: end_cursor.is_some(),
            end_cursor: end_cursor.map(str::to_string),
        },
        total,
        campaign: None,
    }
}
