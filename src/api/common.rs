//! Common API utilities and shared types

use serde::{Deserialize, Serialize};

use crate::models::{ListParams, OrderItem};

/// Pagination query parameters; missing values fall back to page 1, 20 per page
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Admin list filter: a status plus pagination
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl StatusQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Body of every reorder endpoint
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<OrderItem>,
}

/// Plain `{ "message": ... }` acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
