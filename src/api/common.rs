//! Common API utilities and shared types

use serde::Deserialize;

use crate::models::ListParams;

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

/// Pagination query parameters (`?page=2&per_page=20`)
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    /// Convert to clamped list parameters
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}
