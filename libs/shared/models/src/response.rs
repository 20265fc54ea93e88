use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Wraps a payload in the `{success, data}` envelope used by every route.
pub fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 200;

    /// Slices an already-sorted result set. Pages are 1-based.
    pub fn paginate(all: Vec<T>, page: Option<usize>, limit: Option<usize>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT);
        let total = all.len();

        let items = all
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Self { items, page, limit, total }
    }
}
