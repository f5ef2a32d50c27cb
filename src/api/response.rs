use chrono::{DateTime, Utc};
use serde::Serialize;

/// Standard envelope for successful responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Listing metadata
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ResponseMetadata {
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_count(mut self, total_count: usize) -> Self {
        self.metadata = Some(ResponseMetadata {
            total_count,
            ..Default::default()
        });
        self
    }

    pub fn with_pagination(mut self, page: usize, page_size: usize, total_count: usize) -> Self {
        self.metadata = Some(ResponseMetadata {
            total_count,
            page: Some(page),
            page_size: Some(page_size),
        });
        self
    }
}

/// Wrap a listing with its length as the total count
pub fn listing<T: Serialize>(items: Vec<T>) -> ApiResponse<Vec<T>> {
    let count = items.len();
    ApiResponse::success(items).with_count(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_counts_items() {
        let response = listing(vec!["a", "b", "c"]);
        assert!(response.success);
        assert_eq!(response.metadata.unwrap().total_count, 3);
    }

    #[test]
    fn test_response_with_pagination() {
        let response = ApiResponse::success("data").with_pagination(2, 20, 100);
        let metadata = response.metadata.unwrap();
        assert_eq!(metadata.page, Some(2));
        assert_eq!(metadata.page_size, Some(20));
        assert_eq!(metadata.total_count, 100);
    }

    #[test]
    fn test_plain_success_has_no_metadata() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["data"], 42);
        assert!(json.get("metadata").is_none());
    }
}
