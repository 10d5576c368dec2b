//! The API endpoints URIs.

/// The route that reports whether the service is up.
pub const HEALTH: &str = "/api/health";
/// The route to upload a CSV file of transactions.
pub const UPLOAD: &str = "/api/upload";
/// The route that deletes every stored transaction.
pub const CLEAR: &str = "/api/clear";
/// The route for the balance of the successful transactions.
pub const BALANCE: &str = "/api/balance";
/// The route for a page of transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for a page of failed and pending transactions.
pub const ISSUES: &str = "/api/issues";

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::HEALTH);
        assert_endpoint_is_valid_uri(endpoints::UPLOAD);
        assert_endpoint_is_valid_uri(endpoints::CLEAR);
        assert_endpoint_is_valid_uri(endpoints::BALANCE);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::ISSUES);
    }
}
