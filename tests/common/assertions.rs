//! Response validation and assertion utilities

use reqwest::{Response, StatusCode};

/// Response validation helpers
pub trait ResponseAssertions {
    /// Assert response has expected status code
    fn assert_status(&self, expected: StatusCode) -> &Self;

    /// Assert response contains expected header
    fn assert_header(&self, name: &str, expected: &str) -> &Self;

    /// Every `Set-Cookie` value, in header order
    fn set_cookies(&self) -> Vec<String>;

    /// Assert a cookie was set with exactly this value
    fn assert_cookie(&self, name: &str, expected: &str) -> &Self;
}

impl ResponseAssertions for Response {
    fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.status()
        );
        self
    }

    fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let header_value = self
            .headers()
            .get(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name))
            .to_str()
            .unwrap_or_else(|_| panic!("Header '{}' contains invalid characters", name));

        assert_eq!(
            header_value, expected,
            "Expected header '{}' to be '{}', got '{}'",
            name, expected, header_value
        );
        self
    }

    fn set_cookies(&self) -> Vec<String> {
        self.headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    fn assert_cookie(&self, name: &str, expected: &str) -> &Self {
        let cookies = self.set_cookies();
        let value = cookies
            .iter()
            .find_map(|c| {
                let pair = c.split(';').next()?;
                let (k, v) = pair.split_once('=')?;
                (k == name).then(|| v.to_string())
            })
            .unwrap_or_else(|| panic!("Cookie '{}' not set, got {:?}", name, cookies));

        assert_eq!(
            value, expected,
            "Expected cookie '{}' to be '{}', got '{}'",
            name, expected, value
        );
        self
    }
}
