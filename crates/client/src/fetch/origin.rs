//! Origin comparison and response tainting.
//!
//! A no-cors fetch that lands on another origin yields an opaque response:
//! the engine may store and replay it but never sees its status or headers.

use swcache_core::{RequestMode, ResponseType};
use url::Url;

/// Scheme, host and port equality.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Response type for a fetch made in `mode` from `origin` that ended at
/// `final_url` after redirects.
pub fn response_type(mode: RequestMode, origin: &Url, final_url: &Url) -> ResponseType {
    if same_origin(origin, final_url) {
        return ResponseType::Basic;
    }
    match mode {
        RequestMode::Cors => ResponseType::Cors,
        RequestMode::NoCors => ResponseType::Opaque,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin(&url("https://quiz.example/"), &url("https://quiz.example/eva.webp")));
        assert!(!same_origin(&url("https://quiz.example/"), &url("http://quiz.example/")));
        assert!(!same_origin(&url("https://quiz.example/"), &url("https://quiz.example:8443/")));
        assert!(!same_origin(&url("https://quiz.example/"), &url("https://cdn.example.com/")));
    }

    #[test]
    fn test_same_origin_is_basic_in_any_mode() {
        let origin = url("https://quiz.example/");
        let target = url("https://quiz.example/index.html");
        assert_eq!(response_type(RequestMode::Cors, &origin, &target), ResponseType::Basic);
        assert_eq!(response_type(RequestMode::NoCors, &origin, &target), ResponseType::Basic);
    }

    #[test]
    fn test_cross_origin_tainting() {
        let origin = url("https://quiz.example/");
        let cdn = url("https://cdn.example.com/VID1-FUNIL.webm");
        assert_eq!(response_type(RequestMode::Cors, &origin, &cdn), ResponseType::Cors);
        assert_eq!(response_type(RequestMode::NoCors, &origin, &cdn), ResponseType::Opaque);
    }
}
