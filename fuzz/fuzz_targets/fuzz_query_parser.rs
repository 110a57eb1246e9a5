//! Fuzz target: `api::parse_request` (request target routing + query decoding)
//!
//! Feeds arbitrary UTF-8 request targets through the router.
//!
//! Invariants checked:
//! - No panics under any input
//! - Anything that is not one of the known paths is `NotFound`
//! - Every decoded parameter fits the fixed-capacity buffer
//!
//! cargo fuzz run fuzz_query_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use ventilator::api::query::{split_uri, MAX_PARAM_LEN};
use ventilator::api::{parse_request, ApiRequest, ROUTES};
use ventilator::app::commands::RequestError;

fuzz_target!(|data: &[u8]| {
    let Ok(uri) = core::str::from_utf8(data) else {
        return;
    };

    let (path, _) = split_uri(uri);
    match parse_request(uri) {
        Ok(request) => {
            assert_eq!(request.path(), path);
            let params = match &request {
                ApiRequest::SetSpo2 { val } => vec![val],
                ApiRequest::SetBpm { password, bpm } => vec![password, bpm],
                ApiRequest::GetData { duration } => vec![duration],
                _ => Vec::new(),
            };
            for p in params.into_iter().flatten() {
                assert!(p.len() <= MAX_PARAM_LEN);
            }
        }
        Err(RequestError::NotFound) => assert!(!ROUTES.contains(&path)),
        Err(RequestError::MalformedQuery) => assert!(ROUTES.contains(&path)),
        Err(other) => panic!("unexpected routing error: {other:?}"),
    }
});
