#![allow(missing_docs)]

pub(crate) mod http;

pub(crate) use http::{assert_content_type, assert_status_ok, must_make_multipart, parse_json_body};
