use pretty_assertions::assert_eq;

use super::*;

#[test]
fn default_paths_follow_runtime_interface_layout() {
    let paths = RuntimeApiPaths::default();
    assert_eq!(paths.next(), "/2018-06-01/runtime/invocation/next");
    assert_eq!(
        paths.response("abc"),
        "/2018-06-01/runtime/invocation/abc/response"
    );
    assert_eq!(paths.error("abc"), "/2018-06-01/runtime/invocation/abc/error");
    assert_eq!(paths.init_error(), "/2018-06-01/runtime/init/error");
}

#[test]
fn templates_use_named_captures() {
    let paths = RuntimeApiPaths::new("v9");
    assert_eq!(
        paths.response_template("request_id"),
        "/v9/runtime/invocation/:request_id/response"
    );
    assert_eq!(
        paths.error_template("request_id"),
        "/v9/runtime/invocation/:request_id/error"
    );
}

#[test]
fn error_info_uses_camel_case_and_ignores_stack_trace() {
    let body = br#"{"errorType":"Init.Failure","errorMessage":"boom","stackTrace":["a","b"]}"#;
    let info = ErrorInfo::from_json_slice(body).expect("parse");
    assert_eq!(info, ErrorInfo::new("Init.Failure", "boom"));

    let encoded = String::from_utf8(info.to_json_vec().expect("encode")).expect("utf8");
    assert_eq!(encoded, r#"{"errorType":"Init.Failure","errorMessage":"boom"}"#);
}

#[test]
fn error_info_rejects_non_json() {
    assert!(ErrorInfo::from_json_slice(b"not json").is_err());
    assert!(ErrorInfo::from_json_slice(br#"{"errorType":"x"}"#).is_err());
}

#[test]
fn error_info_display_joins_type_and_message() {
    assert_eq!(
        ErrorInfo::new("Function.Crash", "oops").to_string(),
        "Function.Crash: oops"
    );
}
