//! Request dispatch and response decoding.
//!
//! # Design
//! `Client` holds an immutable `ClientConfig` and a `Transport`, and carries
//! no mutable state between calls. Every operation goes through the same
//! three steps:
//!
//! 1. `build_request` validates required parameters, fills the path
//!    template, encodes the remaining parameters and attaches credentials.
//!    Nothing touches the network here.
//! 2. The transport executes exactly one round-trip.
//! 3. `parse_response` decodes the body and turns an error envelope into a
//!    typed `Error`, whatever the HTTP status.
//!
//! Steps 1 and 3 are public so callers with their own HTTP stack can drive
//! the round-trip themselves.

use log::{debug, warn};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::{map_service_error, Error, Result, ServiceError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::operations::{self, placeholders, AuthScope, Operation, USERS};
use crate::transport::UreqTransport;
use crate::types::{Params, UserLookup};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Synchronous TalentLMS API client.
///
/// Cheap to share: wrap it in an `Arc` to use it from several threads.
#[derive(Debug, Clone)]
pub struct Client<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl Client {
    /// Validate the configuration and set up the default blocking transport.
    /// No network I/O happens here.
    pub fn new(host: &str, api_key: &str, api_secret: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::new(host, api_key)?;
        if let Some(secret) = api_secret {
            config = config.with_api_secret(secret);
        }
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self { config, transport }
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one operation end to end.
    pub fn call(&self, op: &Operation, params: &Params) -> Result<Value> {
        let request = self.build_request(op, params)?;
        debug!("{}: {} {}/{}", op.name, op.method, self.config.base_url(), op.path);

        let response = self.transport.execute(&request).map_err(Error::Transport)?;
        debug!("{}: HTTP {}", op.name, response.status);

        self.parse_response(op, response)
    }

    /// Dynamic entry point: run the operation registered under `name`.
    /// Unknown names fail with `Error::UnknownOperation` without any network
    /// call.
    pub fn call_named(&self, name: &str, params: &Params) -> Result<Value> {
        let op = operations::find(name).ok_or_else(|| Error::UnknownOperation(name.to_string()))?;
        self.call(op, params)
    }

    /// `users` restricted to a single user.
    pub fn find_user(&self, lookup: &UserLookup) -> Result<Value> {
        self.call(&USERS, &lookup.to_params())
    }

    /// Build the HTTP request for `op` without sending it.
    pub fn build_request(&self, op: &Operation, params: &Params) -> Result<HttpRequest> {
        for &name in op.required {
            if !params.is_present(name) {
                return Err(Error::MissingParameter {
                    operation: op.name,
                    parameter: name,
                });
            }
        }

        let mut remaining: Map<String, Value> = params
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), word_flag(op, key, value)))
            .collect();

        for name in remaining.keys().filter(|name| !op.declares(name)) {
            debug!("{}: passing undeclared parameter `{name}`", op.name);
        }

        let path = fill_template(op, &mut remaining)?;
        merge_fields(op, &mut remaining);

        let mut url = format!("{}/{path}", self.config.base_url());
        let mut headers = vec![
            ("accept".to_string(), "application/json".to_string()),
            ("authorization".to_string(), self.authorization(op)),
        ];

        let body = match op.method {
            HttpMethod::Get => {
                let segment = read_segment(&remaining);
                if !segment.is_empty() {
                    url.push('/');
                    url.push_str(&segment);
                }
                None
            }
            HttpMethod::Post => {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
                Some(form_body(&remaining))
            }
        };

        Ok(HttpRequest {
            method: op.method,
            url,
            headers,
            body,
        })
    }

    /// Decode a response for `op`. A JSON object with a non-null `error`
    /// member is a service error regardless of `response.status`.
    pub fn parse_response(&self, op: &Operation, response: HttpResponse) -> Result<Value> {
        let value: Value = match serde_json::from_str(&response.body) {
            Ok(value) => value,
            Err(source) => {
                warn!("{}: undecodable body (HTTP {})", op.name, response.status);
                return Err(Error::MalformedResponse {
                    body: response.body,
                    source,
                });
            }
        };

        match service_error(&value, response.status) {
            Some(e) => {
                debug!("{}: service error {e}", op.name);
                Err(map_service_error(e))
            }
            None => Ok(value),
        }
    }

    fn authorization(&self, op: &Operation) -> String {
        let password = match op.auth {
            AuthScope::Secondary => self.config.api_secret().unwrap_or(""),
            AuthScope::Primary => "",
        };
        let credentials = format!("{}:{password}", self.config.api_key());
        format!("Basic {}", base64_simd::STANDARD.encode_to_string(credentials.as_bytes()))
    }
}

/// Substitute `{name}` placeholders, consuming the matching parameters.
fn fill_template(op: &Operation, remaining: &mut Map<String, Value>) -> Result<String> {
    let mut path = op.path.to_string();
    for name in placeholders(op.path) {
        let value = remaining
            .remove(name)
            .map(|value| render(&value))
            .filter(|value| !value.is_empty())
            .ok_or(Error::MissingParameter {
                operation: op.name,
                parameter: name,
            })?;
        path = path.replacen(&format!("{{{name}}}"), &encode_path_segment(&value), 1);
    }
    Ok(path)
}

/// Booleans of flag parameters become the words the service expects.
fn word_flag(op: &Operation, name: &str, value: &Value) -> Value {
    match value.as_bool().and_then(|b| op.flag_word(name, b)) {
        Some(word) => Value::String(word.to_string()),
        None => value.clone(),
    }
}

/// Splice the entries of merged object fields into the top level. Entries
/// override explicit parameters of the same name.
fn merge_fields(op: &Operation, remaining: &mut Map<String, Value>) {
    for name in op.merged {
        if let Some(Value::Object(fields)) = remaining.remove(*name) {
            for (key, value) in fields {
                if !value.is_null() {
                    remaining.insert(key, value);
                }
            }
        }
    }
}

/// Pull the error envelope out of a decoded body, if it has one.
fn service_error(value: &Value, status: u16) -> Option<ServiceError> {
    let error = value.as_object()?.get("error")?;
    match error {
        Value::Null => None,
        Value::Object(fields) => {
            let code = fields
                .get("code")
                .or_else(|| fields.get("type"))
                .filter(|code| !code.is_null())
                .map(render);
            let message = fields.get("message").map(render).unwrap_or_default();
            Some(ServiceError {
                code,
                message,
                status,
            })
        }
        other => Some(ServiceError {
            code: None,
            message: render(other),
            status,
        }),
    }
}

/// Scalar rendering used on the wire: strings verbatim, everything else in
/// JSON notation.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn encode_path_segment(s: &str) -> String {
    encode(s).replace('+', "%20")
}

/// TalentLMS read parameters: `name:value` pairs joined by commas, sorted by
/// name. `@` stays literal so email lookups read naturally.
fn read_segment(params: &Map<String, Value>) -> String {
    let mut pairs: Vec<String> = flatten(params)
        .into_iter()
        .map(|(key, value)| format!("{}:{}", encode(&key), encode(&value).replace("%40", "@")))
        .collect();
    pairs.sort();
    pairs.join(",")
}

fn form_body(params: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in flatten(params) {
        serializer.append_pair(&key, &value);
    }
    serializer.finish()
}

/// Flatten nested values with bracket notation: `field[key]` for objects,
/// `field[]` for arrays.
fn flatten(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_into(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_into(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            for (sub, value) in fields {
                flatten_into(format!("{key}[{sub}]"), value, pairs);
            }
        }
        Value::Array(items) => {
            for value in items {
                flatten_into(format!("{key}[]"), value, pairs);
            }
        }
        scalar => pairs.push((key, render(scalar))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{
        ADD_USER_TO_COURSE, BRANCH_SET_STATUS, DELETE_USER, USERS, USER_SET_STATUS, USER_SIGNUP,
    };
    use serde_json::json;

    struct NoTransport;

    impl Transport for NoTransport {
        fn execute(&self, _: &HttpRequest) -> std::result::Result<HttpResponse, crate::http::TransportError> {
            Err("network disabled in unit tests".into())
        }
    }

    fn client() -> Client<NoTransport> {
        let config = ClientConfig::new("example.talentlms.com", "KEY123").unwrap();
        Client::with_transport(config, NoTransport)
    }

    fn signup_params() -> Params {
        Params::new()
            .with("email", "jsmith@example.com")
            .with("first_name", "John")
            .with("last_name", "Smith")
            .with("login", "jsmith")
            .with("password", "Secret123")
    }

    fn form_pairs(body: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(body.as_bytes()).into_owned().collect()
    }

    #[test]
    fn build_signup_produces_form_post() {
        let req = client().build_request(&USER_SIGNUP, &signup_params()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://example.talentlms.com/api/v1/user/signup");
        assert_eq!(req.header("content-type"), Some(FORM_CONTENT_TYPE));

        let pairs = form_pairs(req.body.as_deref().unwrap());
        assert!(pairs.contains(&("email".to_string(), "jsmith@example.com".to_string())));
        assert!(pairs.contains(&("login".to_string(), "jsmith".to_string())));
        assert_eq!(pairs.len(), 5);
    }

    #[test]
    fn build_list_users_has_no_body_or_segment() {
        let req = client().build_request(&USERS, &Params::new()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://example.talentlms.com/api/v1/users");
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn read_parameters_become_sorted_segment() {
        let params = Params::new()
            .with("param_4", "user@example.com")
            .with("param_1", "str_value:with/special.symbols")
            .with("param_3", false)
            .with("param_2", 1);
        let op = Operation::get("test_api_method");
        let req = client().build_request(&op, &params).unwrap();
        assert_eq!(
            req.url,
            "https://example.talentlms.com/api/v1/test_api_method/\
             param_1:str_value%3Awith%2Fspecial.symbols,param_2:1,param_3:false,\
             param_4:user@example.com"
        );
    }

    #[test]
    fn basic_auth_uses_key_and_empty_password() {
        let req = client().build_request(&USERS, &Params::new()).unwrap();
        // base64("KEY123:")
        assert_eq!(req.header("authorization"), Some("Basic S0VZMTIzOg=="));
    }

    #[test]
    fn secondary_key_sent_only_where_required() {
        let config = ClientConfig::new("example.talentlms.com", "KEY123")
            .unwrap()
            .with_api_secret("S");
        let client = Client::with_transport(config, NoTransport);

        let params = Params::new().with("user_id", 7);
        let req = client.build_request(&DELETE_USER, &params).unwrap();
        // base64("KEY123:S")
        assert_eq!(req.header("authorization"), Some("Basic S0VZMTIzOlM="));

        let req = client.build_request(&USERS, &Params::new()).unwrap();
        assert_eq!(req.header("authorization"), Some("Basic S0VZMTIzOg=="));
    }

    #[test]
    fn missing_required_parameter_is_named() {
        let params = signup_params().with("password", "");
        let err = client().build_request(&USER_SIGNUP, &params).unwrap_err();
        match err {
            Error::MissingParameter {
                operation,
                parameter,
            } => {
                assert_eq!(operation, "user_signup");
                assert_eq!(parameter, "password");
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn missing_parameter_never_reaches_transport() {
        let err = client().call(&ADD_USER_TO_COURSE, &Params::new().with("user_id", 1)).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { parameter: "course_id", .. }));
    }

    #[test]
    fn path_placeholders_are_encoded_and_consumed() {
        let op = Operation::get("courses/{course_id}/users");
        let params = Params::new().with("course_id", "a b/c").with("role", "learner");
        let req = client().build_request(&op, &params).unwrap();
        assert_eq!(
            req.url,
            "https://example.talentlms.com/api/v1/courses/a%20b%2Fc/users/role:learner"
        );
    }

    #[test]
    fn placeholder_without_value_is_missing() {
        let op = Operation::post("courses/{course_id}").named("custom");
        let err = client().build_request(&op, &Params::new()).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { parameter: "course_id", .. }));
    }

    #[test]
    fn custom_fields_are_merged_into_payload() {
        let params = signup_params().with(
            "custom_fields",
            json!({"custom_field_1": "Company LLC", "custom_field_2": "on"}),
        );
        let req = client().build_request(&USER_SIGNUP, &params).unwrap();
        let pairs = form_pairs(req.body.as_deref().unwrap());
        assert!(pairs.contains(&("custom_field_1".to_string(), "Company LLC".to_string())));
        assert!(pairs.contains(&("custom_field_2".to_string(), "on".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k.starts_with("custom_fields")));
    }

    #[test]
    fn other_nested_values_use_brackets() {
        let op = Operation::post("creatething");
        let params = Params::new().with("meta", json!({"a": 1, "tags": ["x", "y"]}));
        let req = client().build_request(&op, &params).unwrap();
        let pairs = form_pairs(req.body.as_deref().unwrap());
        assert_eq!(
            pairs,
            vec![
                ("meta[a]".to_string(), "1".to_string()),
                ("meta[tags][]".to_string(), "x".to_string()),
                ("meta[tags][]".to_string(), "y".to_string()),
            ]
        );
    }

    #[test]
    fn null_parameters_are_dropped() {
        let params = Params::new().with("id", Value::Null);
        let req = client().build_request(&USERS, &params).unwrap();
        assert_eq!(req.url, "https://example.talentlms.com/api/v1/users");
    }

    #[test]
    fn parse_returns_body_unchanged() {
        let body = json!([{"id": "1", "login": "a"}, {"id": "2", "login": "b"}]);
        let value = client()
            .parse_response(&USERS, HttpResponse::new(200, body.to_string()))
            .unwrap();
        assert_eq!(value, body);
    }

    #[test]
    fn parse_error_envelope_even_on_200() {
        let body = r#"{"error":{"code":"3","message":"User already exists"}}"#;
        let err = client()
            .parse_response(&USER_SIGNUP, HttpResponse::new(200, body))
            .unwrap_err();
        assert!(matches!(err, Error::UserAlreadyExists(_)));
    }

    #[test]
    fn parse_error_envelope_with_type_and_message() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"The requested user does not exist"}}"#;
        let err = client()
            .parse_response(&USERS, HttpResponse::new(404, body))
            .unwrap_err();
        let service = err.service().unwrap();
        assert_eq!(service.code.as_deref(), Some("invalid_request_error"));
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[test]
    fn parse_numeric_code_as_string() {
        let body = r#"{"error":{"code":42,"message":"Odd"}}"#;
        let err = client().parse_response(&USERS, HttpResponse::new(400, body)).unwrap_err();
        match err {
            Error::Api(e) => {
                assert_eq!(e.code.as_deref(), Some("42"));
                assert_eq!(e.message, "Odd");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn parse_string_error_member() {
        let err = client()
            .parse_response(&USERS, HttpResponse::new(500, r#"{"error":"boom"}"#))
            .unwrap_err();
        match err {
            Error::Api(e) => {
                assert!(e.code.is_none());
                assert_eq!(e.message, "boom");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn parse_null_error_member_is_success() {
        let value = client()
            .parse_response(&USERS, HttpResponse::new(200, r#"{"error":null,"id":1}"#))
            .unwrap();
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn parse_malformed_keeps_raw_body() {
        let err = client()
            .parse_response(&USERS, HttpResponse::new(502, "<html>Bad gateway"))
            .unwrap_err();
        match err {
            Error::MalformedResponse { body, .. } => assert_eq!(body, "<html>Bad gateway"),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn transport_failure_is_wrapped() {
        let err = client().call(&USERS, &Params::new()).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn call_named_rejects_unknown_operation() {
        let err = client().call_named("no_such_thing", &Params::new()).unwrap_err();
        match err {
            Error::UnknownOperation(name) => assert_eq!(name, "no_such_thing"),
            other => panic!("expected UnknownOperation, got {other:?}"),
        }
    }

    #[test]
    fn permanent_flag_is_sent_as_yes_or_no() {
        let params = Params::new().with("user_id", 1).with("permanent", true);
        let req = client().build_request(&DELETE_USER, &params).unwrap();
        assert_eq!(req.body.as_deref(), Some("permanent=yes&user_id=1"));

        let params = Params::new().with("user_id", 1).with("permanent", false);
        let req = client().build_request(&DELETE_USER, &params).unwrap();
        assert_eq!(req.body.as_deref(), Some("permanent=no&user_id=1"));
    }

    #[test]
    fn status_flag_is_sent_as_word() {
        let params = Params::new().with("branch_id", 84).with("status", false);
        let req = client().build_request(&BRANCH_SET_STATUS, &params).unwrap();
        assert_eq!(
            req.url,
            "https://example.talentlms.com/api/v1/branchsetstatus/branch_id:84,status:inactive"
        );

        let params = Params::new().with("user_id", 7).with("status", "active");
        let req = client().build_request(&USER_SET_STATUS, &params).unwrap();
        assert!(req.url.ends_with("/usersetstatus/status:active,user_id:7"));
    }

    #[test]
    fn false_flag_still_counts_as_present() {
        let params = Params::new().with("branch_id", 84).with("status", false);
        assert!(client().build_request(&BRANCH_SET_STATUS, &params).is_ok());
    }

    #[test]
    fn undeclared_parameters_pass_through() {
        let params = signup_params().with("branch_id", 3);
        let req = client().build_request(&USER_SIGNUP, &params).unwrap();
        let pairs = form_pairs(req.body.as_deref().unwrap());
        assert!(pairs.contains(&("branch_id".to_string(), "3".to_string())));
    }
}
