//! Blocking Mixpanel client: `Client` plus a `Transport`.
//!
//! Every operation builds its request with `Client`, executes it once through
//! the transport and interprets the body. Nothing is retried or queued.

use std::collections::BTreeMap;

use crate::client::Client;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::transport::{Transport, UreqTransport};
use crate::types::{ProfileUpdate, Properties};

/// Synchronous Mixpanel client.
///
/// Read-only after construction, so a shared reference can be used from
/// several threads whenever the transport allows it.
#[derive(Debug, Clone)]
pub struct Mixpanel<T = UreqTransport> {
    client: Client,
    transport: T,
}

impl Mixpanel<UreqTransport> {
    /// Client for the default Mixpanel host using `UreqTransport`.
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self::from_client(Client::new(token)?))
    }

    pub fn from_client(client: Client) -> Self {
        Self::with_transport(client, UreqTransport::new())
    }
}

impl<T: Transport> Mixpanel<T> {
    pub fn with_transport(client: Client, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Track `event` with `properties`. The project token is added to a copy
    /// of `properties`.
    pub fn track(&self, event: &str, properties: &Properties) -> Result<(), ApiError> {
        let req = self.client.build_track(event, properties)?;
        self.send(req)
    }

    /// Link `old_id` to `new_id` via the `$create_alias` event.
    pub fn alias(&self, old_id: &str, new_id: &str) -> Result<(), ApiError> {
        let req = self.client.build_alias(old_id, new_id)?;
        self.send(req)
    }

    /// Apply a single profile update to `distinct_id`.
    pub fn engage(&self, distinct_id: &str, update: &ProfileUpdate) -> Result<(), ApiError> {
        let req = self.client.build_engage(distinct_id, update)?;
        self.send(req)
    }

    pub fn profile_set(&self, distinct_id: &str, properties: Properties) -> Result<(), ApiError> {
        self.engage(distinct_id, &ProfileUpdate::Set(properties))
    }

    pub fn profile_set_once(&self, distinct_id: &str, properties: Properties) -> Result<(), ApiError> {
        self.engage(distinct_id, &ProfileUpdate::SetOnce(properties))
    }

    /// Increment numeric properties; use negative amounts to decrement.
    pub fn profile_add(&self, distinct_id: &str, amounts: BTreeMap<String, i64>) -> Result<(), ApiError> {
        self.engage(distinct_id, &ProfileUpdate::Add(amounts))
    }

    pub fn profile_append(&self, distinct_id: &str, properties: Properties) -> Result<(), ApiError> {
        self.engage(distinct_id, &ProfileUpdate::Append(properties))
    }

    pub fn profile_union(&self, distinct_id: &str, properties: Properties) -> Result<(), ApiError> {
        self.engage(distinct_id, &ProfileUpdate::Union(properties))
    }

    pub fn profile_unset<I, S>(&self, distinct_id: &str, names: I) -> Result<(), ApiError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.engage(distinct_id, &ProfileUpdate::Unset(names))
    }

    pub fn profile_delete(&self, distinct_id: &str) -> Result<(), ApiError> {
        self.engage(distinct_id, &ProfileUpdate::Delete)
    }

    fn send(&self, req: HttpRequest) -> Result<(), ApiError> {
        tracing::debug!(endpoint = req.endpoint.path(), len = req.data.len(), "sending request");
        let response = self.transport.get(&req.url)?;
        self.client.parse(req.endpoint, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::{json, Value};

    use crate::http::HttpResponse;

    /// Records every URL and answers with a fixed body or a connection error.
    struct StubTransport {
        body: Option<&'static str>,
        urls: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn answering(body: &'static str) -> Self {
            Self {
                body: Some(body),
                urls: Mutex::new(Vec::new()),
            }
        }

        fn refusing() -> Self {
            Self {
                body: None,
                urls: Mutex::new(Vec::new()),
            }
        }

        fn payloads(&self) -> Vec<Value> {
            self.urls
                .lock()
                .unwrap()
                .iter()
                .map(|url| {
                    let data = url.split_once("?data=").unwrap().1;
                    let data = urlencoding::decode(data).unwrap();
                    serde_json::from_slice(&STANDARD.decode(data.as_bytes()).unwrap()).unwrap()
                })
                .collect()
        }
    }

    impl Transport for StubTransport {
        fn get(&self, url: &str) -> io::Result<HttpResponse> {
            self.urls.lock().unwrap().push(url.to_string());
            match self.body {
                Some(body) => Ok(HttpResponse::new(200, body)),
                None => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")),
            }
        }
    }

    fn mixpanel(transport: &StubTransport) -> Mixpanel<&StubTransport> {
        let client = Client::builder("tok").base_url("http://stub").build().unwrap();
        Mixpanel::with_transport(client, transport)
    }

    fn props(value: Value) -> Properties {
        value.as_object().unwrap().clone()
    }

    /// Runs every public operation once, returning each result.
    fn run_all(mp: &Mixpanel<&StubTransport>) -> Vec<(&'static str, Result<(), ApiError>)> {
        vec![
            ("track", mp.track("Signed Up", &props(json!({"plan": "pro"})))),
            ("alias", mp.alias("old1", "new1")),
            ("set", mp.profile_set("1", props(json!({"name": "Mclovin"})))),
            ("set_once", mp.profile_set_once("1", props(json!({"first_seen": "today"})))),
            ("add", mp.profile_add("1", BTreeMap::from([("logins".to_string(), -1)]))),
            ("append", mp.profile_append("1", props(json!({"power_ups": "bubble lead"})))),
            ("union", mp.profile_union("1", props(json!({"items": ["socks", "shirts"]})))),
            ("unset", mp.profile_unset("1", ["Days Purchased"])),
            ("delete", mp.profile_delete("1")),
        ]
    }

    #[test]
    fn every_operation_succeeds_on_one() {
        let stub = StubTransport::answering("1");
        for (name, result) in run_all(&mixpanel(&stub)) {
            assert!(result.is_ok(), "{name}: {result:?}");
        }
        assert_eq!(stub.urls.lock().unwrap().len(), 9);
    }

    #[test]
    fn rejected_bodies_map_to_endpoint_errors() {
        for body in ["0", ""] {
            let stub = StubTransport::answering(body);
            for (name, result) in run_all(&mixpanel(&stub)) {
                let err = result.unwrap_err();
                if name == "track" || name == "alias" {
                    assert!(matches!(err, ApiError::UnexpectedTrackResponse { .. }), "{name}");
                } else {
                    assert!(matches!(err, ApiError::UnexpectedEngageResponse { .. }), "{name}");
                }
            }
        }
    }

    #[test]
    fn transport_error_is_returned_unchanged() {
        let stub = StubTransport::refusing();
        for (name, result) in run_all(&mixpanel(&stub)) {
            match result.unwrap_err() {
                ApiError::Transport(e) => {
                    assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused, "{name}");
                    assert_eq!(e.to_string(), "connection refused", "{name}");
                }
                other => panic!("{name}: expected transport error, got {other:?}"),
            }
        }
    }

    #[test]
    fn requests_hit_track_and_engage_paths() {
        let stub = StubTransport::answering("1");
        run_all(&mixpanel(&stub));
        let urls = stub.urls.lock().unwrap();
        assert!(urls[0].starts_with("http://stub/track/?data="));
        assert!(urls[1].starts_with("http://stub/track/?data="));
        for url in &urls[2..] {
            assert!(url.starts_with("http://stub/engage/?data="), "{url}");
        }
    }

    #[test]
    fn alias_sends_create_alias_track() {
        let stub = StubTransport::answering("1");
        mixpanel(&stub).alias("old1", "new1").unwrap();
        let payload = &stub.payloads()[0];
        assert_eq!(payload["event"], "$create_alias");
        assert_eq!(payload["properties"]["distinct_id"], "old1");
        assert_eq!(payload["properties"]["alias"], "new1");
        assert_eq!(payload["properties"]["token"], "tok");
    }

    #[test]
    fn profile_operations_use_their_keys() {
        let stub = StubTransport::answering("1");
        run_all(&mixpanel(&stub));
        let keys: Vec<String> = stub.payloads()[2..]
            .iter()
            .map(|p| {
                let obj = p.as_object().unwrap();
                assert_eq!(obj["$token"], "tok");
                assert_eq!(obj["$distinct_id"], "1");
                assert_eq!(obj.len(), 3, "{p}");
                obj.keys()
                    .find(|k| *k != "$token" && *k != "$distinct_id")
                    .unwrap()
                    .clone()
            })
            .collect();
        assert_eq!(
            keys,
            ["$set", "$set_once", "$add", "$append", "$union", "$unset", "$delete"]
        );
    }

    #[test]
    fn override_ip_is_sent_on_engage_only() {
        let stub = StubTransport::answering("1");
        let client = Client::builder("tok")
            .base_url("http://stub")
            .override_ip("10.0.0.1")
            .build()
            .unwrap();
        let mp = Mixpanel::with_transport(client, &stub);
        mp.track("e", &Properties::new()).unwrap();
        mp.profile_delete("1").unwrap();

        let payloads = stub.payloads();
        assert!(payloads[0].get("$ip").is_none());
        assert!(payloads[0]["properties"].get("$ip").is_none());
        assert_eq!(payloads[1]["$ip"], "10.0.0.1");
    }

    #[test]
    fn empty_event_name_never_reaches_transport() {
        let stub = StubTransport::answering("1");
        let err = mixpanel(&stub).track("", &Properties::new()).unwrap_err();
        assert!(matches!(err, ApiError::EmptyEventName));
        assert!(stub.urls.lock().unwrap().is_empty());
    }

    #[test]
    fn mixpanel_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mixpanel>();
    }
}
