//! Boundary to the remote quest-progress API.
//!
//! Every call either returns the service's answer or a [`TransportError`];
//! [`resolve_call`] turns failures into the deterministic local fallback so
//! gameplay never waits on the network to move forward.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::quest::{EmotionKind, QuestCall, QuestCompletion, QuestReply, QuestStage, TransitionOrigin};

#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error("quest service is offline")]
    Offline,
    #[error("call '{call}' needs a session id")]
    MissingSession { call: &'static str },
    #[error("failed to build http client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to decode reply from {url}: {detail}")]
    Decode { url: String, detail: String },
}

/// Stage-bearing reply shared by every call except session creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct StageReply {
    pub(crate) stage: QuestStage,
    #[serde(default, alias = "dialogueLines")]
    pub(crate) dialogue_lines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SessionCreatedReply {
    #[serde(alias = "sessionId")]
    session_id: String,
}

/// A unit of work handed to the quest worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestRequest {
    pub(crate) request_id: u64,
    pub(crate) session_id: Option<String>,
    pub(crate) call: QuestCall,
}

pub(crate) trait QuestService {
    fn send(&self, session_id: Option<&str>, call: &QuestCall) -> Result<QuestReply, TransportError>;
}

impl<S: QuestService + ?Sized> QuestService for Box<S> {
    fn send(&self, session_id: Option<&str>, call: &QuestCall) -> Result<QuestReply, TransportError> {
        (**self).send(session_id, call)
    }
}

/// Used when no API URL is configured. Every call takes the fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineQuestService;

impl QuestService for OfflineQuestService {
    fn send(&self, _session_id: Option<&str>, _call: &QuestCall) -> Result<QuestReply, TransportError> {
        Err(TransportError::Offline)
    }
}

#[derive(Debug)]
pub(crate) struct HttpQuestService {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpQuestService {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::ClientBuild { source })?;
        Ok(Self::with_client(base_url, client))
    }

    pub(crate) fn with_client(base_url: &str, client: reqwest::blocking::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub(crate) fn create_session(&self, display_name: &str) -> Result<String, TransportError> {
        let url = format!("{}/users", self.base_url);
        let reply: SessionCreatedReply =
            self.post_json(&url, &json!({ "displayName": display_name }))?;
        Ok(reply.session_id)
    }

    pub(crate) fn start_session(&self, session_id: &str) -> Result<StageReply, TransportError> {
        self.post_json(&self.session_url(session_id, "start"), &json!({}))
    }

    pub(crate) fn advance_stage(
        &self,
        session_id: &str,
        target: QuestStage,
        selected_npc: Option<&str>,
    ) -> Result<StageReply, TransportError> {
        let mut body = json!({ "targetStage": target });
        if let Some(npc) = selected_npc {
            body["selectedNpc"] = json!(npc);
        }
        self.post_json(&self.session_url(session_id, "progress"), &body)
    }

    pub(crate) fn collect(&self, session_id: &str, kind: EmotionKind) -> Result<StageReply, TransportError> {
        self.post_json(
            &self.session_url(session_id, "collect"),
            &json!({ "emotionKind": kind }),
        )
    }

    pub(crate) fn deliver(&self, session_id: &str, kind: EmotionKind) -> Result<StageReply, TransportError> {
        self.post_json(
            &self.session_url(session_id, "deliver"),
            &json!({ "emotionKind": kind }),
        )
    }

    pub(crate) fn complete(
        &self,
        session_id: &str,
        contact_info: &str,
        message: &str,
    ) -> Result<StageReply, TransportError> {
        self.post_json(
            &self.session_url(session_id, "complete"),
            &json!({ "contactInfo": contact_info, "message": message }),
        )
    }

    fn session_url(&self, session_id: &str, action: &str) -> String {
        format!("{}/sessions/{session_id}/{action}", self.base_url)
    }

    fn post_json<T>(&self, url: &str, body: &serde_json::Value) -> Result<T, TransportError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&text);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            TransportError::Decode {
                url: url.to_string(),
                detail: format!("{} at {path}", error.into_inner()),
            }
        })
    }
}

impl QuestService for HttpQuestService {
    fn send(&self, session_id: Option<&str>, call: &QuestCall) -> Result<QuestReply, TransportError> {
        let require_session =
            || session_id.ok_or(TransportError::MissingSession { call: call.name() });
        let reply = match call {
            QuestCall::CreateSession { display_name } => {
                let session_id = self.create_session(display_name)?;
                return Ok(QuestReply::SessionCreated { session_id });
            }
            QuestCall::StartSession => self.start_session(require_session()?)?,
            QuestCall::AdvanceStage {
                target,
                selected_npc,
            } => self.advance_stage(require_session()?, *target, selected_npc.as_deref())?,
            QuestCall::Collect(kind) => self.collect(require_session()?, *kind)?,
            QuestCall::Deliver(kind) => self.deliver(require_session()?, *kind)?,
            QuestCall::Complete {
                contact_info,
                message,
            } => self.complete(require_session()?, contact_info, message)?,
        };
        Ok(QuestReply::Progress {
            stage: reply.stage,
            dialogue_lines: reply.dialogue_lines,
        })
    }
}

/// Runs one request to completion. Failures never escape: they are logged
/// and replaced by the call's fallback reply.
pub(crate) fn resolve_call(service: &dyn QuestService, request: QuestRequest) -> QuestCompletion {
    let QuestRequest {
        request_id,
        session_id,
        call,
    } = request;

    match service.send(session_id.as_deref(), &call) {
        Ok(reply) => {
            debug!(request_id, call = call.name(), "quest_call_succeeded");
            QuestCompletion {
                request_id,
                reply,
                call,
                origin: TransitionOrigin::Server,
            }
        }
        Err(error) => {
            warn!(request_id, call = call.name(), error = %error, "quest_call_failed");
            QuestCompletion {
                request_id,
                reply: call.fallback_reply(),
                call,
                origin: TransitionOrigin::Fallback,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    struct Recorded {
        request_line: String,
        body: String,
    }

    /// Serves canned responses, one connection each, and reports what it saw.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Recorded>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for (status, body) in responses {
                let (stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                reader.read_line(&mut request_line).expect("request line");
                let mut content_length = 0usize;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).expect("header");
                    let header = header.trim_end();
                    if header.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().expect("content length");
                        }
                    }
                }
                let mut request_body = vec![0u8; content_length];
                reader.read_exact(&mut request_body).expect("body");
                tx.send(Recorded {
                    request_line: request_line.trim_end().to_string(),
                    body: String::from_utf8(request_body).expect("utf8"),
                })
                .expect("record");

                let mut stream = reader.into_inner();
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).expect("respond");
            }
        });
        (base_url, rx)
    }

    fn service(base_url: &str) -> HttpQuestService {
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("client");
        HttpQuestService::with_client(base_url, client)
    }

    #[test]
    fn create_session_posts_display_name_and_reads_session_id() {
        let (base_url, seen) = serve(vec![(200, r#"{"sessionId":"abc-123"}"#)]);
        let reply = service(&base_url)
            .send(
                None,
                &QuestCall::CreateSession {
                    display_name: "Ana".to_string(),
                },
            )
            .expect("create");
        assert_eq!(
            reply,
            QuestReply::SessionCreated {
                session_id: "abc-123".to_string()
            }
        );

        let recorded = seen.recv().expect("request");
        assert_eq!(recorded.request_line, "POST /users HTTP/1.1");
        let body: serde_json::Value = serde_json::from_str(&recorded.body).expect("json");
        assert_eq!(body["displayName"], "Ana");
    }

    #[test]
    fn collect_sends_kind_and_parses_stage_reply() {
        let (base_url, seen) = serve(vec![(
            200,
            r#"{"stage":"collect_pride","dialogueLines":["Got it."]}"#,
        )]);
        let reply = service(&format!("{base_url}/"))
            .send(Some("s1"), &QuestCall::Collect(EmotionKind::Pride))
            .expect("collect");
        assert_eq!(reply, QuestReply::progress(QuestStage::CollectPride, ["Got it."]));

        let recorded = seen.recv().expect("request");
        assert_eq!(recorded.request_line, "POST /sessions/s1/collect HTTP/1.1");
        let body: serde_json::Value = serde_json::from_str(&recorded.body).expect("json");
        assert_eq!(body["emotionKind"], "pride");
    }

    #[test]
    fn missing_dialogue_lines_default_to_empty() {
        let (base_url, _seen) = serve(vec![(200, r#"{"stage":"game_start"}"#)]);
        let reply = service(&base_url)
            .start_session("s1")
            .expect("start");
        assert_eq!(reply.stage, QuestStage::GameStart);
        assert!(reply.dialogue_lines.is_empty());
    }

    #[test]
    fn non_success_status_is_a_transport_error() {
        let (base_url, _seen) = serve(vec![(503, "{}")]);
        let err = service(&base_url)
            .deliver("s1", EmotionKind::Envy)
            .expect_err("status");
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
    }

    #[test]
    fn malformed_reply_reports_location() {
        let (base_url, _seen) = serve(vec![(200, r#"{"stage":"nowhere"}"#)]);
        let err = service(&base_url)
            .deliver("s1", EmotionKind::Envy)
            .expect_err("decode");
        match err {
            TransportError::Decode { detail, .. } => assert!(detail.contains("stage"), "{detail}"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn session_calls_without_id_fail_before_sending() {
        let service = HttpQuestService::with_client(
            "http://127.0.0.1:9",
            reqwest::blocking::Client::new(),
        );
        let err = service
            .send(None, &QuestCall::StartSession)
            .expect_err("missing session");
        assert!(matches!(
            err,
            TransportError::MissingSession {
                call: "start_session"
            }
        ));
    }

    #[test]
    fn resolve_call_falls_back_on_failure() {
        let call = QuestCall::Collect(EmotionKind::Loneliness);
        let completion = resolve_call(
            &OfflineQuestService,
            QuestRequest {
                request_id: 7,
                session_id: Some("s1".to_string()),
                call: call.clone(),
            },
        );
        assert_eq!(completion.request_id, 7);
        assert_eq!(completion.origin, TransitionOrigin::Fallback);
        assert_eq!(completion.reply, call.fallback_reply());
    }
}
