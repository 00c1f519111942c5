//! Client-side request helpers used by the game's connection screen.
//!
//! A [`GameSession`] speaks the server's small command vocabulary on top of
//! a [`RequestOrchestrator`]: reads check reachability, creates carry
//! `UserID`/`RequestMessage` forms, and updates carry comma-joined values
//! tagged with the command name.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::{
    transport::{HttpTransport, Transport},
    wire, ConnectorError, FormFields, RequestOrchestrator, Result,
};

/// Commands understood by the game server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestMessage {
    GenerateId,
    GetUserData,
    SetName,
    SetScore,
    GetName,
    GetScore,
    DeleteUserData,
    CloseClient,
}

impl RequestMessage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateId => "GenerateID",
            Self::GetUserData => "GetUserData",
            Self::SetName => "SetName",
            Self::SetScore => "SetScore",
            Self::GetName => "GetName",
            Self::GetScore => "GetScore",
            Self::DeleteUserData => "DeleteUserData",
            Self::CloseClient => "CloseClient",
        }
    }
}

impl fmt::Display for RequestMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form field carrying the user id.
pub const USER_ID_FIELD: &str = "UserID";
/// Form field carrying the command name.
pub const REQUEST_MESSAGE_FIELD: &str = "RequestMessage";

/// One client's conversation with the game server.
#[derive(Debug)]
pub struct GameSession<T = HttpTransport> {
    orchestrator: RequestOrchestrator<T>,
    connected: bool,
    closed: bool,
    last_response: Option<String>,
}

impl<T: Transport> GameSession<T> {
    /// Wraps an initialized orchestrator.
    pub fn new(orchestrator: RequestOrchestrator<T>) -> Self {
        Self {
            orchestrator,
            connected: false,
            closed: false,
            last_response: None,
        }
    }

    pub fn orchestrator(&self) -> &RequestOrchestrator<T> {
        &self.orchestrator
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether the server confirmed a close for this session.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Text of the most recent create or update response.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// Checks that the server answers reads. A positive answer is remembered
    /// and not checked again.
    pub async fn connect(&mut self) -> bool {
        if self.connected {
            return true;
        }
        self.connected = self.orchestrator.send_read(None).await;
        self.connected
    }

    /// Sends `message` on behalf of `user_id` as a form.
    pub async fn post(&mut self, message: RequestMessage, user_id: &str) -> String {
        let fields = FormFields::new()
            .add(USER_ID_FIELD, user_id)
            .add(REQUEST_MESSAGE_FIELD, message.as_str());
        let response = self.orchestrator.send_create(&fields, None).await;
        self.remember(response)
    }

    /// Sends `values` joined with commas, tagged with `message`.
    pub async fn put<S: AsRef<str>>(&mut self, message: RequestMessage, values: &[S]) -> String {
        let payload = values
            .iter()
            .map(|value| value.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        let response = self
            .orchestrator
            .send_update(&payload, message.as_str(), None)
            .await;
        self.remember(response)
    }

    /// Asks the server for a new user id.
    pub async fn generate_id(&mut self) -> String {
        self.post(RequestMessage::GenerateId, "").await
    }

    /// Fetches stored user data of the given record type and decodes it.
    pub async fn fetch_user_data<D: DeserializeOwned>(
        &mut self,
        user_id: &str,
        record_type: &str,
    ) -> Result<D> {
        let body = self
            .put(RequestMessage::GetUserData, &[user_id, record_type])
            .await;
        serde_json::from_str(&body).map_err(|err| {
            ConnectorError::Decode(format!("invalid user data JSON: {err}; body: {body}"))
        })
    }

    pub async fn set_name(&mut self, user_id: &str, name: &str) -> String {
        self.put(RequestMessage::SetName, &[user_id, name]).await
    }

    pub async fn set_score(&mut self, user_id: &str, score: i64) -> String {
        let score = score.to_string();
        self.put(RequestMessage::SetScore, &[user_id, score.as_str()])
            .await
    }

    pub async fn get_name(&mut self, user_id: &str) -> String {
        self.post(RequestMessage::GetName, user_id).await
    }

    pub async fn get_score(&mut self, user_id: &str) -> String {
        self.post(RequestMessage::GetScore, user_id).await
    }

    /// Ends the session on the server.
    ///
    /// With `keep_data` the server only closes the client; otherwise the
    /// user's data is deleted. Returns whether the server confirmed.
    pub async fn close(&mut self, user_id: &str, keep_data: bool) -> bool {
        let message = if keep_data {
            RequestMessage::CloseClient
        } else {
            RequestMessage::DeleteUserData
        };
        let confirmed = self.post(message, user_id).await == wire::READ_SUCCESS;
        self.closed |= confirmed;
        confirmed
    }

    /// Closes the client on the server unless a close was already confirmed.
    ///
    /// Meant for teardown paths that cannot know whether [`GameSession::close`]
    /// ran. Keeps the user's data. Returns whether the session is closed.
    pub async fn close_if_open(&mut self, user_id: &str) -> bool {
        if self.closed {
            return true;
        }
        self.close(user_id, true).await
    }

    fn remember(&mut self, response: String) -> String {
        self.last_response = Some(response.clone());
        response
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::{GameSession, RequestMessage};
    use crate::{
        testing::{Script, ScriptedTransport},
        ConnectorError, RequestOrchestrator, RetryPolicy,
    };

    fn session(transport: &ScriptedTransport) -> GameSession<ScriptedTransport> {
        let mut orchestrator = RequestOrchestrator::new(transport.clone()).with_policy(RetryPolicy {
            max_retries: 0,
            attempt_timeout_ms: 1_000,
        });
        orchestrator.initialize("http://127.0.0.1:7000/");
        GameSession::new(orchestrator)
    }

    fn body_text(transport: &ScriptedTransport, index: usize) -> String {
        let request = &transport.requests()[index];
        let body = request.body.as_ref().expect("request carries a body");
        String::from_utf8(body.bytes.clone()).expect("body is utf-8")
    }

    #[test]
    fn wire_names() {
        assert_eq!(RequestMessage::GenerateId.as_str(), "GenerateID");
        assert_eq!(RequestMessage::DeleteUserData.to_string(), "DeleteUserData");
    }

    #[tokio::test]
    async fn connect_is_cached_after_success() {
        let transport = ScriptedTransport::new([Script::text("Success")]);
        let mut session = session(&transport);

        assert!(session.connect().await);
        assert!(session.connect().await);
        assert!(session.is_connected());
        assert_eq!(transport.issued_count(), 1);
    }

    #[tokio::test]
    async fn failed_connect_is_retried_on_next_call() {
        let transport = ScriptedTransport::new([Script::text("Busy"), Script::text("Success")]);
        let mut session = session(&transport);

        assert!(!session.connect().await);
        assert!(session.connect().await);
        assert_eq!(transport.issued_count(), 2);
    }

    #[tokio::test]
    async fn generate_id_posts_user_and_message_fields() {
        let transport = ScriptedTransport::new([Script::text("abc123")]);
        let mut session = session(&transport);

        assert_eq!(session.generate_id().await, "abc123");
        assert_eq!(session.last_response(), Some("abc123"));
        assert_eq!(body_text(&transport, 0), "UserID=&RequestMessage=GenerateID");
    }

    #[tokio::test]
    async fn set_score_joins_values_with_commas() {
        let transport = ScriptedTransport::new([Script::text("Success")]);
        let mut session = session(&transport);

        session.set_score("u1", 5).await;
        assert_eq!(body_text(&transport, 0), "u1,5^SetScore");
    }

    #[tokio::test]
    async fn fetch_user_data_decodes_json() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Profile {
            #[serde(rename = "UserID")]
            user_id: String,
            #[serde(rename = "Score")]
            score: i64,
        }

        let transport = ScriptedTransport::new([
            Script::text(r#"{"UserID":"u1","Score":42}"#),
            Script::error("HTTP/1.1 404 Not Found"),
        ]);
        let mut session = session(&transport);

        let profile: Profile = session
            .fetch_user_data("u1", "DemoData")
            .await
            .expect("profile must decode");
        assert_eq!(
            profile,
            Profile {
                user_id: "u1".to_owned(),
                score: 42
            }
        );
        assert_eq!(body_text(&transport, 0), "u1,DemoData^GetUserData");

        let err = session
            .fetch_user_data::<Profile>("u1", "DemoData")
            .await
            .expect_err("failure sentinel is not JSON");
        assert!(matches!(err, ConnectorError::Decode(_)));
    }

    #[tokio::test]
    async fn close_picks_command_from_keep_data() {
        let transport = ScriptedTransport::new([Script::text("Success"), Script::text("None")]);
        let mut session = session(&transport);

        assert!(session.close("u1", true).await);
        assert!(!session.close("u1", false).await);
        assert_eq!(body_text(&transport, 0), "UserID=u1&RequestMessage=CloseClient");
        assert_eq!(body_text(&transport, 1), "UserID=u1&RequestMessage=DeleteUserData");
    }

    #[tokio::test]
    async fn close_if_open_skips_confirmed_session() {
        let transport = ScriptedTransport::new([Script::text("Success")]);
        let mut session = session(&transport);

        assert!(session.close("u1", false).await);
        assert!(session.is_closed());
        assert!(session.close_if_open("u1").await);
        assert_eq!(transport.issued_count(), 1);
    }

    #[tokio::test]
    async fn close_if_open_sends_close_client_until_confirmed() {
        let transport = ScriptedTransport::new([
            Script::error("Cannot connect to destination host"),
            Script::text("Success"),
        ]);
        let mut session = session(&transport);

        assert!(!session.close_if_open("u1").await);
        assert!(!session.is_closed());
        assert!(session.close_if_open("u1").await);
        assert!(session.is_closed());
        assert!(session.close_if_open("u1").await);

        assert_eq!(transport.issued_count(), 2);
        assert_eq!(body_text(&transport, 1), "UserID=u1&RequestMessage=CloseClient");
    }
}
