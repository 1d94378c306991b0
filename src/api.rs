//! REST collaborator seam for snapshots and actions.
//!
//! All server-state *writes* (join, submit, vote, host controls) and the
//! one-shot snapshot *read* go through these traits — the push channel is
//! read-only from the client's perspective. The traits are object-safe so
//! room handles can hold `Arc<dyn QuizApi>` etc., and so tests can swap in
//! scripted implementations.
//!
//! [`HttpApi`] is the default implementation behind the `api-http` feature
//! (enabled by default), covering all three domains against a single base
//! URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::{
    ContestSnapshot, OptionId, QuestionId, QuizSnapshot, RoomId, SurveySnapshot, UserId,
};

// ── Action payloads ─────────────────────────────────────────────────

/// Server acknowledgement of a join action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinReceipt {
    /// Identity assigned (or confirmed) by the server.
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: String,
}

/// One answer of a survey submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswer {
    pub question_id: QuestionId,
    /// For option questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<OptionId>,
    /// For free-text questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A vote cast during a contest jury/public-vote stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContestVote {
    /// The presented submission being voted on.
    pub submission_id: uuid::Uuid,
    /// Jury score; absent for plain public votes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

// ── Domain API traits ───────────────────────────────────────────────

/// REST surface of the quiz domain.
#[async_trait]
pub trait QuizApi: Send + Sync + 'static {
    /// One-shot authoritative read of current room state. Idempotent; safe
    /// to call repeatedly. Never retried automatically — the room view
    /// decides when to retry a failure.
    async fn room_details(&self, room_id: RoomId) -> Result<QuizSnapshot>;

    /// Join the room as a participant.
    async fn join(&self, room_id: RoomId, display_name: &str) -> Result<JoinReceipt>;

    /// Submit one answer for a question. The server rejects duplicates;
    /// the client-side latch in the room handle avoids re-sending.
    async fn submit_answer(
        &self,
        room_id: RoomId,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<()>;

    /// Host action: start the quiz from the lobby.
    async fn start(&self, room_id: RoomId) -> Result<()>;

    /// Host action: advance to the next question.
    async fn next_question(&self, room_id: RoomId) -> Result<()>;

    /// Host action: force-finish the current question.
    async fn finish_question(&self, room_id: RoomId) -> Result<()>;

    /// Host action: close the room.
    async fn close(&self, room_id: RoomId) -> Result<()>;
}

/// REST surface of the survey domain.
#[async_trait]
pub trait SurveyApi: Send + Sync + 'static {
    /// One-shot authoritative read of current room state.
    async fn room_details(&self, room_id: RoomId) -> Result<SurveySnapshot>;

    /// Join the room as a participant.
    async fn join(&self, room_id: RoomId, display_name: &str) -> Result<JoinReceipt>;

    /// Submit the whole survey form at once.
    async fn submit(&self, room_id: RoomId, answers: &[SurveyAnswer]) -> Result<()>;

    /// Host action: close the survey.
    async fn close(&self, room_id: RoomId) -> Result<()>;
}

/// REST surface of the contest domain.
#[async_trait]
pub trait ContestApi: Send + Sync + 'static {
    /// One-shot authoritative read of current room state.
    async fn room_details(&self, room_id: RoomId) -> Result<ContestSnapshot>;

    /// Join the contest as a participant.
    async fn join(&self, room_id: RoomId, display_name: &str) -> Result<JoinReceipt>;

    /// Cast a vote during a jury/public-vote stage.
    async fn vote(&self, room_id: RoomId, vote: &ContestVote) -> Result<()>;

    /// Host action: advance to the next stage. The authoritative stage
    /// change arrives back via `STAGE_CHANGED` (or an explicit refresh) —
    /// this call does not mutate local state.
    async fn advance_stage(&self, room_id: RoomId) -> Result<()>;

    /// Host action: close the contest.
    async fn close(&self, room_id: RoomId) -> Result<()>;
}

// ── HTTP implementation ─────────────────────────────────────────────

/// Error body shape returned by the REST collaborator on non-2xx responses.
/// Decoded defensively — both fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<crate::error_codes::ErrorCode>,
}

/// Default HTTP implementation of all three domain APIs.
///
/// One instance serves every domain: paths are prefixed with the domain
/// segment (`/quiz/rooms/{id}`, `/survey/rooms/{id}`, …). The bearer
/// credential, when set, is attached to every request.
#[cfg(feature = "api-http")]
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

#[cfg(feature = "api-http")]
impl HttpApi {
    /// Create an API client against the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            credential: None,
        }
    }

    /// Attach a bearer credential to every request.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Use a pre-configured `reqwest` client (custom TLS, proxies,
    /// timeouts).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let builder = self.client.request(method, url);
        match &self.credential {
            Some(credential) => builder.bearer_auth(credential),
            None => builder,
        }
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response).await);
        }
        Ok(response.json().await?)
    }

    async fn expect_ok(builder: reqwest::RequestBuilder) -> Result<()> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response).await);
        }
        Ok(())
    }

    async fn status_error(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> crate::error::RoomcastError {
        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        crate::error::RoomcastError::Api {
            status: status.as_u16(),
            message: body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").into()),
            error_code: body.error_code,
        }
    }
}

#[cfg(feature = "api-http")]
#[async_trait]
impl QuizApi for HttpApi {
    async fn room_details(&self, room_id: RoomId) -> Result<QuizSnapshot> {
        Self::expect_json(self.request(reqwest::Method::GET, &format!("/quiz/rooms/{room_id}")))
            .await
    }

    async fn join(&self, room_id: RoomId, display_name: &str) -> Result<JoinReceipt> {
        Self::expect_json(
            self.request(reqwest::Method::POST, &format!("/quiz/rooms/{room_id}/join"))
                .json(&serde_json::json!({ "displayName": display_name })),
        )
        .await
    }

    async fn submit_answer(
        &self,
        room_id: RoomId,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<()> {
        Self::expect_ok(
            self.request(
                reqwest::Method::POST,
                &format!("/quiz/rooms/{room_id}/questions/{question_id}/answers"),
            )
            .json(&serde_json::json!({ "optionId": option_id })),
        )
        .await
    }

    async fn start(&self, room_id: RoomId) -> Result<()> {
        Self::expect_ok(self.request(reqwest::Method::POST, &format!("/quiz/rooms/{room_id}/start")))
            .await
    }

    async fn next_question(&self, room_id: RoomId) -> Result<()> {
        Self::expect_ok(self.request(reqwest::Method::POST, &format!("/quiz/rooms/{room_id}/next")))
            .await
    }

    async fn finish_question(&self, room_id: RoomId) -> Result<()> {
        Self::expect_ok(
            self.request(reqwest::Method::POST, &format!("/quiz/rooms/{room_id}/finish")),
        )
        .await
    }

    async fn close(&self, room_id: RoomId) -> Result<()> {
        Self::expect_ok(self.request(reqwest::Method::POST, &format!("/quiz/rooms/{room_id}/close")))
            .await
    }
}

#[cfg(feature = "api-http")]
#[async_trait]
impl SurveyApi for HttpApi {
    async fn room_details(&self, room_id: RoomId) -> Result<SurveySnapshot> {
        Self::expect_json(self.request(reqwest::Method::GET, &format!("/survey/rooms/{room_id}")))
            .await
    }

    async fn join(&self, room_id: RoomId, display_name: &str) -> Result<JoinReceipt> {
        Self::expect_json(
            self.request(reqwest::Method::POST, &format!("/survey/rooms/{room_id}/join"))
                .json(&serde_json::json!({ "displayName": display_name })),
        )
        .await
    }

    async fn submit(&self, room_id: RoomId, answers: &[SurveyAnswer]) -> Result<()> {
        Self::expect_ok(
            self.request(
                reqwest::Method::POST,
                &format!("/survey/rooms/{room_id}/submissions"),
            )
            .json(&serde_json::json!({ "answers": answers })),
        )
        .await
    }

    async fn close(&self, room_id: RoomId) -> Result<()> {
        Self::expect_ok(
            self.request(reqwest::Method::POST, &format!("/survey/rooms/{room_id}/close")),
        )
        .await
    }
}

#[cfg(feature = "api-http")]
#[async_trait]
impl ContestApi for HttpApi {
    async fn room_details(&self, room_id: RoomId) -> Result<ContestSnapshot> {
        Self::expect_json(self.request(reqwest::Method::GET, &format!("/contest/rooms/{room_id}")))
            .await
    }

    async fn join(&self, room_id: RoomId, display_name: &str) -> Result<JoinReceipt> {
        Self::expect_json(
            self.request(
                reqwest::Method::POST,
                &format!("/contest/rooms/{room_id}/join"),
            )
            .json(&serde_json::json!({ "displayName": display_name })),
        )
        .await
    }

    async fn vote(&self, room_id: RoomId, vote: &ContestVote) -> Result<()> {
        Self::expect_ok(
            self.request(reqwest::Method::POST, &format!("/contest/rooms/{room_id}/votes"))
                .json(vote),
        )
        .await
    }

    async fn advance_stage(&self, room_id: RoomId) -> Result<()> {
        Self::expect_ok(
            self.request(
                reqwest::Method::POST,
                &format!("/contest/rooms/{room_id}/advance"),
            ),
        )
        .await
    }

    async fn close(&self, room_id: RoomId) -> Result<()> {
        Self::expect_ok(
            self.request(reqwest::Method::POST, &format!("/contest/rooms/{room_id}/close")),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn api_error_body_decodes_defensively() {
        let body: ApiErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message.is_none());
        assert!(body.error_code.is_none());

        let body: ApiErrorBody = serde_json::from_str(
            r#"{"message":"room is closed","errorCode":"ROOM_CLOSED"}"#,
        )
        .unwrap();
        assert_eq!(body.message.as_deref(), Some("room is closed"));
        assert_eq!(
            body.error_code,
            Some(crate::error_codes::ErrorCode::RoomClosed)
        );
    }

    #[test]
    fn survey_answer_skips_absent_fields() {
        let answer = SurveyAnswer {
            question_id: uuid::Uuid::nil(),
            option_id: None,
            text: Some("free text".into()),
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert!(json.get("optionId").is_none());
        assert_eq!(json["text"], "free text");
    }

    #[test]
    fn contest_vote_wire_shape() {
        use serde_json::json;

        let vote = ContestVote {
            submission_id: uuid::Uuid::from_u128(7),
            score: Some(9),
        };
        let json = serde_json::to_value(&vote).unwrap();
        assert_eq!(json["submissionId"], json!(uuid::Uuid::from_u128(7)));
        assert_eq!(json["score"], 9);

        let public: ContestVote =
            serde_json::from_value(json!({ "submissionId": uuid::Uuid::from_u128(8) })).unwrap();
        assert!(public.score.is_none());
    }
}
