//! Integration tests for background jobs

mod test_utils;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use base64::{Engine as _, engine::general_purpose::URL_SAFE};
    use mockito::Matcher;
    use serde_json::json;

    use leadflow::google::gmail::Gmail;
    use leadflow::google::oauth::TokenProvider;
    use leadflow::jobs::{PeriodicJob, ProcessInbox};

    use crate::test_utils::*;

    const NO_DATE: &str = r#"{"datetime": null, "date_intent_type": "none"}"#;

    fn gmail(server: &mockito::ServerGuard) -> Arc<Gmail> {
        Arc::new(Gmail::new(
            &server.url(),
            Arc::new(TokenProvider::Static(String::from("test_token"))),
        ))
    }

    fn message_body(id: &str, text: &str) -> String {
        json!({
            "id": id,
            "threadId": "thr_001",
            "snippet": text,
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "From", "value": "Jane Doe <jane@acme.io>"},
                    {"name": "Subject", "value": "Demo request"}
                ],
                "body": {"data": URL_SAFE.encode(text.as_bytes())}
            }
        })
        .to_string()
    }

    /// Tests unread messages go through the workflow and are marked read
    #[tokio::test]
    async fn it_processes_unread_messages() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/users/me/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"messages": [{"id": "msg_001", "threadId": "thr_001"}]}"#)
            .create();
        let _fetch = server
            .mock("GET", "/users/me/messages/msg_001")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(message_body("msg_001", "Could we set up a demo next week?"))
            .create();
        let mark_read = server
            .mock("POST", "/users/me/messages/msg_001/modify")
            .match_body(Matcher::PartialJson(json!({"removeLabelIds": ["UNREAD"]})))
            .with_status(200)
            .with_body("{}")
            .create();

        let harness = Harness::new(qualified_model(NO_DATE));
        let job = ProcessInbox::new(gmail(&server), harness.services(), Duration::from_secs(60));

        let processed = job.process(&test_config()).await.unwrap();

        assert_eq!(processed, 1);
        mark_read.assert();
        let classifier_prompts = harness.llm.prompts_containing(CLASSIFIER);
        assert!(classifier_prompts[0].contains("Could we set up a demo next week?"));

        let drafts = harness.mailbox.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].thread_id.as_deref(), Some("thr_001"));
        assert_eq!(drafts[0].subject, "Re: Demo request");
    }

    /// Tests a failing inbox listing is an error and nothing runs
    #[tokio::test]
    async fn it_fails_when_the_inbox_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/users/me/messages")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": "unauthorized"}"#)
            .create();

        let harness = Harness::new(ScriptedModel::new());
        let job = ProcessInbox::new(gmail(&server), harness.services(), Duration::from_secs(60));

        assert!(job.process(&test_config()).await.is_err());
        // The periodic wrapper only logs
        job.run_job(&test_config()).await;
        assert!(harness.llm.prompts().is_empty());
    }

    /// Tests the poll interval comes from the job
    #[test]
    fn it_uses_the_configured_interval() {
        let server_url = "http://localhost:1";
        let gmail = Arc::new(Gmail::new(
            server_url,
            Arc::new(TokenProvider::Static(String::from("t"))),
        ));
        let harness = Harness::new(ScriptedModel::new());
        let job = ProcessInbox::new(gmail, harness.services(), Duration::from_secs(300));
        assert_eq!(job.interval(), Duration::from_secs(300));
    }
}
