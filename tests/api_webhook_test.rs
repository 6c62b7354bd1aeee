//! Integration tests for the webhook API endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    use crate::test_utils::*;

    const NO_DATE: &str = r#"{"datetime": null, "date_intent_type": "none"}"#;

    async fn post_form(harness: &Harness, form: &str) -> (StatusCode, Vec<u8>) {
        let response = test_app(harness.services())
            .oneshot(
                Request::builder()
                    .uri("/api/webhook/email")
                    .method("POST")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    /// Tests an inbound email runs the workflow and drafts a reply
    #[tokio::test]
    async fn it_processes_inbound_email() {
        let harness = Harness::new(qualified_model(NO_DATE));
        let form = format!(
            "from={}&subject={}&text={}",
            urlencoding::encode("Jane Doe <jane@acme.io>"),
            urlencoding::encode("Demo request"),
            urlencoding::encode("We'd like a demo of your product."),
        );

        let (status, body) = post_form(&harness, &form).await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["report"]["qualified"], json!(true));
        assert!(body["report"]["meeting"].is_object());

        let classifier_prompts = harness.llm.prompts_containing(CLASSIFIER);
        assert!(classifier_prompts[0].contains("We'd like a demo of your product."));

        let drafts = harness.mailbox.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].to, "jane@acme.io");
        assert_eq!(drafts[0].subject, "Re: Demo request");
    }

    /// Tests the HTML body is used when there is no plain text
    #[tokio::test]
    async fn it_falls_back_to_html_body() {
        let harness = Harness::new(qualified_model(NO_DATE));
        let form = format!(
            "from=bob%40example.com&subject=Hi&html={}",
            urlencoding::encode("<p>Interested in <b>pricing</b></p>"),
        );

        let (status, _) = post_form(&harness, &form).await;

        assert_eq!(status, StatusCode::OK);
        let classifier_prompts = harness.llm.prompts_containing(CLASSIFIER);
        assert!(classifier_prompts[0].contains("pricing"));
        assert!(!classifier_prompts[0].contains("<p>"));
    }

    /// Tests an email without any body is rejected
    #[tokio::test]
    async fn it_returns_400_without_body() {
        let harness = Harness::new(ScriptedModel::new());
        let (status, _) = post_form(&harness, "from=bob%40example.com&subject=Hi").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
