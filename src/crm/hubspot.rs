//! HubSpot CRM v3: one contact per lead plus a note with the original
//! message, associated to the contact.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};

use super::{CrmClient, CrmRecord, LeadDetails};

pub const HUBSPOT_API_URL: &str = "https://api.hubapi.com";

pub struct HubSpot {
    client: Client,
    api_base_url: String,
    api_key: String,
}

/// Split a display name into HubSpot's first and last name properties.
fn split_name(name: Option<&str>) -> (String, String) {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    match name.and_then(|n| n.split_once(' ')) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (
            name.unwrap_or("Lead").to_string(),
            String::from("AI Generated"),
        ),
    }
}

impl HubSpot {
    pub fn new(api_base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn create_object(&self, kind: &str, properties: Value) -> Result<String> {
        let res = self
            .client
            .post(format!("{}/crm/v3/objects/{}", self.api_base_url, kind))
            .bearer_auth(&self.api_key)
            .json(&json!({ "properties": properties }))
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("[HubSpot] Failed to create {}: {} ({})", kind, status, text);
        }
        let body: Value = serde_json::from_str(&text)?;
        body["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| anyhow!("[HubSpot] No id in {} response", kind))
    }

    async fn associate(&self, note_id: &str, contact_id: &str) -> Result<()> {
        let res = self
            .client
            .put(format!(
                "{}/crm/v3/objects/notes/{}/associations/contact/{}/note_to_contact",
                self.api_base_url, note_id, contact_id
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("[HubSpot] Association failed: {}", res.status());
        }
        Ok(())
    }
}

#[async_trait]
impl CrmClient for HubSpot {
    fn name(&self) -> &'static str {
        "HubSpotCRMTool.log"
    }

    async fn log_lead(&self, lead: &LeadDetails, message: &str) -> Result<CrmRecord> {
        let email = lead
            .email
            .as_deref()
            .ok_or_else(|| anyhow!("[HubSpot] Lead has no email address"))?;
        let (first, last) = split_name(lead.name.as_deref());

        let mut contact = json!({
            "email": email,
            "firstname": first,
            "lastname": last,
        });
        if let Some(company) = &lead.company {
            contact["company"] = json!(company);
        }
        let contact_id = self.create_object("contacts", contact).await?;

        let note_id = self
            .create_object(
                "notes",
                json!({
                    "hs_note_body": format!("Lead message: {}", message),
                    "hs_timestamp": Utc::now().timestamp_millis().to_string(),
                }),
            )
            .await?;

        // The contact and note exist even if linking them fails
        if let Err(e) = self.associate(&note_id, &contact_id).await {
            tracing::warn!("{}", e);
        }

        Ok(CrmRecord {
            status: String::from("logged"),
            contact_id: Some(contact_id),
            note_id: Some(note_id),
            message: format!("[HubSpot] Contact created and note logged for {}", email),
            lead: lead.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn lead() -> LeadDetails {
        LeadDetails {
            name: Some(String::from("Jane Doe")),
            email: Some(String::from("jane@acme.io")),
            company: Some(String::from("Acme")),
            interest: Some(String::from("Demo")),
            priority: Some(String::from("high")),
        }
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name(Some("Jane van Doe")),
            (String::from("Jane"), String::from("van Doe"))
        );
        assert_eq!(
            split_name(Some("Jane")),
            (String::from("Jane"), String::from("AI Generated"))
        );
        assert_eq!(
            split_name(None),
            (String::from("Lead"), String::from("AI Generated"))
        );
    }

    #[tokio::test]
    async fn test_log_lead_creates_contact_note_and_association() {
        let mut server = mockito::Server::new_async().await;
        let contact = server
            .mock("POST", "/crm/v3/objects/contacts")
            .match_header("authorization", "Bearer hs-key")
            .match_body(Matcher::PartialJson(json!({
                "properties": {"email": "jane@acme.io", "firstname": "Jane", "lastname": "Doe"}
            })))
            .with_status(201)
            .with_body(r#"{"id": "501"}"#)
            .create();
        let note = server
            .mock("POST", "/crm/v3/objects/notes")
            .match_body(Matcher::Regex(String::from("Lead message: Can we meet")))
            .with_status(201)
            .with_body(r#"{"id": "901"}"#)
            .create();
        let association = server
            .mock(
                "PUT",
                "/crm/v3/objects/notes/901/associations/contact/501/note_to_contact",
            )
            .with_status(200)
            .with_body("{}")
            .create();

        let hubspot = HubSpot::new(&server.url(), "hs-key");
        let record = hubspot.log_lead(&lead(), "Can we meet tomorrow?").await.unwrap();

        contact.assert();
        note.assert();
        association.assert();
        assert_eq!(record.contact_id.as_deref(), Some("501"));
        assert_eq!(record.note_id.as_deref(), Some("901"));
    }

    #[tokio::test]
    async fn test_contact_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _contact = server
            .mock("POST", "/crm/v3/objects/contacts")
            .with_status(409)
            .with_body(r#"{"message": "Contact already exists"}"#)
            .create();

        let hubspot = HubSpot::new(&server.url(), "hs-key");
        let err = hubspot.log_lead(&lead(), "Hi").await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_lead_without_email_is_rejected() {
        let hubspot = HubSpot::new("http://localhost:1", "hs-key");
        let err = hubspot
            .log_lead(&LeadDetails::default(), "Hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no email"));
    }
}
