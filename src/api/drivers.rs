use serde::Deserialize;

use crate::models::{Driver, DriverDraft, DriverId};

use super::error::ApiError;

// ============================================================================
// Driver Directory Client
// ============================================================================
//
// The admin screen's CRUD surface. The directory is small, so mutations do
// not patch locally: after every add/edit/delete the whole roster is
// refetched. The list endpoint sometimes returns a bare array and sometimes
// wraps it under a `drivers` key; both shapes decode.
//
// ============================================================================

pub struct DriverDirectoryApi {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DriversPayload {
    Bare(Vec<Driver>),
    Wrapped { drivers: Vec<Driver> },
}

impl DriversPayload {
    fn into_roster(self) -> Vec<Driver> {
        match self {
            DriversPayload::Bare(drivers) => drivers,
            DriversPayload::Wrapped { drivers } => drivers,
        }
    }
}

impl DriverDirectoryApi {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list(&self) -> Result<Vec<Driver>, ApiError> {
        let response = self.http.get(self.endpoint("/api/drivers")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                op: "list_drivers",
                status,
            });
        }
        let payload: DriversPayload = response.json().await?;
        Ok(payload.into_roster())
    }

    pub async fn add(&self, draft: &DriverDraft) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.endpoint("/api/drivers/add"))
            .json(draft)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                op: "add_driver",
                status,
            });
        }
        tracing::info!(name = %draft.name, "driver added");
        Ok(())
    }

    pub async fn update(&self, id: &DriverId, draft: &DriverDraft) -> Result<(), ApiError> {
        let response = self
            .http
            .put(self.endpoint(&format!("/api/drivers/edit/{id}")))
            .json(draft)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                op: "edit_driver",
                status,
            });
        }
        tracing::info!(driver_id = %id, "driver updated");
        Ok(())
    }

    pub async fn remove(&self, id: &DriverId) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/api/drivers/{id}")))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                op: "delete_driver",
                status,
            });
        }
        tracing::info!(driver_id = %id, "driver removed");
        Ok(())
    }
}

// ============================================================================
// Driver Admin Session
// ============================================================================

/// Holds the roster for the admin screen. Mutations validate the form,
/// forward to the backend and then refetch the full list.
pub struct DriverAdmin {
    api: DriverDirectoryApi,
    roster: Vec<Driver>,
}

impl DriverAdmin {
    pub fn new(api: DriverDirectoryApi) -> Self {
        Self {
            api,
            roster: Vec::new(),
        }
    }

    pub fn roster(&self) -> &[Driver] {
        &self.roster
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        self.roster = self.api.list().await?;
        tracing::debug!(count = self.roster.len(), "driver roster refreshed");
        Ok(())
    }

    pub async fn add(&mut self, draft: &DriverDraft) -> Result<(), ApiError> {
        draft.validate()?;
        self.api.add(draft).await?;
        self.refresh().await
    }

    pub async fn update(&mut self, id: &DriverId, draft: &DriverDraft) -> Result<(), ApiError> {
        draft.validate()?;
        self.api.update(id, draft).await?;
        self.refresh().await
    }

    pub async fn remove(&mut self, id: &DriverId) -> Result<(), ApiError> {
        self.api.remove(id).await?;
        self.refresh().await
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_list_decodes_bare_array() {
        let payload: DriversPayload =
            serde_json::from_str(r#"[{"_id": "d1", "name": "Mulu", "phone": "0922"}]"#).unwrap();
        let roster = payload.into_roster();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "Mulu");
    }

    #[test]
    fn test_driver_list_decodes_wrapped_object() {
        let payload: DriversPayload = serde_json::from_str(
            r#"{"drivers": [{"_id": "d1", "name": "Mulu", "phone": "0922"},
                            {"_id": "d2", "name": "Kebede", "phone": "0933"}]}"#,
        )
        .unwrap();
        assert_eq!(payload.into_roster().len(), 2);
    }

    #[tokio::test]
    async fn test_admin_rejects_invalid_draft_before_any_request() {
        // Unroutable base URL: validation must fail before it matters.
        let api = DriverDirectoryApi::new(reqwest::Client::new(), "http://127.0.0.1:1");
        let mut admin = DriverAdmin::new(api);

        let missing_phone = DriverDraft {
            name: "Mulu".to_string(),
            phone: String::new(),
            vehicle_plate: String::new(),
        };
        let err = admin.add(&missing_phone).await.unwrap_err();
        assert!(matches!(err, ApiError::Form(_)));
        assert!(admin.roster().is_empty());
    }
}
