use crate::error::ApiError;
use crate::task::{NewTask, Task, TaskRecord};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://tasktrackerbackend-x03u.onrender.com";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    jwt_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for the task backend.
#[derive(Debug, Clone)]
pub struct TaskApi {
    client: Client,
    base_url: String,
}

impl TaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchanges credentials for a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        tracing::debug!(email, "POST /login");
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let body = check(response).await?.bytes().await?;
        let LoginResponse { jwt_token } = serde_json::from_slice(&body)?;
        Ok(jwt_token)
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        tracing::debug!(email, "POST /signup");
        let response = self
            .client
            .post(self.url("/signup"))
            .json(&SignupRequest {
                name,
                email,
                password,
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Fetches the user's tasks in server order.
    pub async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, ApiError> {
        tracing::debug!("GET /tasks");
        let response = self
            .client
            .get(self.url("/tasks"))
            .bearer_auth(token)
            .send()
            .await?;
        let body = check(response).await?.bytes().await?;
        let records: Vec<TaskRecord> = serde_json::from_slice(&body)?;
        Ok(records.into_iter().map(Task::from).collect())
    }

    pub async fn get_task(&self, token: &str, id: &str) -> Result<Task, ApiError> {
        tracing::debug!(id, "GET /tasks/:id");
        let response = self
            .client
            .get(self.url(&format!("/tasks/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        let body = check(response).await?.bytes().await?;
        let record: TaskRecord = serde_json::from_slice(&body)?;
        Ok(record.into())
    }

    /// Creates a task. Returns the server's copy when the response body is a task record.
    pub async fn create_task(&self, token: &str, task: &NewTask) -> Result<Option<Task>, ApiError> {
        tracing::debug!(id = %task.id, "POST /tasks");
        let response = self
            .client
            .post(self.url("/tasks"))
            .bearer_auth(token)
            .json(task)
            .send()
            .await?;
        echoed_task(check(response).await?).await
    }

    /// Replaces a task with `record`. Returns the server's copy when it sends one back.
    pub async fn update_task(
        &self,
        token: &str,
        id: &str,
        record: &TaskRecord,
    ) -> Result<Option<Task>, ApiError> {
        tracing::debug!(id, "PUT /tasks/:id");
        let response = self
            .client
            .put(self.url(&format!("/tasks/{}", id)))
            .bearer_auth(token)
            .json(record)
            .send()
            .await?;
        echoed_task(check(response).await?).await
    }

    pub async fn delete_task(&self, token: &str, id: &str) -> Result<(), ApiError> {
        tracing::debug!(id, "DELETE /tasks/:id");
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message);
    tracing::warn!(%status, ?message, "request rejected");
    Err(ApiError::Status { status, message })
}

async fn echoed_task(response: Response) -> Result<Option<Task>, ApiError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice::<TaskRecord>(&body).ok().map(Task::from))
}
