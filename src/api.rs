use crate::error::{Error, Result};
use crate::models::{CreateTodoInput, Todo, TodoPatch, UpdateTodoInput, User};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// The upstream todo/user service. It has no server-side filtering, so list
/// reads always return the whole collection.
#[async_trait]
pub trait TodoSource: Send + Sync {
    async fn fetch_todos(&self) -> Result<Vec<Todo>>;
    async fn fetch_todo(&self, id: u64) -> Result<Todo>;
    async fn create_todo(&self, input: &CreateTodoInput) -> Result<Todo>;
    async fn update_todo(&self, id: u64, input: &UpdateTodoInput) -> Result<TodoPatch>;
    async fn delete_todo(&self, id: u64) -> Result<()>;
    async fn fetch_users(&self) -> Result<Vec<User>>;
}

#[derive(Clone, Debug)]
pub struct JsonPlaceholder {
    client: Client,
    base_url: String,
}

impl JsonPlaceholder {
    pub fn new(base_url: &str) -> Self {
        JsonPlaceholder {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        self.client
            .request(method, url)
            .header("Content-Type", "application/json")
    }

    async fn send(&self, method: Method, endpoint: &str, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(%method, endpoint, "upstream request");
        let res = request.send().await?;
        let status = res.status();
        tracing::debug!(%method, endpoint, status = status.as_u16(), "upstream response");

        if status.is_success() {
            Ok(res)
        } else {
            Err(upstream_error(status))
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let res = self
            .send(Method::GET, endpoint, self.request(Method::GET, endpoint))
            .await?;
        Ok(res.json::<T>().await?)
    }
}

fn upstream_error(status: StatusCode) -> Error {
    Error::Upstream {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

#[async_trait]
impl TodoSource for JsonPlaceholder {
    async fn fetch_todos(&self) -> Result<Vec<Todo>> {
        self.fetch_json("/todos").await
    }

    async fn fetch_todo(&self, id: u64) -> Result<Todo> {
        match self.fetch_json(&format!("/todos/{}", id)).await {
            Err(Error::Upstream { status: 404, .. }) => Err(Error::NotFound { id }),
            other => other,
        }
    }

    async fn create_todo(&self, input: &CreateTodoInput) -> Result<Todo> {
        let endpoint = "/todos";
        let request = self.request(Method::POST, endpoint).json(input);
        let res = self.send(Method::POST, endpoint, request).await?;
        Ok(res.json::<Todo>().await?)
    }

    async fn update_todo(&self, id: u64, input: &UpdateTodoInput) -> Result<TodoPatch> {
        let endpoint = format!("/todos/{}", id);

        let mut body = json!({ "id": id });
        if let Some(title) = &input.title {
            body["title"] = json!(title);
        }
        if let Some(user_id) = input.user_id {
            body["userId"] = json!(user_id);
        }
        if let Some(completed) = input.completed {
            body["completed"] = json!(completed);
        }

        let request = self.request(Method::PUT, &endpoint).json(&body);
        let res = self.send(Method::PUT, &endpoint, request).await?;
        Ok(res.json::<TodoPatch>().await?)
    }

    async fn delete_todo(&self, id: u64) -> Result<()> {
        let endpoint = format!("/todos/{}", id);
        let request = self.request(Method::DELETE, &endpoint);
        self.send(Method::DELETE, &endpoint, request).await?;
        Ok(())
    }

    async fn fetch_users(&self) -> Result<Vec<User>> {
        self.fetch_json("/users").await
    }
}
