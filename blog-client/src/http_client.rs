use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::BlogClientError;
use crate::models::{
    CommentForm, CommentFormContext, PostDetail, PostForm, PostFormContext, PostList,
};

/// File the bearer token is kept in between invocations.
pub const TOKEN_FILE: &str = ".blog_token";

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct BlogClient {
    client: Client,
    base_url: Url,
    token_file: PathBuf,
    token: Option<String>,
}

impl BlogClient {
    /// Creates a client for `endpoint`, picking up a token saved by an
    /// earlier login from [`TOKEN_FILE`].
    pub fn connect(endpoint: &str) -> Result<Self, BlogClientError> {
        Self::with_token_file(endpoint, TOKEN_FILE)
    }

    pub fn with_token_file(
        endpoint: &str,
        token_file: impl Into<PathBuf>,
    ) -> Result<Self, BlogClientError> {
        let base_url = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| BlogClientError::InvalidRequest(format!("bad server url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BlogClientError::InvalidRequest(format!(
                "bad server url: {endpoint}"
            )));
        }
        let token_file = token_file.into();
        let token = match fs::read_to_string(&token_file) {
            Ok(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            client: Client::builder().build()?,
            base_url,
            token_file,
            token,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: String) -> Result<(), BlogClientError> {
        fs::write(&self.token_file, &token)?;
        self.token = Some(token);
        Ok(())
    }

    /// Forgets the token and removes the token file.
    pub fn logout(&mut self) -> Result<(), BlogClientError> {
        self.token = None;
        match fs::remove_file(&self.token_file) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn url(&self, segments: &[&str], trailing_slash: bool) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        url
    }

    fn page_url(&self, segments: &[&str], page: Option<u32>) -> Url {
        let mut url = self.url(segments, true);
        if let Some(page) = page {
            url.query_pairs_mut()
                .append_pair("page", &page.to_string());
        }
        url
    }

    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder, BlogClientError> {
        match &self.token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    BlogClientError::NotAuthenticated("stored token is not a valid header".into())
                })?;
                Ok(req.header(AUTHORIZATION, value))
            }
            None => Ok(req),
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BlogClientError> {
        let resp = self.authorize(req)?.send().await?;
        debug!(status = resp.status().as_u16(), url = %resp.url(), "response received");
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(BlogClientError::from_http_response(resp).await)
        }
    }

    async fn authenticate(
        &mut self,
        action: &str,
        username: &str,
        password: &str,
    ) -> Result<(), BlogClientError> {
        let req = self
            .client
            .post(self.url(&["auth", action], false))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }));
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(BlogClientError::from_http_response(resp).await);
        }
        let auth: AuthResponse = resp.json().await?;
        self.set_token(auth.access_token)
    }

    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<(), BlogClientError> {
        self.authenticate("register", username, password).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), BlogClientError> {
        self.authenticate("login", username, password).await
    }

    pub async fn list_posts(&self, page: Option<u32>) -> Result<PostList, BlogClientError> {
        self.send(self.client.get(self.page_url(&["blog"], page)))
            .await
    }

    pub async fn get_post(&self, id: i64) -> Result<PostDetail, BlogClientError> {
        self.send(self.client.get(self.url(&["blog", &id.to_string()], true)))
            .await
    }

    /// `slug` may be `_none` for the uncategorized posts.
    pub async fn category_posts(
        &self,
        slug: &str,
        page: Option<u32>,
    ) -> Result<PostList, BlogClientError> {
        self.send(
            self.client
                .get(self.page_url(&["blog", "category", slug], page)),
        )
        .await
    }

    pub async fn tag_posts(
        &self,
        slug: &str,
        page: Option<u32>,
    ) -> Result<PostList, BlogClientError> {
        self.send(self.client.get(self.page_url(&["blog", "tag", slug], page)))
            .await
    }

    pub async fn search_posts(
        &self,
        term: &str,
        page: Option<u32>,
    ) -> Result<PostList, BlogClientError> {
        self.send(self.client.get(self.page_url(&["blog", "search", term], page)))
            .await
    }

    pub async fn create_post(&self, form: &PostForm) -> Result<PostDetail, BlogClientError> {
        self.send(
            self.client
                .post(self.url(&["blog", "create"], true))
                .json(form),
        )
        .await
    }

    /// The post's current values as the server pre-fills its update form.
    pub async fn update_form(&self, id: i64) -> Result<PostFormContext, BlogClientError> {
        self.send(
            self.client
                .get(self.url(&["blog", &id.to_string(), "update"], true)),
        )
        .await
    }

    pub async fn update_post(
        &self,
        id: i64,
        form: &PostForm,
    ) -> Result<PostDetail, BlogClientError> {
        self.send(
            self.client
                .post(self.url(&["blog", &id.to_string(), "update"], true))
                .json(form),
        )
        .await
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), BlogClientError> {
        let req = self
            .client
            .post(self.url(&["blog", &id.to_string(), "delete"], true));
        let resp = self.authorize(req)?.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(BlogClientError::from_http_response(resp).await)
        }
    }

    pub async fn new_comment(
        &self,
        post_id: i64,
        text: &str,
    ) -> Result<PostDetail, BlogClientError> {
        self.send(
            self.client
                .post(self.url(&["blog", &post_id.to_string(), "new_comment"], true))
                .json(&CommentForm { text: text.into() }),
        )
        .await
    }

    pub async fn edit_comment_form(&self, id: i64) -> Result<CommentFormContext, BlogClientError> {
        self.send(
            self.client
                .get(self.url(&["blog", "edit_comment", &id.to_string()], true)),
        )
        .await
    }

    pub async fn edit_comment(&self, id: i64, text: &str) -> Result<PostDetail, BlogClientError> {
        self.send(
            self.client
                .post(self.url(&["blog", "edit_comment", &id.to_string()], true))
                .json(&CommentForm { text: text.into() }),
        )
        .await
    }

    pub async fn delete_comment(&self, id: i64) -> Result<PostDetail, BlogClientError> {
        self.send(
            self.client
                .get(self.url(&["blog", "delete_comment", &id.to_string()], true)),
        )
        .await
    }
}
