//! Typed HTTP client for the blog server's JSON API.

mod error;
mod http_client;
mod models;

pub use error::BlogClientError;
pub use http_client::{BlogClient, TOKEN_FILE};
pub use models::{
    Author, Category, CategoryCount, CommentForm, CommentFormContext, CommentView, PageInfo, Post,
    PostDetail, PostForm, PostFormContext, PostList, Sidebar, Tag,
};
