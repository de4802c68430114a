use axum::{
    response::{Html, Redirect},
    routing::get,
    Router,
};

use crate::api::AppState;

pub const LEARN_PATH: &str = "/learn";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Learn,
    Login,
}

macro_rules! view_file {
    ($name:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/views/", $name, ".html"))
    };
}

impl View {
    pub fn html(self) -> &'static str {
        match self {
            View::Learn => view_file!("learn"),
            View::Login => view_file!("login"),
        }
    }
}

/// Path to view bindings. `/` is not listed: it redirects to the learn view.
pub const ROUTES: &[(&str, View)] = &[(LEARN_PATH, View::Learn), (LOGIN_PATH, View::Login)];

pub fn router() -> Router<AppState> {
    ROUTES.iter().fold(
        Router::new().route("/", get(|| async { Redirect::temporary(LEARN_PATH) })),
        |router, &(path, view)| router.route(path, get(move || async move { Html(view.html()) })),
    )
}
