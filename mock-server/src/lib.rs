use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const DEFAULT_USERNAME: &str = "demo";
pub const DEFAULT_PASSWORD: &str = "secret";

/// A post as the API returns it. `author` is not part of the client's
/// record and is there to exercise unknown-field handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub author: String,
    pub date: String,
    pub text: String,
    pub public_text: String,
    pub mood: i32,
    pub location_verbose: String,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub public: bool,
}

impl Post {
    /// A private post without location; the id is set by `Store::insert`.
    pub fn draft(author: &str, date: &str, text: &str, mood: i32) -> Self {
        Self {
            id: 0,
            author: author.to_string(),
            date: date.to_string(),
            text: text.to_string(),
            public_text: String::new(),
            mood,
            location_verbose: String::new(),
            location_lat: None,
            location_lon: None,
            public: false,
        }
    }
}

#[derive(Deserialize)]
pub struct PostForm {
    pub date: String,
    pub text: String,
    pub mood: String,
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    posts: Vec<Post>,
}

impl Store {
    /// Store `post` under the next id and return the stored copy.
    pub fn insert(&mut self, mut post: Post) -> Post {
        self.next_id += 1;
        post.id = self.next_id;
        self.posts.push(post.clone());
        post
    }
}

#[derive(Clone)]
pub struct AppState {
    username: Arc<str>,
    password: Arc<str>,
    pub store: Arc<RwLock<Store>>,
}

impl AppState {
    pub fn new(username: &str, password: &str) -> Self {
        Self::with_store(username, password, Store::default())
    }

    pub fn with_store(username: &str, password: &str, store: Store) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            store: Arc::new(RwLock::new(store)),
        }
    }
}

/// Errors in the shape the shortdiary API produces.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    NotFound(&'static str),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // The real service answers 401 with a non-JSON body.
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"api\"")],
                "Invalid username/password.",
            )
                .into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(json!({ "Error": msg }))).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "Error": msg }))).into_response(),
        }
    }
}

/// Router with the default account and its seeded first post.
pub fn app() -> Router {
    app_with_account(DEFAULT_USERNAME, DEFAULT_PASSWORD)
}

/// Router for one account, seeded with post 1 so credential probes succeed.
pub fn app_with_account(username: &str, password: &str) -> Router {
    let mut store = Store::default();
    store.insert(Post::draft(username, "2013-05-01", "First post", 5));
    router(AppState::with_store(username, password, store))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/posts/", get(list_posts).post(create_post))
        .route("/api/v1/posts/{id}/", get(get_post).put(update_post))
        .route("/api/v1/public/", get(public_post))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    info!(%addr, "mock shortdiary api listening");
    axum::serve(listener, app()).await
}

/// Check the Basic credentials and return the user name.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .ok_or(ApiError::Unauthorized)?;
    let decoded = STANDARD.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
    match decoded.split_once(':') {
        Some((user, pass)) if user == &*state.username && pass == &*state.password => Ok(user.to_string()),
        _ => {
            debug!("rejected credentials");
            Err(ApiError::Unauthorized)
        }
    }
}

fn validate(form: Result<Form<PostForm>, FormRejection>) -> Result<(String, String, i32), ApiError> {
    let Form(form) = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    NaiveDate::parse_from_str(&form.date, "%Y-%m-%d").map_err(|_| ApiError::BadRequest("Invalid date".to_string()))?;
    let mood = form
        .mood
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid mood".to_string()))?;
    if form.text.is_empty() {
        return Err(ApiError::BadRequest("Text must not be empty".to_string()));
    }
    Ok((form.date, form.text, mood))
}

async fn list_posts(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Post>>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let store = state.store.read().await;
    Ok(Json(store.posts.iter().filter(|p| p.author == user).cloned().collect()))
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<PostForm>, FormRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let user = authenticate(&state, &headers)?;
    let (date, text, mood) = validate(form)?;
    let post = state.store.write().await.insert(Post::draft(&user, &date, &text, mood));
    debug!(id = post.id, "created post");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Post>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let store = state.store.read().await;
    store
        .posts
        .iter()
        .find(|p| p.id == id && p.author == user)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("Post not found"))
}

async fn update_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    form: Result<Form<PostForm>, FormRejection>,
) -> Result<Json<Post>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let mut store = state.store.write().await;
    let post = store
        .posts
        .iter_mut()
        .find(|p| p.id == id && p.author == user)
        .ok_or(ApiError::NotFound("Post not found"))?;
    let (date, text, mood) = validate(form)?;
    post.date = date;
    post.text = text;
    post.mood = mood;
    Ok(Json(post.clone()))
}

async fn public_post(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Post>, ApiError> {
    authenticate(&state, &headers)?;
    let store = state.store.read().await;
    store
        .posts
        .iter()
        .rev()
        .find(|p| p.public)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("No public posts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, pass: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    fn state() -> AppState {
        AppState::new("demo", "secret")
    }

    #[test]
    fn accepts_matching_credentials() {
        assert_eq!(authenticate(&state(), &basic("demo", "secret")).unwrap(), "demo");
    }

    #[test]
    fn rejects_wrong_password() {
        let err = authenticate(&state(), &basic("demo", "nope")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn rejects_missing_header() {
        let err = authenticate(&state(), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn password_may_contain_colons() {
        let mut state = state();
        state.password = "a:b".into();
        assert!(authenticate(&state, &basic("demo", "a:b")).is_ok());
    }

    #[test]
    fn store_assigns_sequential_ids() {
        let mut store = Store::default();
        let post = Post::draft("demo", "2020-01-01", "x", 1);
        assert_eq!(store.insert(post.clone()).id, 1);
        assert_eq!(store.insert(post).id, 2);
    }

    #[test]
    fn post_form_requires_all_fields() {
        let result: Result<PostForm, _> = serde_json::from_str(r#"{"date":"2020-01-01","text":"x"}"#);
        assert!(result.is_err());
    }
}
