//! Integration tests for the resource share backend.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, LogFormat};
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
const NOT_OWNER: &str = "You are not the resource owner.";
const NOT_AUTHOR: &str = "You can delete only your own comments.";
const FORBIDDEN: &str = "You do not have permission to perform this action.";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
            admin: None,
            cors_any: true,
        };

        let state = AppState {
            repo: repo.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            repo,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.get(self.url(path)), token)
    }

    fn post(&self, path: &str, token: Option<&str>, body: Value) -> RequestBuilder {
        with_token(self.client.post(self.url(path)), token).json(&body)
    }

    fn put(&self, path: &str, token: Option<&str>, body: Value) -> RequestBuilder {
        with_token(self.client.put(self.url(path)), token).json(&body)
    }

    fn patch(&self, path: &str, token: Option<&str>, body: Value) -> RequestBuilder {
        with_token(self.client.patch(self.url(path)), token).json(&body)
    }

    fn delete(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.delete(self.url(path)), token)
    }

    /// Register a user through the API and return `(id, token)`.
    async fn register(&self, username: &str, password: &str) -> (i64, String) {
        let resp = self
            .post(
                "/register/",
                None,
                json!({ "username": username, "password": password }),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        (
            body["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Create a staff account directly in the store and return its token.
    async fn admin_token(&self) -> String {
        let (_, token) = self
            .repo
            .create_user("admin_user", "not-a-login-hash", true)
            .await
            .unwrap();
        token
    }

    async fn create_category(&self, name: &str) -> i64 {
        self.repo.create_category(name).await.unwrap().id
    }

    /// Create a resource through the API and return its JSON.
    async fn create_resource(&self, token: &str, body: Value) -> Value {
        let resp = self.post("/resources/", Some(token), body).send().await.unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    async fn create_comment(&self, token: &str, resource_id: i64, content: &str) -> Value {
        let resp = self
            .post(
                &format!("/resources/{}/comments/", resource_id),
                Some(token),
                json!({ "content": content }),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }
}

fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.header("Authorization", format!("Token {}", token)),
        None => builder,
    }
}

async fn detail(resp: Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["detail"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/health", None).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_protected_endpoints_require_authentication() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("owner", "password1").await;
    let resource = fixture
        .create_resource(
            &token,
            json!({ "title": "Test resource", "resource_url": "http://example.com/" }),
        )
        .await;
    let id = resource["id"].as_i64().unwrap();
    let comment = fixture.create_comment(&token, id, "hello").await;
    let cid = comment["id"].as_i64().unwrap();

    let resource_path = format!("/resources/{}/", id);
    let comments_path = format!("/resources/{}/comments/", id);
    let comment_path = format!("/resources/{}/comments/{}/", id, cid);
    let body = json!({ "title": "x", "content": "x", "name": "x" });

    let requests = vec![
        fixture.get("/categories/", None),
        fixture.post("/categories/", None, body.clone()),
        fixture.get("/resources/", None),
        fixture.post("/resources/", None, body.clone()),
        fixture.get("/resources/test/", None),
        fixture.get(&resource_path, None),
        fixture.put(&resource_path, None, body.clone()),
        fixture.delete(&resource_path, None),
        fixture.get(&comments_path, None),
        fixture.post(&comments_path, None, body.clone()),
        fixture.get(&comment_path, None),
        fixture.put(&comment_path, None, body.clone()),
        fixture.delete(&comment_path, None),
    ];

    for request in requests {
        let resp = request.send().await.unwrap();
        assert_eq!(resp.status(), 401);
        assert_eq!(resp.headers()["www-authenticate"], "Token");
        assert_eq!(detail(resp).await, NOT_AUTHENTICATED);
    }

    // Nothing changed.
    let resp = fixture.get(&resource_path, Some(&token)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_unauthenticated_missing_resource_is_401_not_404() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/resources/999/", None).send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .get("/categories/", Some("deadbeef"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(detail(resp).await, "Invalid token.");

    let resp = fixture
        .client
        .get(fixture.url("/categories/"))
        .header("Authorization", "Token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(
        detail(resp).await,
        "Invalid token header. No credentials provided."
    );
}

#[tokio::test]
async fn test_bearer_keyword_is_accepted() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("bearer_user", "password1").await;

    let resp = fixture
        .client
        .get(fixture.url("/categories/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_register_and_login() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/register/",
            None,
            json!({ "username": "alice", "password": "secret1" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let registered: Value = resp.json().await.unwrap();
    assert_eq!(registered["username"], "alice");
    let token = registered["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert!(registered.get("password").is_none());

    let resp = fixture
        .post(
            "/login/",
            None,
            json!({ "username": "alice", "password": "secret1" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let login: Value = resp.json().await.unwrap();
    assert_eq!(login["token"], token.as_str());
    assert_eq!(login["id"], registered["id"]);
    assert_eq!(login["username"], "alice");

    let resp = fixture
        .post(
            "/login/",
            None,
            json!({ "username": "alice", "password": "wrong" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Unable to login with the provided credentials."
    );

    let resp = fixture
        .post(
            "/login/",
            None,
            json!({ "username": "nobody", "password": "secret1" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // The issued token works.
    let resp = fixture
        .get("/resources/", Some(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_register_validation() {
    let fixture = TestFixture::new().await;
    fixture.register("alice", "secret1").await;

    let resp = fixture
        .post(
            "/register/",
            None,
            json!({ "username": "alice", "password": "secret1" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["username"][0],
        "A user with that username already exists."
    );

    let resp = fixture
        .post("/register/", None, json!({ "username": "al", "password": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["username"][0],
        "Ensure this field has at least 3 characters."
    );
    assert_eq!(
        body["password"][0],
        "Ensure this field has at least 6 characters."
    );

    let resp = fixture
        .post("/login/", None, json!({ "username": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["password"][0], "This field is required.");
}

#[tokio::test]
async fn test_category_list_and_create() {
    let fixture = TestFixture::new().await;
    let test_id = fixture.create_category("Test").await;
    let (_, user_token) = fixture.register("test_user", "passtestword123").await;
    let admin_token = fixture.admin_token().await;

    let resp = fixture
        .get("/categories/", Some(&user_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([{ "id": test_id, "name": "Test" }]));

    let resp = fixture
        .post("/categories/", Some(&user_token), json!({ "name": "Music" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(detail(resp).await, FORBIDDEN);

    let resp = fixture
        .post("/categories/", Some(&admin_token), json!({ "name": "Music" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["name"], "Music");
    assert!(created["id"].is_number());

    let resp = fixture
        .post("/categories/", Some(&admin_token), json!({ "name": "Music" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"][0], "category with this name already exists.");

    let resp = fixture
        .post("/categories/", Some(&admin_token), json!({ "name": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"][0], "This field may not be blank.");

    let resp = fixture
        .get("/categories/", Some(&user_token))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_resource_create_sets_owner_from_caller() {
    let fixture = TestFixture::new().await;
    let (_, alice) = fixture.register("alice", "secret1").await;
    fixture.register("mallory", "secret1").await;

    let resp = fixture
        .post(
            "/resources/",
            Some(&alice),
            json!({
                "title": "Mix",
                "resource_url": "http://x.com",
                "owner": { "username": "mallory" }
            }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["title"], "Mix");
    assert_eq!(created["resource_url"], "http://x.com");
    assert_eq!(created["owner"], json!({ "username": "alice" }));
    assert_eq!(created["categories"], json!([]));
    assert_eq!(created["comment_set"], json!([]));

    let resp = fixture
        .get("/resources/", Some(&alice))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["title"], "Mix");
}

#[tokio::test]
async fn test_resource_validation() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("alice", "secret1").await;
    fixture
        .create_resource(
            &token,
            json!({ "title": "Taken", "resource_url": "http://x.com" }),
        )
        .await;

    let resp = fixture
        .post(
            "/resources/",
            Some(&token),
            json!({ "title": "", "resource_url": "not a url" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"][0], "This field may not be blank.");
    assert_eq!(body["resource_url"][0], "Enter a valid URL.");

    let resp = fixture
        .post(
            "/resources/",
            Some(&token),
            json!({ "title": "Taken", "resource_url": "http://y.com" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"][0], "resource with this title already exists.");

    let resp = fixture
        .post("/resources/", Some(&token), json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"][0], "This field is required.");
    assert_eq!(body["resource_url"][0], "This field is required.");

    let resp = fixture
        .post(
            "/resources/",
            Some(&token),
            json!({ "title": "New", "resource_url": "http://z.com", "categories": [404] }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["categories"][0],
        "Invalid pk \"404\" - object does not exist."
    );
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("alice", "secret1").await;

    let resp = fixture
        .client
        .post(fixture.url("/resources/"))
        .header("Authorization", format!("Token {}", token))
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(detail(resp).await.starts_with("JSON parse error"));
}

#[tokio::test]
async fn test_resource_retrieve_and_not_found() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("alice", "secret1").await;
    let created = fixture
        .create_resource(
            &token,
            json!({ "title": "Test resource", "resource_url": "http://www.example.org/testing/" }),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    let resp = fixture
        .get(&format!("/resources/{}/", id), Some(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, created);

    let resp = fixture
        .get("/resources/999/", Some(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(detail(resp).await, "Not found.");
}

#[tokio::test]
async fn test_resource_update_permissions() {
    let fixture = TestFixture::new().await;
    let (_, owner) = fixture.register("test_user", "passtestword123").await;
    let (_, other) = fixture.register("nonowner", "123456789").await;
    let created = fixture
        .create_resource(
            &owner,
            json!({ "title": "Mix", "resource_url": "http://x.com" }),
        )
        .await;
    let path = format!("/resources/{}/", created["id"]);

    let resp = fixture
        .put(&path, Some(&other), json!({ "title": "skydive" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(detail(resp).await, NOT_OWNER);

    // Missing targets are reported before ownership.
    let resp = fixture
        .put("/resources/999/", Some(&other), json!({ "title": "skydive" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .put(&path, Some(&owner), json!({ "title": "skydive" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "skydive");
    assert_eq!(body["resource_url"], "http://x.com");
    assert_eq!(body["owner"]["username"], "test_user");

    let resp = fixture
        .patch(
            &path,
            Some(&owner),
            json!({ "resource_url": "https://y.com/", "owner": { "username": "nonowner" } }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "skydive");
    assert_eq!(body["resource_url"], "https://y.com/");
    assert_eq!(body["owner"]["username"], "test_user");

    let resp = fixture
        .patch(&path, Some(&owner), json!({ "resource_url": "bad" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_resource_delete_cascades_comments() {
    let fixture = TestFixture::new().await;
    let (_, owner) = fixture.register("test_user", "passtestword123").await;
    let (_, other) = fixture.register("nonowner", "123456789").await;
    let created = fixture
        .create_resource(
            &owner,
            json!({ "title": "Mix", "resource_url": "http://x.com" }),
        )
        .await;
    let id = created["id"].as_i64().unwrap();
    let comment = fixture.create_comment(&other, id, "nice").await;
    let path = format!("/resources/{}/", id);

    let resp = fixture.delete(&path, Some(&other)).send().await.unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(detail(resp).await, NOT_OWNER);

    let resp = fixture.delete(&path, Some(&owner)).send().await.unwrap();
    assert_eq!(resp.status(), 204);

    let resp = fixture.get(&path, Some(&owner)).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .get(&format!("/resources/{}/comments/", id), Some(&owner))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    assert!(fixture
        .repo
        .get_comment(id, comment["id"].as_i64().unwrap())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_resources_by_category() {
    let fixture = TestFixture::new().await;
    let music = fixture.create_category("Music").await;
    let books = fixture.create_category("Books").await;
    let (_, token) = fixture.register("alice", "secret1").await;

    let tagged = fixture
        .create_resource(
            &token,
            json!({ "title": "Mix", "resource_url": "http://x.com", "categories": [music] }),
        )
        .await;
    fixture
        .create_resource(
            &token,
            json!({ "title": "Novel", "resource_url": "http://n.com", "categories": [books] }),
        )
        .await;
    assert_eq!(tagged["categories"], json!([{ "id": music, "name": "Music" }]));

    for path in ["/resources/music/", "/resources/MUSIC/"] {
        let resp = fixture.get(path, Some(&token)).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["id"], tagged["id"]);
        assert_eq!(list[0]["categories"][0]["id"], music);
    }

    let resp = fixture
        .get("/resources/wrong/", Some(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(detail(resp).await, "Not found.");

    let resp = fixture
        .put("/resources/music/", Some(&token), json!({ "title": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
}

#[tokio::test]
async fn test_resource_category_reassignment() {
    let fixture = TestFixture::new().await;
    let music = fixture.create_category("Music").await;
    let books = fixture.create_category("Books").await;
    let (_, token) = fixture.register("alice", "secret1").await;
    let created = fixture
        .create_resource(
            &token,
            json!({ "title": "Mix", "resource_url": "http://x.com", "categories": [music] }),
        )
        .await;
    let path = format!("/resources/{}/", created["id"]);

    let resp = fixture
        .patch(&path, Some(&token), json!({ "categories": [books] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["categories"], json!([{ "id": books, "name": "Books" }]));

    let resp = fixture
        .get("/resources/music/", Some(&token))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_comment_crud_and_permissions() {
    let fixture = TestFixture::new().await;
    let (_, author) = fixture.register("test_user", "passtestword123").await;
    let (_, other) = fixture.register("non_author", "iamnottheauthor123").await;
    let created = fixture
        .create_resource(
            &author,
            json!({ "title": "Mix", "resource_url": "http://x.com" }),
        )
        .await;
    let id = created["id"].as_i64().unwrap();
    let list_path = format!("/resources/{}/comments/", id);

    let resp = fixture
        .post(&list_path, Some(&author), json!({ "content": "testestestest", "author": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let comment: Value = resp.json().await.unwrap();
    assert_eq!(comment["content"], "testestestest");
    assert_eq!(comment["author"], json!({ "username": "test_user" }));
    let posted_on = comment["posted_on"].clone();
    assert!(posted_on.is_string());
    let detail_path = format!("/resources/{}/comments/{}/", id, comment["id"]);

    let resp = fixture.get(&list_path, Some(&other)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    let resp = fixture.get(&detail_path, Some(&other)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"], "testestestest");

    // Comments show up on the resource.
    let resp = fixture
        .get(&format!("/resources/{}/", id), Some(&other))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["comment_set"][0]["content"], "testestestest");

    let resp = fixture
        .put(&detail_path, Some(&other), json!({ "content": "blablablabla." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(detail(resp).await, NOT_AUTHOR);

    let resp = fixture
        .put(&detail_path, Some(&author), json!({ "content": "blablablabla." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"], "blablablabla.");
    assert_eq!(body["posted_on"], posted_on);

    let resp = fixture.delete(&detail_path, Some(&other)).send().await.unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(detail(resp).await, NOT_AUTHOR);

    let resp = fixture.delete(&detail_path, Some(&author)).send().await.unwrap();
    assert_eq!(resp.status(), 204);

    let resp = fixture.get(&detail_path, Some(&author)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_comments_are_scoped_to_their_resource() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("alice", "secret1").await;
    let first = fixture
        .create_resource(
            &token,
            json!({ "title": "First", "resource_url": "http://a.com" }),
        )
        .await;
    let second = fixture
        .create_resource(
            &token,
            json!({ "title": "Second", "resource_url": "http://b.com" }),
        )
        .await;
    let comment = fixture
        .create_comment(&token, first["id"].as_i64().unwrap(), "hello")
        .await;

    let resp = fixture
        .get(
            &format!("/resources/{}/comments/{}/", second["id"], comment["id"]),
            Some(&token),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .post(
            "/resources/999/comments/",
            Some(&token),
            json!({ "content": "orphan" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .post(
            &format!("/resources/{}/comments/", first["id"]),
            Some(&token),
            json!({ "content": "" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"][0], "This field may not be blank.");
}

#[tokio::test]
async fn test_unsupported_method_requires_authentication_first() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("alice", "secret1").await;
    let created = fixture
        .create_resource(
            &token,
            json!({ "title": "Mix", "resource_url": "http://x.com" }),
        )
        .await;
    let resource_path = format!("/resources/{}/", created["id"]);

    let anonymous = vec![
        fixture.delete("/categories/", None),
        fixture.post(&resource_path, None, json!({})),
        fixture.post("/resources/music/", None, json!({})),
        fixture.put("/resources/music/", None, json!({})),
        fixture.delete("/resources/", None),
    ];
    for request in anonymous {
        let resp = request.send().await.unwrap();
        assert_eq!(resp.status(), 401);
        assert_eq!(detail(resp).await, NOT_AUTHENTICATED);
    }

    let resp = fixture
        .delete("/categories/", Some("deadbeef"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(detail(resp).await, "Invalid token.");

    let resp = fixture
        .delete("/categories/", Some(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
    assert_eq!(detail(resp).await, "Method \"DELETE\" not allowed.");

    let resp = fixture
        .post(&resource_path, Some(&token), json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);

    // Account routes stay open.
    let resp = fixture.get("/login/", None).send().await.unwrap();
    assert_eq!(resp.status(), 405);
}

#[tokio::test]
async fn test_non_json_body_is_unsupported_media_type() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.register("alice", "secret1").await;

    let resp = fixture
        .client
        .post(fixture.url("/resources/"))
        .header("Authorization", format!("Token {}", token))
        .header("Content-Type", "text/plain")
        .body("title=Mix")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 415);
    assert!(detail(resp).await.starts_with("Unsupported media type"));
}

#[tokio::test]
async fn test_password_whitespace_is_trimmed() {
    let fixture = TestFixture::new().await;
    let (id, _) = fixture.register("alice", "secret1 ").await;

    let resp = fixture
        .post(
            "/login/",
            None,
            json!({ "username": "alice", "password": "secret1" }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/nowhere/", None).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(detail(resp).await, "Not found.");
}
