//! End-to-end checks of the HTML routes, driving the router in-process.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use circulo_api::render::Templates;
use circulo_api::{AppStateInner, SessionSettings, router};
use circulo_db::Database;

const PASSWORD: &str = "s3nha-forte";

struct TestApp {
    _dir: TempDir,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("circulo.db")).unwrap();
        let state = Arc::new(AppStateInner {
            db,
            templates: Templates::new().unwrap(),
            session: SessionSettings {
                secret: "test-secret".into(),
                ttl_days: 1,
                secure_cookies: false,
            },
            feed_limit: 100,
        });
        Self {
            _dir: dir,
            router: router(state),
        }
    }

    async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    /// Registers `username` and returns its session cookie.
    async fn register(&self, username: &str) -> String {
        let form = format!("username={username}&password1={PASSWORD}&password2={PASSWORD}");
        let resp = self.post("/register/", &form, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        session_cookie(&resp)
    }

    async fn page(&self, uri: &str, cookie: &str) -> String {
        let resp = self.get(uri, Some(cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
        body(resp).await
    }
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn session_cookie(resp: &Response) -> String {
    let raw = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie");
    raw.split(';').next().unwrap().to_string()
}

async fn body(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_and_anonymous_home() {
    let app = TestApp::new();
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await, "ok");

    let resp = app.get("/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("Log in to see comments"));
}

#[tokio::test]
async fn protected_routes_redirect_to_login() {
    let app = TestApp::new();
    for uri in ["/profile/", "/profile/edit/", "/following/", "/followers/", "/edit_comment/1/"] {
        let resp = app.get(uri, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&resp), format!("/login/?next={uri}"));
    }

    let resp = app.post("/profile/ana/follow/", "", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/login/"));

    // A forged cookie is just anonymous.
    let resp = app.get("/profile/", Some("circulo_session=forged")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn registration_creates_profile_and_session() {
    let app = TestApp::new();
    let cookie = app.register("ana").await;

    let page = app.page("/profile/", &cookie).await;
    assert!(page.contains("@ana"));
    assert!(page.contains("0 followers"));
}

#[tokio::test]
async fn registration_errors_rerender_form() {
    let app = TestApp::new();
    let resp = app
        .post("/register/", "username=ana&password1=s3nha-forte&password2=outra", None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("didn&#x27;t match"));

    // Nothing was created, so the name is still free.
    app.register("ana").await;

    let form = format!("username=ana&password1={PASSWORD}&password2={PASSWORD}");
    let resp = app.post("/register/", &form, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("already exists"));
}

#[tokio::test]
async fn login_and_logout() {
    let app = TestApp::new();
    app.register("ana").await;

    let resp = app
        .post("/login/", "username=ana&password=errada1234", None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("Invalid username or password"));

    let form = format!("username=ana&password={PASSWORD}&next=/following/");
    let resp = app.post("/login/", &form, None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/following/");
    let cookie = session_cookie(&resp);
    app.page("/following/", &cookie).await;

    let form = format!("username=ana&password={PASSWORD}&next=https://evil.example/");
    let resp = app.post("/login/", &form, None).await;
    assert_eq!(location(&resp), "/");

    let form = format!("username=ana&password={PASSWORD}&next=%2F%0D%0AX");
    let resp = app.post("/login/", &form, None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let resp = app.post("/logout/", "", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let cleared = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cleared.starts_with("circulo_session="));
}

#[tokio::test]
async fn feed_follows_the_follow_timeline() {
    let app = TestApp::new();
    let ana = app.register("ana").await;
    let bia = app.register("bia").await;

    let resp = app.post("/profile/", "content=antes+do+follow", Some(&ana)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile/");

    let resp = app.post("/profile/ana/follow/", "", Some(&bia)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile/ana/");

    app.post("/profile/", "content=depois+do+follow", Some(&ana)).await;

    let home = app.page("/", &bia).await;
    assert!(home.contains("depois do follow"));
    assert!(!home.contains("antes do follow"));

    // The profile page still shows everything ana wrote, plus follow status.
    let profile = app.page("/profile/ana/", &bia).await;
    assert!(profile.contains("antes do follow"));
    assert!(profile.contains("Unfollow"));

    app.post("/profile/ana/unfollow/", "", Some(&bia)).await;
    let home = app.page("/", &bia).await;
    assert!(!home.contains("depois do follow"));
    let profile = app.page("/profile/ana/", &bia).await;
    assert!(profile.contains(">Follow<"));

    // Re-following moves the boundary: older comments stay hidden.
    app.post("/profile/ana/follow/", "", Some(&bia)).await;
    app.post("/profile/", "content=terceiro", Some(&ana)).await;
    let home = app.page("/", &bia).await;
    assert!(home.contains("terceiro"));
    assert!(!home.contains("depois do follow"));
}

#[tokio::test]
async fn follow_lists_and_self_follow() {
    let app = TestApp::new();
    let ana = app.register("ana").await;
    let bia = app.register("bia").await;

    let resp = app.post("/profile/ana/follow/", "", Some(&ana)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile/");
    assert!(app.page("/following/", &ana).await.contains("not following anyone"));

    app.post("/profile/ana/follow/", "", Some(&bia)).await;
    app.post("/profile/ana/follow/", "", Some(&bia)).await;

    let following = app.page("/following/", &bia).await;
    assert_eq!(following.matches("href=\"/profile/ana/\"").count(), 1);
    let followers = app.page("/followers/", &ana).await;
    assert!(followers.contains("href=\"/profile/bia/\""));

    let resp = app.post("/profile/ninguem/follow/", "", Some(&bia)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = app.get("/profile/ninguem/", Some(&bia)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.get("/profile/bia/", Some(&bia)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile/");
}

#[tokio::test]
async fn only_the_author_can_change_a_comment() {
    let app = TestApp::new();
    let ana = app.register("ana").await;
    let bia = app.register("bia").await;

    app.post("/profile/", "content=original", Some(&ana)).await;
    let page = app.page("/profile/", &ana).await;
    assert!(!page.contains("(edited"));
    let id = page
        .split("/edit_comment/")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap()
        .to_string();

    let edit_uri = format!("/edit_comment/{id}/");
    let delete_uri = format!("/delete_comment/{id}/");

    for resp in [
        app.get(&edit_uri, Some(&bia)).await,
        app.post(&edit_uri, "content=sequestro", Some(&bia)).await,
        app.get(&delete_uri, Some(&bia)).await,
        app.post(&delete_uri, "", Some(&bia)).await,
    ] {
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    let form = app.page(&edit_uri, &ana).await;
    assert!(form.contains("original"));

    let resp = app.post(&edit_uri, "content=", Some(&ana)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("This field is required."));

    let resp = app.post(&edit_uri, "content=revisado", Some(&ana)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let page = app.page("/profile/", &ana).await;
    assert!(page.contains("revisado"));
    assert!(page.contains("(edited"));

    app.page(&delete_uri, &ana).await;
    let resp = app.post(&delete_uri, "", Some(&ana)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(!app.page("/profile/", &ana).await.contains("revisado"));

    let resp = app.post(&delete_uri, "", Some(&ana)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_edit_validates_and_replaces() {
    let app = TestApp::new();
    let ana = app.register("ana").await;

    let resp = app
        .post("/profile/edit/", "full_name=Ana&email=nao-e-email", Some(&ana))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("Enter a valid email address."));
    assert!(!app.page("/profile/", &ana).await.contains("<h1>Ana</h1>"));

    let form = "full_name=Ana+Souza&birth_date=1995-07-02&location=Olinda&bio=&email=ana%40example.com&phone_number=&education=UFPE";
    let resp = app.post("/profile/edit/", form, Some(&ana)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile/");

    let page = app.page("/profile/", &ana).await;
    assert!(page.contains("<h1>Ana Souza</h1>"));
    assert!(page.contains("02 Jul 1995"));
    assert!(page.contains("Olinda"));

    let edit = app.page("/profile/edit/", &ana).await;
    assert!(edit.contains("value=\"1995-07-02\""));
}
