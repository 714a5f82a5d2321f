use axum::Router;
use mailbucket::{
    app::{
        AppState,
        config::{Config, DatabaseConfig, IngestConfig, ServerConfig, StorageConfig},
    },
    db, http,
    models::account::Role,
    storage::MemoryStore,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    store: Arc<MemoryStore>,
    state: AppState,
    _handle: JoinHandle<()>,
}

async fn start_server() -> TestServer {
    let database = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    let pool = db::connect(&database).await.expect("connect memory sqlite");
    let config = Config {
        server: ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
        },
        database,
        storage: StorageConfig::Local {
            base_dir: "unused".to_string(),
            public_base_url: None,
        },
        ingest: IngestConfig::default(),
    };
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(pool, store.clone(), config);
    let app: Router = http::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base: format!("http://{}", addr),
        store,
        state,
        _handle: handle,
    }
}

fn raw_mail(to: &str, subject: &str) -> String {
    format!(
        concat!(
            "From: Dev Team <dev@example.test>\r\n",
            "To: {}\r\n",
            "Subject: {}\r\n",
            "Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "Hi there\r\n",
        ),
        to, subject
    )
}

#[tokio::test]
async fn requests_without_caller_are_rejected() {
    let srv = start_server().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/emails", srv.base)).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/emails", srv.base))
        .header("X-User-Id", "999")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_sync_then_user_reads_inbox() {
    let srv = start_server().await;
    let db = &srv.state.db;
    let admin = db::accounts::create(db, "admin@example.test", Role::Admin).await.unwrap();
    let user = db::accounts::create(db, "you@example.test", Role::User).await.unwrap();
    srv.store.insert("inbound/1", raw_mail("you@example.test", "Hello Sync"));
    let client = reqwest::Client::new();

    // plain users may not trigger a pass
    let res = client
        .post(format!("{}/sync", srv.base))
        .header("X-User-Id", user.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/sync", srv.base))
        .header("X-User-Id", admin.to_string())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(report["stats"]["total_emails"], 1);
    assert_eq!(report["stats"]["new_emails"], 1);
    assert_eq!(report["outcomes"]["persisted"], 1);
    assert!(!srv.store.contains("inbound/1"));

    let res = client
        .get(format!("{}/emails", srv.base))
        .header("X-User-Id", user.to_string())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let emails: serde_json::Value = res.json().await.unwrap();
    let emails = emails.as_array().unwrap();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0]["subject"], "Hello Sync");
    assert_eq!(emails[0]["preview"], "Hi there");
    assert_eq!(emails[0]["sender_name"], "Dev Team");
    assert_eq!(emails[0]["is_read"], false);
    assert_eq!(emails[0]["relative_time"], "01 Jul 2003");
    let id = emails[0]["id"].as_i64().unwrap();

    // opening it marks it read
    let res = client
        .get(format!("{}/emails/{}", srv.base, id))
        .header("X-User-Id", user.to_string())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let detail: serde_json::Value = res.json().await.unwrap();
    assert_eq!(detail["is_read"], true);

    // the run log is visible to admins
    let res = client
        .get(format!("{}/logs", srv.base))
        .header("X-User-Id", admin.to_string())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let logs: serde_json::Value = res.json().await.unwrap();
    let found = logs.as_array().unwrap().iter().any(|l| {
        l["message"]
            .as_str()
            .unwrap_or("")
            .contains("sync finished: total=1 new=1")
    });
    assert!(found, "expected a run summary in the log");
}

#[tokio::test]
async fn users_cannot_see_other_mailboxes() {
    let srv = start_server().await;
    let db = &srv.state.db;
    let alice = db::accounts::create(db, "alice@example.test", Role::User).await.unwrap();
    let bob = db::accounts::create(db, "bob@example.test", Role::User).await.unwrap();
    let admin = db::accounts::create(db, "root@example.test", Role::SuperAdmin).await.unwrap();
    srv.store.insert("m1", raw_mail("alice@example.test", "for alice"));
    srv.state.ingestor.run_once().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/users/{}/emails", srv.base, alice))
        .header("X-User-Id", bob.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::FORBIDDEN);

    let res = client
        .get(format!("{}/users/{}/emails", srv.base, alice))
        .header("X-User-Id", admin.to_string())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let emails: serde_json::Value = res.json().await.unwrap();
    let id = emails[0]["id"].as_i64().unwrap();

    let res = client
        .get(format!("{}/emails/{}", srv.base, id))
        .header("X-User-Id", bob.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    // an admin reading it leaves it unread for alice
    let res = client
        .get(format!("{}/emails/{}", srv.base, id))
        .header("X-User-Id", admin.to_string())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let detail: serde_json::Value = res.json().await.unwrap();
    assert_eq!(detail["is_read"], false);
}

#[tokio::test]
async fn admin_delete_removes_email() {
    let srv = start_server().await;
    let db = &srv.state.db;
    let user = db::accounts::create(db, "you@example.test", Role::User).await.unwrap();
    let admin = db::accounts::create(db, "admin@example.test", Role::Admin).await.unwrap();
    srv.store.insert("m1", raw_mail("you@example.test", "short lived"));
    srv.state.ingestor.run_once().await;
    let id = db::emails::list_inbox(db, user, 10).await.unwrap()[0].id;
    let client = reqwest::Client::new();

    let res = client
        .delete(format!("{}/emails/{}", srv.base, id))
        .header("X-User-Id", user.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::FORBIDDEN);

    let res = client
        .delete(format!("{}/emails/{}", srv.base, id))
        .header("X-User-Id", admin.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NO_CONTENT);

    let res = client
        .delete(format!("{}/emails/{}", srv.base, id))
        .header("X-User-Id", admin.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    assert!(db::emails::list_inbox(db, user, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_inbox_delivers_staged_mail() {
    let srv = start_server().await;
    let db = &srv.state.db;
    let user = db::accounts::create(db, "you@example.test", Role::User).await.unwrap();
    let raw = raw_mail("you@example.test", "waiting");
    let staged = db::staging::stage(db, "you@example.test", "k1", raw.as_bytes(), chrono::Utc::now())
        .await
        .unwrap();
    assert!(staged);

    let res = reqwest::Client::new()
        .get(format!("{}/emails", srv.base))
        .header("X-User-Id", user.to_string())
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let emails: serde_json::Value = res.json().await.unwrap();
    assert_eq!(emails.as_array().unwrap().len(), 1);
    assert_eq!(emails[0]["subject"], "waiting");
    assert!(db::staging::pending_for(db, "you@example.test").await.unwrap().is_empty());
}
