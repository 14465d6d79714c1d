use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use webpad_core::{CreateFileRequest, CreateFolderRequest, FileType, NodeKind};
use webpad_gateway::{HttpRemoteStore, RemoteStore};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Recorded {
    fn push(&self, line: String) {
        self.requests.lock().expect("requests lock").push(line);
    }

    fn push_body(&self, body: Value) {
        self.bodies.lock().expect("bodies lock").push(body);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().expect("bodies lock").clone()
    }
}

async fn list_files(State(rec): State<Recorded>) -> Json<Value> {
    rec.push("GET /files".to_string());
    Json(json!({
        "success": true,
        "data": [
            {
                "id": "src",
                "name": "src",
                "type": "folder",
                "isOpen": true,
                "children": [
                    {"id": 42, "name": "index.html", "type": "file", "fileType": "html", "content": "<p></p>"}
                ]
            }
        ]
    }))
}

async fn file_content(State(rec): State<Recorded>, Path(id): Path<String>) -> impl IntoResponse {
    rec.push(format!("GET /files/{id}/content"));
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "File not found"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "data": {"content": format!("content of {id}")}})),
    )
}

async fn update_content(
    State(rec): State<Recorded>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.push(format!("PUT /files/{id}/content"));
    rec.push_body(body);
    Json(json!({"success": true, "message": "File updated"}))
}

async fn create_file(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("POST /files".to_string());
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let file_type = body["fileType"].clone();
    rec.push_body(body);
    Json(json!({
        "success": true,
        "data": {"id": 7, "name": name, "type": "file", "fileType": file_type, "content": ""}
    }))
}

async fn create_folder(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("POST /folders".to_string());
    let name = body["name"].as_str().unwrap_or_default().to_string();
    rec.push_body(body);
    Json(json!({
        "success": true,
        "data": {"id": "f-1", "name": name, "type": "folder", "children": []}
    }))
}

async fn delete_item(State(rec): State<Recorded>, Path(id): Path<String>) -> impl IntoResponse {
    rec.push(format!("DELETE /items/{id}"));
    (StatusCode::INTERNAL_SERVER_ERROR, "internal failure")
}

async fn toggle_folder(State(rec): State<Recorded>, Path(id): Path<String>) -> StatusCode {
    rec.push(format!("PUT /folders/{id}/toggle"));
    StatusCode::NO_CONTENT
}

async fn reset(State(rec): State<Recorded>) -> Json<Value> {
    rec.push("POST /reset".to_string());
    Json(json!({"success": true, "message": "Project reset"}))
}

async fn health(State(rec): State<Recorded>) -> Json<Value> {
    rec.push("GET /health".to_string());
    Json(json!({"success": true, "data": {"status": "ok"}}))
}

async fn launch_server() -> (SocketAddr, Recorded, oneshot::Sender<()>) {
    let recorded = Recorded::default();
    let api = Router::new()
        .route("/files", get(list_files).post(create_file))
        .route("/files/:id/content", get(file_content).put(update_content))
        .route("/folders", post(create_folder))
        .route("/folders/:id/toggle", put(toggle_folder))
        .route("/items/:id", delete(delete_item))
        .route("/reset", post(reset))
        .route("/health", get(health))
        .with_state(recorded.clone());
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    (addr, recorded, shutdown_tx)
}

fn store_for(addr: SocketAddr) -> HttpRemoteStore {
    HttpRemoteStore::new(&format!("http://{addr}/api"), Some(Duration::from_secs(5)))
        .expect("http store")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tree_and_content_round_trip_through_envelopes() {
    let (addr, recorded, shutdown) = launch_server().await;
    let store = store_for(addr);

    let tree = store
        .get_file_tree()
        .await
        .into_result()
        .expect("tree ok")
        .expect("tree data");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].kind, NodeKind::Folder);
    assert_eq!(tree[0].children()[0].id, "42");

    let content = store
        .get_file_content("src/a b.js")
        .await
        .into_result()
        .expect("content ok")
        .expect("content data");
    assert_eq!(content.content, "content of src/a b.js");

    let missing = store.get_file_content("missing").await;
    assert_eq!(missing.into_result(), Err("File not found".to_string()));

    assert_eq!(
        recorded.requests(),
        vec![
            "GET /files".to_string(),
            "GET /files/src/a b.js/content".to_string(),
            "GET /files/missing/content".to_string(),
        ]
    );
    let _ = shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mutations_send_camel_case_bodies() {
    let (addr, recorded, shutdown) = launch_server().await;
    let store = store_for(addr);

    assert!(store.update_file_content("a.css", "body{}").await.success);

    let created = store
        .create_file(&CreateFileRequest {
            name: "app.js".to_string(),
            file_type: FileType::Js,
            parent_id: Some("src".to_string()),
        })
        .await
        .into_result()
        .expect("create file ok")
        .expect("created node");
    assert_eq!(created.id, "7");
    assert_eq!(created.file_type, Some(FileType::Js));

    let folder = store
        .create_folder(&CreateFolderRequest {
            name: "assets".to_string(),
            parent_id: None,
        })
        .await
        .into_result()
        .expect("create folder ok")
        .expect("created folder");
    assert!(folder.is_folder());

    assert_eq!(
        recorded.bodies(),
        vec![
            json!({"content": "body{}"}),
            json!({"name": "app.js", "fileType": "js", "parentId": "src"}),
            json!({"name": "assets"}),
        ]
    );
    let _ = shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_failures_and_empty_bodies_map_to_envelopes() {
    let (addr, _recorded, shutdown) = launch_server().await;
    let store = store_for(addr);

    let deleted = store.delete_item("src").await;
    assert_eq!(
        deleted.into_result(),
        Err("Request failed with status code 500".to_string())
    );

    let toggled = store.toggle_folder("src").await;
    assert!(toggled.success);
    assert!(toggled.data.is_none());

    let reset = store.reset_project().await;
    assert!(reset.success);
    assert_eq!(reset.message.as_deref(), Some("Project reset"));

    let health = store.health_check().await.into_result().expect("health ok");
    assert_eq!(health, Some(json!({"status": "ok"})));
    let _ = shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_server_is_a_failure_envelope() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind probe");
        listener.local_addr().expect("probe addr")
    };
    let store = store_for(addr);

    let health = store.health_check().await;
    assert!(!health.success);
    assert!(!health.error_message().is_empty());
}
