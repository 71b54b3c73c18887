//! Stand-in `/predict` + `/health` service shared by the integration tests.
#![allow(dead_code)]

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub model: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub image: Vec<u8>,
}

pub type Uploads = Arc<Mutex<Vec<Upload>>>;

async fn predict(
    State(uploads): State<Uploads>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut upload = Upload::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                upload.image = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            }
            Some("model") => upload.model = field.text().await.ok(),
            _ => {}
        }
    }
    uploads.lock().await.push(upload.clone());

    if upload.image.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No image provided" })),
        );
    }
    let model = upload.model.unwrap_or_else(|| "allData_v2".to_string());
    if model == "cnn_M_20x_k_8" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Model {} not found", model) })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "coordinates": { "x": upload.image.len() as f64, "y": 34.57 },
            "result_image": format!("data:image/png;base64,{}", STANDARD.encode(&upload.image)),
        })),
    )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// A running stand-in for the prediction service.
pub struct Service {
    pub address: String,
    pub port: u16,
    pub uploads: Uploads,
}

pub async fn spawn_service() -> Result<Service, Box<dyn std::error::Error>> {
    let uploads = Uploads::default();
    let router = Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(uploads.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(Service {
        address: format!("http://{}", local_addr),
        port: local_addr.port(),
        uploads,
    })
}
