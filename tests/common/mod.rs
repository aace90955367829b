// Shared fixtures: loopback backends standing in for the streaming and
// analysis services.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// WebSocket inference stand-in: for every inbound frame, reply with one
/// joy prediction under the modality key named in the frame's models map.
#[allow(dead_code)]
pub async fn spawn_stream_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
                        continue;
                    };
                    let Some(model) = value
                        .get("models")
                        .and_then(|m| m.as_object())
                        .and_then(|m| m.keys().next().cloned())
                    else {
                        continue;
                    };

                    let mut reply = serde_json::Map::new();
                    reply.insert(
                        model,
                        serde_json::json!({
                            "predictions": [
                                { "emotions": [ { "name": "joy", "score": 0.9 } ] }
                            ]
                        }),
                    );
                    let body = serde_json::Value::Object(reply).to_string();
                    if ws.send(Message::Text(body)).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    format!("ws://{}", addr)
}

/// WebSocket stand-in that answers the n-th inbound text frame with the
/// n-th scripted reply (the last entry repeats once the script runs out).
#[allow(dead_code)]
pub async fn spawn_scripted_stream_server(script: Vec<String>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let script = script.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let mut index = 0usize;
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(_) = message else {
                        continue;
                    };
                    let Some(reply) = script.get(index).or_else(|| script.last()) else {
                        continue;
                    };
                    index += 1;
                    if ws.send(Message::Text(reply.clone())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    format!("ws://{}", addr)
}

/// Analysis backend stand-in: records every request body and answers a
/// fixed result with the given status.
#[allow(dead_code)]
pub async fn spawn_analyze_server(
    response: serde_json::Value,
    status: StatusCode,
) -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
    let (tx, rx) = mpsc::unbounded_channel();

    async fn handler(
        State((tx, response, status)): State<(
            mpsc::UnboundedSender<serde_json::Value>,
            serde_json::Value,
            StatusCode,
        )>,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        let _ = tx.send(body);
        (status, Json(response))
    }

    let app = Router::new()
        .route("/analyze", post(handler))
        .with_state((tx, response, status));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/analyze", addr), rx)
}
