// src/server/livereload.rs

//! LiveReload protocol 7 listener.
//!
//! Browsers load `/livereload.js`, open a WebSocket on `/livereload`, and
//! receive one `reload` command per changed file. `/changed?files=a,b`
//! triggers the same notification by hand.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::server::reload::ReloadHub;

const PROTOCOL: &str = "http://livereload.com/protocols/official-7";

/// Messages sent to connected browsers.
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ServerMessage<'a> {
    Hello {
        protocols: Vec<&'static str>,
        #[serde(rename = "serverName")]
        server_name: &'static str,
    },
    Reload {
        path: &'a str,
        #[serde(rename = "liveCSS")]
        live_css: bool,
    },
}

impl ServerMessage<'_> {
    fn hello() -> Self {
        ServerMessage::Hello {
            protocols: vec![PROTOCOL],
            server_name: "assetdag",
        }
    }
}

pub fn router(hub: ReloadHub) -> Router {
    Router::new()
        .route("/livereload", get(websocket_handler))
        .route("/livereload.js", get(client_script))
        .route("/changed", get(changed).post(changed))
        .with_state(hub)
}

async fn websocket_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> Response {
    ws.on_upgrade(|socket| client_session(socket, hub))
}

async fn client_session(socket: WebSocket, hub: ReloadHub) {
    info!("live-reload client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut rx = hub.subscribe();

    let send_task = tokio::spawn(async move {
        if send_json(&mut sender, &ServerMessage::hello()).await.is_err() {
            return;
        }
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live-reload client lagging; notifications dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            for path in &event.paths {
                let message = ServerMessage::Reload {
                    path,
                    live_css: true,
                };
                if send_json(&mut sender, &message).await.is_err() {
                    return;
                }
            }
        }
    });

    // The client's own hello/info messages need no answer.
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) => debug!(message = %text.as_str(), "live-reload client message"),
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("live-reload client disconnected");
}

async fn send_json<S>(sender: &mut S, message: &ServerMessage<'_>) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = serde_json::to_string(message).map_err(|_| ())?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Minimal protocol-7 client: reloads stylesheets in place, anything else
/// reloads the page.
const CLIENT_SCRIPT: &str = r#"(function () {
  var script = document.currentScript;
  var host = (script && script.src.match(/\/\/([^/]+)\//) || [])[1] || location.host;
  var socket = new WebSocket("ws://" + host + "/livereload");
  socket.onopen = function () {
    socket.send(JSON.stringify({ command: "hello", protocols: ["http://livereload.com/protocols/official-7"] }));
  };
  socket.onmessage = function (event) {
    var message = JSON.parse(event.data);
    if (message.command !== "reload") return;
    if (message.liveCSS && /\.css$/.test(message.path)) {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      for (var i = 0; i < links.length; i++) {
        var href = links[i].href.replace(/[?&]livereload=\d+/, "");
        links[i].href = href + (href.indexOf("?") < 0 ? "?" : "&") + "livereload=" + Date.now();
      }
      return;
    }
    location.reload();
  };
})();
"#;

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

#[derive(Debug, Deserialize)]
struct ChangedQuery {
    #[serde(default)]
    files: String,
}

#[derive(Debug, Serialize)]
struct ChangedResponse {
    clients: usize,
    files: Vec<String>,
}

async fn changed(State(hub): State<ReloadHub>, Query(query): Query<ChangedQuery>) -> Json<ChangedResponse> {
    let files: Vec<String> = query
        .files
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    let clients = hub.subscriber_count();
    info!(?files, clients, "manual reload requested");
    hub.notify(files.clone());

    Json(ChangedResponse { clients, files })
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn protocol_messages_match_livereload_7() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::hello()).unwrap(),
            r#"{"command":"hello","protocols":["http://livereload.com/protocols/official-7"],"serverName":"assetdag"}"#
        );
        let reload = ServerMessage::Reload {
            path: "css/main.css",
            live_css: true,
        };
        assert_eq!(
            serde_json::to_string(&reload).unwrap(),
            r#"{"command":"reload","path":"css/main.css","liveCSS":true}"#
        );
    }

    #[tokio::test]
    async fn serves_client_script() {
        let response = router(ReloadHub::new())
            .oneshot(Request::get("/livereload.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/javascript"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(std::str::from_utf8(&body).unwrap().contains("/livereload"));
    }

    #[tokio::test]
    async fn changed_notifies_subscribers() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/changed?files=index.html,css/main.css")
            .body(Body::empty())
            .unwrap();
        let response = router(hub).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["clients"], 1);

        assert_eq!(rx.recv().await.unwrap().paths, vec!["index.html", "css/main.css"]);
    }

    #[tokio::test]
    async fn changed_without_files_sends_nothing() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();
        let response = router(hub)
            .oneshot(Request::get("/changed").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(rx.try_recv().is_err());
    }
}
