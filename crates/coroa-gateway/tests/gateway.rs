use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::WebSocketUpgrade;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use coroa_gateway::connection::handle_connection;
use coroa_gateway::dispatcher::Dispatcher;
use coroa_types::api::Claims;
use coroa_types::events::{GatewayCommand, GatewayEvent};

const SECRET: &str = "gateway-secret";

fn token_for(user_id: Uuid, secret: &str) -> String {
    let exp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
        + 3600;
    let claims = Claims { sub: user_id, email: "ana@example.com".into(), exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

async fn spawn_gateway(dispatcher: Dispatcher) -> SocketAddr {
    let app = Router::new().route(
        "/gateway",
        get(move |ws: WebSocketUpgrade| {
            let dispatcher = dispatcher.clone();
            async move {
                ws.on_upgrade(move |socket| handle_connection(socket, dispatcher, SECRET.to_string()))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn identify(token: String) -> Message {
    Message::text(serde_json::to_string(&GatewayCommand::Identify { token }).unwrap())
}

#[tokio::test]
async fn identified_client_gets_ready_and_its_events() {
    let dispatcher = Dispatcher::new();
    let addr = spawn_gateway(dispatcher.clone()).await;
    let user_id = Uuid::new_v4();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/gateway")).await.unwrap();
    ws.send(identify(token_for(user_id, SECRET))).await.unwrap();

    let ready = ws.next().await.unwrap().unwrap();
    match serde_json::from_str::<GatewayEvent>(ready.to_text().unwrap()).unwrap() {
        GatewayEvent::Ready { user_id: ready_id } => assert_eq!(ready_id, user_id),
        other => panic!("expected Ready, got {:?}", other),
    }

    // The user channel is registered right after Ready goes out.
    let mut delivered = false;
    for _ in 0..100 {
        if dispatcher.send_to_user(user_id, GatewayEvent::PremiumUpdate { is_premium: true }).await {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(delivered);

    let frame = ws.next().await.unwrap().unwrap();
    match serde_json::from_str::<GatewayEvent>(frame.to_text().unwrap()).unwrap() {
        GatewayEvent::PremiumUpdate { is_premium } => assert!(is_premium),
        other => panic!("expected PremiumUpdate, got {:?}", other),
    }
}

#[tokio::test]
async fn bad_token_closes_without_ready() {
    let dispatcher = Dispatcher::new();
    let addr = spawn_gateway(dispatcher.clone()).await;
    let user_id = Uuid::new_v4();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/gateway")).await.unwrap();
    ws.send(identify(token_for(user_id, "wrong-secret"))).await.unwrap();

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => panic!("unexpected frame {}", text),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    assert!(!dispatcher.send_to_user(user_id, GatewayEvent::PremiumUpdate { is_premium: true }).await);
}
