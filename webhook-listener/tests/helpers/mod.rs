//! Shared fixtures for listener integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use helix_webhooks::{
    ApiError, HubOptions, HubTopic, Listener, ListenerConfig, PlatformClient, Subscription,
};

/// Platform client standing in for the hub's subscribe endpoint.
///
/// Answers with the last path segment of the callback URL, like a hub that
/// reuses the subscriber's id, unless told to assign ids of its own.
#[derive(Default)]
pub struct FakeHub {
    registrations: Mutex<Vec<(HubTopic, HubOptions)>>,
    unsubscriptions: Mutex<Vec<HubOptions>>,
    id_prefix: Mutex<Option<String>>,
}

impl FakeHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Assign `{prefix}{n}` ids instead of echoing the callback id
    pub fn assign_ids(&self, prefix: &str) {
        *self.id_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn registrations(&self) -> Vec<(HubTopic, HubOptions)> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn unsubscriptions(&self) -> Vec<HubOptions> {
        self.unsubscriptions.lock().unwrap().clone()
    }

    /// The secret the hub was given for a subscription
    pub fn secret_for(&self, subscription: &Subscription) -> String {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, options)| options.callback_url == subscription.callback_url())
            .map(|(_, options)| options.secret.clone())
            .expect("subscription was never registered with the hub")
    }
}

#[async_trait]
impl PlatformClient for FakeHub {
    async fn subscribe(&self, topic: &HubTopic, options: &HubOptions) -> Result<String, ApiError> {
        let mut registrations = self.registrations.lock().unwrap();
        registrations.push((topic.clone(), options.clone()));

        let id = match &*self.id_prefix.lock().unwrap() {
            Some(prefix) => format!("{prefix}{}", registrations.len()),
            None => options
                .callback_url
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        Ok(id)
    }

    async fn unsubscribe(&self, _topic: &HubTopic, options: &HubOptions) -> Result<(), ApiError> {
        self.unsubscriptions.lock().unwrap().push(options.clone());
        Ok(())
    }
}

/// A port the OS just handed out and released again
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("0.0.0.0:0")
        .and_then(|listener| listener.local_addr())
        .expect("Failed to find a free port")
        .port()
}

/// A listening listener on a free localhost port.
pub async fn start_listener(hub: Arc<FakeHub>, config: ListenerConfig) -> (Listener, String) {
    let listener = Listener::create(hub, config.with_host_name("127.0.0.1").with_port(free_port()))
        .expect("Failed to create listener");
    listener.listen().await.expect("Failed to listen");
    let base_url = base_url(&listener).await;
    (listener, base_url)
}

pub async fn base_url(listener: &Listener) -> String {
    let addr: SocketAddr = listener.local_addr().await.expect("listener not running");
    format!("http://127.0.0.1:{}", addr.port())
}

/// POST `chunks` with `Transfer-Encoding: chunked` and no length; returns the status code.
pub async fn post_chunked(addr: SocketAddr, path: &str, headers: &[(&str, &str)], chunks: &[&[u8]]) -> u16 {
    let mut head = format!(
        "POST {path} HTTP/1.1\r\nHost: {addr}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n"
    );
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let mut request = head.into_bytes();
    for chunk in chunks {
        request.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        request.extend_from_slice(chunk);
        request.extend_from_slice(b"\r\n");
    }
    request.extend_from_slice(b"0\r\n\r\n");

    let mut stream = TcpStream::connect(addr).await.expect("Failed to connect");
    stream.write_all(&request).await.expect("Failed to send request");

    let mut response = Vec::new();
    let mut buf = [0u8; 1024];
    while !response.windows(2).any(|w| w == b"\r\n") {
        let n = stream.read(&mut buf).await.expect("Failed to read response");
        if n == 0 {
            break;
        }
        response.extend_from_slice(&buf[..n]);
    }

    String::from_utf8_lossy(&response)
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("Response has no status line")
}
