use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use crate::{RealtimeStore, StoreConfig};

/// Answers a single HTTP request with `body` and closes the connection.
pub async fn serve_once(status: &'static str, content_type: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0_u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}")
}

pub fn store(database_url: String) -> RealtimeStore {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    RealtimeStore::with_client(
        client,
        StoreConfig {
            database_url,
            path: StoreConfig::DEFAULT_PATH.into(),
            auth: None,
        },
    )
}
