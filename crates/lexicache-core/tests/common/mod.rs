//! Fixtures shared by the integration tests: a scriptable remote for loads and
//! a local HTTP server that answers mutation requests with canned responses.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use lexicache_core::{
    ApiClient, BundledData, CacheManager, Category, Config, Dictionary, KeyValueStore, Lexicache, MemoryStore,
    RemoteSource, StorageKey, Text, Word, WordBuckets,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Online,
    Offline,
    Hanging,
}

pub struct FakeRemote {
    network: Mutex<Network>,
    delay: Duration,
    pub categories: Mutex<Vec<Category>>,
    pub words: Mutex<WordBuckets>,
    pub texts: Mutex<Vec<Text>>,
    pub category_calls: AtomicUsize,
    pub word_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new(dictionary: Dictionary, texts: Vec<Text>) -> Self {
        Self {
            network: Mutex::new(Network::Online),
            delay: Duration::ZERO,
            categories: Mutex::new(dictionary.categories),
            words: Mutex::new(dictionary.words),
            texts: Mutex::new(texts),
            category_calls: AtomicUsize::new(0),
            word_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_network(&self, network: Network) {
        *self.network.lock().unwrap() = network;
    }

    fn respond<T: Send + 'static>(&self, value: T) -> BoxFuture<'_, Result<T>> {
        let network = *self.network.lock().unwrap();
        let delay = self.delay;
        Box::pin(async move {
            match network {
                Network::Hanging => futures::future::pending().await,
                Network::Offline => Err(anyhow!("connection refused")),
                Network::Online => {
                    tokio::time::sleep(delay).await;
                    Ok(value)
                }
            }
        })
    }
}

impl RemoteSource for FakeRemote {
    fn fetch_categories(&self) -> BoxFuture<'_, Result<Vec<Category>>> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(self.categories.lock().unwrap().clone())
    }

    fn fetch_words(&self) -> BoxFuture<'_, Result<WordBuckets>> {
        self.word_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(self.words.lock().unwrap().clone())
    }

    fn fetch_texts(&self) -> BoxFuture<'_, Result<Vec<Text>>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(self.texts.lock().unwrap().clone())
    }
}

/// Answers one canned `(status, body)` per connection, in order, and records
/// each request it received. Stops listening once the script runs out.
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses: Vec<(u16, String)> = responses.into_iter().map(|(s, b)| (s, b.to_string())).collect();

        let recorded = requests.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                let request = read_request(&mut socket).await;
                recorded.lock().unwrap().push(request);

                let reason = if (200..300).contains(&status) { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { url, requests }
    }

    /// `METHOD /path` of every request served so far.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.lines().next().unwrap_or_default().rsplitn(2, ' ').nth(1).unwrap_or_default().to_string())
            .collect()
    }

    /// Full text of the `index`th request, headers and body.
    pub fn request(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.url).unwrap()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if request_complete(&buf) {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn request_complete(buf: &[u8]) -> bool {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
    let body = &buf[end + 4..];
    if head.contains("transfer-encoding: chunked") {
        return body.ends_with(b"0\r\n\r\n");
    }
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    body.len() >= length
}

pub fn word(id: i64, category_id: i64, text: &str) -> Word {
    Word {
        id,
        category_id,
        word: text.to_string(),
        meaning: format!("significado de {}", text),
        translation: None,
        attachments: Vec::new(),
    }
}

pub fn text(id: i64, title: &str) -> Text {
    Text {
        id,
        title: title.to_string(),
        subtitle: String::new(),
        content: "Era uma vez...".to_string(),
        cover_url: String::new(),
    }
}

pub fn remote_dictionary() -> Dictionary {
    Dictionary {
        categories: vec![
            Category { id: 1, name: "Animais".into() },
            Category { id: 2, name: "Cores".into() },
        ],
        words: WordBuckets::from_words([word(10, 1, "gato"), word(11, 1, "cão"), word(20, 2, "azul")]),
    }
}

pub fn bundled_dictionary() -> Dictionary {
    Dictionary {
        categories: vec![Category { id: 9, name: "Básico".into() }],
        words: WordBuckets::from_words([word(90, 9, "sim")]),
    }
}

/// A store holding a signed-in user's token.
pub fn signed_in_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set(StorageKey::AuthToken, "user-token").unwrap();
    store
}

pub struct Harness {
    pub app: Lexicache,
    pub store: Arc<MemoryStore>,
    pub remote: Arc<FakeRemote>,
}

impl Harness {
    pub fn new(remote: FakeRemote) -> Self {
        Self::with_store(remote, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(remote: FakeRemote, store: Arc<MemoryStore>) -> Self {
        // Nothing listens here; mutations fail before any request is sent
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        Self::with_client(remote, store, client)
    }

    pub fn with_client(remote: FakeRemote, store: Arc<MemoryStore>, client: ApiClient) -> Self {
        let remote = Arc::new(remote);
        let bundle = BundledData::new(bundled_dictionary(), vec![text(900, "Texto de exemplo")]);
        let app = Lexicache::with_parts(Config::default(), store.clone(), remote.clone(), client, bundle);
        Self { app, store, remote }
    }

    pub fn cache(&self) -> CacheManager {
        CacheManager::new(self.store.clone())
    }

    pub fn online() -> Self {
        Self::new(FakeRemote::new(remote_dictionary(), vec![text(1, "O gato azul")]))
    }
}
