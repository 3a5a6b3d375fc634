//! Content-addressed image cache: a bounded in-memory layer in front of a
//! directory of `<sha256(url)>.img` files.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create asset HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;
        if !response.status().is_success() {
            bail!("Download of {} failed with status {}", url, response.status());
        }
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        if bytes.is_empty() {
            bail!("Download of {} returned no data", url);
        }
        Ok(bytes.to_vec())
    }
}

/// Insertion-ordered memory cache bounded by entry count and total bytes.
struct MemoryCache {
    entries: HashMap<String, Arc<Vec<u8>>>,
    order: VecDeque<String>,
    total_bytes: usize,
    max_entries: usize,
    max_bytes: usize,
}

impl MemoryCache {
    fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            total_bytes: 0,
            max_entries,
            max_bytes,
        }
    }

    fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, data: Arc<Vec<u8>>) {
        if self.max_entries == 0 || data.len() > self.max_bytes || self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= self.max_entries || self.total_bytes + data.len() > self.max_bytes
        {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.total_bytes -= evicted.len();
            }
        }
        self.total_bytes += data.len();
        self.order.push_back(key.clone());
        self.entries.insert(key, data);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_bytes = 0;
    }
}

pub struct AssetCache {
    dir: PathBuf,
    fetcher: Arc<dyn AssetFetcher>,
    memory: Mutex<MemoryCache>,
}

impl AssetCache {
    pub fn new<P: AsRef<Path>>(
        dir: P,
        fetcher: Arc<dyn AssetFetcher>,
        max_entries: usize,
        max_bytes: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create image cache directory {:?}", dir))?;
        Ok(Self {
            dir,
            fetcher,
            memory: Mutex::new(MemoryCache::new(max_entries, max_bytes)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name an asset is stored under: hex SHA-256 of the full URL plus `.img`.
    pub fn cache_filename(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        format!("{:x}.img", digest)
    }

    /// Memory first, then disk, then the network. Downloads are written to disk.
    pub async fn get_or_fetch(&self, url: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(hit) = self.memory.lock().await.get(url) {
            return Ok(hit);
        }

        let path = self.dir.join(Self::cache_filename(url));
        let data = match tokio::fs::read(&path).await {
            Ok(data) if !data.is_empty() => {
                debug!("Image cache disk hit for {}", url);
                data
            }
            _ => {
                let data = self.fetcher.fetch(url).await?;
                tokio::fs::write(&path, &data)
                    .await
                    .with_context(|| format!("Failed to write cached image {:?}", path))?;
                debug!("Cached {} bytes from {}", data.len(), url);
                data
            }
        };

        let data = Arc::new(data);
        self.memory
            .lock()
            .await
            .insert(url.to_string(), data.clone());
        Ok(data)
    }

    /// Cache file name for `url` if that file exists on disk.
    pub fn filename_if_cached(&self, url: &str) -> Option<String> {
        let filename = Self::cache_filename(url);
        self.contains_file(&filename).then_some(filename)
    }

    pub fn contains_file(&self, filename: &str) -> bool {
        self.dir.join(filename).is_file()
    }

    pub async fn read_file(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(filename);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read cached image {:?}", path))
    }

    /// Empties both layers. The directory itself is recreated.
    pub async fn clear_all(&self) -> Result<()> {
        let mut memory = self.memory.lock().await;
        if self.dir.exists() {
            tokio::fs::remove_dir_all(&self.dir)
                .await
                .with_context(|| format!("Failed to remove image cache {:?}", self.dir))?;
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        memory.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingFetcher {
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(url.to_string());
            if url.contains("missing") {
                bail!("404 for {}", url);
            }
            Ok(format!("bytes of {}", url).into_bytes())
        }
    }

    fn create_cache(dir: &TempDir, fetcher: Arc<CountingFetcher>) -> AssetCache {
        AssetCache::new(dir.path().join("image_cache"), fetcher, 50, 50 * 1024 * 1024).unwrap()
    }

    #[test]
    fn filename_is_sha256_hex_of_url() {
        let name = AssetCache::cache_filename("https://example.com/a.jpg");
        assert!(name.ends_with(".img"));
        assert_eq!(name.len(), 64 + 4);
        assert_ne!(name, AssetCache::cache_filename("https://example.com/b.jpg"));
        assert_eq!(name, AssetCache::cache_filename("https://example.com/a.jpg"));
    }

    #[tokio::test]
    async fn fetches_once_then_serves_from_memory() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = create_cache(&dir, fetcher.clone());

        let url = "https://example.com/poster.jpg";
        let first = cache.get_or_fetch(url).await.unwrap();
        let second = cache.get_or_fetch(url).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);

        let filename = cache.filename_if_cached(url).unwrap();
        assert!(cache.contains_file(&filename));
        assert_eq!(cache.read_file(&filename).await.unwrap(), *first);
    }

    #[tokio::test]
    async fn disk_layer_survives_a_new_cache_instance() {
        let dir = TempDir::new().unwrap();
        let url = "https://example.com/cover.jpg";
        {
            let cache = create_cache(&dir, Arc::new(CountingFetcher::default()));
            cache.get_or_fetch(url).await.unwrap();
        }

        let fetcher = Arc::new(CountingFetcher::default());
        let cache = create_cache(&dir, fetcher.clone());
        let data = cache.get_or_fetch(url).await.unwrap();
        assert_eq!(*data, format!("bytes of {}", url).into_bytes());
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_caches_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = create_cache(&dir, Arc::new(CountingFetcher::default()));

        let url = "https://example.com/missing.jpg";
        assert!(cache.get_or_fetch(url).await.is_err());
        assert!(cache.filename_if_cached(url).is_none());
    }

    #[tokio::test]
    async fn clear_all_empties_disk_and_memory() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = create_cache(&dir, fetcher.clone());

        let url = "https://example.com/a.jpg";
        cache.get_or_fetch(url).await.unwrap();
        cache.clear_all().await.unwrap();

        assert!(cache.filename_if_cached(url).is_none());
        assert!(cache.dir().is_dir());
        cache.get_or_fetch(url).await.unwrap();
        assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn memory_cache_evicts_oldest_by_count() {
        let mut memory = MemoryCache::new(2, 1024);
        memory.insert("a".into(), Arc::new(vec![0; 10]));
        memory.insert("b".into(), Arc::new(vec![0; 10]));
        memory.insert("c".into(), Arc::new(vec![0; 10]));

        assert!(memory.get("a").is_none());
        assert!(memory.get("b").is_some());
        assert!(memory.get("c").is_some());
        assert_eq!(memory.total_bytes, 20);
    }

    #[test]
    fn memory_cache_evicts_oldest_by_bytes() {
        let mut memory = MemoryCache::new(10, 100);
        memory.insert("a".into(), Arc::new(vec![0; 60]));
        memory.insert("b".into(), Arc::new(vec![0; 30]));
        memory.insert("c".into(), Arc::new(vec![0; 30]));

        assert!(memory.get("a").is_none());
        assert_eq!(memory.total_bytes, 60);

        // Larger than the whole budget: never cached.
        memory.insert("huge".into(), Arc::new(vec![0; 101]));
        assert!(memory.get("huge").is_none());
        assert!(memory.get("b").is_some());
    }
}
