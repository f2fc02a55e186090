use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{
    ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CACHE_VERSION: u32 = 1;
const CACHE_FILE: &str = "csv_cache.json";
const REQUEST_TIMEOUT_SECS: u64 = 20;
const CLIENT_NAME: &str = concat!("footy_poisson/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Blocking client shared by every fetch in the process.
pub fn shared_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, CachedBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedBody {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: i64,
}

/// Disk-backed body cache keyed by URL.
///
/// Fresh entries are served without a request, stale ones are revalidated with
/// conditional headers, and a failing upstream falls back to the stale body.
#[derive(Debug)]
pub struct BodyCache {
    path: Option<PathBuf>,
    max_age_secs: i64,
    file: Mutex<CacheFile>,
}

impl BodyCache {
    pub fn open(dir: &Path, max_age_secs: u64) -> Self {
        let path = dir.join(CACHE_FILE);
        let file = load_cache_file(&path);
        Self {
            path: Some(path),
            max_age_secs: i64::try_from(max_age_secs).unwrap_or(i64::MAX),
            file: Mutex::new(file),
        }
    }

    /// A cache that never touches disk and never serves entries from a previous run.
    pub fn disabled() -> Self {
        Self {
            path: None,
            max_age_secs: 0,
            file: Mutex::new(CacheFile::default()),
        }
    }

    pub fn fetch_text(&self, client: &Client, url: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let cached = self.get(url);
        if let Some(entry) = cached.as_ref()
            && self.is_fresh(entry, now)
        {
            debug!(url, "serving cached body");
            return Ok(entry.body.clone());
        }

        let resp = match conditional_request(client, url, cached.as_ref()).send() {
            Ok(resp) => resp,
            Err(err) => return self.stale_or(url, cached, anyhow!(err).context("request failed")),
        };
        let status = resp.status();
        if status == StatusCode::NOT_MODIFIED {
            let Some(mut entry) = cached else {
                return Err(anyhow!("received 304 without cached body for {url}"));
            };
            entry.fetched_at = now;
            let body = entry.body.clone();
            self.put(url, entry);
            return Ok(body);
        }

        let etag = header_string(resp.headers(), ETAG);
        let last_modified = header_string(resp.headers(), LAST_MODIFIED);
        let body = match resp.text() {
            Ok(body) => body,
            Err(err) => {
                return self.stale_or(url, cached, anyhow!(err).context("failed reading body"));
            }
        };
        if !status.is_success() {
            return self.stale_or(url, cached, anyhow!("http {status}"));
        }

        self.put(
            url,
            CachedBody {
                body: body.clone(),
                etag,
                last_modified,
                fetched_at: now,
            },
        );
        Ok(body)
    }

    fn is_fresh(&self, entry: &CachedBody, now: i64) -> bool {
        self.path.is_some() && now.saturating_sub(entry.fetched_at) < self.max_age_secs
    }

    fn stale_or(&self, url: &str, cached: Option<CachedBody>, err: anyhow::Error) -> Result<String> {
        match cached {
            Some(entry) => {
                warn!(url, error = %err, "upstream failed, serving stale cached body");
                Ok(entry.body)
            }
            None => Err(err),
        }
    }

    fn get(&self, url: &str) -> Option<CachedBody> {
        let guard = self.file.lock().expect("body cache lock poisoned");
        guard.entries.get(url).cloned()
    }

    fn put(&self, url: &str, entry: CachedBody) {
        let mut guard = self.file.lock().expect("body cache lock poisoned");
        guard.version = CACHE_VERSION;
        guard.entries.insert(url.to_string(), entry);
        if let Some(path) = self.path.as_deref()
            && let Err(err) = save_cache_file(path, &guard)
        {
            warn!(error = %err, "could not persist body cache");
        }
    }
}

fn conditional_request(client: &Client, url: &str, cached: Option<&CachedBody>) -> RequestBuilder {
    let mut req = client.get(url).header(USER_AGENT, CLIENT_NAME);
    if let Some(entry) = cached {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }
    req
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn load_cache_file(path: &Path) -> CacheFile {
    let Ok(raw) = fs::read_to_string(path) else {
        return CacheFile::default();
    };
    let cache = serde_json::from_str::<CacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return CacheFile::default();
    }
    cache
}

fn save_cache_file(path: &Path, cache: &CacheFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("create cache dir")?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize body cache")?;
    fs::write(&tmp, json).context("write body cache")?;
    fs::rename(&tmp, path).context("swap body cache")?;
    Ok(())
}
