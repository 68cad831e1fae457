//! Outbound request model for the recommendation service
//!
//! Every request has a canonical key (SHA-256 over method, path and a
//! key-sorted JSON body) used both for response caching and for coalescing
//! concurrent identical requests.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

pub const SCORE_PATH: &str = "/v1/score";
pub const BLUEPRINTS_PATH: &str = "/v1/blueprints";

pub fn job_status_path(job_id: &str) -> String {
    format!("/v1/jobs/{job_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Served from and stored in the response cache
    Cacheable,
    /// Always dispatched, never stored
    Bypass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub cache: CachePolicy,
}

impl RemoteRequest {
    /// GET requests are idempotent and cacheable unless told otherwise
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            cache: CachePolicy::Cacheable,
        }
    }

    /// POST requests bypass the cache unless marked [`RemoteRequest::cacheable`]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            cache: CachePolicy::Bypass,
        }
    }

    pub fn cacheable(mut self) -> Self {
        self.cache = CachePolicy::Cacheable;
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.cache = CachePolicy::Bypass;
        self
    }

    pub fn is_cacheable(&self) -> bool {
        self.cache == CachePolicy::Cacheable
    }

    /// Deterministic hex key for cache lookup and coalescing
    pub fn canonical_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.path.as_bytes());
        hasher.update(b"\n");
        if let Some(body) = &self.body {
            hasher.update(canonical_json(body).as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Serialize JSON with object keys sorted at every level
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        Value::String(key.clone()),
                        canonical_json(&map[key.as_str()])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}
