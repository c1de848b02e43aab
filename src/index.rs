//! Gateway to the external lexical+vector index engine
//!
//! Thin adapter translating component-level operations (lexical search,
//! kNN search, upsert, document fetch, facets) onto the engine's
//! Solr-style `select`/`update` JSON API. The gateway owns filter
//! encoding, scalar-or-array field parsing, and per-document write
//! serialization; ranking belongs to the retrieval layer.

use crate::chunking::Chunk;
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

/// Boolean filters applied to searches.
///
/// Missing values are wildcards; date endpoints are inclusive days;
/// `speaker` matches the exact stored string; composition is AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SearchFilters {
    pub country: Option<String>,
    pub speaker: Option<String>,
    pub chamber: Option<String>,
    /// Inclusive ISO-8601 day
    pub date_from: Option<String>,
    /// Inclusive ISO-8601 day
    pub date_to: Option<String>,
}

impl SearchFilters {
    /// Encode as engine filter-query clauses
    pub fn to_filter_queries(&self) -> Vec<String> {
        let mut clauses = Vec::new();

        if let Some(country) = &self.country {
            clauses.push(format!("source:\"{}\"", country));
        }
        if let Some(speaker) = &self.speaker {
            clauses.push(format!("speaker:\"{}\"", speaker));
        }
        if let Some(chamber) = &self.chamber {
            clauses.push(format!("chamber:\"{}\"", chamber));
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let from = self.date_from.as_deref().unwrap_or("*");
            let to = self.date_to.as_deref().unwrap_or("*");
            clauses.push(format!("date:[{} TO {}]", from, to));
        }

        clauses
    }
}

/// A raw engine hit, sorted by engine score descending
#[derive(Debug, Clone)]
pub struct RawHit {
    pub chunk_id: String,
    pub doc_id: String,
    pub text: String,
    pub speaker: String,
    pub date: String,
    pub country: String,
    pub chamber: String,
    pub title: String,
    pub url: String,
    pub score: f32,
    pub chunk_index: usize,
}

/// A chunk as stored in the engine, with an optional dense vector.
///
/// Records without `content_vector` are lexical-only; a later upsert of
/// the same `chunk_id` backfills the vector.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub chunk: Chunk,
    pub content_vector: Option<Vec<f32>>,
}

impl IndexedRecord {
    pub fn new(chunk: Chunk) -> Self {
        Self {
            chunk,
            content_vector: None,
        }
    }

    pub fn with_vector(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            chunk,
            content_vector: Some(vector),
        }
    }

    /// Engine document representation, keyed by `chunk_id`
    fn to_engine_doc(&self) -> serde_json::Value {
        let chunk = &self.chunk;
        let mut doc = serde_json::json!({
            "id": chunk.chunk_id,
            "document_id": chunk.doc_id,
            "content": chunk.text,
            "speaker": chunk.speaker,
            "source": chunk.country,
            "chamber": chunk.chamber,
            "title": chunk.title,
            "url": chunk.url,
            "document_type": chunk.document_type,
            "chunk_index": chunk.chunk_index,
            "token_count": chunk.token_estimate,
            "content_hash": chunk.content_hash,
        });

        if let Some(date) = &chunk.date {
            doc["date"] = serde_json::Value::String(date.clone());
        }
        if let Some(vector) = &self.content_vector {
            doc["content_vector"] = serde_json::json!(vector);
        }

        doc
    }
}

/// Metadata of a reconstructed document, taken from its first chunk
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentMetadata {
    pub doc_id: String,
    pub title: String,
    pub country: String,
    pub date: String,
    pub speaker: String,
    pub url: String,
}

/// A full document reassembled from its chunks in `chunk_index` order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FullDocument {
    pub doc_id: String,
    pub content: String,
    pub formatted_content: String,
    pub metadata: DocumentMetadata,
    pub chunk_count: usize,
    pub total_length: usize,
}

/// Index statistics for the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexStats {
    pub total_documents: u64,
    pub countries: HashMap<String, u64>,
    pub index_status: String,
}

/// Component-level operations over the external index engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexGateway: Send + Sync {
    /// Tokenized text match with boolean filters, engine-ranked
    async fn lexical_search(
        &self,
        query: &str,
        filters: &SearchFilters,
        k: usize,
    ) -> Result<Vec<RawHit>>;

    /// Approximate kNN over `content_vector`. Filters are applied as
    /// post-filters on the kNN candidate set.
    async fn vector_search(
        &self,
        query_vector: &[f32],
        filters: &SearchFilters,
        k: usize,
    ) -> Result<Vec<RawHit>>;

    /// Idempotent upsert keyed by `chunk_id`
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()>;

    /// Delete all chunks belonging to a document
    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<()>;

    /// Delete-then-upsert for one document, serialized per `doc_id`
    async fn replace_document(&self, doc_id: &str, records: &[IndexedRecord]) -> Result<()>;

    /// All chunks of a document sorted by `chunk_index`
    async fn fetch_document(&self, doc_id: &str) -> Result<Option<FullDocument>>;

    /// Counts by field value under the given filters
    async fn facets(&self, field: &str, filters: &SearchFilters) -> Result<HashMap<String, u64>>;

    /// Total chunk count under the given filters
    async fn count(&self, filters: &SearchFilters) -> Result<u64>;

    /// Engine reachability
    async fn health(&self) -> bool;

    /// Aggregate statistics for the stats endpoint
    async fn stats(&self) -> IndexStats;
}

/// Gateway implementation over a Solr core
pub struct SolrGateway {
    client: reqwest::Client,
    config: IndexConfig,
    /// Serializes delete-then-upsert per document id
    doc_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SolrGateway {
    pub fn new(config: IndexConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            doc_locks: Mutex::new(HashMap::new()),
        }
    }

    fn select_url(&self) -> String {
        format!("{}/select", self.config.url.trim_end_matches('/'))
    }

    fn update_url(&self) -> String {
        format!("{}/update?commit=true", self.config.url.trim_end_matches('/'))
    }

    async fn doc_lock(&self, doc_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.doc_locks.lock().await;
        locks
            .entry(doc_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run a select query and return the parsed JSON body
    async fn select(&self, params: &[(String, String)]) -> Result<serde_json::Value> {
        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client.get(self.select_url()).query(params).send(),
        )
        .await
        .map_err(|_| IndexError::Timeout)?
        .map_err(|e| IndexError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Index query error: {}", error_text);
            return Err(IndexError::QueryFailed(error_text).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        Ok(body)
    }

    fn base_params(query: String, filters: &SearchFilters, rows: usize) -> Vec<(String, String)> {
        let mut params = vec![
            ("q".to_string(), query),
            ("rows".to_string(), rows.to_string()),
            ("fl".to_string(), "*,score".to_string()),
            ("wt".to_string(), "json".to_string()),
        ];
        for clause in filters.to_filter_queries() {
            params.push(("fq".to_string(), clause));
        }
        params
    }

    /// Main lexical query: exact phrase OR individual terms over `content`
    fn build_lexical_query(query: &str) -> String {
        let escaped = query.replace('"', "\\\"");
        format!("content:(\"{}\") OR content:({})", escaped, escaped)
    }

    fn build_knn_query(query_vector: &[f32], k: usize) -> String {
        let vector = query_vector
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("{{!knn f=content_vector topK={}}}[{}]", k, vector)
    }

    fn parse_hits(body: &serde_json::Value) -> Vec<RawHit> {
        let docs = body
            .pointer("/response/docs")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        let mut hits = Vec::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            let chunk_id = field_str(doc, "id");
            if chunk_id.is_empty() {
                warn!("Skipping hit {} with no id", i);
                continue;
            }

            hits.push(RawHit {
                doc_id: non_empty_or(field_str(doc, "document_id"), &chunk_id),
                text: field_str(doc, "content"),
                speaker: non_empty_or(field_str(doc, "speaker"), "Unknown"),
                date: field_str(doc, "date"),
                country: non_empty_or(field_str(doc, "source"), "Unknown"),
                chamber: non_empty_or(field_str(doc, "chamber"), "Parliament"),
                title: field_str(doc, "title"),
                url: field_str(doc, "url"),
                score: doc
                    .get("score")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0) as f32,
                chunk_index: field_u64(doc, "chunk_index").unwrap_or(i as u64) as usize,
                chunk_id,
            });
        }

        hits
    }

    fn num_found(body: &serde_json::Value) -> u64 {
        body.pointer("/response/numFound")
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }

    async fn post_update(&self, payload: serde_json::Value, op: &str) -> Result<()> {
        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client.post(self.update_url()).json(&payload).send(),
        )
        .await
        .map_err(|_| IndexError::Timeout)?
        .map_err(|e| IndexError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Index {} error: {}", op, error_text);
            return match op {
                "delete" => Err(IndexError::DeleteFailed(error_text).into()),
                _ => Err(IndexError::UpsertFailed(error_text).into()),
            };
        }

        Ok(())
    }
}

#[async_trait]
impl IndexGateway for SolrGateway {
    async fn lexical_search(
        &self,
        query: &str,
        filters: &SearchFilters,
        k: usize,
    ) -> Result<Vec<RawHit>> {
        let mut params = Self::base_params(Self::build_lexical_query(query), filters, k);
        params.push(("sort".to_string(), "score desc".to_string()));

        let body = self.select(&params).await?;
        let hits = Self::parse_hits(&body);
        debug!("Lexical search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn vector_search(
        &self,
        query_vector: &[f32],
        filters: &SearchFilters,
        k: usize,
    ) -> Result<Vec<RawHit>> {
        let params = Self::base_params(Self::build_knn_query(query_vector, k), filters, k);

        let body = self.select(&params).await?;
        let hits = Self::parse_hits(&body);
        debug!("Vector search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let docs: Vec<serde_json::Value> = records.iter().map(|r| r.to_engine_doc()).collect();
        self.post_update(serde_json::Value::Array(docs), "upsert")
            .await?;

        info!("Upserted {} records", records.len());
        Ok(())
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<()> {
        let escaped = doc_id.replace('"', "\\\"");
        let payload = serde_json::json!({
            "delete": { "query": format!("document_id:\"{}\"", escaped) }
        });
        self.post_update(payload, "delete").await
    }

    async fn replace_document(&self, doc_id: &str, records: &[IndexedRecord]) -> Result<()> {
        let lock = self.doc_lock(doc_id).await;
        let _guard = lock.lock().await;

        self.delete_by_doc_id(doc_id).await?;
        self.upsert(records).await
    }

    async fn fetch_document(&self, doc_id: &str) -> Result<Option<FullDocument>> {
        let escaped = doc_id.replace('"', "\\\"");
        let params = vec![
            ("q".to_string(), format!("document_id:\"{}\"", escaped)),
            ("rows".to_string(), "1000".to_string()),
            ("sort".to_string(), "chunk_index asc".to_string()),
            ("wt".to_string(), "json".to_string()),
        ];

        let body = self.select(&params).await?;
        let mut hits = Self::parse_hits(&body);
        if hits.is_empty() {
            return Ok(None);
        }
        hits.sort_by_key(|h| h.chunk_index);

        let first = &hits[0];
        let metadata = DocumentMetadata {
            doc_id: doc_id.to_string(),
            title: first.title.clone(),
            country: first.country.clone(),
            date: truncate_to_day(&first.date),
            speaker: first.speaker.clone(),
            url: first.url.clone(),
        };

        let parts: Vec<&str> = hits
            .iter()
            .map(|h| h.text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        let content = parts.join("\n\n");
        let formatted_content = format_document_content(&content, &metadata);

        Ok(Some(FullDocument {
            doc_id: doc_id.to_string(),
            total_length: content.len(),
            chunk_count: hits.len(),
            content,
            formatted_content,
            metadata,
        }))
    }

    async fn facets(&self, field: &str, filters: &SearchFilters) -> Result<HashMap<String, u64>> {
        let mut params = Self::base_params("*:*".to_string(), filters, 0);
        params.push(("facet".to_string(), "true".to_string()));
        params.push(("facet.field".to_string(), field.to_string()));
        params.push(("facet.mincount".to_string(), "1".to_string()));

        let body = self.select(&params).await?;

        // Facet fields arrive as alternating value/count arrays
        let mut counts = HashMap::new();
        if let Some(entries) = body
            .pointer(&format!("/facet_counts/facet_fields/{}", field))
            .and_then(|v| v.as_array())
        {
            let mut iter = entries.iter();
            while let (Some(value), Some(count)) = (iter.next(), iter.next()) {
                if let (Some(value), Some(count)) = (value.as_str(), count.as_u64()) {
                    counts.insert(value.to_string(), count);
                }
            }
        }

        Ok(counts)
    }

    async fn count(&self, filters: &SearchFilters) -> Result<u64> {
        let params = Self::base_params("*:*".to_string(), filters, 0);
        let body = self.select(&params).await?;
        Ok(Self::num_found(&body))
    }

    async fn health(&self) -> bool {
        match self.count(&SearchFilters::default()).await {
            Ok(total) => {
                debug!("Index healthy, {} chunks indexed", total);
                true
            }
            Err(e) => {
                error!("Index health check failed: {}", e);
                false
            }
        }
    }

    async fn stats(&self) -> IndexStats {
        let total = match self.count(&SearchFilters::default()).await {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to get index stats: {}", e);
                return IndexStats {
                    total_documents: 0,
                    countries: HashMap::new(),
                    index_status: "error".to_string(),
                };
            }
        };

        let countries = match self.facets("source", &SearchFilters::default()).await {
            Ok(counts) => counts,
            Err(e) => {
                warn!("Could not get country counts: {}", e);
                HashMap::new()
            }
        };

        IndexStats {
            total_documents: total,
            countries,
            index_status: "healthy".to_string(),
        }
    }
}

/// Extract a string field that may be stored as a scalar or a
/// single-element array
fn field_str(doc: &serde_json::Value, field: &str) -> String {
    match doc.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => String::new(),
    }
}

fn field_u64(doc: &serde_json::Value, field: &str) -> Option<u64> {
    match doc.get(field) {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::Array(items)) => items.first().and_then(|v| v.as_u64()),
        _ => None,
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Drop the time portion of an engine timestamp, keeping the day
pub fn truncate_to_day(date: &str) -> String {
    date.split('T').next().unwrap_or(date).to_string()
}

fn speaker_heading_in_flow_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(?:HON\.|MR\.|MS\.|DR\.|PROF\.)[^.]*?\.[-\u{2013}]\s*")
            .expect("static regex")
    })
}

/// Render a reconstructed document as readable Markdown: metadata header,
/// bolded speaker headings, paragraph breaks on length and closing
/// formulae.
fn format_document_content(raw_content: &str, metadata: &DocumentMetadata) -> String {
    let mut header_parts = Vec::new();
    if !metadata.title.is_empty() {
        header_parts.push(format!("# {}", metadata.title));
    }
    if !metadata.country.is_empty() {
        header_parts.push(format!("**Country:** {}", metadata.country));
    }
    if !metadata.date.is_empty() {
        header_parts.push(format!("**Date:** {}", metadata.date));
    }
    if !metadata.speaker.is_empty() && metadata.speaker != "Parliament" {
        header_parts.push(format!("**Speaker:** {}", metadata.speaker));
    }

    let header = if header_parts.is_empty() {
        String::new()
    } else {
        format!("{}\n\n---\n\n", header_parts.join("\n"))
    };

    let content = raw_content.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sections: Vec<String> = Vec::new();
    let mut last_end = 0;
    for m in speaker_heading_in_flow_re().find_iter(&content) {
        let before = content[last_end..m.start()].trim();
        if !before.is_empty() {
            sections.extend(split_into_paragraphs(before));
        }
        sections.push(format!("**{}**", m.as_str().trim()));
        last_end = m.end();
    }
    let tail = content[last_end..].trim();
    if !tail.is_empty() {
        sections.extend(split_into_paragraphs(tail));
    }

    format!("{}{}", header, sections.join("\n\n"))
}

/// Break a speaker's section into paragraphs on length and common
/// closing formulae
fn split_into_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for raw in text.split('.') {
        let sentence = raw.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence = format!("{}.", sentence);
        current.push(sentence.clone());

        let paragraph = current.join(" ");
        if paragraph.len() > 600
            || sentence.contains("Thank you, Mr. Speaker")
            || sentence.contains("I thank you")
            || sentence.ends_with("Thank you, Sir.")
            || sentence.ends_with("I conclude.")
        {
            paragraphs.push(paragraph);
            current.clear();
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    if paragraphs.is_empty() && !text.is_empty() {
        paragraphs.push(text.to_string());
    }

    paragraphs
}
