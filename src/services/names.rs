// src/services/names.rs

//! Knowledge-base name listing.
//!
//! Runs one SPARQL query against Wikidata for entities of a category (cities,
//! by default) that have an article in the requested language edition, and
//! returns the article titles in result order.

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, Identifier, IdentifierList, KnowledgeBaseConfig};
use crate::utils::http::create_async_client;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Lists entity names from a SPARQL endpoint.
#[derive(Debug, Clone)]
pub struct NameLister {
    client: Client,
    endpoint: Url,
    category: String,
}

impl NameLister {
    pub fn new(config: &Config) -> Result<Self> {
        let client = create_async_client(&config.http, &config.http.user_agent)?;
        Self::with_client(client, &config.knowledge_base)
    }

    pub fn with_client(client: Client, config: &KnowledgeBaseConfig) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
            category: config.category.clone(),
        })
    }

    /// Query the endpoint for every entity name in `language`.
    ///
    /// An unreachable endpoint, a non-success status, an unparsable result,
    /// or an empty result all fail with [`AppError::Query`].
    pub async fn list(&self, language: &str) -> Result<IdentifierList> {
        let query = build_query(language, &self.category);
        log::info!("Querying {} for language: {}", self.endpoint, language);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("query", query.as_str()), ("format", "json")])
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .send()
            .await
            .map_err(|e| AppError::query(language, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::query(language, format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::query(language, e))?;
        let names = parse_names(&body)
            .map_err(|e| AppError::query(language, format!("malformed results: {e}")))?;

        if names.is_empty() {
            return Err(AppError::query(language, "no entities returned"));
        }

        log::info!("Found {} names for language {}", names.len(), language);
        Ok(names)
    }
}

/// SPARQL selecting the article title of every instance (or instance of a
/// subclass) of `category` with an article on `{language}.wikipedia.org`.
pub fn build_query(language: &str, category: &str) -> String {
    format!(
        "SELECT DISTINCT ?title WHERE {{\n\
         \x20 ?item wdt:P31/wdt:P279* wd:{category} .\n\
         \x20 ?article schema:about ?item ;\n\
         \x20          schema:isPartOf <https://{language}.wikipedia.org/> ;\n\
         \x20          schema:name ?title .\n\
         }}"
    )
}

#[derive(Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Deserialize)]
struct SparqlBindings {
    bindings: Vec<SparqlRow>,
}

#[derive(Deserialize)]
struct SparqlRow {
    title: SparqlTerm,
}

#[derive(Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Parse SPARQL JSON results into identifiers, keeping row order.
///
/// Titles are written the way they appear in article URLs, with spaces
/// replaced by underscores.
pub fn parse_names(body: &str) -> std::result::Result<IdentifierList, serde_json::Error> {
    let results: SparqlResults = serde_json::from_str(body)?;
    Ok(results
        .results
        .bindings
        .into_iter()
        .map(|row| Identifier::new(row.title.value.replace(' ', "_")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_embeds_language_and_category() {
        let query = build_query("fr", "Q515");
        assert!(query.starts_with("SELECT DISTINCT ?title WHERE {"));
        assert!(query.contains("wdt:P31/wdt:P279* wd:Q515 ."));
        assert!(query.contains("schema:isPartOf <https://fr.wikipedia.org/>"));
        assert!(query.contains("schema:name ?title"));
        assert!(query.ends_with('}'));
    }

    #[test]
    fn parse_names_keeps_order_and_underscores_titles() {
        let body = r#"{
            "head": {"vars": ["title"]},
            "results": {"bindings": [
                {"title": {"xml:lang": "en", "type": "literal", "value": "Paris"}},
                {"title": {"xml:lang": "en", "type": "literal", "value": "New York City"}},
                {"title": {"xml:lang": "en", "type": "literal", "value": "São Paulo"}}
            ]}
        }"#;
        let names = parse_names(body).unwrap();
        let titles: Vec<&str> = names.iter().map(Identifier::as_str).collect();
        assert_eq!(titles, ["Paris", "New_York_City", "São_Paulo"]);
    }

    #[test]
    fn parse_names_accepts_empty_results() {
        let body = r#"{"head": {"vars": ["title"]}, "results": {"bindings": []}}"#;
        assert!(parse_names(body).unwrap().is_empty());
    }

    #[test]
    fn parse_names_rejects_malformed_results() {
        assert!(parse_names("<html>busy</html>").is_err());
        assert!(parse_names(r#"{"results": {"bindings": [{"item": {"value": "x"}}]}}"#).is_err());
    }

    #[test]
    fn with_client_rejects_bad_endpoint() {
        let config = KnowledgeBaseConfig {
            endpoint: "not a url".into(),
            category: "Q515".into(),
        };
        assert!(NameLister::with_client(Client::new(), &config).is_err());
    }
}
