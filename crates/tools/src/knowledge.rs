//! Knowledge lookups
//!
//! Weather comes from a wttr.in-style endpoint (`{endpoint}/{location}?format=3`),
//! search, news and facts from a DuckDuckGo-style instant answer API, and
//! stock quotes from an optional endpoint template containing `{symbol}`.
//! Time and date are answered locally.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::{Client, Url};
use serde::Deserialize;

use shadow_config::KnowledgeConfig;
use shadow_core::{CapabilityResult, KnowledgeQuery, KnowledgeService, Result};

use crate::CapabilityError;

const MAX_ANSWER_CHARS: usize = 400;

/// Current local time, e.g. "It's 07:45 PM."
pub fn current_time(now: DateTime<Local>) -> String {
    format!("It's {}.", now.format("%I:%M %p"))
}

/// Current local date, e.g. "Today is Saturday, October 17, 2026."
pub fn current_date(now: DateTime<Local>) -> String {
    format!("Today is {}.", now.format("%A, %B %-d, %Y"))
}

/// Knowledge service backed by public HTTP endpoints
#[derive(Clone)]
pub struct HttpKnowledge {
    client: Client,
    weather_endpoint: String,
    search_endpoint: String,
    stock_endpoint: Option<String>,
}

impl HttpKnowledge {
    pub fn new(config: &KnowledgeConfig, timeout: Duration) -> std::result::Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("shadow-assistant")
            .build()
            .map_err(|e| CapabilityError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            weather_endpoint: config.weather_endpoint.trim_end_matches('/').to_string(),
            search_endpoint: config.search_endpoint.trim_end_matches('/').to_string(),
            stock_endpoint: config.stock_endpoint.clone(),
        })
    }

    fn weather_url(&self, location: &str) -> std::result::Result<Url, CapabilityError> {
        let mut url = Url::parse(&self.weather_endpoint)
            .map_err(|e| CapabilityError::Configuration(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| CapabilityError::Configuration("weather endpoint cannot be a base".into()))?
            .pop_if_empty()
            .push(location);
        url.query_pairs_mut().append_pair("format", "3");
        Ok(url)
    }

    fn search_url(&self, query: &str) -> std::result::Result<Url, CapabilityError> {
        Url::parse_with_params(
            &format!("{}/", self.search_endpoint),
            &[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")],
        )
        .map_err(|e| CapabilityError::Configuration(e.to_string()))
    }

    async fn weather(&self, location: &str) -> std::result::Result<CapabilityResult, CapabilityError> {
        let location = if location.eq_ignore_ascii_case("current location") {
            ""
        } else {
            location
        };
        let body = self
            .client
            .get(self.weather_url(location)?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(CapabilityResult::ok(truncate(body.trim())))
    }

    async fn instant_answer(&self, query: &str) -> std::result::Result<CapabilityResult, CapabilityError> {
        let answer: InstantAnswer = self
            .client
            .get(self.search_url(query)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(match answer.best_text() {
            Some(text) => CapabilityResult::ok(truncate(&text)),
            None => CapabilityResult::failure(format!("No results for '{}'", query)),
        })
    }

    async fn stock(&self, symbol: &str) -> std::result::Result<CapabilityResult, CapabilityError> {
        let Some(template) = &self.stock_endpoint else {
            return Err(CapabilityError::Unavailable("no stock quote endpoint configured".into()));
        };
        let url = template.replace("{symbol}", symbol);
        let body = self.client.get(url).send().await?.error_for_status()?.text().await?;

        // JSON quotes carry a price field; anything else is shown as text
        let text = match serde_json::from_str::<Quote>(&body) {
            Ok(quote) => format!("{} is trading at {:.2}", symbol, quote.price),
            Err(_) => truncate(body.trim()),
        };
        Ok(CapabilityResult::ok(text))
    }
}

#[async_trait]
impl KnowledgeService for HttpKnowledge {
    async fn lookup(&self, query: KnowledgeQuery) -> Result<CapabilityResult> {
        tracing::debug!(kind = query.kind(), "Knowledge lookup");
        let result = match &query {
            KnowledgeQuery::Weather { location } => self.weather(location).await,
            KnowledgeQuery::Stock { symbol } => self.stock(symbol).await,
            KnowledgeQuery::News { topic } => self.instant_answer(&format!("{} news", topic)).await,
            KnowledgeQuery::Search { query } => self.instant_answer(query).await,
            KnowledgeQuery::Fact { topic } => self.instant_answer(topic).await,
        };
        Ok(result?)
    }
}

/// Knowledge service used when lookups are switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpKnowledge;

#[async_trait]
impl KnowledgeService for NoOpKnowledge {
    async fn lookup(&self, query: KnowledgeQuery) -> Result<CapabilityResult> {
        tracing::debug!(kind = query.kind(), "Knowledge disabled");
        Ok(CapabilityResult::failure("Online lookups are not enabled."))
    }
}

#[derive(Debug, Deserialize)]
struct Quote {
    price: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    definition: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: String,
}

impl InstantAnswer {
    fn best_text(&self) -> Option<String> {
        [&self.answer, &self.abstract_text, &self.definition]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .or_else(|| {
                self.related_topics
                    .iter()
                    .map(|t| t.text.clone())
                    .find(|t| !t.trim().is_empty())
            })
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ANSWER_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_ANSWER_CHARS).collect();
    format!("{}...", cut.trim_end())
}
