use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use crate::config::{Config, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::Sample;

/// Supplies one page observation per tick. Lookup failures of any kind are
/// absorbed into absent fields, never an error: absence is a normal state at
/// round boundaries and the tracker is built around it.
#[async_trait]
pub trait PageReader {
    async fn sample(&mut self) -> Sample;
}

/// Polls the live game page over HTTP and extracts the coefficient and
/// total-bets text with CSS selectors.
pub struct HttpPageReader {
    client: reqwest::Client,
    url: String,
    coefficient: Selector,
    coefficient_fallback: Selector,
    total_bets: Selector,
}

impl HttpPageReader {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: cfg.game_url.clone(),
            coefficient: parse_selector(&cfg.coefficient_selector)?,
            coefficient_fallback: parse_selector(&cfg.coefficient_fallback_selector)?,
            total_bets: parse_selector(&cfg.total_bets_selector)?,
        })
    }

    async fn fetch_snapshot(&self) -> Result<String> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl PageReader for HttpPageReader {
    async fn sample(&mut self) -> Sample {
        let observed_at = Instant::now();
        let body = match self.fetch_snapshot().await {
            Ok(body) => body,
            Err(e) => {
                debug!("page fetch failed: {e}");
                return Sample::absent(observed_at);
            }
        };

        let doc = Html::parse_document(&body);
        let coefficient =
            extract_coefficient(&doc, &self.coefficient, &self.coefficient_fallback);
        let total_bets = select_text(&doc, &self.total_bets);
        if total_bets.is_none() {
            debug!("total-bets element not found in snapshot");
        }

        Sample {
            coefficient,
            total_bets,
            observed_at,
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Selector(format!("{css}: {e}")))
}

/// Trimmed text of the first element matching `sel`, None when the element is
/// missing or empty.
fn select_text(doc: &Html, sel: &Selector) -> Option<String> {
    let element = doc.select(sel).next()?;
    let text: String = element.text().collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Primary selector first, fallback second. A primary miss is not yet an
/// absence while the resolving-state element still carries the value.
fn extract_coefficient(doc: &Html, primary: &Selector, fallback: &Selector) -> Option<String> {
    select_text(doc, primary).or_else(|| select_text(doc, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IN_ROUND: &str = r#"
        <html><body>
          <div class="head-list__crash"><span>1 540</span></div>
          <div class="ratio-timer"><span>2.35x</span></div>
        </body></html>"#;

    const RESOLVING: &str = r#"
        <html><body>
          <div class="head-list__crash"><span>1 540</span></div>
          <div class="ratio-timer__white"><span>4.10x</span></div>
        </body></html>"#;

    const BETWEEN_ROUNDS: &str = r#"<html><body><div class="loader"></div></body></html>"#;

    fn selectors() -> (Selector, Selector, Selector) {
        (
            parse_selector(crate::config::COEFFICIENT_SELECTOR).unwrap(),
            parse_selector(crate::config::COEFFICIENT_FALLBACK_SELECTOR).unwrap(),
            parse_selector(crate::config::TOTAL_BETS_SELECTOR).unwrap(),
        )
    }

    #[test]
    fn primary_selector_reads_live_coefficient() {
        let (primary, fallback, _) = selectors();
        let doc = Html::parse_document(IN_ROUND);
        assert_eq!(
            extract_coefficient(&doc, &primary, &fallback).as_deref(),
            Some("2.35x")
        );
    }

    #[test]
    fn fallback_selector_covers_the_resolving_state() {
        let (primary, fallback, _) = selectors();
        let doc = Html::parse_document(RESOLVING);
        assert!(select_text(&doc, &primary).is_none());
        assert_eq!(
            extract_coefficient(&doc, &primary, &fallback).as_deref(),
            Some("4.10x")
        );
    }

    #[test]
    fn missing_elements_read_as_none() {
        let (primary, fallback, bets) = selectors();
        let doc = Html::parse_document(BETWEEN_ROUNDS);
        assert!(extract_coefficient(&doc, &primary, &fallback).is_none());
        assert!(select_text(&doc, &bets).is_none());
    }

    #[test]
    fn extracted_text_is_trimmed() {
        let (primary, fallback, _) = selectors();
        let doc =
            Html::parse_document(r#"<div class="ratio-timer"><span>  3.07x </span></div>"#);
        assert_eq!(
            extract_coefficient(&doc, &primary, &fallback).as_deref(),
            Some("3.07x")
        );
    }

    #[test]
    fn whitespace_only_text_is_none() {
        let (primary, fallback, _) = selectors();
        let doc = Html::parse_document(r#"<div class="ratio-timer"><span>   </span></div>"#);
        assert!(extract_coefficient(&doc, &primary, &fallback).is_none());
    }

    #[test]
    fn total_bets_reads_independently_of_the_coefficient() {
        let (_, _, bets) = selectors();
        let doc = Html::parse_document(IN_ROUND);
        assert_eq!(select_text(&doc, &bets).as_deref(), Some("1 540"));
    }

    #[test]
    fn invalid_selector_is_rejected() {
        assert!(parse_selector("div..broken").is_err());
    }
}
