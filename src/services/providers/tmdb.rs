//! TMDB (The Movie Database) provider
//!
//! Serves both collaborator roles of the engine:
//! 1. Related items: /{movie|tv}/{id}/recommendations
//! 2. Text search: /search/{movie|tv}?query=
//!
//! Only the first result page is requested; the engine never surfaces more than
//! twenty titles per run.
use crate::{
    error::{AppError, AppResult},
    models::{Candidate, MovieSummary, ShowSummary, TitleId, TitleKind},
    services::providers::{RelatedItemsProvider, TextSearchProvider},
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TmdbPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
        }
    }

    /// TMDB path segment for a title kind
    fn media_path(kind: TitleKind) -> &'static str {
        match kind {
            TitleKind::Movie => "movie",
            TitleKind::Show => "tv",
        }
    }

    fn related_url(&self, id: TitleId, kind: TitleKind) -> String {
        format!(
            "{}/{}/{}/recommendations",
            self.api_url,
            Self::media_path(kind),
            id
        )
    }

    fn search_url(&self, kind: TitleKind) -> String {
        format!("{}/search/{}", self.api_url, Self::media_path(kind))
    }

    /// Decodes one result page into candidates of `kind`
    fn parse_page(kind: TitleKind, body: &str) -> AppResult<Vec<Candidate>> {
        let parse_error = |e: serde_json::Error| {
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        };

        let candidates = match kind {
            TitleKind::Movie => serde_json::from_str::<TmdbPage<MovieSummary>>(body)
                .map_err(parse_error)?
                .results
                .into_iter()
                .map(Candidate::Movie)
                .collect(),
            TitleKind::Show => serde_json::from_str::<TmdbPage<ShowSummary>>(body)
                .map_err(parse_error)?
                .results
                .into_iter()
                .map(Candidate::Show)
                .collect(),
        };

        Ok(candidates)
    }

    async fn get_page(
        &self,
        url: &str,
        params: &[(&str, &str)],
        kind: TitleKind,
    ) -> AppResult<Vec<Candidate>> {
        let response = self
            .http_client
            .get(url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
                ("page", "1"),
            ])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        Self::parse_page(kind, &body).inspect_err(|e| {
            tracing::error!(error = %e, url = %url, "Failed to deserialize TMDB response");
        })
    }
}

#[async_trait::async_trait]
impl RelatedItemsProvider for TmdbProvider {
    async fn fetch_related(&self, id: TitleId, kind: TitleKind) -> AppResult<Vec<Candidate>> {
        let url = self.related_url(id, kind);
        let candidates = self.get_page(&url, &[], kind).await?;

        tracing::debug!(
            seed_id = %id,
            kind = %kind,
            results = candidates.len(),
            provider = "tmdb",
            "Related items fetched"
        );

        Ok(candidates)
    }
}

#[async_trait::async_trait]
impl TextSearchProvider for TmdbProvider {
    async fn search(&self, query: &str, kind: TitleKind) -> AppResult<Vec<Candidate>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = self.search_url(kind);
        let candidates = self
            .get_page(&url, &[("query", query), ("include_adult", "false")], kind)
            .await?;

        tracing::info!(
            query = %query,
            kind = %kind,
            results = candidates.len(),
            provider = "tmdb",
            "Title search completed"
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider() -> TmdbProvider {
        TmdbProvider::new(
            "test_key".to_string(),
            "http://test.local/3/".to_string(),
            "en-US".to_string(),
        )
    }

    #[test]
    fn test_related_url_movie() {
        let provider = create_test_provider();
        assert_eq!(
            provider.related_url(TitleId(27205), TitleKind::Movie),
            "http://test.local/3/movie/27205/recommendations"
        );
    }

    #[test]
    fn test_related_url_show_uses_tv_path() {
        let provider = create_test_provider();
        assert_eq!(
            provider.related_url(TitleId(1396), TitleKind::Show),
            "http://test.local/3/tv/1396/recommendations"
        );
    }

    #[test]
    fn test_search_url() {
        let provider = create_test_provider();
        assert_eq!(
            provider.search_url(TitleKind::Show),
            "http://test.local/3/search/tv"
        );
    }

    #[test]
    fn test_parse_movie_page() {
        let body = r#"{
            "page": 1,
            "results": [
                {
                    "id": 157336,
                    "title": "Interstellar",
                    "overview": "Explorers travel through a wormhole in space.",
                    "vote_average": 8.4,
                    "release_date": "2014-11-05",
                    "media_type": "movie"
                },
                {
                    "id": 155,
                    "title": "The Dark Knight",
                    "overview": null,
                    "vote_average": 8.5
                }
            ],
            "total_pages": 2,
            "total_results": 40
        }"#;

        let candidates = TmdbProvider::parse_page(TitleKind::Movie, body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id(), TitleId(157336));
        assert_eq!(candidates[0].title(), "Interstellar");
        assert_eq!(candidates[0].kind(), TitleKind::Movie);
        assert_eq!(candidates[1].overview(), "");
        assert_eq!(candidates[1].quality_score(), 8.5);
    }

    #[test]
    fn test_parse_show_page() {
        let body = r#"{
            "page": 1,
            "results": [
                {
                    "id": 1399,
                    "name": "Game of Thrones",
                    "overview": "Seven noble families fight.",
                    "vote_average": 8.4
                }
            ]
        }"#;

        let candidates = TmdbProvider::parse_page(TitleKind::Show, body).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title(), "Game of Thrones");
        assert_eq!(candidates[0].kind(), TitleKind::Show);
    }

    #[test]
    fn test_parse_page_without_results_is_empty() {
        let candidates = TmdbProvider::parse_page(TitleKind::Movie, r#"{ "page": 1 }"#).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_parse_page_malformed() {
        let result = TmdbProvider::parse_page(TitleKind::Movie, "<html>rate limited</html>");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse TMDB response"));
    }

    #[tokio::test]
    async fn test_search_rejects_blank_query() {
        let provider = create_test_provider();
        let result = provider.search("   ", TitleKind::Movie).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
