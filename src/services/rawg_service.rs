use crate::{
    error::Result,
    models::{RawgGame, RawgGamePage},
};

/// Thin client for the RAWG game catalog API. The catalog is treated as
/// authoritative for game metadata; a miss (or any non-success response)
/// just means the catalog does not know the game.
#[derive(Clone)]
pub struct RawgService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct GetGamesParams {
    pub search: Option<String>,
    pub page_size: Option<u32>,
    pub ordering: Option<String>,
}

impl RawgService {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn keyed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    /// Looks a game up by numeric id or slug.
    pub async fn get_game(&self, id_or_slug: &str) -> Result<Option<RawgGame>> {
        let url = format!("{}/games/{}", self.base_url, id_or_slug);
        let response = self.keyed(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let game: RawgGame = response.json().await?;
        Ok(Some(game))
    }

    pub async fn get_games(&self, params: &GetGamesParams) -> Result<RawgGamePage> {
        let url = format!("{}/games", self.base_url);
        let mut request = self.keyed(self.client.get(&url));

        if let Some(search) = &params.search {
            request = request.query(&[("search", search)]);
        }
        if let Some(page_size) = params.page_size {
            request = request.query(&[("page_size", page_size.to_string())]);
        }
        if let Some(ordering) = &params.ordering {
            request = request.query(&[("ordering", ordering)]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Ok(RawgGamePage {
                count: 0,
                results: Vec::new(),
            });
        }

        let page: RawgGamePage = response.json().await?;
        Ok(page)
    }
}
