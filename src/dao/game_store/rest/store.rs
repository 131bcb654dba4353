use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexSet;
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameRecord, RevealedAnswerRecord, SoundCueRecord, revealed_ids},
    storage::StorageResult,
};

use super::{
    config::RestConfig,
    error::{RestDaoError, RestResult},
};

const GAMES: &str = "rest/v1/games";
const REVEALED_ANSWERS: &str = "rest/v1/revealed_answers";
const CUE_COLUMNS: &str = "play_intense_sound_at,play_winning_sound_at,stop_sounds_at";

/// Read-only client for a PostgREST-style endpoint exposing the game tables.
#[derive(Clone)]
pub struct RestGameStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl RestGameStore {
    /// Build the HTTP client. No request is issued until the first read.
    pub fn connect(config: RestConfig) -> RestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RestDaoError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            api_key: config.api_key.map(Arc::from),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json");
        match self.api_key {
            Some(ref key) => builder
                .header("apikey", key.as_ref())
                .bearer_auth(key.as_ref()),
            None => builder,
        }
    }

    async fn select<T>(&self, path: &str, query: &[(&str, String)]) -> RestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .get(path)
            .query(query)
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(RestDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| RestDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn select_single<T>(&self, path: &str, query: &[(&str, String)]) -> RestResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self.select(path, query).await?.into_iter().next())
    }
}

impl GameStore for RestGameStore {
    fn fetch_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = [
                ("id", format!("eq.{game_id}")),
                ("select", "*".to_string()),
            ];
            store
                .select_single(GAMES, &query)
                .await
                .map_err(Into::into)
        })
    }

    fn fetch_sound_cues(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SoundCueRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = [
                ("id", format!("eq.{game_id}")),
                ("select", CUE_COLUMNS.to_string()),
            ];
            store
                .select_single(GAMES, &query)
                .await
                .map_err(Into::into)
        })
    }

    fn fetch_revealed_answers(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<IndexSet<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = [
                ("game_id", format!("eq.{game_id}")),
                ("select", "answer_id".to_string()),
            ];
            let rows = store
                .select::<RevealedAnswerRecord>(REVEALED_ANSWERS, &query)
                .await?;
            Ok(revealed_ids(rows))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let query = [("select", "id".to_string()), ("limit", "1".to_string())];
            store
                .select::<serde_json::Value>(GAMES, &query)
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
    }
}
