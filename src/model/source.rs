use std::time::Duration;

use log::debug;
use reqwest::Client;

use crate::error::{Error, Result};

use super::actor::{Actor, ActorId};

/// Where actors come from.
#[rocket::async_trait]
pub trait ActorSource: Send + Sync {
    /// Fetch the actor with the given id.
    async fn actor(&self, id: ActorId) -> Result<Actor>;

    /// Fetch the whole catalog in one request.
    async fn catalog(&self) -> Result<Vec<Actor>>;
}

/// An [`ActorSource`] backed by a REST endpoint serving `GET <base>` and
/// `GET <base>/<id>`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    /// Requests that take longer than `timeout` are abandoned.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[rocket::async_trait]
impl ActorSource for HttpSource {
    async fn actor(&self, id: ActorId) -> Result<Actor> {
        let url = format!("{}/{id}", self.base_url);
        debug!("Requesting {url}");
        let actor = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Actor>()
            .await?;
        if actor.id != id {
            return Err(Error::Mismatch {
                requested: id,
                received: actor.id,
            });
        }
        Ok(actor)
    }

    async fn catalog(&self) -> Result<Vec<Actor>> {
        debug!("Requesting {}", self.base_url);
        let actors = self
            .client
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Actor>>()
            .await?;
        Ok(actors)
    }
}

#[cfg(test)]
pub use fixture::FixtureSource;
