use mongodb::error::Error as DbError;
use reqwest::Error as FetchError;
use rocket::{http::Status, response::Responder, serde::json::serde_json::Error as JsonError};
use thiserror::Error;

use crate::model::actor::ActorId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Catalog returned actor {received} when asked for {requested}")]
    Mismatch {
        requested: ActorId,
        received: ActorId,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Does this error mean the catalog has no such actor, as opposed to a
    /// failure that might not happen next time?
    pub fn is_permanent_absence(&self) -> bool {
        match self {
            Self::Fetch(err) => err.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Mismatch { .. } | Self::NotFound(_) => true,
            _ => false,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        Err(match self {
            Self::NotFound(_) => Status::NotFound,
            Self::Fetch(_) | Self::Mismatch { .. } => Status::BadGateway,
            Self::Db(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) => {
                Status::InternalServerError
            }
        })
    }
}
