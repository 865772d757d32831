use rocket::{serde::json::Json, Route, State};

use crate::model::{
    awards::AwardCounts,
    roster::{Roster, RosterStatus},
};

pub fn routes() -> Vec<Route> {
    routes![awards, status]
}

/// How often each award appears across the visible actors.
#[get("/awards")]
async fn awards(roster: &State<Roster>) -> Json<AwardCounts> {
    Json(roster.award_counts().await)
}

#[get("/status")]
async fn status(roster: &State<Roster>) -> Json<RosterStatus> {
    Json(roster.status().await)
}
