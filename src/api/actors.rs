use rocket::{http::Status, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    actor::ActorId,
    api::actor::{ActorDetails, ActorList, ActorSummary},
    roster::Roster,
};

pub fn routes() -> Vec<Route> {
    routes![list, details, remove, reset]
}

#[get("/actors?<search>")]
async fn list(search: Option<&str>, roster: &State<Roster>) -> Json<ActorList> {
    let actors = match search {
        Some(query) => roster.search(query).await,
        None => roster.all().await,
    };
    Json(actors.into())
}

#[get("/actors/<actor_id>")]
async fn details(actor_id: ActorId, roster: &State<Roster>) -> Result<Json<ActorDetails>> {
    let actor = roster
        .get(actor_id)
        .await
        .ok_or_else(|| Error::not_found(format!("Actor with ID '{actor_id}'")))?;
    Ok(Json((&actor).into()))
}

#[delete("/actors/<actor_id>")]
async fn remove(actor_id: ActorId, roster: &State<Roster>) -> Result<Json<ActorSummary>> {
    let actor = roster
        .remove(actor_id)
        .await
        .ok_or_else(|| Error::not_found(format!("Actor with ID '{actor_id}'")))?;
    Ok(Json(actor.into()))
}

#[delete("/actors")]
async fn reset(roster: &State<Roster>) -> Status {
    roster.reset().await;
    Status::NoContent
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};

    use crate::model::{api::actor::ALIVE, roster::Cycle};

    use super::*;

    async fn fill(roster: &Roster) {
        while roster.run_cycle().await != Cycle::Exhausted {}
    }

    async fn fetch_list(client: &Client, uri: &str) -> ActorList {
        let response = client.get(uri).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let raw = response.into_string().await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn names(list: &ActorList) -> Vec<&str> {
        list.actors.iter().map(|a| a.name.as_str()).collect()
    }

    #[backend_test]
    async fn empty_roster(client: Client) {
        let list = fetch_list(&client, "/actors").await;
        assert_eq!(list.total, 0);
        assert!(list.actors.is_empty());
    }

    #[backend_test]
    async fn listing_is_sorted_by_name(client: Client, roster: Roster) {
        fill(&roster).await;

        let list = fetch_list(&client, "/actors").await;
        assert_eq!(list.total, 5);
        assert_eq!(
            names(&list),
            vec![
                "Amy Adams",
                "Denzel Washington",
                "meryl Streep",
                "Mia Farrow",
                "Zoe Saldana"
            ]
        );
    }

    #[backend_test]
    async fn search_ignores_case(client: Client, roster: Roster) {
        fill(&roster).await;

        let list = fetch_list(&client, "/actors?search=MI").await;
        assert_eq!(names(&list), vec!["Mia Farrow"]);
        assert_eq!(list.total, 1);

        let list = fetch_list(&client, "/actors?search=nobody").await;
        assert_eq!(list.total, 0);

        let list = fetch_list(&client, "/actors?search=").await;
        assert_eq!(list.total, 5);
    }

    #[backend_test]
    async fn details_of_a_visible_actor(client: Client, roster: Roster) {
        fill(&roster).await;

        let response = client
            .get(uri!(details(ActorId(4))))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let raw = response.into_string().await.unwrap();
        let details: ActorDetails = serde_json::from_str(&raw).unwrap();
        assert_eq!(details.name, "Denzel Washington");
        assert_eq!(details.awards, vec!["Oscar", "Golden Globe"]);
        assert_eq!(details.death_year, serde_json::json!(ALIVE));
    }

    #[backend_test]
    async fn details_of_an_unknown_actor(client: Client) {
        let response = client
            .get(uri!(details(ActorId(4))))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let response = client.get("/actors/not-a-number").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn removal_excludes_the_actor(client: Client, roster: Roster) {
        fill(&roster).await;

        let response = client.delete(uri!(remove(ActorId(3)))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let raw = response.into_string().await.unwrap();
        let removed: ActorSummary = serde_json::from_str(&raw).unwrap();
        assert_eq!(removed.name, "Mia Farrow");

        let list = fetch_list(&client, "/actors").await;
        assert_eq!(list.total, 4);
        assert!(!names(&list).contains(&"Mia Farrow"));
        assert_eq!(roster.excluded().await, vec![ActorId(3)]);

        // A second removal finds nothing.
        let response = client.delete(uri!(remove(ActorId(3)))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        // And the id is never fetched again.
        assert_eq!(roster.run_cycle().await, Cycle::Exhausted);
        assert_eq!(roster.get(ActorId(3)).await, None);
    }

    #[backend_test]
    async fn reset_clears_everything(client: Client, roster: Roster) {
        fill(&roster).await;
        roster.remove(ActorId(1)).await;

        let response = client.delete(uri!(reset)).dispatch().await;
        assert_eq!(Status::NoContent, response.status());

        let list = fetch_list(&client, "/actors").await;
        assert_eq!(list.total, 0);
        assert!(roster.excluded().await.is_empty());

        // Previously excluded ids come back.
        fill(&roster).await;
        assert!(roster.get(ActorId(1)).await.is_some());
    }
}
