use rocket::Route;

pub mod actors;
pub mod roster;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(actors::routes());
    routes.extend(roster::routes());
    routes
}
