use std::sync::Arc;

use actix_web::HttpServer;
use common::{
    auth::JwtKeys, clock::SystemClock, context::ServiceState, entities::ticket::Ticket,
    repository::mongo_repository::MongoRepository,
};
use tickets::{config::Config, create_app, repositories::ticket::TICKET_ORDER};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;

    let tickets: MongoRepository<Ticket> =
        MongoRepository::new(&config.mongo_uri, &config.database, &config.collection).await?;
    tickets.ensure_index(TICKET_ORDER).await?;

    let mut state = ServiceState::new(
        JwtKeys::from_secret(config.jwt_secret.as_bytes()),
        Arc::new(SystemClock),
    );
    state.insert::<Ticket>(Arc::new(tickets));
    let state = Arc::new(state);

    log::info!(
        "Ticket service listening on {}:{}",
        config.bind_address,
        config.port
    );

    HttpServer::new(move || create_app(state.clone()))
        .bind((config.bind_address.as_str(), config.port))?
        .run()
        .await?;

    Ok(())
}
