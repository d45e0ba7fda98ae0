pub mod config;
pub mod handlers;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware, web, App,
};
use common::{
    auth::{Actor, JwtKeys},
    clock::ClockObject,
    context::ServiceState,
    entities::ticket::{
        Attachment, Comment, PublicTicket, Ticket, TicketCategory, TicketPriority, TicketStatus,
        UserSnapshot,
    },
    error::AddCode,
    repository::test_repository::TestRepository,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub use handlers::auth::*;
pub use handlers::ticket::*;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "http",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::ticket::get_tickets,
        handlers::ticket::get_ticket_stats,
        handlers::ticket::get_ticket,
        handlers::ticket::post_ticket,
        handlers::ticket::put_ticket,
        handlers::ticket::post_comment,
        handlers::ticket::delete_ticket,
        handlers::auth::auth_status,
    ),
    components(schemas(
        PublicTicket,
        UserSnapshot,
        Comment,
        Attachment,
        TicketStatus,
        TicketPriority,
        TicketCategory,
        Actor,
        services::ticket::CreateTicket,
        services::ticket::TicketChange,
        services::ticket::CreateComment,
        services::ticket::TicketStats,
        handlers::auth::AuthStatus,
        handlers::ticket::Confirmation,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub fn create_app(
    state: Arc<ServiceState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let cors = Cors::permissive();

    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        anyhow::anyhow!("Invalid request body: {}", err)
            .code(400)
            .into()
    });

    #[allow(clippy::let_and_return)]
    let app = App::new()
        .wrap(cors)
        .wrap(middleware::Logger::default())
        .app_data(web::Data::new(state))
        .app_data(json_config)
        .service(get_tickets)
        .service(get_ticket_stats)
        .service(get_ticket)
        .service(post_ticket)
        .service(put_ticket)
        .service(post_comment)
        .service(delete_ticket)
        .service(auth_status)
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
        );
    app
}

/// State backed by an in-memory repository, for tests and local experiments.
pub fn create_test_state(keys: JwtKeys, clock: ClockObject) -> Arc<ServiceState> {
    let mut state = ServiceState::new(keys, clock);
    state.insert::<Ticket>(Arc::new(TestRepository::<Ticket>::new()));
    Arc::new(state)
}
