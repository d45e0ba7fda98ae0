use actix_web::{
    delete, get, post, put,
    web::{Json, Path, Query},
    HttpResponse,
};
use common::{
    context::Context,
    entities::ticket::{Comment, PublicTicket},
    error,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::{
    filter::TicketQuery,
    ticket::{parse_ticket_id, CreateComment, CreateTicket, TicketChange, TicketService, TicketStats},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Confirmation {
    pub message: String,
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
        ("status" = Option<String>, Query, description = "open, in-progress, pending, resolved or closed"),
        ("priority" = Option<String>, Query, description = "low, medium, high or critical"),
        ("category" = Option<String>, Query, description = "hardware, software, network, security or other"),
        ("createdByMe" = Option<String>, Query, description = "\"true\" to list only own tickets"),
        ("assignedToMe" = Option<String>, Query, description = "\"true\" to list only tickets assigned to me"),
    ),
    responses(
        (status = 200, body = [PublicTicket])
    )
)]
#[get("/api/tickets")]
pub async fn get_tickets(
    context: Context,
    Query(query): Query<TicketQuery>,
) -> error::Result<Json<Vec<PublicTicket>>> {
    Ok(Json(TicketService::new(context).list(query.into()).await?))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
    ),
    responses(
        (status = 200, body = TicketStats)
    )
)]
#[get("/api/tickets/stats")]
pub async fn get_ticket_stats(context: Context) -> error::Result<Json<TicketStats>> {
    Ok(Json(TicketService::new(context).stats().await?))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
        ("id" = String, Path, description = "Ticket id"),
    ),
    responses(
        (status = 200, body = PublicTicket),
        (status = 404, body = Confirmation)
    )
)]
#[get("/api/tickets/{id}")]
pub async fn get_ticket(context: Context, id: Path<String>) -> error::Result<Json<PublicTicket>> {
    Ok(Json(
        TicketService::new(context)
            .find(parse_ticket_id(&id)?)
            .await?,
    ))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
    ),
    request_body(
        content = CreateTicket
    ),
    responses(
        (status = 201, body = PublicTicket),
        (status = 400, body = Confirmation)
    )
)]
#[post("/api/tickets")]
pub async fn post_ticket(
    context: Context,
    Json(data): Json<CreateTicket>,
) -> error::Result<HttpResponse> {
    let ticket = TicketService::new(context).create(data).await?;
    Ok(HttpResponse::Created().json(ticket))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
        ("id" = String, Path, description = "Ticket id"),
    ),
    request_body(
        content = TicketChange
    ),
    responses(
        (status = 200, body = PublicTicket),
        (status = 404, body = Confirmation)
    )
)]
#[put("/api/tickets/{id}")]
pub async fn put_ticket(
    context: Context,
    id: Path<String>,
    Json(data): Json<TicketChange>,
) -> error::Result<Json<PublicTicket>> {
    Ok(Json(
        TicketService::new(context)
            .change(parse_ticket_id(&id)?, data)
            .await?,
    ))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
        ("id" = String, Path, description = "Ticket id"),
    ),
    request_body(
        content = CreateComment
    ),
    responses(
        (status = 201, body = Comment),
        (status = 400, body = Confirmation),
        (status = 404, body = Confirmation)
    )
)]
#[post("/api/tickets/{id}/comments")]
pub async fn post_comment(
    context: Context,
    id: Path<String>,
    Json(data): Json<CreateComment>,
) -> error::Result<HttpResponse> {
    let comment = TicketService::new(context)
        .add_comment(parse_ticket_id(&id)?, data)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
        ("id" = String, Path, description = "Ticket id"),
    ),
    responses(
        (status = 200, body = Confirmation),
        (status = 403, body = Confirmation),
        (status = 404, body = Confirmation)
    )
)]
#[delete("/api/tickets/{id}")]
pub async fn delete_ticket(context: Context, id: Path<String>) -> error::Result<Json<Confirmation>> {
    TicketService::new(context)
        .delete(parse_ticket_id(&id)?)
        .await?;
    Ok(Json(Confirmation {
        message: "Ticket deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{
        http::StatusCode,
        test::{self, init_service, TestRequest},
    };
    use chrono::Utc;
    use common::{
        auth::{Actor, Auth, JwtKeys},
        clock::ManualClock,
        entities::ticket::{TicketPriority, TicketStatus},
    };
    use serde_json::json;

    use super::*;
    use crate::{create_app, create_test_state};

    fn keys() -> JwtKeys {
        JwtKeys::from_secret(b"handler-secret")
    }

    fn bearer(actor: &Actor) -> (&'static str, String) {
        let token = Auth::User(actor.clone())
            .to_token(&keys(), Utc::now().timestamp() + 600)
            .unwrap();
        ("Authorization", format!("Bearer {}", token))
    }

    fn new_ticket(actor: &Actor, body: serde_json::Value) -> TestRequest {
        TestRequest::post()
            .uri("/api/tickets")
            .insert_header(bearer(actor))
            .set_json(body)
    }

    #[actix_web::test]
    async fn ticket_lifecycle_over_http() {
        let clock = Arc::new(ManualClock::new(1_000));
        let app = init_service(create_app(create_test_state(keys(), clock.clone()))).await;
        let u1 = Actor::new("u1", "alice");
        let u2 = Actor::new("u2", "bob");

        let req = new_ticket(
            &u1,
            json!({"title": "VPN down", "description": "Cannot connect", "category": "network"}),
        );
        let res = test::call_service(&app, req.to_request()).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let ticket: PublicTicket = test::read_body_json(res).await;
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Medium);
        assert_eq!(ticket.created_by.id, "u1");

        clock.advance(10);
        let req = TestRequest::put()
            .uri(&format!("/api/tickets/{}", ticket.id))
            .insert_header(bearer(&u2))
            .set_json(json!({"status": "resolved"}))
            .to_request();
        let updated: PublicTicket = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.status, TicketStatus::Resolved);
        assert_eq!(updated.title, "VPN down");
        assert!(updated.updated_at > updated.created_at);

        let req = TestRequest::delete()
            .uri(&format!("/api/tickets/{}", ticket.id))
            .insert_header(bearer(&u2))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::get()
            .uri(&format!("/api/tickets/{}", ticket.id))
            .insert_header(bearer(&u2))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let req = TestRequest::delete()
            .uri(&format!("/api/tickets/{}", ticket.id))
            .insert_header(bearer(&u1))
            .to_request();
        let confirmation: Confirmation = test::call_and_read_body_json(&app, req).await;
        assert_eq!(confirmation.message, "Ticket deleted successfully");

        let req = TestRequest::get()
            .uri(&format!("/api/tickets/{}", ticket.id))
            .insert_header(bearer(&u1))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn requests_without_identity_are_rejected() {
        let app = init_service(create_app(create_test_state(
            keys(),
            Arc::new(ManualClock::new(0)),
        )))
        .await;

        let req = TestRequest::get().uri("/api/tickets").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::get()
            .uri("/api/tickets")
            .insert_header(("Authorization", "Bearer not-a-token"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn malformed_bodies_are_bad_requests() {
        let app = init_service(create_app(create_test_state(
            keys(),
            Arc::new(ManualClock::new(0)),
        )))
        .await;
        let u1 = Actor::new("u1", "alice");

        for body in [
            json!({"title": "", "description": "d", "category": "network"}),
            json!({"title": "t", "description": "d"}),
            json!({"title": "t", "description": "d", "category": "printers"}),
            json!({"title": "t", "description": "d", "category": "other", "priority": "urgent"}),
        ] {
            let res = test::call_service(&app, new_ticket(&u1, body).to_request()).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }

        let req = new_ticket(&u1, json!({"title": "t", "description": "d", "category": "other"}));
        let ticket: PublicTicket = test::call_and_read_body_json(&app, req.to_request()).await;

        let req = TestRequest::put()
            .uri(&format!("/api/tickets/{}", ticket.id))
            .insert_header(bearer(&u1))
            .set_json(json!({"status": "done", "title": "changed"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::get()
            .uri(&format!("/api/tickets/{}", ticket.id))
            .insert_header(bearer(&u1))
            .to_request();
        let stored: PublicTicket = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stored.title, "t");

        let req = TestRequest::get()
            .uri("/api/tickets")
            .insert_header(bearer(&u1))
            .to_request();
        let all: Vec<PublicTicket> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all.len(), 1);
    }

    #[actix_web::test]
    async fn comments_and_listing() {
        let clock = Arc::new(ManualClock::new(0));
        let app = init_service(create_app(create_test_state(keys(), clock.clone()))).await;
        let u1 = Actor::new("u1", "alice");
        let u2 = Actor::new("u2", "bob");

        let req = new_ticket(&u1, json!({"title": "a", "description": "d", "category": "hardware"}));
        let first: PublicTicket = test::call_and_read_body_json(&app, req.to_request()).await;
        clock.advance(1);
        let req = new_ticket(
            &u2,
            json!({"title": "b", "description": "d", "category": "software", "priority": "high"}),
        );
        let second: PublicTicket = test::call_and_read_body_json(&app, req.to_request()).await;

        let req = TestRequest::post()
            .uri(&format!("/api/tickets/{}/comments", first.id))
            .insert_header(bearer(&u2))
            .set_json(json!({"text": "on it"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let comment: Comment = test::read_body_json(res).await;
        assert_eq!(comment.created_by.id, "u2");

        let req = TestRequest::post()
            .uri(&format!("/api/tickets/{}/comments", first.id))
            .insert_header(bearer(&u2))
            .set_json(json!({"text": ""}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/api/tickets/not-an-id/comments")
            .insert_header(bearer(&u2))
            .set_json(json!({"text": "hello"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::get()
            .uri("/api/tickets")
            .insert_header(bearer(&u1))
            .to_request();
        let all: Vec<PublicTicket> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

        let req = TestRequest::get()
            .uri("/api/tickets?createdByMe=true&status=")
            .insert_header(bearer(&u1))
            .to_request();
        let mine: Vec<PublicTicket> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first.id);
        assert_eq!(mine[0].comments.len(), 1);

        let req = TestRequest::get()
            .uri("/api/tickets?priority=high")
            .insert_header(bearer(&u1))
            .to_request();
        let urgent: Vec<PublicTicket> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(urgent.len(), 1);
        assert_eq!(urgent[0].id, second.id);

        let req = TestRequest::get()
            .uri("/api/tickets/stats")
            .insert_header(bearer(&u1))
            .to_request();
        let stats: TicketStats = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats.total_tickets, 2);
        assert_eq!(stats.open_tickets, 2);
        assert_eq!(stats.high_priority_tickets, 1);
        assert_eq!(stats.resolved_tickets, 0);
    }
}
