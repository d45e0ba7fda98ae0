use actix_web::{get, web::Json};
use common::{auth::Actor, context::Context, error};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub user: Option<Actor>,
}

#[utoipa::path(
    params(
        ("Authorization" = Option<String>, Header, description = "Bearer token"),
    ),
    responses(
        (status = 200, body = AuthStatus)
    )
)]
#[get("/api/auth/status")]
pub async fn auth_status(context: Context) -> error::Result<Json<AuthStatus>> {
    let user = context.auth().actor().cloned();
    Ok(Json(AuthStatus {
        authenticated: user.is_some(),
        user,
    }))
}
