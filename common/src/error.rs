use actix_web::{http::StatusCode, HttpResponse};
use derive_more::Display;
use serde_json::json;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Authorization,
    NotFound,
    Conflict,
    Store,
}

#[derive(Debug)]
pub struct ServiceError {
    pub code: u16,
    err: anyhow::Error,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            400 => ErrorKind::Validation,
            401 => ErrorKind::Unauthenticated,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            _ => ErrorKind::Store,
        }
    }

    pub fn message(&self) -> String {
        self.err.to_string()
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ServiceError({}): {}", self.code, self.err)
    }
}

impl actix_web::error::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let message = if status.is_server_error() {
            log::error!("{}", self);
            "Internal server error".to_string()
        } else {
            log::warn!("{}", self);
            self.err.to_string()
        };

        HttpResponse::build(status).json(json!({ "message": message }))
    }
}

impl<E: Into<anyhow::Error>> From<E> for ServiceError {
    fn from(err: E) -> ServiceError {
        ServiceError {
            code: 500,
            err: err.into(),
        }
    }
}

pub trait AddCode {
    fn code(self, code: u16) -> ServiceError;
}

impl AddCode for anyhow::Error {
    fn code(self, code: u16) -> ServiceError {
        ServiceError { code, err: self }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
