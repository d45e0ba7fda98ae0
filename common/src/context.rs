use std::sync::Arc;

use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use type_map::concurrent::TypeMap;

use crate::{
    auth::{Actor, Auth, JwtKeys},
    clock::ClockObject,
    error::{self, AddCode, ServiceError},
    repository::RepositoryObject,
};

pub struct ServiceState {
    pub repositories: TypeMap,
    pub keys: JwtKeys,
    pub clock: ClockObject,
}

impl ServiceState {
    pub fn new(keys: JwtKeys, clock: ClockObject) -> Self {
        Self {
            repositories: TypeMap::new(),
            keys,
            clock,
        }
    }

    pub fn insert<T: 'static>(&mut self, repository: RepositoryObject<T>) {
        self.repositories.insert(repository);
    }
}

#[derive(Clone)]
pub struct HandlerContext {
    pub user_auth: Auth,
}

#[derive(Clone)]
pub struct Context(pub Arc<ServiceState>, pub HandlerContext);

impl Context {
    pub fn new(state: Arc<ServiceState>, user_auth: Auth) -> Self {
        Self(state, HandlerContext { user_auth })
    }

    pub fn auth(&self) -> &Auth {
        &self.1.user_auth
    }

    /// The signed-in user, or 401.
    pub fn actor(&self) -> error::Result<&Actor> {
        self.auth()
            .actor()
            .ok_or_else(|| anyhow::anyhow!("Authentication required").code(401))
    }

    pub fn now(&self) -> i64 {
        self.0.clock.now()
    }

    pub fn try_get_repository<T: 'static>(&self) -> error::Result<RepositoryObject<T>> {
        self.0
            .repositories
            .get::<RepositoryObject<T>>()
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Repository for type {} not found",
                    std::any::type_name::<T>()
                )
                .code(500)
            })
    }
}

impl FromRequest for Context {
    type Error = ServiceError;

    type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        fn from_request_inner(req: &HttpRequest) -> error::Result<Context> {
            let Some(state) = req.app_data::<Data<Arc<ServiceState>>>() else {
                return Err(anyhow::anyhow!("No state provided".to_string()).into());
            };

            let auth = req
                .headers()
                .get("Authorization")
                .and_then(|x| x.to_str().ok())
                .and_then(|x| x.strip_prefix("Bearer "))
                .map(|token| Auth::from_token(token, &state.keys));

            let user_auth = match auth {
                Some(Ok(Some(res))) => {
                    log::debug!("Token parsed successfully");
                    res
                }
                Some(Ok(None)) => {
                    log::warn!("Token expired");
                    Auth::None
                }
                Some(Err(err)) => {
                    log::warn!("Error parsing token: {}", err);
                    Auth::None
                }
                None => Auth::None,
            };

            Ok(Context::new(Arc::clone(state), user_auth))
        }

        futures_util::future::ready(from_request_inner(req))
    }
}
