use jsonwebtoken::{decode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entities::ticket::UserSnapshot,
    error::{self, AddCode},
};

/// Identity resolved from the bearer token. Issued by the authentication provider, never by
/// this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar_url: None,
        }
    }

    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    User(Actor),
    None,
}

impl Auth {
    pub fn actor(&self) -> Option<&Actor> {
        match self {
            Auth::User(actor) => Some(actor),
            Auth::None => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.actor().map(|actor| actor.id.as_str())
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    user_id: String,
    login: String,
    avatar_url: Option<String>,
    exp: i64,
}

impl Auth {
    /// `Ok(None)` means the token was well formed but has expired.
    pub fn from_token(token: &str, keys: &JwtKeys) -> error::Result<Option<Self>> {
        match decode::<Claims>(token, &keys.decoding, &Validation::new(Algorithm::HS512)) {
            Ok(data) => {
                let claims = data.claims;
                Ok(Some(Auth::User(Actor {
                    id: claims.user_id,
                    username: claims.login,
                    avatar_url: claims.avatar_url,
                })))
            }
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Ok(None),
                _ => Err(anyhow::anyhow!("Invalid token: {}", err).code(401)),
            },
        }
    }

    pub fn to_token(&self, keys: &JwtKeys, exp: i64) -> error::Result<String> {
        let Auth::User(actor) = self else {
            return Err(anyhow::anyhow!("Cannot create token for Auth::None").code(500));
        };

        let header = Header {
            alg: Algorithm::HS512,
            ..Default::default()
        };

        let claims = Claims {
            user_id: actor.id.clone(),
            login: actor.username.clone(),
            avatar_url: actor.avatar_url.clone(),
            exp,
        };

        jsonwebtoken::encode(&header, &claims, &keys.encoding)
            .map_err(|_| anyhow::anyhow!("Failed to encode token").code(500))
    }
}
