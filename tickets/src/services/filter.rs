use common::{
    auth::Actor,
    entities::ticket::{TicketCategory, TicketPriority, TicketStatus},
};
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

/// Raw listing parameters as they arrive in the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub created_by_me: Option<String>,
    pub assigned_to_me: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub created_by_me: bool,
    pub assigned_to_me: bool,
}

// Values outside the vocabulary constrain nothing rather than matching nothing.
fn known<T: std::str::FromStr>(field: &str, raw: Option<String>) -> Option<T> {
    let raw = raw.filter(|raw| !raw.is_empty())?;
    let parsed = raw.parse().ok();
    if parsed.is_none() {
        log::debug!("Ignoring unknown {} filter '{}'", field, raw);
    }
    parsed
}

impl From<TicketQuery> for TicketFilter {
    fn from(query: TicketQuery) -> Self {
        Self {
            status: known("status", query.status),
            priority: known("priority", query.priority),
            category: known("category", query.category),
            created_by_me: query.created_by_me.as_deref() == Some("true"),
            assigned_to_me: query.assigned_to_me.as_deref() == Some("true"),
        }
    }
}

impl TicketFilter {
    /// AND of every constraint that was given; an empty filter matches every ticket.
    pub fn to_document(&self, actor: &Actor) -> Document {
        let mut filter = doc! {};

        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(priority) = self.priority {
            filter.insert("priority", priority.as_str());
        }
        if let Some(category) = self.category {
            filter.insert("category", category.as_str());
        }
        if self.created_by_me {
            filter.insert("createdBy.id", actor.id.as_str());
        }
        if self.assigned_to_me {
            filter.insert("assignedTo.id", actor.id.as_str());
        }

        filter
    }
}
