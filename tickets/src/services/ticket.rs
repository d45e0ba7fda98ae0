use common::{
    access_rules::{AccessRules, Delete, Edit, Read},
    context::Context,
    entities::ticket::{
        blank_as_none, Comment, PublicTicket, Ticket, TicketCategory, TicketPriority,
        TicketStatus, UserSnapshot,
    },
    error::{self, AddCode},
};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{repositories::ticket::TicketStore, services::filter::TicketFilter};

/// Resolved tickets count towards the dashboard summary for this long after their last change.
const RESOLVED_WINDOW_MICROS: i64 = 7 * 24 * 60 * 60 * 1_000_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicket {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<TicketCategory>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<TicketPriority>,
}

/// Partial update; absent or empty fields leave the ticket as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketChange {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<TicketPriority>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<TicketCategory>,
    #[serde(default)]
    pub assigned_to: Option<UserSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateComment {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total_tickets: u64,
    pub open_tickets: u64,
    pub high_priority_tickets: u64,
    pub resolved_tickets: u64,
}

pub fn parse_ticket_id(id: &str) -> error::Result<ObjectId> {
    id.parse()
        .map_err(|_| anyhow::anyhow!("Ticket not found").code(404))
}

// Every write moves `updatedAt` forward, even within one clock tick.
fn next_update(ticket: &Ticket, now: i64) -> i64 {
    now.max(ticket.updated_at + 1)
}

pub struct TicketService {
    context: Context,
}

impl TicketService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    fn store(&self) -> error::Result<TicketStore> {
        Ok(TicketStore::new(self.context.try_get_repository::<Ticket>()?))
    }

    pub async fn create(&self, ticket: CreateTicket) -> error::Result<PublicTicket> {
        let actor = self.context.actor()?;

        let (Some(title), Some(description), Some(category)) = (
            ticket.title.filter(|title| !title.is_empty()),
            ticket.description.filter(|description| !description.is_empty()),
            ticket.category,
        ) else {
            return Err(
                anyhow::anyhow!("Title, description, and category are required").code(400),
            );
        };

        let now = self.context.now();
        let ticket = Ticket {
            id: ObjectId::new(),
            title,
            description,
            status: TicketStatus::Open,
            priority: ticket.priority.unwrap_or_default(),
            category,
            created_by: actor.snapshot(),
            assigned_to: None,
            comments: Vec::new(),
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        };

        self.store()?.create(&ticket).await?;
        log::info!("Ticket {} created by {}", ticket.id, actor.id);

        Ok(ticket.publish())
    }

    pub async fn find(&self, id: ObjectId) -> error::Result<PublicTicket> {
        let auth = self.context.auth();
        self.context.actor()?;

        let ticket = self.store()?.get_by_id(id).await?;

        if !Read.get_access(auth, &ticket) {
            return Err(anyhow::anyhow!("User is not available to read this ticket").code(403));
        }

        Ok(ticket.publish())
    }

    pub async fn list(&self, filter: TicketFilter) -> error::Result<Vec<PublicTicket>> {
        let actor = self.context.actor()?;

        let tickets = self.store()?.query(filter.to_document(actor)).await?;

        Ok(tickets.into_iter().map(Ticket::publish).collect())
    }

    pub async fn change(&self, id: ObjectId, change: TicketChange) -> error::Result<PublicTicket> {
        let auth = self.context.auth();
        let actor = self.context.actor()?;

        if let Some(assignee) = &change.assigned_to {
            if assignee.id.is_empty() || assignee.username.is_empty() {
                return Err(anyhow::anyhow!("Assignee needs an id and a username").code(400));
            }
        }

        let title = change.title.filter(|title| !title.is_empty());
        let description = change.description.filter(|description| !description.is_empty());

        let store = self.store()?;

        if !Edit.get_access(auth, &store.get_by_id(id).await?) {
            return Err(anyhow::anyhow!("User is not available to change this ticket").code(403));
        }

        let now = self.context.now();
        let ticket = store
            .update(id, |ticket| {
                if let Some(title) = &title {
                    ticket.title = title.clone();
                }
                if let Some(description) = &description {
                    ticket.description = description.clone();
                }
                if let Some(status) = change.status {
                    ticket.status = status;
                }
                if let Some(priority) = change.priority {
                    ticket.priority = priority;
                }
                if let Some(category) = change.category {
                    ticket.category = category;
                }
                if let Some(assignee) = &change.assigned_to {
                    ticket.assigned_to = Some(assignee.clone());
                }
                ticket.updated_at = next_update(ticket, now);
            })
            .await?;

        log::info!("Ticket {} changed by {}", id, actor.id);

        Ok(ticket.publish())
    }

    pub async fn add_comment(&self, id: ObjectId, comment: CreateComment) -> error::Result<Comment> {
        let actor = self.context.actor()?;

        let Some(text) = comment.text.filter(|text| !text.is_empty()) else {
            return Err(anyhow::anyhow!("Comment text is required").code(400));
        };

        let comment = Comment {
            text,
            created_by: actor.snapshot(),
            created_at: self.context.now(),
        };

        self.store()?
            .update(id, |ticket| {
                ticket.comments.push(comment.clone());
                ticket.updated_at = next_update(ticket, comment.created_at);
            })
            .await?;

        Ok(comment)
    }

    pub async fn delete(&self, id: ObjectId) -> error::Result<PublicTicket> {
        let auth = self.context.auth();
        let actor = self.context.actor()?;

        let store = self.store()?;
        let ticket = store.get_by_id(id).await?;

        if !Delete.get_access(auth, &ticket) {
            return Err(
                anyhow::anyhow!("You are not authorized to delete this ticket").code(403),
            );
        }

        let ticket = store.delete(id).await?;
        log::info!("Ticket {} deleted by {}", id, actor.id);

        Ok(ticket.publish())
    }

    pub async fn stats(&self) -> error::Result<TicketStats> {
        self.context.actor()?;

        let store = self.store()?;
        let since = self.context.now() - RESOLVED_WINDOW_MICROS;

        let total_tickets = store.count(doc! {}).await?;
        let open_tickets = store.count(doc! {"status": TicketStatus::Open.as_str()}).await?;
        let high_priority_tickets = store
            .count(doc! {"priority": TicketPriority::High.as_str()})
            .await?
            + store
                .count(doc! {"priority": TicketPriority::Critical.as_str()})
                .await?;
        let resolved_tickets = store
            .query(doc! {"status": TicketStatus::Resolved.as_str()})
            .await?
            .iter()
            .filter(|ticket| ticket.updated_at > since)
            .count() as u64;

        Ok(TicketStats {
            total_tickets,
            open_tickets,
            high_priority_tickets,
            resolved_tickets,
        })
    }
}
