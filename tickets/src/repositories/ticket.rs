use std::time::Duration;

use common::{
    entities::ticket::Ticket,
    error::{self, AddCode, ErrorKind},
    repository::{Direction, RepositoryObject},
};
use mongodb::bson::{oid::ObjectId, Bson, Document};

/// Every listing is newest first.
pub const TICKET_ORDER: &[(&str, Direction)] = &[
    ("createdAt", Direction::Descending),
    ("_id", Direction::Descending),
];

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_millis(50);

pub struct TicketStore {
    tickets: RepositoryObject<Ticket>,
}

impl TicketStore {
    pub fn new(tickets: RepositoryObject<Ticket>) -> Self {
        Self { tickets }
    }

    pub async fn create(&self, ticket: &Ticket) -> error::Result<ObjectId> {
        if !self.tickets.insert(ticket).await? {
            return Err(anyhow::anyhow!("Ticket {} already exists", ticket.id).code(409));
        }
        Ok(ticket.id)
    }

    pub async fn get_by_id(&self, id: ObjectId) -> error::Result<Ticket> {
        self.tickets
            .find("_id", &Bson::ObjectId(id))
            .await?
            .ok_or_else(|| anyhow::anyhow!("Ticket not found").code(404))
    }

    pub async fn query(&self, filter: Document) -> error::Result<Vec<Ticket>> {
        self.tickets.find_many(filter, TICKET_ORDER).await
    }

    pub async fn count(&self, filter: Document) -> error::Result<u64> {
        self.tickets.count(filter).await
    }

    /// Re-reads and re-applies `mutator` when another writer got in between, so the stored
    /// ticket only ever moves from one whole version to the next.
    pub async fn update<F>(&self, id: ObjectId, mut mutator: F) -> error::Result<Ticket>
    where
        F: FnMut(&mut Ticket),
    {
        let mut attempt = 1;
        loop {
            let mut ticket = self.get_by_id(id).await?;
            mutator(&mut ticket);

            match self.tickets.update_one(&ticket).await {
                Err(err) if err.kind() == ErrorKind::Conflict && attempt < MAX_RETRIES => {
                    log::warn!("Ticket {} update attempt {} lost a race, retrying", id, attempt);
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    return Err(anyhow::anyhow!("Ticket not found").code(404));
                }
                result => return result,
            }
        }
    }

    pub async fn delete(&self, id: ObjectId) -> error::Result<Ticket> {
        self.tickets
            .delete("_id", &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Ticket not found").code(404))
    }
}
