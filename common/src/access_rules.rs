use crate::{auth::Auth, entities::ticket::Ticket};

pub trait AccessRules<Object, Subject> {
    fn get_access(&self, object: Object, subject: Subject) -> bool;
}

pub struct Read;

pub struct Edit;

pub struct Delete;

impl<'a, 'b> AccessRules<&'a Auth, &'b Ticket> for Read {
    fn get_access(&self, auth: &'a Auth, _ticket: &'b Ticket) -> bool {
        matches!(auth, Auth::User(_))
    }
}

// Any signed-in user may change any ticket.
impl<'a, 'b> AccessRules<&'a Auth, &'b Ticket> for Edit {
    fn get_access(&self, auth: &'a Auth, _ticket: &'b Ticket) -> bool {
        matches!(auth, Auth::User(_))
    }
}

impl<'a, 'b> AccessRules<&'a Auth, &'b Ticket> for Delete {
    fn get_access(&self, auth: &'a Auth, ticket: &'b Ticket) -> bool {
        match auth {
            Auth::User(actor) => ticket.is_created_by(&actor.id),
            Auth::None => false,
        }
    }
}
