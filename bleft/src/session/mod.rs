//! Requester and responder state machines, one pair per command
// (c) 2026 Ross Younger

mod handler;

mod delete;
mod listdir;
mod mkdir;
mod read;
mod rename;
mod write;


pub(crate) use handler::{CommandHandler, HandlerContext, RequestContext};
pub(crate) use {
    delete::DeleteHandler,
    listdir::ListdirHandler,
    mkdir::{MkdirArgs, MkdirHandler},
    read::{ReadArgs, ReadHandler},
    rename::{MoveArgs, MoveHandler},
    write::{WriteArgs, WriteHandler},
};
