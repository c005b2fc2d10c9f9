//! Source resolution for server commands.

use crate::handlers::{Context, HandlerError};
use crate::message::RawMessage;
use crate::state::client::{Client, LinkId, ServerLink};

/// The server a message claims to come from.
pub fn server_source(ctx: &Context<'_>, msg: &RawMessage) -> Result<ServerLink, HandlerError> {
    let prefix = msg.prefix.as_deref().ok_or(HandlerError::NeedMoreParams)?;
    if let Some(server) = ctx.net.servers.find(prefix) {
        return Ok(server.clone());
    }
    if ctx.net.clients.find_person(prefix).is_some() {
        return Err(HandlerError::NotAServer(prefix.to_string()));
    }
    Err(HandlerError::UnknownSource(prefix.to_string()))
}

/// The client a message comes from.
pub fn client_source<'a>(ctx: &'a Context<'_>, msg: &RawMessage) -> Result<&'a Client, HandlerError> {
    let prefix = msg.prefix.as_deref().ok_or(HandlerError::NeedMoreParams)?;
    ctx.net
        .clients
        .find_person(prefix)
        .ok_or_else(|| HandlerError::NoSuchClient(prefix.to_string()))
}

/// Link and name of the server introducing a client. Our own SID means a
/// local client.
pub fn introducer(ctx: &Context<'_>, msg: &RawMessage) -> Result<(LinkId, String, bool), HandlerError> {
    let prefix = msg.prefix.as_deref().ok_or(HandlerError::NeedMoreParams)?;
    if prefix == ctx.net.me.sid || prefix == ctx.net.me.name {
        return Ok((LinkId::LOCAL, ctx.net.me.name.clone(), false));
    }
    let server = server_source(ctx, msg)?;
    Ok((server.link, server.name, server.hidden))
}
