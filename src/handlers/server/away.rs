use super::source::client_source;
use crate::handlers::{Context, HandlerError, HandlerResult, ServerHandler};
use crate::message::RawMessage;

/// Handler for a remote AWAY (`:<uid> AWAY [:<message>]`).
///
/// An empty or missing message marks the client as back.
pub struct AwayHandler;

impl ServerHandler for AwayHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage) -> HandlerResult {
        let uid = client_source(ctx, msg)?.uid.clone();
        let away = msg.arg(0).filter(|m| !m.is_empty()).map(str::to_string);

        let client = ctx
            .net
            .clients
            .get_mut(&uid)
            .ok_or(HandlerError::NoSuchClient(uid))?;
        client.away = away;
        Ok(())
    }
}
