use super::source::client_source;
use crate::handlers::{Context, HandlerError, HandlerResult, ServerHandler};
use crate::message::RawMessage;
use tracing::debug;

/// Handler for a remote NICK change (`:<uid> NICK <newnick> <ts>`).
///
/// The old identity is kept in WHOWAS so commands chasing it still land.
pub struct NickHandler;

impl ServerHandler for NickHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage) -> HandlerResult {
        let new_nick = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let (uid, old_nick) = {
            let client = client_source(ctx, msg)?;
            (client.uid.clone(), client.nick.clone())
        };

        ctx.net.nick_change(&uid, new_nick, ctx.now);
        debug!(uid = %uid, old = %old_nick, new = %new_nick, "Nick change");
        Ok(())
    }
}
