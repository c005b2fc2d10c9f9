use super::source::client_source;
use crate::handlers::{Context, HandlerResult, ServerHandler};
use crate::message::RawMessage;
use tracing::debug;

/// Handler for a remote QUIT (`:<uid> QUIT :<reason>`).
pub struct QuitHandler;

impl ServerHandler for QuitHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage) -> HandlerResult {
        let uid = client_source(ctx, msg)?.uid.clone();
        let reason = msg.arg(0).unwrap_or("");

        if let Some(client) = ctx.net.client_exit(&uid, ctx.now) {
            debug!(uid = %uid, nick = %client.nick, reason = %reason, "Client quit");
        }
        Ok(())
    }
}
