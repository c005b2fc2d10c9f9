use super::source::introducer;
use crate::handlers::{Context, HandlerError, HandlerResult, ServerHandler};
use crate::message::RawMessage;
use crate::state::client::{Client, UIDLEN};
use std::collections::HashSet;
use tracing::info;

/// Handler for the UID command (User ID).
///
/// UID introduces a new user to the network. Two layouts are accepted:
///
/// - `UID <nick> <hops> <ts> <user> <host> <uid> <modes> :<realname>`
/// - `UID <nick> <hops> <ts> <modes> <user> <host> <ip> <uid> <account> :<realname>`
pub struct UidHandler;

impl ServerHandler for UidHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage) -> HandlerResult {
        let (from, server, server_hidden) = introducer(ctx, msg)?;
        let arg = |i: usize| msg.arg(i).ok_or(HandlerError::NeedMoreParams);

        let nick = arg(0)?;
        let timestamp_str = arg(2)?;
        timestamp_str
            .parse::<u64>()
            .map_err(|_| HandlerError::InvalidTimestamp(timestamp_str.to_string()))?;

        let (user, host, sockhost, uid, account, realname) = if msg.args().len() >= 10 {
            let account = arg(8)?;
            let account = (account != "*" && account != "0").then(|| account.to_string());
            (arg(4)?, arg(5)?, arg(6)?, arg(7)?, account, arg(9)?)
        } else {
            (arg(3)?, arg(4)?, "0", arg(5)?, None, arg(7)?)
        };

        if uid.is_empty() || uid.len() > UIDLEN || !uid.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(HandlerError::InvalidUid(uid.to_string()));
        }

        ctx.net.introduce_client(Client {
            uid: uid.to_string(),
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            sockhost: sockhost.to_string(),
            account,
            realname: realname.to_string(),
            server,
            server_hidden,
            away: None,
            caps: HashSet::new(),
            from,
        });

        info!(uid = %uid, nick = %nick, "Registered user via UID");
        Ok(())
    }
}
