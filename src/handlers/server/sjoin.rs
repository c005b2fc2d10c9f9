use super::source::server_source;
use crate::handlers::{Context, HandlerError, HandlerResult, ServerHandler};
use crate::message::RawMessage;
use crate::state::mode::Mode;
use crate::sync::{Sjoin, process_sjoin};
use crate::telemetry::spans;

/// Handler for the SJOIN command.
///
/// SJOIN carries a channel's creation time, modes and members during bursts
/// and netjoins. Timestamp conflicts are settled by [`process_sjoin`].
pub struct SjoinHandler;

impl ServerHandler for SjoinHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage) -> HandlerResult {
        // Format: SJOIN <ts> <channel> <modes> [args...] :<members>
        let source = server_source(ctx, msg)?;
        let sjoin = parse_sjoin(msg.args())?;

        let _span = spans::sjoin(&sjoin.channel, &source.sid).entered();
        process_sjoin(ctx.net, ctx.out, &source, &sjoin, ctx.now)?;
        Ok(())
    }
}

/// Parse an SJOIN parameter vector.
///
/// `k` and `l` in the mode string each take the next parameter; the
/// parameter after those is the member list.
pub fn parse_sjoin(args: &[String]) -> Result<Sjoin, HandlerError> {
    if args.len() < 4 {
        return Err(HandlerError::NeedMoreParams);
    }
    let ts_str = &args[0];
    let ts = ts_str
        .parse::<u64>()
        .map_err(|_| HandlerError::InvalidTimestamp(ts_str.clone()))?;
    let (mode, used) = Mode::parse(&args[2], &args[3..])?;
    let members = args.get(3 + used).ok_or(HandlerError::NeedMoreParams)?;

    Ok(Sjoin {
        ts,
        channel: args[1].clone(),
        mode_letters: args[2].clone(),
        mode,
        members: members.clone(),
    })
}
