//! Channel burst generation for a new server link.
//!
//! When a link comes up each side sends one SJOIN per channel carrying its
//! creation time, full mode and every member not reached through the new
//! link itself. Long member lists are split the same way relayed SJOINs are.

use super::frame::SjoinFramer;
use crate::state::client::LinkId;
use crate::state::network::Network;
use tracing::warn;

/// SJOIN lines describing every channel, for the server on `link`.
pub fn generate_burst(net: &Network, link: LinkId) -> Vec<String> {
    let mut channels: Vec<_> = net.channels.iter().collect();
    channels.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = Vec::new();
    for channel in channels {
        let (modes, params) = channel.mode.to_burst();
        let mut framer =
            match SjoinFramer::new(&net.me.sid, channel.created, &channel.name, &modes, &params) {
                Ok(framer) => framer,
                Err(err) => {
                    warn!(channel = %channel.name, error = %err, "Skipping channel in burst");
                    continue;
                }
            };

        let mut any = false;
        for (uid, status) in &channel.members {
            if !net.clients.get(uid).is_some_and(|c| c.from != link) {
                continue;
            }
            match framer.push_member(*status, uid) {
                Ok(()) => any = true,
                Err(err) => warn!(channel = %channel.name, error = %err, "Member left out of burst"),
            }
        }
        if any {
            lines.extend(framer.finish());
        }
    }
    lines
}
