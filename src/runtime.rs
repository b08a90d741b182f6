//! Wall-clock driver for a [`PageHost`].

use rand::Rng;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::host::PageHost;
use crate::model::{Command, TypingState};
use crate::settings::SettingsStore;

fn is_settled<R: Rng, S: SettingsStore>(host: &PageHost<R, S>) -> bool {
    host.overlay().state() != TypingState::WaitingToStart
        && host.controller().state() != TypingState::Typing
}

/// Run `host` in real time until neither a countdown nor a run is in
/// progress. `commands` are posted on the page channel as they arrive, the
/// way overlay buttons would post them.
pub async fn drive<R: Rng, S: SettingsStore>(
    host: &mut PageHost<R, S>,
    mut commands: UnboundedReceiver<Command>,
) -> TypingState {
    let origin = Instant::now() - host.now();
    let mut commands_open = true;

    loop {
        host.advance_to(origin.elapsed());
        if is_settled(host) {
            break;
        }

        let deadline = host.next_deadline().map(|d| origin + d);
        tokio::select! {
            command = commands.recv(), if commands_open => match command {
                Some(command) => {
                    debug!(?command, "external command");
                    host.channel().poster().post(command);
                }
                None => commands_open = false,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {}
            else => break,
        }
    }

    host.controller().state()
}
