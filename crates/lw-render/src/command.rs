use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use lw_core::tunables::TunableValue;

/// Spécification de transition portée par un `SetEffect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionSpec {
    /// Cross-fade duration in milliseconds (0 = instant).
    pub duration_ms: u32,
    /// Easing curve index (see [`crate::transition::Curve`]).
    pub curve: u8,
}

/// Les commandes que le renderer draine en tête de chaque frame.
///
/// Une commande reçue pendant la frame N prend effet au début de la
/// frame N+1, jamais au milieu d'une frame.
#[derive(Clone, Debug)]
pub enum Command {
    /// Select an effect, optionally cross-fading.
    SetEffect {
        /// Target effect id.
        id: u8,
        /// Cross-fade, `None` for an instant switch.
        transition: Option<TransitionSpec>,
    },
    /// Select the active palette.
    SetPalette(u8),
    /// Set the global output brightness.
    SetBrightness(u8),
    /// Set one effect parameter.
    SetParam {
        /// Owning effect id.
        effect_id: u8,
        /// Parameter name.
        name: String,
        /// New value.
        value: TunableValue,
    },
    /// Ask housekeeping to re-scan the plugin directory.
    ReloadPlugins,
    /// One more LED-stream subscriber.
    StreamSubscribe,
    /// One LED-stream subscriber left.
    StreamUnsubscribe,
}

/// Producteur du bus. Clonable, un par source de commandes (API, watcher,
/// poller UI).
///
/// Politique de saturation : on jette le message le plus ANCIEN, compté
/// et logué — jamais la commande entrante. Le shutdown ne transite pas
/// par le bus (drapeau atomique séparé), il ne peut donc pas être jeté.
#[derive(Clone)]
pub struct CommandSender {
    tx: flume::Sender<Command>,
    rx: flume::Receiver<Command>,
    dropped: Arc<AtomicU64>,
}

impl CommandSender {
    /// Queue a command. Never blocks; on a full queue the oldest pending
    /// command is dropped to make room.
    pub fn send(&self, cmd: Command) {
        loop {
            match self.tx.try_send(cmd.clone()) {
                Ok(()) => return,
                Err(flume::TrySendError::Full(_)) => {
                    if self.rx.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        log::warn!("command queue full, oldest message dropped");
                    }
                }
                Err(flume::TrySendError::Disconnected(_)) => {
                    log::warn!("command bus consumer gone");
                    return;
                }
            }
        }
    }

    /// Commands dropped so far because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consommateur du bus : le renderer, et lui seul.
pub struct CommandBus {
    rx: flume::Receiver<Command>,
    dropped: Arc<AtomicU64>,
}

impl CommandBus {
    /// A bounded bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> (CommandSender, CommandBus) {
        let (tx, rx) = flume::bounded(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        (
            CommandSender {
                tx,
                rx: rx.clone(),
                dropped: Arc::clone(&dropped),
            },
            CommandBus { rx, dropped },
        )
    }

    /// Non-blocking drain of everything queued before this frame.
    pub fn drain(&self, out: &mut Vec<Command>) {
        out.clear();
        while let Ok(cmd) = self.rx.try_recv() {
            out.push(cmd);
        }
    }

    /// Commands dropped so far because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Le signal d'arrêt : hors bus, jamais jeté, visible des deux tâches.
///
/// # Example
/// ```
/// use lw_render::command::ShutdownFlag;
/// let flag = ShutdownFlag::new();
/// assert!(!flag.is_requested());
/// flag.request();
/// assert!(flag.is_requested());
/// ```
#[derive(Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// A new, unraised flag.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Raise the flag; tasks finish their current frame/hop then exit.
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The inner atomic, for tasks that take `Arc<AtomicBool>`.
    #[must_use]
    pub fn inner(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_per_producer() {
        let (tx, bus) = CommandBus::new(8);
        tx.send(Command::SetPalette(1));
        tx.send(Command::SetPalette(2));
        let mut out = Vec::new();
        bus.drain(&mut out);
        assert!(matches!(out[0], Command::SetPalette(1)));
        assert!(matches!(out[1], Command::SetPalette(2)));
    }

    #[test]
    fn full_queue_drops_oldest_not_newest() {
        let (tx, bus) = CommandBus::new(2);
        tx.send(Command::SetPalette(1));
        tx.send(Command::SetPalette(2));
        tx.send(Command::SetPalette(3)); // drops palette 1
        assert_eq!(tx.dropped(), 1);
        assert_eq!(bus.dropped(), 1);

        let mut out = Vec::new();
        bus.drain(&mut out);
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Command::SetPalette(2)));
        assert!(matches!(out[1], Command::SetPalette(3)));
    }

    #[test]
    fn drain_on_empty_bus_is_empty() {
        let (_tx, bus) = CommandBus::new(2);
        let mut out = vec![Command::SetPalette(9)];
        bus.drain(&mut out);
        assert!(out.is_empty());
    }
}
