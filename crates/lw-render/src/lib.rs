/// La tâche de rendu : scheduler de frames à période fixe, moteur de
/// transition, correction couleur sur copie de sortie, bus de commandes
/// et publication du flux LED.

pub mod command;
pub mod correction;
pub mod scheduler;
pub mod stats;
pub mod stream;
pub mod transition;

pub use command::{Command, CommandBus, CommandSender, ShutdownFlag, TransitionSpec};
pub use correction::{ColorCorrector, CorrectionParams};
pub use scheduler::{Renderer, RendererConfig, SharedRegistry};
pub use stats::{RenderStats, SharedStats};
pub use stream::{LedStreamPublisher, STREAM_FRAME_LEN, StreamFrame};
pub use transition::Curve;
