use lw_core::error::CoreError;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::meta::EffectMeta;
use crate::params::ParamDescriptor;

/// Le contrat que chaque effet implémente. Un trait unique — les
/// variantes (centre-origine, stateful, LGP-sensible) sont des drapeaux
/// de métadonnées consultés par le scheduler, pas des sous-classes.
///
/// `render` ne doit pas allouer et doit tenir dans son budget de frame ;
/// l'état par effet vit dans la struct, pré-alloué à la construction.
pub trait Effect: Send {
    /// Static metadata: name, family, tags, scheduler flags.
    fn meta(&self) -> &'static EffectMeta;

    /// The static parameter table.
    fn param_descriptors(&self) -> &'static [ParamDescriptor];

    /// Current value of a parameter, `None` for unknown names.
    fn get_param(&self, name: &str) -> Option<TunableValue>;

    /// Set a parameter.
    ///
    /// # Errors
    /// `NotFound` for unknown names, `TypeMismatch`/`OutOfRange` when the
    /// value fails the descriptor.
    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError>;

    /// Compose one frame into `ctx.frame`.
    fn render(&mut self, ctx: &mut EffectContext);

    /// Drop transient state (selected away, presence reset).
    fn reset(&mut self) {}
}
