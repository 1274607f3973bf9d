/// Le contrat d'effet, les descripteurs de paramètres, le registre
/// builtin (128 slots, ids par ordre d'enregistrement) et les effets
/// compilés en dur.
///
/// Aucun chargement dynamique : les plugins ne font que curer et
/// paramétrer l'ensemble enregistré ici.

pub mod context;
pub mod effect;
pub mod effects;
pub mod meta;
pub mod params;
pub mod registry;

pub use context::EffectContext;
pub use effect::Effect;
pub use meta::{EffectFamily, EffectMeta};
pub use params::ParamDescriptor;
pub use registry::{EffectRegistry, MAX_EFFECTS};
