use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Valeur typée d'un tunable. Quatre kinds, fermés.
///
/// # Example
/// ```
/// use lw_core::tunables::TunableValue;
/// let v = TunableValue::F32(0.5);
/// assert_eq!(v.kind_name(), "f32");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TunableValue {
    /// Boolean flag.
    Bool(bool),
    /// Unsigned byte.
    U8(u8),
    /// Signed 32-bit integer.
    I32(i32),
    /// 32-bit float.
    F32(f32),
}

impl TunableValue {
    /// Kind name for error reporting ("bool", "u8", "i32", "f32").
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            TunableValue::Bool(_) => "bool",
            TunableValue::U8(_) => "u8",
            TunableValue::I32(_) => "i32",
            TunableValue::F32(_) => "f32",
        }
    }

    /// Numeric view for range checks. Bools have no numeric view.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TunableValue::Bool(_) => None,
            TunableValue::U8(v) => Some(f64::from(*v)),
            TunableValue::I32(v) => Some(f64::from(*v)),
            TunableValue::F32(v) => Some(f64::from(*v)),
        }
    }
}

impl From<bool> for TunableValue {
    fn from(v: bool) -> Self {
        TunableValue::Bool(v)
    }
}
impl From<u8> for TunableValue {
    fn from(v: u8) -> Self {
        TunableValue::U8(v)
    }
}
impl From<i32> for TunableValue {
    fn from(v: i32) -> Self {
        TunableValue::I32(v)
    }
}
impl From<f32> for TunableValue {
    fn from(v: f32) -> Self {
        TunableValue::F32(v)
    }
}

/// Typed extraction from a [`TunableValue`], used by [`TunableStore::get`].
pub trait FromTunable: Sized {
    /// Extract the value if the kind matches.
    fn from_value(v: TunableValue) -> Option<Self>;
}

impl FromTunable for bool {
    fn from_value(v: TunableValue) -> Option<Self> {
        match v {
            TunableValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}
impl FromTunable for u8 {
    fn from_value(v: TunableValue) -> Option<Self> {
        match v {
            TunableValue::U8(b) => Some(b),
            _ => None,
        }
    }
}
impl FromTunable for i32 {
    fn from_value(v: TunableValue) -> Option<Self> {
        match v {
            TunableValue::I32(b) => Some(b),
            _ => None,
        }
    }
}
impl FromTunable for f32 {
    fn from_value(v: TunableValue) -> Option<Self> {
        match v {
            TunableValue::F32(b) => Some(b),
            _ => None,
        }
    }
}

/// Descripteur d'un tunable : nom stable ASCII (≤ 40 octets), kind, bornes,
/// groupe et drapeau de persistance.
#[derive(Clone, Debug)]
pub struct TunableDesc {
    /// Stable ASCII name, ≤ 40 bytes.
    pub name: &'static str,
    /// Logical group ("audio", "render", "correction", ...).
    pub group: &'static str,
    /// Default value; its kind is the tunable's kind.
    pub default: TunableValue,
    /// Optional lower bound (numeric kinds only).
    pub min: Option<TunableValue>,
    /// Optional upper bound (numeric kinds only).
    pub max: Option<TunableValue>,
    /// Whether the value survives reboots.
    pub persistent: bool,
}

/// One persisted record. Kind is implied by the value tag.
#[derive(Serialize, Deserialize)]
struct PersistRecord {
    group: String,
    name: String,
    value: TunableValue,
}

/// Persisted batch: epoch-tagged so a firmware change can invalidate
/// records whose descriptors moved underneath them.
#[derive(Serialize, Deserialize)]
struct PersistFile {
    epoch: u32,
    records: Vec<PersistRecord>,
}

struct Inner {
    descs: Vec<TunableDesc>,
    values: Vec<TunableValue>,
    index: HashMap<&'static str, usize>,
    dirty: bool,
    last_set: Option<Instant>,
}

/// Store clé→valeur typé, durable, à écriture différée.
///
/// Les écritures vers les tunables persistants sont coalescées : rien ne
/// part sur le flash avant `debounce` de calme, puis tout part en un seul
/// batch transactionnel (fichier temporaire + rename).
///
/// # Example
/// ```
/// use lw_core::tunables::{TunableDesc, TunableStore, TunableValue};
/// let store = TunableStore::new(None, 1);
/// store.register(TunableDesc {
///     name: "render.brightness",
///     group: "render",
///     default: TunableValue::U8(200),
///     min: Some(TunableValue::U8(0)),
///     max: Some(TunableValue::U8(255)),
///     persistent: true,
/// }).unwrap();
/// assert_eq!(store.get::<u8>("render.brightness"), Some(200));
/// store.set("render.brightness", TunableValue::U8(64)).unwrap();
/// assert_eq!(store.get::<u8>("render.brightness"), Some(64));
/// ```
pub struct TunableStore {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
    epoch: u32,
}

impl TunableStore {
    /// Create an empty store. `path = None` disables persistence
    /// (host test builds); `epoch` is the firmware epoch stamped into
    /// the persisted batch.
    #[must_use]
    pub fn new(path: Option<PathBuf>, epoch: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                descs: Vec::new(),
                values: Vec::new(),
                index: HashMap::new(),
                dirty: false,
                last_set: None,
            }),
            path,
            epoch,
        }
    }

    /// Register a tunable. Call order defines enumeration order.
    ///
    /// # Errors
    /// Fails on duplicate name, non-ASCII or over-long name, or bounds
    /// whose kind differs from the default's.
    pub fn register(&self, desc: TunableDesc) -> Result<(), CoreError> {
        if desc.name.len() > 40 || !desc.name.is_ascii() {
            return Err(CoreError::InvalidManifest(format!(
                "tunable name '{}' must be ASCII and at most 40 bytes",
                desc.name
            )));
        }
        for bound in [&desc.min, &desc.max].into_iter().flatten() {
            if bound.kind_name() != desc.default.kind_name() {
                return Err(CoreError::TypeMismatch {
                    name: desc.name.to_string(),
                    expected: desc.default.kind_name(),
                    got: bound.kind_name(),
                });
            }
        }
        let mut inner = self.lock();
        if inner.index.contains_key(desc.name) {
            return Err(CoreError::InvalidManifest(format!(
                "duplicate tunable '{}'",
                desc.name
            )));
        }
        let slot = inner.descs.len();
        inner.index.insert(desc.name, slot);
        inner.values.push(desc.default);
        inner.descs.push(desc);
        Ok(())
    }

    /// Typed read. `None` when the name is unknown or the kind differs.
    #[must_use]
    pub fn get<T: FromTunable>(&self, name: &str) -> Option<T> {
        let inner = self.lock();
        let slot = *inner.index.get(name)?;
        T::from_value(inner.values[slot])
    }

    /// Raw read.
    #[must_use]
    pub fn get_value(&self, name: &str) -> Option<TunableValue> {
        let inner = self.lock();
        inner.index.get(name).map(|&slot| inner.values[slot])
    }

    /// Typed write. Kind and range are enforced against the descriptor.
    /// Writing the current value back is a no-op and does not mark the
    /// store dirty (no persisted write will be issued).
    ///
    /// # Errors
    /// `NotFound`, `TypeMismatch` or `OutOfRange`.
    pub fn set(&self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let mut inner = self.lock();
        let slot = *inner
            .index
            .get(name)
            .ok_or_else(|| CoreError::not_found(format!("tunable '{name}'")))?;
        let desc = &inner.descs[slot];
        if value.kind_name() != desc.default.kind_name() {
            return Err(CoreError::TypeMismatch {
                name: name.to_string(),
                expected: desc.default.kind_name(),
                got: value.kind_name(),
            });
        }
        if let Some(v) = value.as_f64() {
            let min = desc.min.as_ref().and_then(TunableValue::as_f64);
            let max = desc.max.as_ref().and_then(TunableValue::as_f64);
            if min.is_some_and(|m| v < m) || max.is_some_and(|m| v > m) {
                return Err(CoreError::OutOfRange {
                    name: name.to_string(),
                    value: format!("{v}"),
                    min: min.map_or_else(|| "-inf".into(), |m| format!("{m}")),
                    max: max.map_or_else(|| "+inf".into(), |m| format!("{m}")),
                });
            }
        }
        if inner.values[slot] == value {
            return Ok(());
        }
        let persistent = inner.descs[slot].persistent;
        inner.values[slot] = value;
        if persistent {
            inner.dirty = true;
            inner.last_set = Some(Instant::now());
        }
        Ok(())
    }

    /// Snapshot of all descriptors and current values, in insertion order.
    #[must_use]
    pub fn enumerate(&self) -> Vec<(TunableDesc, TunableValue)> {
        let inner = self.lock();
        inner
            .descs
            .iter()
            .cloned()
            .zip(inner.values.iter().copied())
            .collect()
    }

    /// Load persisted records over the registered defaults.
    ///
    /// Records whose name is unknown, whose kind no longer matches the
    /// descriptor, or whose value left the declared range are discarded
    /// with a warning — the store never ends up internally inconsistent.
    pub fn load(&self) {
        let Some(path) = &self.path else { return };
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => return, // first boot: nothing persisted yet
        };
        let file: PersistFile = match bincode::deserialize(&bytes) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("tunable store unreadable ({e}), keeping defaults");
                return;
            }
        };
        if file.epoch != self.epoch {
            log::info!(
                "tunable store epoch {} -> {}, revalidating records",
                file.epoch,
                self.epoch
            );
        }
        let mut applied = 0usize;
        for rec in file.records {
            match self.set(&rec.name, rec.value) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("discarding persisted tunable '{}': {e}", rec.name),
            }
        }
        // Loading must not schedule an immediate write-back.
        let mut inner = self.lock();
        inner.dirty = false;
        inner.last_set = None;
        log::info!("tunable store loaded, {applied} records applied");
    }

    /// Flush the persistent set if dirty and quiescent for at least
    /// `debounce`. Called from the housekeeping task.
    pub fn flush_if_due(&self, debounce: Duration) {
        let due = {
            let inner = self.lock();
            inner.dirty && inner.last_set.is_some_and(|t| t.elapsed() >= debounce)
        };
        if due {
            self.flush_now();
        }
    }

    /// Unconditionally flush the persistent set as one transactional batch.
    pub fn flush_now(&self) {
        let Some(path) = &self.path else {
            let mut inner = self.lock();
            inner.dirty = false;
            return;
        };
        let file = {
            let inner = self.lock();
            PersistFile {
                epoch: self.epoch,
                records: inner
                    .descs
                    .iter()
                    .zip(inner.values.iter())
                    .filter(|(d, _)| d.persistent)
                    .map(|(d, v)| PersistRecord {
                        group: d.group.to_string(),
                        name: d.name.to_string(),
                        value: *v,
                    })
                    .collect(),
            }
        };
        let bytes = match bincode::serialize(&file) {
            Ok(b) => b,
            Err(e) => {
                log::error!("tunable serialize failed: {e}");
                return;
            }
        };
        // Batch-or-nothing: temp file in the same directory, then rename.
        let tmp = path.with_extension("tmp");
        let result = std::fs::write(&tmp, &bytes).and_then(|()| std::fs::rename(&tmp, path));
        match result {
            Ok(()) => {
                let mut inner = self.lock();
                inner.dirty = false;
                log::debug!("tunable store flushed ({} bytes)", bytes.len());
            }
            Err(e) => log::error!("tunable flush failed: {e}"),
        }
    }

    /// Whether a flush is pending.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicking writer; values are plain Copy
        // data so the map is still structurally sound.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_desc(name: &'static str, default: f32, min: f32, max: f32) -> TunableDesc {
        TunableDesc {
            name,
            group: "test",
            default: TunableValue::F32(default),
            min: Some(TunableValue::F32(min)),
            max: Some(TunableValue::F32(max)),
            persistent: true,
        }
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let store = TunableStore::new(None, 1);
        store.register(f32_desc("a.gain", 0.5, 0.0, 1.0)).unwrap();
        let err = store.set("a.gain", TunableValue::Bool(true)).unwrap_err();
        assert_eq!(err.code(), "TypeMismatch");
    }

    #[test]
    fn out_of_range_is_rejected_one_ulp_above_max() {
        let store = TunableStore::new(None, 1);
        store.register(f32_desc("a.gain", 0.5, 0.0, 1.0)).unwrap();
        let above = f32::from_bits(1.0f32.to_bits() + 1);
        let err = store.set("a.gain", TunableValue::F32(above)).unwrap_err();
        assert_eq!(err.code(), "OutOfRange");
        assert!(store.set("a.gain", TunableValue::F32(1.0)).is_ok());
    }

    #[test]
    fn set_same_value_does_not_dirty() {
        let store = TunableStore::new(None, 1);
        store.register(f32_desc("a.gain", 0.5, 0.0, 1.0)).unwrap();
        store.set("a.gain", TunableValue::F32(0.5)).unwrap();
        assert!(!store.is_dirty());
        store.set("a.gain", TunableValue::F32(0.7)).unwrap();
        assert!(store.is_dirty());
    }

    #[test]
    fn enumeration_is_insertion_order() {
        let store = TunableStore::new(None, 1);
        store.register(f32_desc("z.last", 0.0, 0.0, 1.0)).unwrap();
        store.register(f32_desc("a.first", 0.0, 0.0, 1.0)).unwrap();
        let names: Vec<_> = store.enumerate().iter().map(|(d, _)| d.name).collect();
        assert_eq!(names, vec!["z.last", "a.first"]);
    }

    #[test]
    fn persist_roundtrip_survives_reboot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunables.bin");

        let store = TunableStore::new(Some(path.clone()), 3);
        store.register(f32_desc("a.gain", 0.5, 0.0, 1.0)).unwrap();
        store.set("a.gain", TunableValue::F32(0.25)).unwrap();
        store.flush_now();

        // Simulated reboot: fresh store, same descriptors.
        let reborn = TunableStore::new(Some(path), 3);
        reborn.register(f32_desc("a.gain", 0.5, 0.0, 1.0)).unwrap();
        reborn.load();
        assert_eq!(reborn.get::<f32>("a.gain"), Some(0.25));
        assert!(!reborn.is_dirty());
    }

    #[test]
    fn kind_change_across_epochs_discards_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunables.bin");

        let store = TunableStore::new(Some(path.clone()), 1);
        store.register(f32_desc("a.mode", 0.0, 0.0, 4.0)).unwrap();
        store.set("a.mode", TunableValue::F32(2.0)).unwrap();
        store.flush_now();

        // Next firmware: same name, kind changed to u8.
        let reborn = TunableStore::new(Some(path), 2);
        reborn
            .register(TunableDesc {
                name: "a.mode",
                group: "test",
                default: TunableValue::U8(1),
                min: Some(TunableValue::U8(0)),
                max: Some(TunableValue::U8(4)),
                persistent: true,
            })
            .unwrap();
        reborn.load();
        // Record discarded with a warning, default preserved.
        assert_eq!(reborn.get::<u8>("a.mode"), Some(1));
    }

    #[test]
    fn debounce_holds_back_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunables.bin");
        let store = TunableStore::new(Some(path.clone()), 1);
        store.register(f32_desc("a.gain", 0.5, 0.0, 1.0)).unwrap();
        store.set("a.gain", TunableValue::F32(0.9)).unwrap();
        store.flush_if_due(Duration::from_secs(3600));
        assert!(!path.exists());
        store.flush_if_due(Duration::ZERO);
        assert!(path.exists());
    }
}
