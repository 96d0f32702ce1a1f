use serde::de::DeserializeOwned;
use serde::Serialize;

/// Contract for the configuration record a store persists.
///
/// The schema is owned by the application, not by this crate; the store only
/// needs round-trip serialization and a default value to fall back to when
/// the file is absent or corrupt. Any `#[derive(Serialize, Deserialize)]`
/// struct with a `Default` impl qualifies automatically.
pub trait ConfigModel: Serialize + DeserializeOwned + Default + Send + 'static {}

impl<T> ConfigModel for T where T: Serialize + DeserializeOwned + Default + Send + 'static {}
