use crate::instrument::{CompiledUnit, PROBE_KEYS_SECTION};
use crate::utils::wasm::custom_section_data;

/// Probe keys of an instrumented unit. A key's id is its line index in the
/// `joule.probe_keys` custom section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeKeyTable {
    keys: Vec<String>,
}

impl ProbeKeyTable {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn from_section_data(data: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(data)
            .map_err(|e| format!("probe key section is not UTF-8: {}", e))?;
        if text.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            keys: text.split('\n').map(str::to_string).collect(),
        })
    }

    /// Table of an instrumented unit, `None` when the unit carries no probes.
    pub fn from_unit(unit: &CompiledUnit) -> Result<Option<Self>, String> {
        match custom_section_data(&unit.bytes, PROBE_KEYS_SECTION) {
            Some(data) => Self::from_section_data(&data).map(Some),
            None => Ok(None),
        }
    }

    pub fn key(&self, id: i32) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.keys.get(i))
            .map(String::as_str)
    }

    pub fn id_of(&self, key: &str) -> Option<i32> {
        self.keys.iter().position(|k| k == key).map(|i| i as i32)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.keys.iter().enumerate().map(|(i, k)| (i as i32, k.as_str()))
    }
}
