//! Method identities and the per-program method index.
//!
//! A method is a module-defined WebAssembly function. Its owning type is the
//! compiled unit it lives in, so identities look like
//! `geometry$area (f64,f64)->f64`.

use super::error::InstrumentationError;
use crate::trace::FIELD_DELIMITER;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walrus::{ExportItem, Function, FunctionId, FunctionKind, Module, ModuleConfig, ValType};

/// Separator between owner and method name in probe keys.
pub const KEY_SEPARATOR: char = '$';

/// Canonical name given to a unit's start function.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Characters a probe key cannot carry: they would split a trace line or a
/// key table entry.
pub const RESERVED_KEY_CHARS: [char; 3] = [FIELD_DELIMITER, '\n', '\r'];

/// Stable identifier of a method: owning unit, method name and signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodIdentity {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MethodIdentity {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// The probe key, `owner$name`.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.owner, KEY_SEPARATOR, self.name)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// First reserved character in the probe key, if any.
    pub fn reserved_char(&self) -> Option<char> {
        self.owner
            .chars()
            .chain(self.name.chars())
            .find(|c| RESERVED_KEY_CHARS.contains(c))
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key(), self.descriptor)
    }
}

/// One compiled unit of the target program.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub name: String,
    pub path: Option<PathBuf>,
    pub bytes: Vec<u8>,
}

impl CompiledUnit {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            path: None,
            bytes,
        }
    }

    /// Load a unit from disk. The unit is named after the module name in the
    /// `name` section, or after the file stem when the module has none.
    pub fn load(path: &Path) -> Result<Self, InstrumentationError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unit".to_string());

        let bytes = fs::read(path).map_err(|e| InstrumentationError::Parse {
            unit: stem.clone(),
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;

        let module = parse_module(&stem, &bytes)?;
        let name = module.name.clone().unwrap_or(stem);

        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            bytes,
        })
    }

    pub fn parse(&self) -> Result<Module, InstrumentationError> {
        parse_module(&self.name, &self.bytes)
    }
}

pub(crate) fn parse_module(unit: &str, bytes: &[u8]) -> Result<Module, InstrumentationError> {
    ModuleConfig::new()
        .parse(bytes)
        .map_err(|e| InstrumentationError::Parse {
            unit: unit.to_string(),
            reason: format!("{:#}", e),
        })
}

fn val_type_name(ty: &ValType) -> &'static str {
    match ty {
        ValType::I32 => "i32",
        ValType::I64 => "i64",
        ValType::F32 => "f32",
        ValType::F64 => "f64",
        ValType::V128 => "v128",
        _ => "ref",
    }
}

fn descriptor(module: &Module, func: &Function) -> String {
    let ty = module.types.get(func.ty());
    let render = |types: &[ValType]| {
        types
            .iter()
            .map(val_type_name)
            .collect::<Vec<_>>()
            .join(",")
    };
    format!("({})->{}", render(ty.params()), render(ty.results()))
}

fn base_name(module: &Module, func: &Function, position: usize) -> String {
    if module.start == Some(func.id()) {
        return CONSTRUCTOR_NAME.to_string();
    }
    if let Some(name) = &func.name {
        return name.clone();
    }
    module
        .exports
        .iter()
        .find(|export| matches!(export.item, ExportItem::Function(id) if id == func.id()))
        .map(|export| export.name.clone())
        .unwrap_or_else(|| format!("func{}", position))
}

/// Enumerate the instrumentable methods of a parsed unit in function order.
///
/// Both the index and the instrumenter name methods through this function,
/// so a key computed at indexing time always matches the one baked into the
/// rewritten unit. Unnamed methods are numbered among the defined functions
/// only, which keeps their keys stable when probe imports are added.
pub(crate) fn unit_methods(module: &Module, owner: &str) -> Vec<(FunctionId, MethodIdentity)> {
    let locals: Vec<&Function> = module
        .funcs
        .iter()
        .filter(|func| matches!(func.kind, FunctionKind::Local(_)))
        .collect();
    let bases: Vec<String> = locals
        .iter()
        .enumerate()
        .map(|(position, func)| base_name(module, func, position))
        .collect();

    // Every base name is reserved up front so a `#n` suffix never lands on
    // a function that really carries that name.
    let mut taken: HashSet<String> = bases.iter().cloned().collect();
    let mut first_seen: HashSet<&str> = HashSet::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();
    let mut methods = Vec::with_capacity(locals.len());

    for (func, base) in locals.iter().zip(&bases) {
        let name = if first_seen.insert(base.as_str()) {
            base.clone()
        } else {
            let suffix = next_suffix.entry(base.as_str()).or_insert(1);
            loop {
                let candidate = format!("{}#{}", base, suffix);
                *suffix += 1;
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            }
        };

        methods.push((
            func.id(),
            MethodIdentity::new(owner, name, descriptor(module, func)),
        ));
    }

    methods
}

/// Read-only index of every method declared by the target program, keyed by
/// probe key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodIndex {
    methods: BTreeMap<String, MethodIdentity>,
}

impl MethodIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index all method declarations of the given units.
    pub fn build(units: &[CompiledUnit]) -> Result<Self, InstrumentationError> {
        let per_unit = units
            .par_iter()
            .map(|unit| {
                let module = unit.parse()?;
                Ok(unit_methods(&module, &unit.name)
                    .into_iter()
                    .map(|(_, identity)| identity)
                    .collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>, InstrumentationError>>()?;

        let mut index = Self::new();
        for identity in per_unit.into_iter().flatten() {
            index.insert(identity);
        }
        Ok(index)
    }

    /// Insert an identity. The first identity registered under a key wins.
    pub fn insert(&mut self, identity: MethodIdentity) -> bool {
        let key = identity.key();
        if self.methods.contains_key(&key) {
            tracing::warn!(key = key.as_str(), "Duplicate method key, keeping first");
            return false;
        }
        self.methods.insert(key, identity);
        true
    }

    pub fn get(&self, key: &str) -> Option<&MethodIdentity> {
        self.methods.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.methods.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodIdentity> {
        self.methods.values()
    }

    /// Methods owned by one unit, in key order.
    pub fn methods_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a MethodIdentity> {
        self.methods.values().filter(move |m| m.owner == owner)
    }
}
