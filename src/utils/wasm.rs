use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use wasmparser::{Parser, Payload, Validator};

/// Compute the SHA-256 checksum of a WASM binary.
pub fn compute_checksum(wasm_bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(wasm_bytes);
    hex::encode(hasher.finalize())
}

/// Return the payload of the first custom section called `name`.
pub fn custom_section_data(wasm_bytes: &[u8], name: &str) -> Option<Vec<u8>> {
    let parser = Parser::new(0);

    for payload in parser.parse_all(wasm_bytes) {
        let Ok(Payload::CustomSection(reader)) = payload else {
            continue;
        };
        if reader.name() == name {
            return Some(reader.data().to_vec());
        }
    }

    None
}

pub fn has_custom_section(wasm_bytes: &[u8], name: &str) -> bool {
    custom_section_data(wasm_bytes, name).is_some()
}

/// Validate a complete module, returning the validator message on failure.
pub fn validate_module(wasm_bytes: &[u8]) -> Result<(), String> {
    Validator::new()
        .validate_all(wasm_bytes)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Collect `.wasm` files: plain files are taken as-is, directories are
/// searched recursively. The result is sorted for deterministic output.
pub fn discover_units(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    fn visit(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                visit(&path, found)?;
            } else if path.extension().is_some_and(|ext| ext == "wasm") {
                found.push(path);
            }
        }
        Ok(())
    }

    let mut found = Vec::new();
    for input in inputs {
        if input.is_dir() {
            visit(input, &mut found)?;
        } else {
            found.push(input.clone());
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

/// High-level module statistics for the `inspect` command.
#[derive(Debug, Default, Serialize)]
pub struct ModuleInfo {
    pub total_size: usize,
    pub type_count: u32,
    pub import_count: u32,
    pub function_count: u32,
    pub export_count: u32,
    pub custom_sections: Vec<String>,
}

pub fn get_module_info(wasm_bytes: &[u8]) -> Result<ModuleInfo, String> {
    let mut info = ModuleInfo {
        total_size: wasm_bytes.len(),
        ..ModuleInfo::default()
    };
    let parser = Parser::new(0);

    for payload in parser.parse_all(wasm_bytes) {
        match payload.map_err(|e| e.to_string())? {
            Payload::TypeSection(reader) => info.type_count = reader.count(),
            Payload::ImportSection(reader) => info.import_count = reader.count(),
            Payload::FunctionSection(reader) => info.function_count = reader.count(),
            Payload::ExportSection(reader) => info.export_count = reader.count(),
            Payload::CustomSection(reader) => info.custom_sections.push(reader.name().to_string()),
            _ => {}
        }
    }

    Ok(info)
}
