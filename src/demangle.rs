use cpp_demangle::{DemangleOptions, Symbol};

/// Turns a mangled `_Z...` symbol into a readable one.
///
/// Anything not carrying the `_Z` prefix is returned unchanged, and so is a
/// name neither the Rust nor the Itanium C++ demangler accepts.
pub fn demangle(name: &str) -> String {
    if name.len() < 3 || !name.starts_with("_Z") {
        return name.to_string();
    }
    if let Ok(rust) = rustc_demangle::try_demangle(name) {
        return format!("{:#}", rust);
    }
    Symbol::new(name)
        .ok()
        .and_then(|symbol| symbol.demangle(&DemangleOptions::default()).ok())
        .filter(|demangled| !demangled.is_empty())
        .unwrap_or_else(|| name.to_string())
}
