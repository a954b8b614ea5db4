// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! External type catalogues.
//!
//! Host APIs (the Lua standard library, editor/framework surfaces) are
//! dynamic tables whose runtime shape cannot be recovered by static
//! analysis. They are modeled as a read-only, pre-seeded catalogue of
//! Certain-typed signatures: the inference engine looks call targets up
//! here before falling back to project-local inference, and never
//! traverses into them.
//!
//! The built-in seed covers the core global, `string`, `table`, and
//! `math` surfaces; version-gated entries (`bit32`, `utf8`, 5.1's
//! `unpack`) are seeded only for the matching [`LuaVersion`]. Framework
//! catalogues are injected on top via [`Catalogue::insert`].

use std::collections::HashMap;

use ecow::EcoString;

use super::types::TypeExpr;

/// Supported Lua language versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LuaVersion {
    /// Lua 5.1
    Lua51,
    /// Lua 5.2
    Lua52,
    /// Lua 5.3
    Lua53,
    /// Lua 5.4
    #[default]
    Lua54,
}

impl LuaVersion {
    /// Returns the version as its conventional string: `"5.4"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lua51 => "5.1",
            Self::Lua52 => "5.2",
            Self::Lua53 => "5.3",
            Self::Lua54 => "5.4",
        }
    }

    /// Parses a version string, accepting `"5.4"` and the shorthand `"54"`.
    #[must_use]
    pub fn parse(version: &str) -> Option<Self> {
        match version {
            "5.1" | "51" => Some(Self::Lua51),
            "5.2" | "52" => Some(Self::Lua52),
            "5.3" | "53" => Some(Self::Lua53),
            "5.4" | "54" => Some(Self::Lua54),
            _ => None,
        }
    }

    /// Returns `true` if the named language/library feature exists in
    /// this version.
    #[must_use]
    pub fn has_feature(self, feature: &str) -> bool {
        match feature {
            "unpack" | "setfenv" | "getfenv" | "loadstring" | "module" => self == Self::Lua51,
            "goto" | "bit32" => self != Self::Lua51,
            "utf8" | "integer-division" => matches!(self, Self::Lua53 | Self::Lua54),
            "to-be-closed" => self == Self::Lua54,
            _ => false,
        }
    }
}

impl std::fmt::Display for LuaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pre-seeded Certain signature for one catalogue symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    /// Parameter types.
    pub params: Vec<TypeExpr>,
    /// Return types. Empty means the call returns nothing.
    pub returns: Vec<TypeExpr>,
}

impl CatalogueEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(params: Vec<TypeExpr>, returns: Vec<TypeExpr>) -> Self {
        Self { params, returns }
    }
}

/// A read-only lookup table from dotted symbol name to Certain signature.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entries: HashMap<EcoString, CatalogueEntry>,
    version: LuaVersion,
}

impl Catalogue {
    /// Creates an empty catalogue for the given Lua version.
    #[must_use]
    pub fn empty(version: LuaVersion) -> Self {
        Self {
            entries: HashMap::new(),
            version,
        }
    }

    /// Creates a catalogue pre-seeded with the Lua standard library for
    /// the given version.
    #[must_use]
    pub fn standard(version: LuaVersion) -> Self {
        let mut catalogue = Self::empty(version);
        catalogue.seed_globals();
        catalogue.seed_string_library();
        catalogue.seed_table_library();
        catalogue.seed_math_library();
        catalogue.seed_versioned_libraries();
        catalogue
    }

    /// Returns the Lua version this catalogue was built for.
    #[must_use]
    pub fn version(&self) -> LuaVersion {
        self.version
    }

    /// Looks up a dotted symbol name: `"string.format"`, `"print"`.
    #[must_use]
    pub fn lookup(&self, symbol: &str) -> Option<&CatalogueEntry> {
        self.entries.get(symbol)
    }

    /// Returns `true` if the symbol's leading segment names a catalogue
    /// namespace (`string`, `table`, ...), even when the full symbol is
    /// unlisted. Unlisted members of a known namespace should not fall
    /// back to project-local inference.
    #[must_use]
    pub fn covers_namespace(&self, symbol: &str) -> bool {
        let namespace = symbol.split('.').next().unwrap_or(symbol);
        self.entries
            .keys()
            .any(|k| k.split('.').next() == Some(namespace) && k.contains('.'))
    }

    /// Inserts or overrides an entry. Used by framework catalogues
    /// layered on top of the standard seed.
    pub fn insert(&mut self, symbol: impl Into<EcoString>, entry: CatalogueEntry) {
        self.entries.insert(symbol.into(), entry);
    }

    /// Number of seeded symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no symbols are seeded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn seed(&mut self, symbol: &str, params: &[&str], returns: &[&str]) {
        let parse = |names: &[&str]| {
            names
                .iter()
                .map(|n| {
                    super::types::parse_type_expr(n)
                        .map(|(ty, _)| ty)
                        .unwrap_or(TypeExpr::Unknown)
                })
                .collect::<Vec<_>>()
        };
        self.entries.insert(
            EcoString::from(symbol),
            CatalogueEntry::new(parse(params), parse(returns)),
        );
    }

    fn seed_globals(&mut self) {
        self.seed("print", &["any"], &[]);
        self.seed("tostring", &["any"], &["string"]);
        self.seed("tonumber", &["any"], &["number|nil"]);
        self.seed("type", &["any"], &["string"]);
        self.seed("rawget", &["table", "any"], &["any"]);
        self.seed("rawset", &["table", "any", "any"], &["table"]);
        self.seed("rawequal", &["any", "any"], &["boolean"]);
        self.seed("rawlen", &["table|string"], &["integer"]);
        self.seed("select", &["integer|string"], &["any"]);
        self.seed("pairs", &["table"], &["fun()", "table", "any"]);
        self.seed("ipairs", &["table"], &["fun()", "table", "integer"]);
        self.seed("next", &["table", "any"], &["any", "any"]);
        self.seed("pcall", &["fun()"], &["boolean", "any"]);
        self.seed("xpcall", &["fun()", "fun()"], &["boolean", "any"]);
        self.seed("error", &["any", "integer"], &[]);
        self.seed("assert", &["any", "any"], &["any"]);
        self.seed("setmetatable", &["table", "table|nil"], &["table"]);
        self.seed("getmetatable", &["any"], &["table|nil"]);
        self.seed("require", &["string"], &["any"]);
        self.seed("collectgarbage", &["string"], &["any"]);
        if self.version.has_feature("unpack") {
            self.seed("unpack", &["table"], &["any"]);
            self.seed("loadstring", &["string"], &["fun()|nil", "string|nil"]);
        }
    }

    fn seed_string_library(&mut self) {
        self.seed("string.format", &["string"], &["string"]);
        self.seed("string.sub", &["string", "integer", "integer"], &["string"]);
        self.seed("string.len", &["string"], &["integer"]);
        self.seed("string.upper", &["string"], &["string"]);
        self.seed("string.lower", &["string"], &["string"]);
        self.seed("string.rep", &["string", "integer"], &["string"]);
        self.seed("string.reverse", &["string"], &["string"]);
        self.seed(
            "string.byte",
            &["string", "integer", "integer"],
            &["integer"],
        );
        self.seed("string.char", &["integer"], &["string"]);
        self.seed(
            "string.find",
            &["string", "string", "integer", "boolean"],
            &["integer|nil", "integer|nil"],
        );
        self.seed("string.match", &["string", "string", "integer"], &["string|nil"]);
        self.seed("string.gmatch", &["string", "string"], &["fun()"]);
        self.seed(
            "string.gsub",
            &["string", "string", "string|table|fun()", "integer"],
            &["string", "integer"],
        );
    }

    fn seed_table_library(&mut self) {
        self.seed("table.insert", &["table", "any"], &[]);
        self.seed("table.remove", &["table", "integer"], &["any"]);
        self.seed("table.concat", &["table", "string", "integer", "integer"], &["string"]);
        self.seed("table.sort", &["table", "fun()"], &[]);
        if self.version != LuaVersion::Lua51 {
            self.seed("table.unpack", &["table"], &["any"]);
            self.seed("table.pack", &["any"], &["table"]);
        }
    }

    fn seed_math_library(&mut self) {
        for f in [
            "math.floor",
            "math.ceil",
            "math.abs",
            "math.sqrt",
            "math.max",
            "math.min",
            "math.fmod",
            "math.exp",
            "math.log",
            "math.sin",
            "math.cos",
            "math.tan",
            "math.random",
        ] {
            self.seed(f, &["number"], &["number"]);
        }
        self.seed("math.randomseed", &["number"], &[]);
        self.seed("math.huge", &[], &["number"]);
        self.seed("math.pi", &[], &["number"]);
        if self.version.has_feature("integer-division") {
            self.seed("math.tointeger", &["any"], &["integer|nil"]);
            self.seed("math.type", &["any"], &["string|nil"]);
        }
    }

    fn seed_versioned_libraries(&mut self) {
        if self.version.has_feature("bit32") && self.version == LuaVersion::Lua52 {
            for f in ["bit32.band", "bit32.bor", "bit32.bxor", "bit32.bnot"] {
                self.seed(f, &["integer"], &["integer"]);
            }
        }
        if self.version.has_feature("utf8") {
            self.seed("utf8.char", &["integer"], &["string"]);
            self.seed("utf8.len", &["string", "integer", "integer"], &["integer|nil"]);
            self.seed("utf8.codepoint", &["string", "integer", "integer"], &["integer"]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_strings() {
        assert_eq!(LuaVersion::Lua54.as_str(), "5.4");
        assert_eq!(LuaVersion::parse("5.1"), Some(LuaVersion::Lua51));
        assert_eq!(LuaVersion::parse("53"), Some(LuaVersion::Lua53));
        assert_eq!(LuaVersion::parse("6.0"), None);
    }

    #[test]
    fn version_features() {
        assert!(LuaVersion::Lua51.has_feature("unpack"));
        assert!(!LuaVersion::Lua54.has_feature("unpack"));
        assert!(LuaVersion::Lua54.has_feature("goto"));
        assert!(!LuaVersion::Lua51.has_feature("goto"));
        assert!(LuaVersion::Lua53.has_feature("utf8"));
        assert!(!LuaVersion::Lua52.has_feature("utf8"));
    }

    #[test]
    fn standard_catalogue_lookup() {
        let catalogue = Catalogue::standard(LuaVersion::Lua54);
        let entry = catalogue.lookup("tostring").expect("tostring");
        assert_eq!(entry.returns, vec![TypeExpr::named("string")]);

        let entry = catalogue.lookup("string.format").expect("string.format");
        assert_eq!(entry.returns, vec![TypeExpr::named("string")]);

        // table.insert returns nothing
        let entry = catalogue.lookup("table.insert").expect("table.insert");
        assert!(entry.returns.is_empty());
    }

    #[test]
    fn version_gated_entries() {
        let lua51 = Catalogue::standard(LuaVersion::Lua51);
        assert!(lua51.lookup("unpack").is_some());
        assert!(lua51.lookup("table.unpack").is_none());
        assert!(lua51.lookup("utf8.char").is_none());

        let lua54 = Catalogue::standard(LuaVersion::Lua54);
        assert!(lua54.lookup("unpack").is_none());
        assert!(lua54.lookup("table.unpack").is_some());
        assert!(lua54.lookup("utf8.char").is_some());
    }

    #[test]
    fn namespace_coverage() {
        let catalogue = Catalogue::standard(LuaVersion::Lua54);
        assert!(catalogue.covers_namespace("string.weird_unlisted"));
        assert!(!catalogue.covers_namespace("mymodule.thing"));
    }

    #[test]
    fn framework_entries_layer_on_top() {
        let mut catalogue = Catalogue::standard(LuaVersion::Lua51);
        catalogue.insert(
            "vim.api.nvim_get_current_line",
            CatalogueEntry::new(vec![], vec![TypeExpr::named("string")]),
        );
        assert!(catalogue.lookup("vim.api.nvim_get_current_line").is_some());
    }
}
