use object::{File, Object, SymbolMap, SymbolMapEntry};

/// A symbol table entry copied out of the mapped image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSymbol {
    pub address: u64,
    pub name: String,
}

impl ExportedSymbol {
    pub fn new<S: Into<String>>(address: u64, name: S) -> Self {
        ExportedSymbol {
            address,
            name: name.into(),
        }
    }
}

impl SymbolMapEntry for ExportedSymbol {
    #[inline]
    fn address(&self) -> u64 {
        self.address
    }
}

pub type ExportedSymbols = SymbolMap<ExportedSymbol>;

pub fn load(f: &File) -> ExportedSymbols {
    SymbolMap::new(
        f.symbol_map()
            .symbols()
            .iter()
            .map(|x| ExportedSymbol::new(x.address(), x.name()))
            .collect(),
    )
}

/// Closest symbol at or below the on-disk address `svma`, with the distance
/// from its start.
pub fn nearest(map: &ExportedSymbols, svma: u64) -> Option<(&str, u64)> {
    map.get(svma)
        .map(|symbol| (symbol.name.as_str(), svma - symbol.address))
}
