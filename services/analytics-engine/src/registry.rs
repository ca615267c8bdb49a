//! Per-symbol engine registry
//!
//! Engines that keep per-symbol state (provenance, OFI) live in an explicit
//! registry owned by the caller. Engines are created lazily from a factory
//! on first use and torn down with `remove` or `clear`.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;
use types::ids::Symbol;

type Factory<E> = Box<dyn Fn(&Symbol) -> E + Send + Sync>;

/// Symbol → engine map with lazy construction.
pub struct SymbolRegistry<E> {
    engines: BTreeMap<Symbol, E>,
    factory: Factory<E>,
}

impl<E> SymbolRegistry<E> {
    pub fn new(factory: impl Fn(&Symbol) -> E + Send + Sync + 'static) -> Self {
        Self {
            engines: BTreeMap::new(),
            factory: Box::new(factory),
        }
    }

    /// Engine for `symbol`, created on first access.
    pub fn engine(&mut self, symbol: &Symbol) -> &mut E {
        let factory = &self.factory;
        self.engines.entry(symbol.clone()).or_insert_with(|| {
            debug!(symbol = %symbol, "Creating engine for symbol");
            factory(symbol)
        })
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&E> {
        self.engines.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &Symbol) -> Option<&mut E> {
        self.engines.get_mut(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.engines.contains_key(symbol)
    }

    /// Drop the engine for `symbol`, returning it if it existed.
    pub fn remove(&mut self, symbol: &Symbol) -> Option<E> {
        self.engines.remove(symbol)
    }

    pub fn clear(&mut self) {
        self.engines.clear();
    }

    /// Registered symbols in sorted order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.engines.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &E)> {
        self.engines.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Symbol, &mut E)> {
        self.engines.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl<E> fmt::Debug for SymbolRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolRegistry")
            .field("symbols", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation() {
        let mut registry = SymbolRegistry::new(|symbol: &Symbol| symbol.as_str().len());
        assert!(registry.is_empty());

        let btc = Symbol::new("BTCUSDT");
        assert_eq!(*registry.engine(&btc), 7);
        assert!(registry.contains(&btc));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_engine_state_persists_between_lookups() {
        let mut registry = SymbolRegistry::new(|_: &Symbol| 0u32);
        let eth = Symbol::new("ETHUSDT");

        *registry.engine(&eth) += 5;
        *registry.engine(&eth) += 1;

        assert_eq!(registry.get(&eth), Some(&6));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry = SymbolRegistry::new(|_: &Symbol| ());
        registry.engine(&Symbol::new("A"));
        registry.engine(&Symbol::new("B"));

        assert!(registry.remove(&Symbol::new("A")).is_some());
        assert!(registry.remove(&Symbol::new("A")).is_none());
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_symbols_sorted() {
        let mut registry = SymbolRegistry::new(|_: &Symbol| ());
        for s in ["SOL", "BTC", "ETH"] {
            registry.engine(&Symbol::new(s));
        }
        let symbols: Vec<&str> = registry.symbols().map(|s| s.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "SOL"]);
    }
}
