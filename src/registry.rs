// 8.1 registry.rs: pool anchor → converter. capabilities are read once at registration,
// the engine never probes a converter at call time.

use crate::converter::{ConverterCapabilities, LiquidityPoolConverter};
use crate::types::TokenId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct RegisteredPool {
    pub converter: Box<dyn LiquidityPoolConverter>,
    pub capabilities: ConverterCapabilities,
}

#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    pools: HashMap<TokenId, RegisteredPool>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the converter owning `converter.anchor()`.
    pub fn register(&mut self, converter: Box<dyn LiquidityPoolConverter>) -> ConverterCapabilities {
        let capabilities = converter.capabilities();
        let anchor = converter.anchor();
        tracing::debug!(pool = %anchor, ?capabilities, "registering converter");
        self.pools.insert(
            anchor,
            RegisteredPool {
                converter,
                capabilities,
            },
        );
        capabilities
    }

    pub fn unregister(&mut self, anchor: TokenId) -> Option<Box<dyn LiquidityPoolConverter>> {
        self.pools.remove(&anchor).map(|pool| pool.converter)
    }

    pub fn get(&self, anchor: TokenId) -> Option<&RegisteredPool> {
        self.pools.get(&anchor)
    }

    pub fn converter(&self, anchor: TokenId) -> Option<&dyn LiquidityPoolConverter> {
        self.pools.get(&anchor).map(|pool| pool.converter.as_ref())
    }

    pub fn converter_mut(&mut self, anchor: TokenId) -> Option<&mut (dyn LiquidityPoolConverter + 'static)> {
        self.pools.get_mut(&anchor).map(|pool| pool.converter.as_mut())
    }

    pub fn capabilities(&self, anchor: TokenId) -> Option<ConverterCapabilities> {
        self.pools.get(&anchor).map(|pool| pool.capabilities)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
