//! Metadata transformers applied while a message is written.
//!
//! # Design Decisions
//! - A factory decides per encoding whether it has anything to do; the
//!   shipped factories only act on binary-mode messages, where attributes
//!   live in headers
//! - The chain runs in insertion order; the first failure aborts the write

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::binding::Encoding;
use crate::error::ProtocolError;

/// A single metadata rewrite.
pub trait Transformer: Send {
    fn transform(&mut self, headers: &mut HeaderMap) -> Result<(), ProtocolError>;
}

/// Produces a transformer for a given encoding.
pub trait TransformerFactory: Send + Sync + fmt::Debug {
    fn transformer(&self, encoding: Encoding) -> Option<Box<dyn Transformer + '_>>;
}

/// Ordered chain of transformer factories.
#[derive(Debug, Clone, Default)]
pub struct TransformerFactories {
    factories: Vec<Arc<dyn TransformerFactory>>,
}

impl TransformerFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, factory: Arc<dyn TransformerFactory>) {
        self.factories.push(factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Run every applicable transformer over `headers`.
    pub fn apply(&self, encoding: Encoding, headers: &mut HeaderMap) -> Result<(), ProtocolError> {
        for factory in &self.factories {
            if let Some(mut transformer) = factory.transformer(encoding) {
                transformer.transform(headers)?;
            }
        }
        Ok(())
    }
}

/// Sets a header (a `ce-` attribute when given a bare attribute name).
#[derive(Debug, Clone)]
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    /// Build from raw strings, rejecting names or values HTTP cannot carry.
    pub fn new(name: &str, value: &str) -> Result<Self, ProtocolError> {
        let name = HeaderName::try_from(name)
            .map_err(|e| ProtocolError::Config(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| ProtocolError::Config(format!("invalid header value for '{}': {}", name, e)))?;
        Ok(Self { name, value })
    }

    /// Set the binary-mode attribute `ce-<attribute>`.
    pub fn attribute(attribute: &str, value: &str) -> Result<Self, ProtocolError> {
        Self::new(&format!("ce-{}", attribute), value)
    }
}

impl Transformer for &SetHeader {
    fn transform(&mut self, headers: &mut HeaderMap) -> Result<(), ProtocolError> {
        headers.insert(self.name.clone(), self.value.clone());
        Ok(())
    }
}

impl TransformerFactory for SetHeader {
    fn transformer(&self, encoding: Encoding) -> Option<Box<dyn Transformer + '_>> {
        (encoding == Encoding::Binary).then(|| Box::new(self) as Box<dyn Transformer + '_>)
    }
}

/// Removes every value of a header.
#[derive(Debug, Clone)]
pub struct RemoveHeader {
    name: HeaderName,
}

impl RemoveHeader {
    pub fn new(name: &str) -> Result<Self, ProtocolError> {
        let name = HeaderName::try_from(name)
            .map_err(|e| ProtocolError::Config(format!("invalid header name '{}': {}", name, e)))?;
        Ok(Self { name })
    }
}

impl Transformer for &RemoveHeader {
    fn transform(&mut self, headers: &mut HeaderMap) -> Result<(), ProtocolError> {
        headers.remove(&self.name);
        Ok(())
    }
}

impl TransformerFactory for RemoveHeader {
    fn transformer(&self, encoding: Encoding) -> Option<Box<dyn Transformer + '_>> {
        (encoding == Encoding::Binary).then(|| Box::new(self) as Box<dyn Transformer + '_>)
    }
}
