use std::marker::PhantomData;

/// Decoded, not yet repaired.
#[derive(Clone, Copy, Debug)]
pub struct Raw;

/// Both namespace rules applied.
#[derive(Clone, Copy, Debug)]
pub struct Repaired;

/// Notation text tagged with its repair state.
///
/// Only [`crate::namespace::repair`] produces a `NotationDocument<Repaired>`,
/// so a half-repaired document cannot be handed to an interpreter.
#[derive(Clone, Debug)]
pub struct NotationDocument<S> {
    text: String,
    _state: PhantomData<S>,
}

impl<S> NotationDocument<S> {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl NotationDocument<Raw> {
    pub fn new(text: String) -> Self {
        Self {
            text,
            _state: PhantomData,
        }
    }
}

impl NotationDocument<Repaired> {
    pub(crate) fn from_repaired(text: String) -> Self {
        Self {
            text,
            _state: PhantomData,
        }
    }
}
