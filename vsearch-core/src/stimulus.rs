use serde::{Deserialize, Serialize};
use std::fmt;
use vsearch_cache::Atom;

/// Opaque stimulus identifier, usually an image path.
///
/// The planner never looks inside it; it only copies it into trials. Backed by
/// an interned atom so every trial can hold its own copy cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StimulusId(Atom);

impl StimulusId {
    pub fn new(name: &str) -> Self {
        Self(Atom::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn atom(&self) -> &Atom {
        &self.0
    }
}

impl From<&str> for StimulusId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StimulusId {
    fn from(name: String) -> Self {
        Self(Atom::from(name))
    }
}

impl From<StimulusId> for String {
    fn from(id: StimulusId) -> Self {
        id.0.to_string()
    }
}

impl AsRef<str> for StimulusId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the non-target items of a trial come from.
///
/// In a config file a single string is a fixed stimulus and an array is a
/// pool that is sampled uniformly with replacement for every slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DistractorSource {
    Fixed(StimulusId),
    Pool(Vec<StimulusId>),
}

impl DistractorSource {
    pub fn stimuli(&self) -> &[StimulusId] {
        match self {
            DistractorSource::Fixed(id) => std::slice::from_ref(id),
            DistractorSource::Pool(ids) => ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stimuli().is_empty()
    }

    pub fn contains(&self, id: &StimulusId) -> bool {
        self.stimuli().contains(id)
    }
}

/// A named distractor condition. The label doubles as the trial's
/// `distractor_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistractorCondition {
    pub label: String,
    #[serde(rename = "stimuli")]
    pub source: DistractorSource,
}

impl DistractorCondition {
    pub fn fixed(label: impl Into<String>, stimulus: impl Into<StimulusId>) -> Self {
        Self {
            label: label.into(),
            source: DistractorSource::Fixed(stimulus.into()),
        }
    }

    pub fn pool<I, S>(label: impl Into<String>, stimuli: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StimulusId>,
    {
        Self {
            label: label.into(),
            source: DistractorSource::Pool(stimuli.into_iter().map(Into::into).collect()),
        }
    }
}
