use indexmap::IndexMap;
use serde::Deserialize;

/// What happens when a recognized number is dialed.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NumberAction {
    /// Plays the named clip (or a random clip matching the glob).
    #[serde(rename = "play")]
    PlayClip(String),
    /// Flips debug mode on or off.
    ToggleDebug,
    /// Plays the "not in service" clip.
    #[serde(rename = "fallback")]
    PlayFallback,
}

/// Maps exact dialed numbers to actions. Numbers that aren't listed fall back to [`NumberAction::PlayFallback`].
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(transparent)]
pub struct NumberTable(IndexMap<String, NumberAction>);

impl NumberTable {
    /// The table used when none is configured.
    pub fn reference() -> Self {
        Self::from_iter([
            ("1", NumberAction::PlayClip("connect".into())),
            ("2", NumberAction::PlayClip("dialup".into())),
            ("7378", NumberAction::ToggleDebug),
            ("31415926535", NumberAction::PlayClip("hint".into())),
        ])
    }

    pub fn lookup(&self, number: &str) -> NumberAction {
        self.0.get(number).cloned().unwrap_or(NumberAction::PlayFallback)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NumberAction)> {
        self.0.iter().map(|(number, action)| (number.as_str(), action))
    }
}

impl<S: Into<String>> FromIterator<(S, NumberAction)> for NumberTable {
    fn from_iter<T: IntoIterator<Item = (S, NumberAction)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(number, action)| (number.into(), action)).collect())
    }
}
