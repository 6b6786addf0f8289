//! Closed sets of lowercase tokens that classify recipes and
//! ingredients. They are loaded once at startup and passed to the
//! handlers through [`Environment`](crate::environment::Environment).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::errors::BackendError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyKind {
    Difficulty,
    Media,
    Taste,
    Unit,
}

impl VocabularyKind {
    pub const ALL: [VocabularyKind; 4] = [
        VocabularyKind::Difficulty,
        VocabularyKind::Media,
        VocabularyKind::Taste,
        VocabularyKind::Unit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VocabularyKind::Difficulty => "difficulty",
            VocabularyKind::Media => "media",
            VocabularyKind::Taste => "taste",
            VocabularyKind::Unit => "unit",
        }
    }

    /// The table holding this vocabulary.
    pub(crate) fn table(self) -> &'static str {
        match self {
            VocabularyKind::Difficulty => "difficulties",
            VocabularyKind::Media => "media",
            VocabularyKind::Taste => "tastes",
            VocabularyKind::Unit => "units",
        }
    }
}

impl fmt::Display for VocabularyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VocabularyKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VocabularyKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or(())
    }
}

/// A single vocabulary entry: the token stored on recipes and a
/// human-readable label.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Label {
    pub(crate) token: String,
    pub(crate) label: String,
}

impl Label {
    pub fn new(token: impl Into<String>, label: impl Into<String>) -> Self {
        Label {
            token: token.into(),
            label: label.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Vocabulary {
    entries: Vec<Label>,
}

impl Vocabulary {
    /// Creates a vocabulary. Tokens are lowercased so that membership
    /// tests are case-insensitive.
    pub fn new(entries: impl IntoIterator<Item = Label>) -> Self {
        let entries = entries
            .into_iter()
            .map(|Label { token, label }| Label {
                token: token.to_lowercase(),
                label,
            })
            .collect();

        Vocabulary { entries }
    }

    pub fn entries(&self) -> &[Label] {
        &self.entries
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    /// Lowercases `raw` and returns it if it names a member.
    ///
    /// ```
    /// use recipes::vocabulary::{Label, Vocabulary};
    /// let difficulty = Vocabulary::new(vec![Label::new("hard", "Hard")]);
    /// assert_eq!(difficulty.normalize("HaRd"), Some("hard".to_owned()));
    /// assert_eq!(difficulty.normalize("easy"), None);
    /// ```
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let token = raw.to_lowercase();

        if self.contains(&token) {
            Some(token)
        } else {
            None
        }
    }

    /// Lists the tokens for error messages.
    pub(crate) fn describe(&self) -> String {
        let tokens = self
            .entries
            .iter()
            .map(|e| e.token.as_str())
            .collect::<Vec<_>>();

        format!("[{}]", tokens.join(", "))
    }
}

/// All the vocabularies a recipe refers to.
#[derive(Clone, Debug)]
pub struct Vocabularies {
    difficulty: Vocabulary,
    media: Vocabulary,
    taste: Vocabulary,
    unit: Vocabulary,
}

impl Vocabularies {
    pub fn new(
        difficulty: Vocabulary,
        media: Vocabulary,
        taste: Vocabulary,
        unit: Vocabulary,
    ) -> Self {
        Vocabularies {
            difficulty,
            media,
            taste,
            unit,
        }
    }

    /// Reads every vocabulary from the database.
    pub async fn load(db: &(dyn Db + Send + Sync)) -> Result<Self, BackendError> {
        let difficulty = load_one(db, VocabularyKind::Difficulty).await?;
        let media = load_one(db, VocabularyKind::Media).await?;
        let taste = load_one(db, VocabularyKind::Taste).await?;
        let unit = load_one(db, VocabularyKind::Unit).await?;

        Ok(Vocabularies::new(difficulty, media, taste, unit))
    }

    pub fn get(&self, kind: VocabularyKind) -> &Vocabulary {
        match kind {
            VocabularyKind::Difficulty => &self.difficulty,
            VocabularyKind::Media => &self.media,
            VocabularyKind::Taste => &self.taste,
            VocabularyKind::Unit => &self.unit,
        }
    }
}

async fn load_one(
    db: &(dyn Db + Send + Sync),
    kind: VocabularyKind,
) -> Result<Vocabulary, BackendError> {
    let entries = db.retrieve_vocabulary(kind).await?;

    Ok(Vocabulary::new(entries))
}

#[cfg(test)]
pub(crate) fn sample() -> Vocabularies {
    fn make(tokens: &[&str]) -> Vocabulary {
        Vocabulary::new(tokens.iter().map(|t| Label::new(*t, t.to_uppercase())))
    }

    Vocabularies::new(
        make(&["easy", "medium", "hard"]),
        make(&["oven", "stove", "grill"]),
        make(&["sweet", "salty", "sour", "spicy"]),
        make(&["g", "kg", "ml", "l", "piece"]),
    )
}
