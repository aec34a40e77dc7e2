//! Identity and small value types shared by the record and its save format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of skills carried by every player record.
pub const SKILL_COUNT: usize = 21;

/// Identifier a player record is stored under.
///
/// The id becomes a file stem, so it must be non-empty and free of path
/// separators. Anything beyond that (case folding, character whitelists) is
/// the caller's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("player id is empty")]
    Empty,
    #[error("player id {0:?} contains a path separator or NUL")]
    InvalidChar(String),
    #[error("player id {0:?} is a relative path component")]
    Reserved(String),
}

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        if id.contains(['/', '\\', '\0']) {
            return Err(IdError::InvalidChar(id));
        }
        if id == "." || id == ".." {
            return Err(IdError::Reserved(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlayerId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

impl std::str::FromStr for PlayerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Skills in canonical save order. The discriminant is the slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Attack = 0,
    Defence,
    Strength,
    Hitpoints,
    Ranged,
    Prayer,
    Magic,
    Cooking,
    Woodcutting,
    Fletching,
    Fishing,
    Firemaking,
    Crafting,
    Smithing,
    Mining,
    Herblore,
    Agility,
    Thieving,
    Stat18,
    Stat19,
    Runecraft,
}

impl Skill {
    pub const ALL: [Skill; SKILL_COUNT] = [
        Skill::Attack,
        Skill::Defence,
        Skill::Strength,
        Skill::Hitpoints,
        Skill::Ranged,
        Skill::Prayer,
        Skill::Magic,
        Skill::Cooking,
        Skill::Woodcutting,
        Skill::Fletching,
        Skill::Fishing,
        Skill::Firemaking,
        Skill::Crafting,
        Skill::Smithing,
        Skill::Mining,
        Skill::Herblore,
        Skill::Agility,
        Skill::Thieving,
        Skill::Stat18,
        Skill::Stat19,
        Skill::Runecraft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Skill::Attack => "attack",
            Skill::Defence => "defence",
            Skill::Strength => "strength",
            Skill::Hitpoints => "hitpoints",
            Skill::Ranged => "ranged",
            Skill::Prayer => "prayer",
            Skill::Magic => "magic",
            Skill::Cooking => "cooking",
            Skill::Woodcutting => "woodcutting",
            Skill::Fletching => "fletching",
            Skill::Fishing => "fishing",
            Skill::Firemaking => "firemaking",
            Skill::Crafting => "crafting",
            Skill::Smithing => "smithing",
            Skill::Mining => "mining",
            Skill::Herblore => "herblore",
            Skill::Agility => "agility",
            Skill::Thieving => "thieving",
            Skill::Stat18 => "stat18",
            Skill::Stat19 => "stat19",
            Skill::Runecraft => "runecraft",
        }
    }
}

/// Experience and current level of one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillState {
    pub experience: u32,
    pub level: u8,
}

impl Default for SkillState {
    fn default() -> Self {
        Self {
            experience: 0,
            level: 1,
        }
    }
}

/// Chat filter settings. `public` uses four bits on the wire, the others two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatModes {
    pub public: u8,
    pub private: u8,
    pub trade: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_rejects_paths() {
        assert_eq!(PlayerId::new(""), Err(IdError::Empty));
        assert!(matches!(PlayerId::new("a/b"), Err(IdError::InvalidChar(_))));
        assert!(matches!(PlayerId::new("a\\b"), Err(IdError::InvalidChar(_))));
        assert!(matches!(PlayerId::new(".."), Err(IdError::Reserved(_))));
        assert_eq!(PlayerId::new("zezima").unwrap().as_str(), "zezima");
    }

    #[test]
    fn player_id_serde_goes_through_validation() {
        let id: PlayerId = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(id.to_string(), "bob");
        assert!(serde_json::from_str::<PlayerId>("\"../etc\"").is_err());
    }

    #[test]
    fn skill_order_is_canonical() {
        for (i, skill) in Skill::ALL.iter().enumerate() {
            assert_eq!(skill.index(), i);
        }
        assert_eq!(Skill::Hitpoints.index(), 3);
        assert_eq!(Skill::Runecraft.index(), SKILL_COUNT - 1);
        assert_eq!(Skill::Stat19.name(), "stat19");
    }
}
