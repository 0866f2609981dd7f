//! Ruleset resolution: a named preset plus explicit overrides, validated once
//! at game start.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::domain::{DomainError, ValidationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StraightRule {
    /// Any run of four or more counts as a small straight.
    Loose,
    /// Small straight requires a run of exactly four.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullHouseRule {
    Fixed,
    DiceSum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Classic,
    Draft,
    Duel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JokerRules {
    pub uses_per_turn: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomizerRules {
    /// Lower-section categories disabled, and specials added, per game.
    pub swaps: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    pub preset: Preset,
    pub max_rolls: u8,
    pub allow_scratch: bool,
    pub straights: StraightRule,
    pub full_house: FullHouseRule,
    /// One multiplier per scoring column.
    pub columns: Vec<u32>,
    pub jokers: Option<JokerRules>,
    pub randomizer: Option<RandomizerRules>,
    pub speed_mode: bool,
    pub match_mode: MatchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Classic,
    Speed,
    Triple,
    Chaos,
    Strict,
}

impl FromStr for Preset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Preset::Classic),
            "speed" => Ok(Preset::Speed),
            "triple" => Ok(Preset::Triple),
            "chaos" => Ok(Preset::Chaos),
            "strict" => Ok(Preset::Strict),
            other => Err(DomainError::validation(
                ValidationKind::InvalidSettings,
                format!("Unknown ruleset preset '{other}'"),
            )),
        }
    }
}

/// Explicit per-room overrides applied on top of a preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesetOverrides {
    pub max_rolls: Option<u8>,
    pub allow_scratch: Option<bool>,
    pub straights: Option<StraightRule>,
    pub full_house: Option<FullHouseRule>,
    pub columns: Option<Vec<u32>>,
    pub joker_uses: Option<u8>,
    pub randomizer_swaps: Option<u8>,
    pub speed_mode: Option<bool>,
    pub match_mode: Option<MatchMode>,
}

impl Ruleset {
    pub fn classic() -> Self {
        Self::from_preset(Preset::Classic)
    }

    pub fn from_preset(preset: Preset) -> Self {
        let base = Ruleset {
            preset,
            max_rolls: 3,
            allow_scratch: true,
            straights: StraightRule::Loose,
            full_house: FullHouseRule::Fixed,
            columns: vec![1],
            jokers: None,
            randomizer: None,
            speed_mode: false,
            match_mode: MatchMode::Classic,
        };
        match preset {
            Preset::Classic => base,
            Preset::Speed => Ruleset {
                speed_mode: true,
                ..base
            },
            Preset::Triple => Ruleset {
                columns: vec![1, 2, 3],
                ..base
            },
            Preset::Chaos => Ruleset {
                jokers: Some(JokerRules { uses_per_turn: 1 }),
                randomizer: Some(RandomizerRules { swaps: 2 }),
                ..base
            },
            Preset::Strict => Ruleset {
                allow_scratch: false,
                straights: StraightRule::Strict,
                full_house: FullHouseRule::DiceSum,
                ..base
            },
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn joker_uses(&self) -> u8 {
        self.jokers.map(|j| j.uses_per_turn).unwrap_or(0)
    }

    fn validate(&self) -> Result<(), DomainError> {
        let invalid = |detail: &str| {
            Err(DomainError::validation(
                ValidationKind::InvalidSettings,
                detail.to_string(),
            ))
        };
        if !(1..=5).contains(&self.max_rolls) {
            return invalid("maxRolls must be between 1 and 5");
        }
        if self.columns.is_empty() || self.columns.len() > 3 {
            return invalid("Between 1 and 3 scoring columns are supported");
        }
        if self.columns.iter().any(|m| !(1..=10).contains(m)) {
            return invalid("Column multipliers must be between 1 and 10");
        }
        if let Some(j) = self.jokers {
            if !(1..=3).contains(&j.uses_per_turn) {
                return invalid("Joker uses per turn must be between 1 and 3");
            }
        }
        if let Some(r) = self.randomizer {
            if !(1..=3).contains(&r.swaps) {
                return invalid("Randomizer swaps must be between 1 and 3");
            }
        }
        Ok(())
    }
}

/// Resolve a ruleset from an optional preset name plus overrides.
pub fn resolve_ruleset(
    preset: Option<&str>,
    overrides: &RulesetOverrides,
) -> Result<Ruleset, DomainError> {
    let preset = match preset {
        Some(name) => name.parse()?,
        None => Preset::Classic,
    };
    let mut rules = Ruleset::from_preset(preset);

    if let Some(v) = overrides.max_rolls {
        rules.max_rolls = v;
    }
    if let Some(v) = overrides.allow_scratch {
        rules.allow_scratch = v;
    }
    if let Some(v) = overrides.straights {
        rules.straights = v;
    }
    if let Some(v) = overrides.full_house {
        rules.full_house = v;
    }
    if let Some(v) = &overrides.columns {
        rules.columns = v.clone();
    }
    if let Some(v) = overrides.joker_uses {
        rules.jokers = (v > 0).then_some(JokerRules { uses_per_turn: v });
    }
    if let Some(v) = overrides.randomizer_swaps {
        rules.randomizer = (v > 0).then_some(RandomizerRules { swaps: v });
    }
    if let Some(v) = overrides.speed_mode {
        rules.speed_mode = v;
    }
    if let Some(v) = overrides.match_mode {
        rules.match_mode = v;
    }

    rules.validate()?;
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_classic() {
        let rules = resolve_ruleset(None, &RulesetOverrides::default()).unwrap();
        assert_eq!(rules, Ruleset::classic());
        assert_eq!(rules.max_rolls, 3);
        assert_eq!(rules.columns, vec![1]);
    }

    #[test]
    fn overrides_apply_on_top_of_preset() {
        let overrides = RulesetOverrides {
            max_rolls: Some(4),
            match_mode: Some(MatchMode::Duel),
            ..Default::default()
        };
        let rules = resolve_ruleset(Some("triple"), &overrides).unwrap();
        assert_eq!(rules.columns, vec![1, 2, 3]);
        assert_eq!(rules.max_rolls, 4);
        assert_eq!(rules.match_mode, MatchMode::Duel);
    }

    #[test]
    fn strict_preset_forbids_scratch() {
        let rules = resolve_ruleset(Some("Strict"), &RulesetOverrides::default()).unwrap();
        assert!(!rules.allow_scratch);
        assert_eq!(rules.straights, StraightRule::Strict);
    }

    #[test]
    fn zero_joker_override_disables_jokers() {
        let overrides = RulesetOverrides {
            joker_uses: Some(0),
            ..Default::default()
        };
        let rules = resolve_ruleset(Some("chaos"), &overrides).unwrap();
        assert!(rules.jokers.is_none());
        assert!(rules.randomizer.is_some());
    }

    #[test]
    fn rejects_bad_values() {
        let too_many_columns = RulesetOverrides {
            columns: Some(vec![1, 1, 1, 1]),
            ..Default::default()
        };
        assert!(resolve_ruleset(None, &too_many_columns).is_err());

        let no_rolls = RulesetOverrides {
            max_rolls: Some(0),
            ..Default::default()
        };
        assert!(resolve_ruleset(None, &no_rolls).is_err());
        assert!(resolve_ruleset(Some("turbo"), &RulesetOverrides::default()).is_err());
    }
}
