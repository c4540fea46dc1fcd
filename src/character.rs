// Import necessary modules from external crates.
use crate::dice::{DieSpec, POINT_BUY_BUDGET, ability_modifier, point_buy_cost};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter};

// The six ability scores of a 5e character.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl Attributes {
    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    fn slot(&mut self, ability: Ability) -> &mut u8 {
        match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i8 {
        ability_modifier(self.get(ability))
    }

    pub fn scores(&self) -> [u8; 6] {
        [
            self.strength,
            self.dexterity,
            self.constitution,
            self.intelligence,
            self.wisdom,
            self.charisma,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub max: i32,
    pub current: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitDice {
    pub total: u8,
    pub value: DieSpec,
    pub used: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub cp: u32,
    pub sp: u32,
    pub ep: u32,
    pub gp: u32,
    pub pp: u32,
}

// Define a structure representing a character's sheet, stored as-is in saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterSheet {
    // Personal Information
    pub name: String,
    pub race: String,
    pub class: String,
    pub level: u8,
    pub background: String,
    pub alignment: String,

    // Abilities and proficiencies
    pub attributes: Attributes,
    pub skill_proficiencies: BTreeMap<String, bool>,
    pub saving_throws: BTreeMap<Ability, bool>,

    // Combat
    pub hp: HitPoints,
    pub ac: i32,
    pub initiative: i8,
    pub speed: u32,
    pub hit_dice: HitDice,

    // Belongings and features
    pub equipment: Vec<String>,
    pub inventory: Vec<String>,
    pub features: Vec<String>,
    pub currency: Currency,

    pub point_buy_remaining: i32,
}

impl Default for CharacterSheet {
    fn default() -> Self {
        CharacterSheet {
            name: String::new(),
            race: String::new(),
            class: String::new(),
            level: 1,
            background: String::new(),
            alignment: String::new(),
            attributes: Attributes::default(),
            skill_proficiencies: BTreeMap::new(),
            saving_throws: BTreeMap::new(),
            hp: HitPoints {
                max: 10,
                current: 10,
            },
            ac: 10,
            initiative: 0,
            speed: 30,
            hit_dice: HitDice {
                total: 1,
                value: DieSpec::D8,
                used: 0,
            },
            equipment: Vec::new(),
            inventory: Vec::new(),
            features: Vec::new(),
            currency: Currency::default(),
            point_buy_remaining: POINT_BUY_BUDGET as i32,
        }
    }
}

// Implementation of methods for the CharacterSheet struct.
impl CharacterSheet {
    pub fn new(name: impl Into<String>, race: impl Into<String>, class: impl Into<String>) -> Self {
        CharacterSheet {
            name: name.into(),
            race: race.into(),
            class: class.into(),
            ..Self::default()
        }
    }

    /// Change one ability score, charging or refunding point-buy points.
    ///
    /// Scores inside the point-buy domain are priced from the cost table.
    /// Scores outside it (racial bonuses, level-ups) cost nothing.
    pub fn set_attribute(&mut self, ability: Ability, score: u8) {
        let old_cost = point_buy_cost(self.attributes.get(ability)).unwrap_or(0);
        let new_cost = point_buy_cost(score).unwrap_or(0);

        *self.attributes.slot(ability) = score;
        self.point_buy_remaining -= new_cost as i32 - old_cost as i32;
        self.recalculate_derived_stats();
        log::debug!(
            "{} set to {score}, {} point-buy points left",
            ability,
            self.point_buy_remaining
        );
    }

    pub fn modifier(&self, ability: Ability) -> i8 {
        self.attributes.modifier(ability)
    }

    pub fn recalculate_derived_stats(&mut self) {
        let dex = self.modifier(Ability::Dexterity);
        let previous_base_ac = 10 + self.initiative as i32;
        // Keep a manually entered armor class, track the unarmored one.
        if self.ac == previous_base_ac {
            self.ac = 10 + dex as i32;
        }
        self.initiative = dex;
        self.hit_dice.total = self.level;
    }

    pub fn level_up(&mut self) {
        self.level = self.level.saturating_add(1);
        self.recalculate_derived_stats();
    }

    pub fn set_hit_points(&mut self, current: i32, max: Option<i32>) {
        if let Some(max) = max {
            self.hp.max = max;
        }
        self.hp.current = current;
    }

    pub fn add_inventory_item(&mut self, item: impl Into<String>) {
        self.inventory.push(item.into());
    }

    pub fn remove_inventory_item(&mut self, index: usize) -> Option<String> {
        (index < self.inventory.len()).then(|| self.inventory.remove(index))
    }

    pub fn add_equipment(&mut self, item: impl Into<String>) {
        self.equipment.push(item.into());
    }

    pub fn add_feature(&mut self, feature: impl Into<String>) {
        self.features.push(feature.into());
    }

    pub fn set_skill_proficiency(&mut self, skill: impl Into<String>, proficient: bool) {
        self.skill_proficiencies.insert(skill.into(), proficient);
    }

    // One-line identity used when opening a new game.
    pub fn introduction(&self) -> String {
        format!(
            "I'm playing as {}, a level {} {} {}. Please start our adventure with an engaging introduction to the world and my first scene.",
            self.name, self.level, self.race, self.class
        )
    }
}
