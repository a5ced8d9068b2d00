use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Name given to the record seeded into an empty database.
pub const DEFAULT_NAME: &str = "guest";
pub const DEFAULT_GOLD: i64 = 1000;
pub const DEFAULT_LEVEL: u32 = 1;
/// Fighter every new profile starts with, unlocked and placed in slot 1.
pub const STARTER_FIGHTER: &str = "melee_basic";
pub const FORMATION_SLOTS: u32 = 3;

/// One position of a player's formation. `fighter_id` is `None` for an empty slot.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormationSlot {
    pub slot_id: u32,
    #[serde(default)]
    pub fighter_id: Option<String>,
}

/// Persisted player profile.
///
/// Everything except `id` and `name` falls back to the template value when
/// missing from the stored document, so files written by older clients still load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_gold")]
    pub gold: i64,
    #[serde(default = "default_level")]
    pub current_level: u32,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub create_date: i64,
    #[serde(default)]
    pub buy_times: u32,
    #[serde(default)]
    pub buy_cell_times: u32,
    #[serde(default = "default_unlock_fighters")]
    pub unlock_fighters: Vec<String>,
    #[serde(default = "default_formation")]
    pub formation: Vec<FormationSlot>,
    #[serde(default)]
    pub online_reward: f64,
    #[serde(default)]
    pub finish_guides: Vec<u32>,
    #[serde(default)]
    pub has_used_fire_ball: bool,
}

fn default_gold() -> i64 {
    DEFAULT_GOLD
}

fn default_level() -> u32 {
    DEFAULT_LEVEL
}

fn default_unlock_fighters() -> Vec<String> {
    vec![STARTER_FIGHTER.to_string()]
}

fn default_formation() -> Vec<FormationSlot> {
    (1..=FORMATION_SLOTS)
        .map(|slot_id| FormationSlot {
            slot_id,
            fighter_id: (slot_id == 1).then(|| STARTER_FIGHTER.to_string()),
        })
        .collect()
}

impl UserRecord {
    /// Build a fresh profile from the default template.
    pub fn template(id: u64, name: impl Into<String>, create_date: i64) -> Self {
        Self {
            id,
            name: name.into(),
            gold: DEFAULT_GOLD,
            current_level: DEFAULT_LEVEL,
            create_date,
            buy_times: 0,
            buy_cell_times: 0,
            unlock_fighters: default_unlock_fighters(),
            formation: default_formation(),
            online_reward: 0.0,
            finish_guides: Vec::new(),
            has_used_fire_ball: false,
        }
    }

    /// The record seeded into an empty database.
    pub fn guest(create_date: i64) -> Self {
        Self::template(0, DEFAULT_NAME, create_date)
    }

    /// Restore every field to the template, keeping `id` and `name`.
    pub fn reset(&mut self, create_date: i64) {
        let name = std::mem::take(&mut self.name);
        *self = Self::template(self.id, name, create_date);
    }
}

/// Partial update applied by `PUT /users/:id`.
///
/// Each present field replaces the stored value wholesale; nested lists such as
/// `formation` are not merged element-wise. Absent and `null` fields are left as is.
/// There is deliberately no `id` field: identifiers never change after creation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub gold: Option<i64>,
    pub current_level: Option<u32>,
    pub create_date: Option<i64>,
    pub buy_times: Option<u32>,
    pub buy_cell_times: Option<u32>,
    pub unlock_fighters: Option<Vec<String>>,
    pub formation: Option<Vec<FormationSlot>>,
    pub online_reward: Option<f64>,
    pub finish_guides: Option<Vec<u32>>,
    pub has_used_fire_ball: Option<bool>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        Ok(())
    }

    /// Shallow-merge the provided fields onto `record`.
    pub fn apply(self, record: &mut UserRecord) {
        if let Some(v) = self.name {
            record.name = v;
        }
        if let Some(v) = self.gold {
            record.gold = v;
        }
        if let Some(v) = self.current_level {
            record.current_level = v;
        }
        if let Some(v) = self.create_date {
            record.create_date = v;
        }
        if let Some(v) = self.buy_times {
            record.buy_times = v;
        }
        if let Some(v) = self.buy_cell_times {
            record.buy_cell_times = v;
        }
        if let Some(v) = self.unlock_fighters {
            record.unlock_fighters = v;
        }
        if let Some(v) = self.formation {
            record.formation = v;
        }
        if let Some(v) = self.online_reward {
            record.online_reward = v;
        }
        if let Some(v) = self.finish_guides {
            record.finish_guides = v;
        }
        if let Some(v) = self.has_used_fire_ball {
            record.has_used_fire_ball = v;
        }
    }
}

/// Top-level shape of the persistence file: `{ "users": [...] }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("name required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_has_documented_defaults() {
        let u = UserRecord::template(7, "Alice", 1_700_000_000_000);
        assert_eq!(u.id, 7);
        assert_eq!(u.name, "Alice");
        assert_eq!(u.gold, 1000);
        assert_eq!(u.current_level, 1);
        assert_eq!(u.buy_times, 0);
        assert_eq!(u.buy_cell_times, 0);
        assert_eq!(u.unlock_fighters, vec!["melee_basic".to_string()]);
        assert_eq!(u.formation.len(), 3);
        assert_eq!(u.formation[0].fighter_id.as_deref(), Some("melee_basic"));
        assert!(u.formation[1].fighter_id.is_none());
        assert!(u.finish_guides.is_empty());
        assert!(!u.has_used_fire_ball);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let v = serde_json::to_value(UserRecord::guest(5)).unwrap();
        assert_eq!(v["id"], 0);
        assert_eq!(v["name"], "guest");
        assert_eq!(v["currentLevel"], 1);
        assert_eq!(v["createDate"], 5);
        assert_eq!(v["hasUsedFireBall"], false);
        assert_eq!(v["formation"][0]["slotId"], 1);
        assert_eq!(v["formation"][0]["fighterId"], "melee_basic");
        assert!(v["formation"][2]["fighterId"].is_null());
    }

    #[test]
    fn missing_fields_load_with_template_values() {
        let u: UserRecord =
            serde_json::from_value(json!({"id": 3, "name": "old", "gold": 5})).unwrap();
        assert_eq!(u.gold, 5);
        assert_eq!(u.current_level, 1);
        assert_eq!(u.formation.len(), 3);
        assert_eq!(u.unlock_fighters, vec!["melee_basic".to_string()]);
    }

    #[test]
    fn record_without_id_is_rejected() {
        assert!(serde_json::from_value::<UserRecord>(json!({"name": "x"})).is_err());
    }

    #[test]
    fn patch_replaces_only_present_fields() {
        let mut u = UserRecord::template(1, "Bob", 0);
        let patch: UserPatch = serde_json::from_value(json!({
            "gold": 42,
            "formation": [{"slotId": 9, "fighterId": "archer"}],
            "hasUsedFireBall": null,
            "id": 99
        }))
        .unwrap();
        patch.apply(&mut u);
        assert_eq!(u.id, 1);
        assert_eq!(u.name, "Bob");
        assert_eq!(u.gold, 42);
        assert_eq!(u.current_level, 1);
        assert_eq!(
            u.formation,
            vec![FormationSlot { slot_id: 9, fighter_id: Some("archer".into()) }]
        );
        assert!(!u.has_used_fire_ball);
    }

    #[test]
    fn reset_keeps_identity() {
        let mut u = UserRecord::template(4, "Carol", 0);
        u.gold = 1;
        u.current_level = 30;
        u.finish_guides = vec![1, 2];
        u.formation.clear();
        u.reset(10);
        assert_eq!(u, UserRecord::template(4, "Carol", 10));
    }

    #[test]
    fn blank_names_are_invalid() {
        assert!(validate_name("  ").is_err());
        assert!(validate_name("Dave").is_ok());
        let patch = UserPatch { name: Some(String::new()), ..Default::default() };
        assert!(matches!(patch.validate(), Err(ModelError::Validation(_))));
    }
}
