use serde::{Deserialize, Serialize};

pub const VITAL_COUNT: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vital {
    Health,
    Mana,
}

impl Vital {
    pub const ALL: [Vital; VITAL_COUNT] = [Vital::Health, Vital::Mana];

    pub fn index(self) -> usize {
        match self {
            Vital::Health => 0,
            Vital::Mana => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vital::Health => "health",
            Vital::Mana => "mana",
        }
    }
}

/// Current and maximum values of every vital. Current values always stay in
/// `[0, max]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vitals {
    current: [i32; VITAL_COUNT],
    max: [i32; VITAL_COUNT],
    /// Percent of max restored per regeneration tick.
    pub regen_percent: [i32; VITAL_COUNT],
}

impl Vitals {
    pub fn new(max: [i32; VITAL_COUNT]) -> Self {
        let mut vitals = Self {
            current: [0; VITAL_COUNT],
            max: [0; VITAL_COUNT],
            regen_percent: [0; VITAL_COUNT],
        };
        for vital in Vital::ALL {
            vitals.set_max(vital, max[vital.index()]);
        }
        vitals.restore_all();
        vitals
    }

    pub fn get(&self, vital: Vital) -> i32 {
        self.current[vital.index()]
    }

    pub fn max(&self, vital: Vital) -> i32 {
        self.max[vital.index()]
    }

    pub fn current_all(&self) -> [i32; VITAL_COUNT] {
        self.current
    }

    pub fn max_all(&self) -> [i32; VITAL_COUNT] {
        self.max
    }

    pub fn set(&mut self, vital: Vital, value: i32) {
        let idx = vital.index();
        self.current[idx] = value.clamp(0, self.max[idx].max(0));
    }

    pub fn add(&mut self, vital: Vital, amount: i32) {
        let safe = amount.min(i32::MAX - self.max(vital));
        self.set(vital, self.get(vital).saturating_add(safe));
    }

    /// Removes up to `amount`; never drops below zero.
    pub fn sub(&mut self, vital: Vital, amount: i32) {
        let safe = amount.min(self.get(vital));
        self.set(vital, self.get(vital).saturating_sub(safe));
    }

    /// Sets a maximum, correcting values no entity may have. Returns true when
    /// the requested value had to be corrected.
    pub fn set_max(&mut self, vital: Vital, value: i32) -> bool {
        let corrected = match vital {
            Vital::Health if value <= 0 => 1,
            Vital::Mana if value < 0 => 0,
            _ => value,
        };
        self.max[vital.index()] = corrected;
        if corrected < self.get(vital) {
            self.set(vital, corrected);
        }
        corrected != value
    }

    pub fn has(&self, vital: Vital) -> bool {
        self.get(vital) > 0
    }

    pub fn is_full(&self, vital: Vital) -> bool {
        self.get(vital) == self.max(vital)
    }

    pub fn restore_all(&mut self) {
        self.current = self.max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_inside_bounds() {
        let mut vitals = Vitals::new([100, 40]);
        vitals.set(Vital::Health, 250);
        assert_eq!(vitals.get(Vital::Health), 100);
        vitals.set(Vital::Mana, -5);
        assert_eq!(vitals.get(Vital::Mana), 0);

        vitals.sub(Vital::Health, 130);
        assert_eq!(vitals.get(Vital::Health), 0);
        vitals.add(Vital::Health, i32::MAX);
        assert_eq!(vitals.get(Vital::Health), 100);
        vitals.add(Vital::Mana, -10);
        assert_eq!(vitals.get(Vital::Mana), 0);
    }

    #[test]
    fn extreme_amounts_saturate() {
        let mut vitals = Vitals::new([100, 40]);
        vitals.set(Vital::Health, 50);
        vitals.sub(Vital::Health, i32::MIN);
        assert_eq!(vitals.get(Vital::Health), 100);
        vitals.sub(Vital::Mana, i32::MAX);
        assert_eq!(vitals.get(Vital::Mana), 0);
    }

    #[test]
    fn health_max_never_drops_below_one() {
        let mut vitals = Vitals::new([100, 40]);
        assert!(vitals.set_max(Vital::Health, 0));
        assert_eq!(vitals.max(Vital::Health), 1);
        assert!(vitals.set_max(Vital::Health, -30));
        assert_eq!(vitals.max(Vital::Health), 1);
        assert_eq!(vitals.get(Vital::Health), 1);

        assert!(!vitals.set_max(Vital::Mana, 0));
        assert!(vitals.set_max(Vital::Mana, -2));
        assert_eq!(vitals.max(Vital::Mana), 0);
    }

    #[test]
    fn spawning_with_invalid_health_still_yields_a_living_entity() {
        let vitals = Vitals::new([-7, 10]);
        assert_eq!(vitals.max(Vital::Health), 1);
        assert_eq!(vitals.get(Vital::Health), 1);
    }
}
