use specs::prelude::Entity;

/// Simulation time handed to systems for the current dispatch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SimClock {
    pub now: u64,
}

/// Settings the housekeeping systems need from the server config.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegenSettings {
    pub interval_ms: u64,
}

impl Default for RegenSettings {
    fn default() -> Self {
        Self { interval_ms: 3000 }
    }
}

/// Entities whose broadcastable state changed during a dispatch.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub vitals: Vec<Entity>,
    pub stats: Vec<Entity>,
    pub statuses: Vec<Entity>,
}

impl ChangeSet {
    fn mark(list: &mut Vec<Entity>, entity: Entity) {
        if !list.contains(&entity) {
            list.push(entity);
        }
    }

    pub fn vitals_changed(&mut self, entity: Entity) {
        Self::mark(&mut self.vitals, entity);
    }

    pub fn stats_changed(&mut self, entity: Entity) {
        Self::mark(&mut self.stats, entity);
    }

    pub fn statuses_changed(&mut self, entity: Entity) {
        Self::mark(&mut self.statuses, entity);
    }

    pub fn is_empty(&self) -> bool {
        self.vitals.is_empty() && self.stats.is_empty() && self.statuses.is_empty()
    }
}
