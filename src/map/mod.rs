use std::collections::BTreeMap;

use bracket_geometry::prelude::Point;
use serde::{Deserialize, Serialize};
use specs::Entity;

use crate::{data::ItemId, error::SimError, movement::Direction};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub u32);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneType {
    #[default]
    Normal,
    /// No player versus player combat.
    Safe,
    /// Player kills carry no penalty or kill events.
    Arena,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapAttribute {
    #[default]
    None,
    Blocked,
    NpcAvoid,
    ZDimension {
        /// Level (0-based) on which the tile is impassable.
        #[serde(default)]
        blocked_level: Option<i32>,
        /// Level the mover is put on after stepping onto the tile.
        #[serde(default)]
        gateway_to: Option<i32>,
    },
    Slide {
        #[serde(default)]
        direction: Option<Direction>,
    },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Neighbors {
    pub up: Option<MapId>,
    pub down: Option<MapId>,
    pub left: Option<MapId>,
    pub right: Option<MapId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapItem {
    pub item: ItemId,
    pub quantity: u32,
    pub x: i32,
    pub y: i32,
    /// Entity that dropped it, if any.
    #[serde(skip)]
    pub dropped_by: Option<Entity>,
}

/// One map of the world: an attribute grid plus the live index of what is on it.
#[derive(Clone, Debug)]
pub struct MapInstance {
    pub id: MapId,
    pub width: i32,
    pub height: i32,
    pub zone: ZoneType,
    pub neighbors: Neighbors,
    attributes: Vec<MapAttribute>,
    /// Registration order; iteration over a map always follows it.
    entities: Vec<Entity>,
    projectiles: Vec<Entity>,
    pub items: Vec<MapItem>,
}

impl MapInstance {
    pub fn new(id: MapId, width: i32, height: i32) -> Self {
        let size = (width.max(0) * height.max(0)) as usize;
        Self {
            id,
            width,
            height,
            zone: ZoneType::Normal,
            neighbors: Neighbors::default(),
            attributes: vec![MapAttribute::None; size],
            entities: Vec::new(),
            projectiles: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn from_layout(layout: &MapLayout) -> Self {
        let mut map = Self::new(layout.id, layout.width, layout.height);
        map.zone = layout.zone;
        map.neighbors = layout.neighbors;
        for tile in &layout.attributes {
            map.set_attribute(Point::new(tile.x, tile.y), tile.attribute);
        }
        map
    }

    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(Point::new(x, y)) {
            Some((y * self.width + x) as usize)
        } else {
            None
        }
    }

    pub fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0 && point.x < self.width && point.y >= 0 && point.y < self.height
    }

    pub fn attribute(&self, point: Point) -> MapAttribute {
        self.idx(point.x, point.y)
            .map(|idx| self.attributes[idx])
            .unwrap_or_default()
    }

    pub fn set_attribute(&mut self, point: Point, attribute: MapAttribute) {
        if let Some(idx) = self.idx(point.x, point.y) {
            self.attributes[idx] = attribute;
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn add_entity(&mut self, entity: Entity) {
        if !self.entities.contains(&entity) {
            self.entities.push(entity);
        }
    }

    pub fn remove_entity(&mut self, entity: Entity) {
        self.entities.retain(|e| *e != entity);
    }

    pub fn projectiles(&self) -> &[Entity] {
        &self.projectiles
    }

    pub fn add_projectile(&mut self, projectile: Entity) {
        self.projectiles.push(projectile);
    }

    pub fn remove_projectile(&mut self, projectile: Entity) {
        self.projectiles.retain(|e| *e != projectile);
    }

    pub fn neighbor(&self, dir: Direction) -> Option<MapId> {
        match dir {
            Direction::Up => self.neighbors.up,
            Direction::Down => self.neighbors.down,
            Direction::Left => self.neighbors.left,
            Direction::Right => self.neighbors.right,
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTile {
    pub x: i32,
    pub y: i32,
    pub attribute: MapAttribute,
}

/// Serialised map shape as handed over by the world collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapLayout {
    pub id: MapId,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub zone: ZoneType,
    #[serde(default)]
    pub neighbors: Neighbors,
    #[serde(default)]
    pub attributes: Vec<AttributeTile>,
}

/// Access to the maps the simulation runs on.
pub trait MapProvider: Send + Sync {
    fn get(&self, id: MapId) -> Option<&MapInstance>;
    fn get_mut(&mut self, id: MapId) -> Option<&mut MapInstance>;
    /// Every loaded map, ascending.
    fn map_ids(&self) -> Vec<MapId>;
}

#[derive(Clone, Debug, Default)]
pub struct MapRegistry {
    maps: BTreeMap<MapId, MapInstance>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layouts(layouts: &[MapLayout]) -> Result<Self, SimError> {
        let mut registry = Self::new();
        for layout in layouts {
            if layout.width <= 0 || layout.height <= 0 {
                return Err(SimError::invariant(format!(
                    "map {:?} has non-positive dimensions",
                    layout.id
                )));
            }
            registry.insert(MapInstance::from_layout(layout));
        }
        Ok(registry)
    }

    /// Adds `map`, refusing maps without any tiles. Returns false when refused.
    pub fn insert(&mut self, map: MapInstance) -> bool {
        if map.width <= 0 || map.height <= 0 {
            tracing::warn!(map = ?map.id, width = map.width, height = map.height, "empty_map_rejected");
            return false;
        }
        self.maps.insert(map.id, map);
        true
    }

    /// Links `left` and `right` as horizontal neighbours of each other.
    pub fn link_horizontal(&mut self, left: MapId, right: MapId) {
        if let Some(map) = self.maps.get_mut(&left) {
            map.neighbors.right = Some(right);
        }
        if let Some(map) = self.maps.get_mut(&right) {
            map.neighbors.left = Some(left);
        }
    }

    pub fn link_vertical(&mut self, up: MapId, down: MapId) {
        if let Some(map) = self.maps.get_mut(&up) {
            map.neighbors.down = Some(down);
        }
        if let Some(map) = self.maps.get_mut(&down) {
            map.neighbors.up = Some(up);
        }
    }
}

impl MapProvider for MapRegistry {
    fn get(&self, id: MapId) -> Option<&MapInstance> {
        self.maps.get(&id)
    }

    fn get_mut(&mut self, id: MapId) -> Option<&mut MapInstance> {
        self.maps.get_mut(&id)
    }

    fn map_ids(&self) -> Vec<MapId> {
        self.maps.keys().copied().collect()
    }
}

/// Moves `from` by `delta` tiles, crossing onto linked neighbour maps when an
/// edge is passed. Horizontal wrapping happens first, then vertical wrapping
/// from whichever map the horizontal step landed on.
pub fn translate(
    maps: &dyn MapProvider,
    map: MapId,
    from: Point,
    delta: Point,
) -> Option<(MapId, Point)> {
    let tiled = |map: &MapInstance| map.width > 0 && map.height > 0;
    let mut current = maps.get(map).filter(|m| tiled(m))?;
    let mut x = from.x + delta.x;
    let mut y = from.y + delta.y;

    while x < 0 {
        let left = maps.get(current.neighbors.left?).filter(|m| tiled(m))?;
        x += left.width;
        current = left;
    }
    while x >= current.width {
        let right = maps.get(current.neighbors.right?).filter(|m| tiled(m))?;
        x -= current.width;
        current = right;
    }
    while y < 0 {
        let up = maps.get(current.neighbors.up?).filter(|m| tiled(m))?;
        y += up.height;
        current = up;
    }
    while y >= current.height {
        let down = maps.get(current.neighbors.down?).filter(|m| tiled(m))?;
        y -= current.height;
        current = down;
    }

    let point = Point::new(x, y);
    current.in_bounds(point).then_some((current.id, point))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_maps() -> MapRegistry {
        let mut registry = MapRegistry::new();
        registry.insert(MapInstance::new(MapId(1), 10, 8));
        registry.insert(MapInstance::new(MapId(2), 12, 8));
        registry.link_horizontal(MapId(1), MapId(2));
        registry
    }

    #[test]
    fn translation_stays_inside_one_map() {
        let registry = two_maps();
        let moved = translate(&registry, MapId(1), Point::new(3, 3), Point::new(1, -1));
        assert_eq!(moved, Some((MapId(1), Point::new(4, 2))));
    }

    #[test]
    fn translation_wraps_through_neighbour_links() {
        let registry = two_maps();
        let east = translate(&registry, MapId(1), Point::new(9, 4), Point::new(1, 0));
        assert_eq!(east, Some((MapId(2), Point::new(0, 4))));

        let west = translate(&registry, MapId(2), Point::new(0, 4), Point::new(-2, 0));
        assert_eq!(west, Some((MapId(1), Point::new(8, 4))));
    }

    #[test]
    fn maps_without_tiles_are_refused() {
        let mut registry = MapRegistry::new();
        assert!(!registry.insert(MapInstance::new(MapId(3), 0, 8)));
        assert!(!registry.insert(MapInstance::new(MapId(4), 8, 0)));
        assert!(registry.get(MapId(3)).is_none());
        assert!(registry.insert(MapInstance::new(MapId(5), 1, 1)));
    }

    #[test]
    fn translation_gives_up_on_tileless_neighbours() {
        let mut maps = BTreeMap::new();
        let mut flat = MapInstance::new(MapId(6), 0, 4);
        flat.neighbors.right = Some(MapId(6));
        flat.neighbors.left = Some(MapId(6));
        maps.insert(MapId(6), flat);
        let mut start = MapInstance::new(MapId(7), 4, 4);
        start.neighbors.right = Some(MapId(6));
        maps.insert(MapId(7), start);
        let registry = MapRegistry { maps };

        assert_eq!(translate(&registry, MapId(7), Point::new(3, 1), Point::new(1, 0)), None);
        assert_eq!(translate(&registry, MapId(6), Point::new(0, 1), Point::new(1, 0)), None);
    }

    #[test]
    fn missing_neighbour_is_out_of_bounds() {
        let registry = two_maps();
        assert_eq!(translate(&registry, MapId(1), Point::new(0, 0), Point::new(0, -1)), None);
        assert_eq!(translate(&registry, MapId(1), Point::new(0, 0), Point::new(-1, 0)), None);
        assert_eq!(translate(&registry, MapId(9), Point::new(0, 0), Point::new(0, 0)), None);
    }

    #[test]
    fn layouts_build_attribute_grids() {
        let layout: MapLayout = serde_json::from_str(
            r#"{
                "id": 4, "width": 5, "height": 5, "zone": "Arena",
                "attributes": [
                    { "x": 1, "y": 2, "attribute": "Blocked" },
                    { "x": 2, "y": 2, "attribute": { "Slide": { "direction": "Left" } } }
                ]
            }"#,
        )
        .expect("layout");
        let registry = MapRegistry::from_layouts(&[layout]).expect("registry");
        let map = registry.get(MapId(4)).expect("map");
        assert_eq!(map.zone, ZoneType::Arena);
        assert_eq!(map.attribute(Point::new(1, 2)), MapAttribute::Blocked);
        assert_eq!(
            map.attribute(Point::new(2, 2)),
            MapAttribute::Slide { direction: Some(Direction::Left) }
        );
        assert_eq!(map.attribute(Point::new(7, 7)), MapAttribute::None);
    }
}
