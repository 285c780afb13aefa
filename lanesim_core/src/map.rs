//! Road map: a lane graph and the lane corridors routed through it.
//!
//! Maps are JSON lane graphs. Each lane has a center line, a width and the
//! ids of the lanes it flows into:
//!
//! ```json
//! { "name": "straight", "lanes": [
//!     { "id": 1, "center_line": [[0, 0], [50, 0]], "width": 3.5, "successors": [2] },
//!     { "id": 2, "center_line": [[50, 0], [100, 0]], "width": 3.5 }
//! ] }
//! ```

use crate::geometry::{point, BoundingBox, Line, Point2d, Polygon2d};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Lane width used when the map file omits it.
pub const DEFAULT_LANE_WIDTH: f64 = 3.5;

fn default_lane_width() -> f64 {
    DEFAULT_LANE_WIDTH
}

/// Identifier of a lane within a map.
pub type LaneId = u32;

/// Errors raised while loading maps or routing corridors.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("Map file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Map JSON invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Map has no lanes")]
    Empty,

    #[error("Lane {0} is defined twice")]
    DuplicateLane(LaneId),

    #[error("Lane {0} needs at least two center line points")]
    DegenerateLane(LaneId),

    #[error("Lane {lane} lists unknown successor {successor}")]
    UnknownSuccessor { lane: LaneId, successor: LaneId },

    #[error("No route from ({:.1}, {:.1}) to ({:.1}, {:.1})", .from.x, .from.y, .to.x, .to.y)]
    NoRoute { from: Point2d, to: Point2d },
}

/// Serialized form of one lane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneDescription {
    pub id: LaneId,
    pub center_line: Vec<[f64; 2]>,
    #[serde(default = "default_lane_width")]
    pub width: f64,
    #[serde(default)]
    pub successors: Vec<LaneId>,
}

/// Serialized form of a map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapDescription {
    #[serde(default)]
    pub name: String,
    pub lanes: Vec<LaneDescription>,
}

/// A lane of the road network.
#[derive(Debug, Clone)]
pub struct Lane {
    pub id: LaneId,
    pub center_line: Line,
    pub width: f64,
    pub successors: Vec<LaneId>,
}

/// Validated, queryable road network.
#[derive(Debug, Clone)]
pub struct MapInterface {
    name: String,
    lanes: BTreeMap<LaneId, Lane>,
}

impl MapInterface {
    /// Builds a map, checking lane ids and successor references.
    pub fn new(description: MapDescription) -> Result<Self, MapError> {
        if description.lanes.is_empty() {
            return Err(MapError::Empty);
        }

        let mut lanes = BTreeMap::new();
        for lane in description.lanes {
            let center_line = Line::new(
                lane.center_line.iter().map(|&[x, y]| point(x, y)).collect(),
            );
            if center_line.points().len() < 2 {
                return Err(MapError::DegenerateLane(lane.id));
            }
            let previous = lanes.insert(
                lane.id,
                Lane {
                    id: lane.id,
                    center_line,
                    width: lane.width,
                    successors: lane.successors,
                },
            );
            if previous.is_some() {
                return Err(MapError::DuplicateLane(lane.id));
            }
        }

        for lane in lanes.values() {
            if let Some(&missing) = lane.successors.iter().find(|id| !lanes.contains_key(id)) {
                return Err(MapError::UnknownSuccessor {
                    lane: lane.id,
                    successor: missing,
                });
            }
        }

        Ok(Self {
            name: description.name,
            lanes,
        })
    }

    /// Loads and validates a JSON map file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let description: MapDescription = serde_json::from_str(&text)?;
        debug!("Loaded map '{}' from {}", description.name, path.display());
        Self::new(description)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    /// Lane whose center line passes closest to `p` (lowest id on ties).
    pub fn nearest_lane(&self, p: Point2d) -> Option<&Lane> {
        let mut best: Option<(&Lane, f64)> = None;
        for lane in self.lanes.values() {
            let d = lane.center_line.distance(p);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((lane, d));
            }
        }
        best.map(|(lane, _)| lane)
    }

    /// Routes a corridor from the lane nearest `source` to the lane nearest
    /// `sink`, following successor links (fewest lanes wins).
    pub fn lane_corridor(&self, source: Point2d, sink: Point2d) -> Result<LaneCorridor, MapError> {
        let no_route = || MapError::NoRoute { from: source, to: sink };
        let start = self.nearest_lane(source).ok_or_else(no_route)?.id;
        let goal = self.nearest_lane(sink).ok_or_else(no_route)?.id;

        let mut predecessor: HashMap<LaneId, LaneId> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut found = start == goal;

        while let Some(current) = queue.pop_front() {
            if found {
                break;
            }
            let Some(lane) = self.lanes.get(&current) else { continue };
            for &next in &lane.successors {
                if next == start || predecessor.contains_key(&next) {
                    continue;
                }
                predecessor.insert(next, current);
                if next == goal {
                    found = true;
                    break;
                }
                queue.push_back(next);
            }
        }

        if !found {
            return Err(no_route());
        }

        let mut lane_ids = vec![goal];
        let mut current = goal;
        while current != start {
            current = *predecessor.get(&current).ok_or_else(no_route)?;
            lane_ids.push(current);
        }
        lane_ids.reverse();

        let lanes: Vec<&Lane> = lane_ids.iter().filter_map(|id| self.lanes.get(id)).collect();
        Ok(LaneCorridor::from_lanes(&lanes))
    }

    /// Bounding box of all lanes including their widths.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb: Option<BoundingBox> = None;
        for lane in self.lanes.values() {
            for &p in lane.center_line.points() {
                let lane_bb = BoundingBox { min: p, max: p }.expand(lane.width / 2.0);
                bb = Some(bb.map_or(lane_bb, |b| b.merge(&lane_bb)));
            }
        }
        bb.unwrap_or(BoundingBox {
            min: point(0.0, 0.0),
            max: point(0.0, 0.0),
        })
    }
}

/// A drivable corridor made of consecutive lanes.
#[derive(Debug, Clone)]
pub struct LaneCorridor {
    lane_ids: Vec<LaneId>,
    center_line: Line,
    left_boundary: Line,
    right_boundary: Line,
    polygon: Polygon2d,
    width: f64,
}

impl PartialEq for LaneCorridor {
    fn eq(&self, other: &Self) -> bool {
        self.lane_ids == other.lane_ids
    }
}

impl LaneCorridor {
    /// Concatenates lanes in driving order.
    pub fn from_lanes(lanes: &[&Lane]) -> Self {
        let mut center_line = Line::default();
        for lane in lanes {
            center_line.append(&lane.center_line);
        }
        let width = lanes
            .iter()
            .map(|lane| lane.width)
            .fold(f64::INFINITY, f64::min);
        let width = if width.is_finite() { width } else { DEFAULT_LANE_WIDTH };
        let left_boundary = center_line.offset(width / 2.0);
        let right_boundary = center_line.offset(-width / 2.0);
        let polygon = Polygon2d::from_boundaries(&left_boundary, &right_boundary);

        Self {
            lane_ids: lanes.iter().map(|lane| lane.id).collect(),
            center_line,
            left_boundary,
            right_boundary,
            polygon,
            width,
        }
    }

    pub fn lane_ids(&self) -> &[LaneId] {
        &self.lane_ids
    }

    pub fn center_line(&self) -> &Line {
        &self.center_line
    }

    pub fn left_boundary(&self) -> &Line {
        &self.left_boundary
    }

    pub fn right_boundary(&self) -> &Line {
        &self.right_boundary
    }

    /// Boundary polygon of the whole corridor.
    pub fn merged_polygon(&self) -> &Polygon2d {
        &self.polygon
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn length(&self) -> f64 {
        self.center_line.length()
    }
}

impl std::fmt::Display for LaneCorridor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.lane_ids.iter().map(|id| id.to_string()).collect();
        write!(f, "corridor[{}]", ids.join("->"))
    }
}
