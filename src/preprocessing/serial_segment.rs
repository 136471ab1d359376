use serde::{Deserialize, Serialize};

use crate::sim::{
    obstacles::ObstacleSet,
    segment::{ObstacleError, Segment},
};

/// An obstacle as stored in a configuration: endpoints `(ax, ay)` and
/// `(bx, by)` plus a thickness, all in cells.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentSpec {
    pub ax: usize,
    pub ay: usize,
    pub bx: usize,
    pub by: usize,
    pub thickness: usize,
}

impl SegmentSpec {
    pub fn from_segment(segment: &Segment) -> Self {
        let ((ax, ay), (bx, by)) = (segment.a(), segment.b());
        Self {
            ax,
            ay,
            bx,
            by,
            thickness: segment.thickness(),
        }
    }

    /// Validate against `obstacles`' grid and add it to the set
    pub fn add_to(&self, obstacles: &mut ObstacleSet) -> Result<(), ObstacleError> {
        obstacles.add_segment((self.ax, self.ay), (self.bx, self.by), self.thickness)?;
        Ok(())
    }

    /// The segments of `obstacles` in insertion order, oldest first
    pub fn list_from(obstacles: &ObstacleSet) -> Vec<SegmentSpec> {
        let mut specs: Vec<SegmentSpec> = obstacles.segments().map(Self::from_segment).collect();
        specs.reverse();
        specs
    }
}

/// Parses `ax,ay,bx,by,thickness` as given on the command line
impl std::str::FromStr for SegmentSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<usize>())
            .collect::<Result<Vec<usize>, _>>()
            .map_err(|err| format!("invalid segment '{s}': {err}"))?;

        match values[..] {
            [ax, ay, bx, by, thickness] => Ok(SegmentSpec {
                ax,
                ay,
                bx,
                by,
                thickness,
            }),
            _ => Err(format!(
                "invalid segment '{s}': expected ax,ay,bx,by,thickness"
            )),
        }
    }
}
