//! Intersection synthesis: a 3-way or 4-way junction placed ahead of the last
//! point of the road under construction.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::geometry::{extend, rotate_around, Point};
use crate::road::{Lanes, RoadKind, RoadPiece};
use crate::traffic_control::TrafficControl;

/// The ego car's exit at an intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Straight,
    Right,
}

impl Direction {
    /// `r <= 0.33` straight, `r <= 0.66` left, otherwise right.
    pub fn from_unit(r: f64) -> Self {
        if r <= 0.33 {
            Direction::Straight
        } else if r <= 0.66 {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    pub fn arm(self) -> ArmRole {
        match self {
            Direction::Left => ArmRole::Left,
            Direction::Straight => ArmRole::Straight,
            Direction::Right => ArmRole::Right,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArmRole {
    Approach,
    Straight,
    Left,
    Right,
}

/// Branch structure of an intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ways {
    Four,
    /// `layout` is the present arm that is not the ego's exit; the third
    /// non-approach arm is missing.
    Three { layout: Direction },
}

impl Ways {
    pub fn count(self) -> u8 {
        match self {
            Ways::Four => 4,
            Ways::Three { .. } => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arm {
    pub role: ArmRole,
    pub piece: RoadPiece,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub center: Point,
    /// Outer end of every potential arm, present or not, indexed like
    /// [`Intersection::corner`].
    pub corners: [Point; 4],
    pub direction: Direction,
    pub ways: Ways,
    /// Lanes and width of the crossing road.
    pub opposite: Lanes,
    /// Approach first, then the non-exit arms, the exit arm last.
    pub arms: Vec<Arm>,
    pub control: TrafficControl,
}

impl Intersection {
    /// Outer end of the arm with `role`, also for a missing arm of a 3-way
    /// junction.
    pub fn corner(&self, role: ArmRole) -> Point {
        self.corners[role as usize]
    }

    pub fn arm(&self, role: ArmRole) -> Option<&RoadPiece> {
        self.arms.iter().find(|a| a.role == role).map(|a| &a.piece)
    }

    pub fn approach(&self) -> Option<&RoadPiece> {
        self.arm(ArmRole::Approach)
    }

    pub fn exit(&self) -> Option<&RoadPiece> {
        self.arm(self.direction.arm())
    }

    pub fn pieces(&self) -> impl Iterator<Item = &RoadPiece> {
        self.arms.iter().map(|a| &a.piece)
    }
}

/// A sampled but uncommitted intersection.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionProposal {
    pub last: Point,
    pub center: Point,
    pub straight: Point,
    pub left: Point,
    pub right: Point,
    pub direction: Direction,
    pub ways: Ways,
    pub opposite: Lanes,
}

impl IntersectionProposal {
    /// Sample a junction ahead of `penultimate -> last`. Returns `None` when
    /// the two points coincide and no direction can be derived.
    pub fn sample(
        rng: &mut impl Rng,
        penultimate: Point,
        last: Point,
        config: &GeneratorConfig,
    ) -> Option<Self> {
        let direction = Direction::from_unit(rng.random());
        let ways = if rng.random_bool(0.5) {
            Ways::Four
        } else {
            let (a, b) = match direction {
                Direction::Straight => (Direction::Left, Direction::Right),
                Direction::Left => (Direction::Straight, Direction::Right),
                Direction::Right => (Direction::Straight, Direction::Left),
            };
            Ways::Three {
                layout: if rng.random_bool(0.5) { a } else { b },
            }
        };

        let deviation = rng.random_range(-10..=10) as f64;
        let straight = extend(
            penultimate,
            rotate_around(last, penultimate, deviation),
            config.intersection_length,
        )?;
        let center = extend(penultimate, last, config.straight_length)?;

        let left_angle = rng.random_range(-110..=-70) as f64;
        let right_angle = rng.random_range(70..=110) as f64;
        let left = extend(
            center,
            rotate_around(last, center, left_angle),
            config.opposite_road_length,
        )?;
        let right = extend(
            center,
            rotate_around(last, center, right_angle),
            config.opposite_road_length,
        )?;

        Some(Self {
            last,
            center,
            straight,
            left,
            right,
            direction,
            ways,
            opposite: Lanes::sample(rng, config),
        })
    }

    pub fn has_arm(&self, role: ArmRole) -> bool {
        match (role, self.ways) {
            (ArmRole::Approach, _) | (_, Ways::Four) => true,
            (role, Ways::Three { layout }) => role == self.direction.arm() || role == layout.arm(),
        }
    }

    fn end_of(&self, role: ArmRole) -> Point {
        match role {
            ArmRole::Approach => self.last,
            ArmRole::Straight => self.straight,
            ArmRole::Left => self.left,
            ArmRole::Right => self.right,
        }
    }

    /// Lane layout of an arm, seen driving away from the center.
    fn lanes_of(&self, role: ArmRole, incoming: Lanes) -> Lanes {
        match role {
            ArmRole::Approach | ArmRole::Straight => incoming,
            side => {
                let straight_four = self.direction == Direction::Straight
                    && self.ways == Ways::Four
                    && side == ArmRole::Left;
                if side == self.direction.arm() || straight_four {
                    self.opposite
                } else {
                    self.opposite.mirrored()
                }
            }
        }
    }

    /// Lanes of the continuing road.
    pub fn exit_lanes(&self, incoming: Lanes) -> Lanes {
        self.lanes_of(self.direction.arm(), incoming)
    }

    pub fn exit_point(&self) -> Point {
        self.end_of(self.direction.arm())
    }

    /// Arms in canonical order: approach, non-exit arms, exit.
    pub fn arms(&self, incoming: Lanes) -> Vec<Arm> {
        let exit = self.direction.arm();
        let mut roles = vec![ArmRole::Approach];
        roles.extend(
            [ArmRole::Straight, ArmRole::Left, ArmRole::Right]
                .into_iter()
                .filter(|&r| r != exit && self.has_arm(r)),
        );
        roles.push(exit);
        roles
            .into_iter()
            .map(|role| {
                let points = match role {
                    ArmRole::Approach => vec![self.last, self.center],
                    other => vec![self.center, self.end_of(other)],
                };
                Arm {
                    role,
                    piece: RoadPiece::new(points, self.lanes_of(role, incoming), RoadKind::IntersectionArm),
                }
            })
            .collect()
    }

    /// The two probe lines validated like newly grown segments.
    pub fn probe_lines(&self) -> [(Point, Point); 2] {
        let new_line = match self.ways {
            Ways::Four
            | Ways::Three {
                layout: Direction::Straight,
            } => (self.last, self.straight),
            Ways::Three { .. } => (self.last, self.center),
        };
        let crossing_line = match self.ways {
            Ways::Four => (self.left, self.right),
            Ways::Three {
                layout: Direction::Left,
            } => (self.left, self.center),
            Ways::Three { .. } => (self.center, self.right),
        };
        [new_line, crossing_line]
    }

    pub fn commit(self, incoming: Lanes, control: TrafficControl) -> Intersection {
        let arms = self.arms(incoming);
        Intersection {
            center: self.center,
            corners: [self.last, self.straight, self.left, self.right],
            direction: self.direction,
            ways: self.ways,
            opposite: self.opposite,
            arms,
            control,
        }
    }
}
