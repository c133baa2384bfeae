use thiserror::Error;

/// Settings that make the generator's constraints unsatisfiable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("min_segment_length ({min}) exceeds max_segment_length ({max})")]
    SegmentLengthInverted { min: f64, max: f64 },

    #[error("min_nodes ({min}) exceeds max_nodes ({max})")]
    NodeBoundsInverted { min: usize, max: usize },

    #[error("max_nodes ({max_nodes}) leaves no room for an intersection")]
    TooFewNodes { max_nodes: usize },

    #[error("max_left_lanes and max_right_lanes must be at least 1")]
    NoLanes,

    #[error("{lanes} lanes leave an empty turn-angle window")]
    AngleWindowCollapsed { lanes: u32 },

    #[error("lane width range [{min}, {max}] is empty or zero")]
    LaneWidthInverted { min: u32, max: u32 },

    #[error("population_size must be positive")]
    EmptyPopulation,

    #[error("number_elites ({elites}) exceeds population_size ({population})")]
    TooManyElites { elites: usize, population: usize },

    #[error("spline_degree must be positive")]
    ZeroSplineDegree,

    #[error("{field} ({samples}) must be at least 2")]
    TooFewSamples { field: &'static str, samples: usize },

    #[error("{field} ({value}) must lie in [0, 1]")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },

    #[error("{field} ({value}) must be positive")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} ({value}) must be finite")]
    NotFinite { field: &'static str, value: f64 },

    #[error("max_tries must be at least 1")]
    ZeroRetryBudget,
}

/// Why a proposed point, intersection or mutation was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("segment length outside the allowed range")]
    SegmentLength,

    #[error("turn angle outside the allowed window")]
    TurnAngle,

    #[error("centerline crosses another road")]
    CenterlineCrossing,

    #[error("road corridor overlaps another road")]
    CorridorOverlap,

    #[error("road crosses itself")]
    SelfCrossing,

    #[error("degenerate geometry")]
    Degenerate,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("geometry rejected: {0}")]
    GeometryRejected(#[from] Rejection),

    #[error("retry budget exhausted after {tries} tries")]
    Exhausted { tries: usize },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PopulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no individual at index {index} (population holds {len})")]
    UnknownIndividual { index: usize, len: usize },

    #[error("individual {index} has not been evaluated yet")]
    NotEvaluated { index: usize },

    #[error("fitness for individual {index} is not a finite number")]
    InvalidFitness { index: usize },
}
