/// Which neighbor a frame travels toward. Data generally flows downstream
/// (transport-in toward transport-out); control/signal frames often flow
/// upstream (spec §2 data-flow note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Upstream,
    Downstream,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Upstream => Direction::Downstream,
            Direction::Downstream => Direction::Upstream,
        }
    }
}
