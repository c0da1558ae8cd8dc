use crate::error::{EngineError, Result};

/// Particle configuration of the exclusion process.
///
/// Positions are stored leader first: `positions[0]` is the rightmost particle and
/// `positions[i - 1] > positions[i]` always holds. `mobile[i]` records whether the
/// site in front of particle `i` is empty; the leader has nothing in front of it and
/// is always mobile. `free_count` caches the number of mobile particles and is kept
/// up to date by the mutation helpers below, never by rescanning.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    positions: Vec<i64>,
    mobile: Vec<bool>,
    free_count: usize,
}

impl ParticleState {
    /// Builds a state from leader-first positions, deriving mobility in one scan.
    pub fn from_positions(positions: Vec<i64>) -> Result<Self> {
        if positions.is_empty() {
            return Err(EngineError::InvariantViolation(
                "particle state needs at least one particle".to_string(),
            ));
        }
        if let Some(i) = (1..positions.len()).find(|&i| positions[i - 1] - positions[i] < 1) {
            return Err(EngineError::InvariantViolation(format!(
                "exclusion broken between particles {} and {} (positions {} and {})",
                i - 1,
                i,
                positions[i - 1],
                positions[i]
            )));
        }

        let (mobile, free_count) = derive_mobility(&positions);
        Ok(Self {
            positions,
            mobile,
            free_count,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a constructed state; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[i64] {
        &self.positions
    }

    pub fn mobile(&self) -> &[bool] {
        &self.mobile
    }

    pub fn is_mobile(&self, index: usize) -> bool {
        self.mobile.get(index).copied().unwrap_or(false)
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn leader_position(&self) -> i64 {
        self.positions[0]
    }

    /// Moves the leader one site to the right.
    pub(crate) fn advance_leader(&mut self) {
        self.positions[0] += 1;
        // The follower was blocked iff the gap was 1, so a gap of exactly 2 frees it.
        if self.positions.len() > 1 && self.positions[0] - self.positions[1] == 2 {
            self.mobile[1] = true;
            self.free_count += 1;
        }
    }

    /// Moves mobile follower `index` one site to the right.
    pub(crate) fn advance_follower(&mut self, index: usize) -> Result<()> {
        if index == 0 || index >= self.positions.len() || !self.mobile[index] {
            return Err(EngineError::InvariantViolation(format!(
                "particle {} selected to jump but it is not a mobile follower",
                index
            )));
        }

        self.positions[index] += 1;
        if self.positions[index - 1] - self.positions[index] == 1 {
            self.mobile[index] = false;
            self.free_count -= 1;
        }
        let next = index + 1;
        if next < self.positions.len() && self.positions[index] - self.positions[next] == 2 {
            self.mobile[next] = true;
            self.free_count += 1;
        }
        Ok(())
    }

    /// Cross-checks the incremental bookkeeping against a full rescan.
    ///
    /// O(N); meant for tests and debug builds, the stepper never relies on it.
    pub fn verify_bookkeeping(&self) -> Result<()> {
        if self.mobile.len() != self.positions.len() {
            return Err(EngineError::InvariantViolation(format!(
                "mobility table has {} entries for {} particles",
                self.mobile.len(),
                self.positions.len()
            )));
        }
        for i in 1..self.positions.len() {
            let gap = self.positions[i - 1] - self.positions[i];
            if gap < 1 {
                return Err(EngineError::InvariantViolation(format!(
                    "exclusion broken at particle {} (gap {})",
                    i, gap
                )));
            }
        }
        let (expected, expected_free) = derive_mobility(&self.positions);
        if let Some(i) = (0..expected.len()).find(|&i| expected[i] != self.mobile[i]) {
            return Err(EngineError::InvariantViolation(format!(
                "mobility of particle {} is {} but positions say {}",
                i, self.mobile[i], expected[i]
            )));
        }
        if expected_free != self.free_count {
            return Err(EngineError::InvariantViolation(format!(
                "free count is {} but {} particles can jump",
                self.free_count, expected_free
            )));
        }
        Ok(())
    }

    /// Assembles a state without any checks, for exercising fault paths.
    #[cfg(test)]
    pub(crate) fn from_raw_parts(positions: Vec<i64>, mobile: Vec<bool>, free_count: usize) -> Self {
        Self {
            positions,
            mobile,
            free_count,
        }
    }
}

fn derive_mobility(positions: &[i64]) -> (Vec<bool>, usize) {
    let mut mobile = Vec::with_capacity(positions.len());
    mobile.push(true);
    for i in 1..positions.len() {
        mobile.push(positions[i - 1] - positions[i] > 1);
    }
    let free_count = mobile.iter().filter(|&&m| m).count();
    (mobile, free_count)
}
