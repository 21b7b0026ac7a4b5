/// Largest id that still fits one half of an overlap key
pub const MAX_OVERLAP_ID: u32 = 0xFFFF;

/// Tracks which id pairs overlap this step and which did last step.
///
/// Pairs are packed into `u32` keys (`min << 16 | max`) and kept sorted, so the
/// difference between two steps is a single linear merge.
#[derive(Debug, Clone, Default)]
pub struct OverlapKeeper {
    current: Vec<u32>,
    previous: Vec<u32>,
}

impl OverlapKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packs an unordered pair into its key
    #[inline]
    pub fn key(i: u32, j: u32) -> u32 {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        debug_assert!(hi <= MAX_OVERLAP_ID, "overlap id {} does not fit 16 bits", hi);
        (lo << 16) | hi
    }

    #[inline]
    pub fn unpack(key: u32) -> (u32, u32) {
        ((key & 0xFFFF_0000) >> 16, key & 0xFFFF)
    }

    /// Records an overlap for this step; repeated pairs are ignored
    pub fn set(&mut self, i: u32, j: u32) {
        let key = Self::key(i, j);
        if let Err(index) = self.current.binary_search(&key) {
            self.current.insert(index, key);
        }
    }

    /// Starts a new step: this step's pairs become the previous ones
    pub fn tick(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }

    /// Pairs that started overlapping go to `additions`; pairs that stopped go to `removals`.
    pub fn get_diff(&self, additions: &mut Vec<(u32, u32)>, removals: &mut Vec<(u32, u32)>) {
        additions.clear();
        removals.clear();

        let (current, previous) = (&self.current, &self.previous);
        let (mut i, mut j) = (0, 0);
        while i < current.len() && j < previous.len() {
            match current[i].cmp(&previous[j]) {
                std::cmp::Ordering::Less => {
                    additions.push(Self::unpack(current[i]));
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    removals.push(Self::unpack(previous[j]));
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        additions.extend(current[i..].iter().map(|&key| Self::unpack(key)));
        removals.extend(previous[j..].iter().map(|&key| Self::unpack(key)));
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Forgets every pair containing `id`, without producing removal events
    pub fn remove_id(&mut self, id: u32) {
        let keep = |key: &u32| {
            let (a, b) = Self::unpack(*key);
            a != id && b != id
        };
        self.current.retain(keep);
        self.previous.retain(keep);
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }
}
