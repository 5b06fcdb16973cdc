// grid.rs: deposit bucketing by row band.
//
// Agents move in parallel but must not race on the trail field. Each agent
// emits one Deposit; deposits are bucketed by band of field rows and every
// band is then applied by exactly one rayon task.
// Rebuild: two-pass count then scatter, stable in agent order, so the result
// is identical for any thread count.

use rayon::prelude::*;

use super::pheromone::TrailField;

/// A pending trail deposit. `index` is a flat index into the channel-planar field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Deposit {
    pub index: usize,
    pub amount: f32,
}

/// Deposits grouped into contiguous bands of field rows.
///
/// A "row" here counts across channels: row `r` of the flat buffer is
/// channel `r / height`, line `r % height`. Bands therefore map to disjoint
/// `par_chunks_mut` slices of the current buffer.
pub struct DepositBands {
    counts: Vec<u32>,  // [n_bands]  deposits per band
    offsets: Vec<u32>, // [n_bands]  start of each band in `data`
    data: Vec<Deposit>,
    band_len: usize, // cells per band
}

impl DepositBands {
    /// `band_rows` field rows per band.
    pub fn new(field: &TrailField, band_rows: usize) -> Self {
        let band_rows = band_rows.max(1);
        let total_rows = field.height * field.channels;
        let n_bands = total_rows.div_ceil(band_rows);
        DepositBands {
            counts: vec![0; n_bands],
            offsets: vec![0; n_bands],
            data: Vec::new(),
            band_len: band_rows * field.width,
        }
    }

    /// Pick a band height that gives every rayon worker several bands.
    pub fn for_field(field: &TrailField) -> Self {
        let total_rows = field.height * field.channels;
        let target_bands = rayon::current_num_threads().max(1) * 4;
        Self::new(field, total_rows.div_ceil(target_bands))
    }

    pub fn n_bands(&self) -> usize {
        self.counts.len()
    }

    #[inline(always)]
    fn band_of(&self, d: &Deposit) -> usize {
        d.index / self.band_len
    }

    /// O(N) rebuild from the deposit list.
    pub fn rebuild(&mut self, deposits: &[Deposit]) {
        if self.data.len() < deposits.len() {
            self.data.resize(deposits.len(), Deposit::default());
        }

        // ── Pass 1: count ────────────────────────────────────────────────────
        self.counts.iter_mut().for_each(|c| *c = 0);
        for d in deposits {
            let b = self.band_of(d);
            self.counts[b] += 1;
        }

        // ── Prefix sum → offsets ─────────────────────────────────────────────
        let mut running = 0u32;
        for b in 0..self.counts.len() {
            self.offsets[b] = running;
            running += self.counts[b];
        }

        // ── Pass 2: scatter ──────────────────────────────────────────────────
        self.counts.iter_mut().for_each(|c| *c = 0); // reuse as cursor
        for d in deposits {
            let b = self.band_of(d);
            let slot = (self.offsets[b] + self.counts[b]) as usize;
            self.data[slot] = *d;
            self.counts[b] += 1;
        }
    }

    pub fn band(&self, b: usize) -> &[Deposit] {
        let start = self.offsets[b] as usize;
        &self.data[start..start + self.counts[b] as usize]
    }

    /// Add every deposit into the current buffer, saturating at `cap`.
    /// Bands run in parallel; within a band deposits apply in agent order.
    pub fn apply(&self, field: &mut TrailField, cap: f32) {
        let band_len = self.band_len;
        field
            .current_mut()
            .par_chunks_mut(band_len)
            .enumerate()
            .for_each(|(b, cells)| {
                let base = b * band_len;
                for d in self.band(b) {
                    let cell = &mut cells[d.index - base];
                    *cell = (*cell + d.amount).min(cap);
                }
            });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
