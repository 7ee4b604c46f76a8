use rust_decimal::Decimal;

/// Most branches one search may take. A search that runs out keeps what it
/// has found so far.
pub const SEARCH_STEP_LIMIT: usize = 250_000;

// Values in ascending order, with running totals so the smallest and
// largest sums of any run of them are O(1).
struct SubsetSearch {
    min: Decimal,
    max: Decimal,
    order: Vec<usize>,
    sorted: Vec<Decimal>,
    prefix: Vec<Decimal>,
    steps: usize,
    current: Vec<usize>,
}

impl SubsetSearch {
    fn new(target: Decimal, tolerance: Decimal, values: &[Decimal]) -> SubsetSearch {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|a, b| values[*a].cmp(&values[*b]).then(a.cmp(b)));
        let sorted: Vec<Decimal> = order.iter().map(|i| values[*i]).collect();
        let mut prefix = Vec::with_capacity(sorted.len() + 1);
        prefix.push(Decimal::ZERO);
        for (i, v) in sorted.iter().enumerate() {
            prefix.push(prefix[i] + v);
        }
        SubsetSearch {
            min: target - tolerance,
            max: target + tolerance,
            order,
            sorted,
            prefix,
            steps: 0,
            current: Vec::new(),
        }
    }

    fn run_sum(&self, from: usize, n: usize) -> Decimal {
        self.prefix[from + n] - self.prefix[from]
    }

    fn exhausted(&self) -> bool {
        self.steps > SEARCH_STEP_LIMIT
    }

    // Picks `left` more values from `start` on. `found` gets every match as
    // sorted indices into the caller's values, and returns false to stop.
    // Returns false once stopped or out of steps.
    fn visit(
        &mut self,
        start: usize,
        left: usize,
        total: Decimal,
        found: &mut dyn FnMut(Vec<usize>) -> bool,
    ) -> bool {
        if left == 0 {
            if total < self.min || total > self.max {
                return true;
            }
            let mut idxs: Vec<usize> = self.current.iter().map(|p| self.order[*p]).collect();
            idxs.sort();
            return found(idxs);
        }
        let n = self.sorted.len();
        if total + self.run_sum(n - left, left) < self.min {
            return true;
        }
        for pos in start..=(n - left) {
            self.steps += 1;
            if self.exhausted() {
                return false;
            }
            // The rest only get larger
            if total + self.run_sum(pos, left) > self.max {
                break;
            }
            self.current.push(pos);
            let go_on = self.visit(pos + 1, left - 1, total + self.sorted[pos], found);
            self.current.pop();
            if !go_on {
                return false;
            }
        }
        true
    }
}

/// Finds a smallest subset of `values` whose sum is within `tolerance` of
/// `target`. Values must be positive. Sizes are tried from one up, and the
/// search stops at the first size with any match. Within that size the
/// first subset `prefer` accepts wins, otherwise the first match found.
/// Returns sorted indices into `values`.
pub fn smallest_subset<F>(
    target: Decimal,
    tolerance: Decimal,
    values: &[Decimal],
    mut prefer: F,
) -> Option<Vec<usize>>
where
    F: FnMut(&[usize]) -> bool,
{
    let mut search = SubsetSearch::new(target, tolerance, values);
    for size in 1..=values.len() {
        let mut first: Option<Vec<usize>> = None;
        let mut preferred: Option<Vec<usize>> = None;
        search.visit(0, size, Decimal::ZERO, &mut |idxs| {
            if prefer(&idxs) {
                preferred = Some(idxs);
                return false;
            }
            if first.is_none() {
                first = Some(idxs);
            }
            true
        });
        if preferred.is_some() {
            return preferred;
        }
        if first.is_some() {
            return first;
        }
        if search.exhausted() {
            tracing::warn!("smallest_subset: gave up on {} among {} values after {} steps",
                           target, values.len(), search.steps);
            return None;
        }
    }
    None
}
