//! Nearest-string matching used to enrich "not found" errors
//!
//! Lookups are always exact. These helpers only produce "did you mean"
//! suggestions once a lookup has already failed.

/// Default number of suggestions attached to a not-found error
pub const DEFAULT_SUGGESTION_LIMIT: usize = 3;

/// Classic edit distance with unit cost for insert, delete and substitute
pub fn distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // (len(a)+1) x (len(b)+1) cost matrix
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + substitution);
        }
    }

    matrix[a.len()][b.len()]
}

/// Largest distance still considered "reasonably close" to `input`
fn max_distance(input: &str) -> usize {
    input.chars().count().div_ceil(2).max(2)
}

/// Closest candidates to `input`, nearest first, ties broken alphabetically
///
/// Comparison is case-insensitive; candidates further away than the
/// closeness band are dropped before truncating to `limit`.
pub fn suggest<'a, I>(input: &str, candidates: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = input.to_lowercase();
    let band = max_distance(&needle);

    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|candidate| (distance(&needle, &candidate.to_lowercase()), candidate))
        .filter(|(d, _)| *d <= band)
        .collect();

    scored.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.cmp(b)));
    scored.dedup_by(|(_, a), (_, b)| a == b);

    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}
