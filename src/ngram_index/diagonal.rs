use std::cmp::Reverse;

/// A maximal run of consecutive query windows that agree on the same alignment offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DiagonalRun {
    /// Token offset minus query offset, the start of the query within the token.
    pub diagonal: isize,
    pub first_window: usize,
    pub length: usize,
}

/// The longest run over all diagonals.
///
/// `hits` are `(query offset, diagonal)` pairs in any order and may contain duplicates.
/// Among equally long runs the one starting at the leftmost query window wins, then the
/// smaller diagonal.
pub(super) fn longest_diagonal_run(hits: &mut Vec<(usize, isize)>) -> Option<DiagonalRun> {
    hits.sort_unstable_by_key(|&(window, diagonal)| (diagonal, window));
    hits.dedup();

    let mut runs = Vec::new();
    let mut hits = hits.iter().copied();
    let (mut window, mut diagonal) = hits.next()?;
    let mut run = DiagonalRun {
        diagonal,
        first_window: window,
        length: 1,
    };

    for (next_window, next_diagonal) in hits {
        if next_diagonal == diagonal && next_window == window + 1 {
            run.length += 1;
        } else {
            runs.push(run);
            run = DiagonalRun {
                diagonal: next_diagonal,
                first_window: next_window,
                length: 1,
            };
        }
        (window, diagonal) = (next_window, next_diagonal);
    }
    runs.push(run);

    runs.into_iter()
        .min_by_key(|run| (Reverse(run.length), run.first_window, run.diagonal))
}
