//! Generated-token accounting for fixed-width output grids
//!
//! Generation models return `[batch, max_length]` grids padded with a
//! filler token past each row's natural end. The natural length of a row is
//! one trailing end token plus every non-filler id in the row; subtracting
//! the known prompt length yields the generated-token count.

use crate::model::TokenGrid;

/// Count generated tokens per grid row, excluding padding and prompt
///
/// Handles rows with no padding (full grid utilization) and batch size 1.
/// Returns one count per row, in row order. Counts clamp at zero when the
/// prompt length exceeds a row's natural length.
#[must_use]
pub fn generated_token_counts(grid: &TokenGrid, prompt_len: usize, filler: u32) -> Vec<usize> {
    grid.iter_rows()
        .map(|row| {
            let natural = 1 + row.iter().filter(|&&t| t != filler).count();
            natural.saturating_sub(prompt_len)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<u32>>) -> TokenGrid {
        TokenGrid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_padded_rows_with_prompt() {
        let g = grid(vec![vec![5, 7, 2, 2, 2], vec![5, 7, 9, 2, 2]]);
        assert_eq!(generated_token_counts(&g, 1, 2), vec![2, 3]);
    }

    #[test]
    fn test_row_without_padding() {
        let g = grid(vec![vec![5, 7, 9, 11]]);
        assert_eq!(generated_token_counts(&g, 0, 2), vec![5]);
    }

    #[test]
    fn test_batch_size_one() {
        let g = grid(vec![vec![5, 2, 2]]);
        assert_eq!(generated_token_counts(&g, 1, 2), vec![1]);
    }

    #[test]
    fn test_prompt_longer_than_row_clamps_to_zero() {
        let g = grid(vec![vec![5, 2, 2]]);
        assert_eq!(generated_token_counts(&g, 10, 2), vec![0]);
    }
}
