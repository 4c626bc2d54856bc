//! Property tests for generated-token accounting

use medir::engine::{generated_token_counts, FILLER_TOKEN};
use medir::model::TokenGrid;
use proptest::prelude::*;

fn padded_grid(rows: Vec<Vec<u32>>) -> (TokenGrid, usize) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let padded: Vec<Vec<u32>> = rows
        .into_iter()
        .map(|mut row| {
            row.resize(width, FILLER_TOKEN);
            row
        })
        .collect();
    (TokenGrid::from_rows(padded).unwrap(), width)
}

proptest! {
    #[test]
    fn counts_cover_every_row(
        rows in prop::collection::vec(prop::collection::vec(0u32..12, 1..16), 1..8)
    ) {
        let (grid, width) = padded_grid(rows);
        let counts = generated_token_counts(&grid, 0, FILLER_TOKEN);

        prop_assert_eq!(counts.len(), grid.rows());
        // Natural length is at most the full row plus the trailing end token
        for count in counts {
            prop_assert!(count <= width + 1);
        }
    }

    #[test]
    fn prompt_longer_than_any_row_clamps_to_zero(
        rows in prop::collection::vec(prop::collection::vec(0u32..12, 1..16), 1..8)
    ) {
        let (grid, width) = padded_grid(rows);
        let counts = generated_token_counts(&grid, width + 2, FILLER_TOKEN);
        prop_assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn filler_only_rows_count_one_trailing_token(
        rows in 1usize..6, cols in 1usize..10
    ) {
        let grid = TokenGrid::from_rows(vec![vec![FILLER_TOKEN; cols]; rows]).unwrap();
        let counts = generated_token_counts(&grid, 0, FILLER_TOKEN);
        prop_assert!(counts.iter().all(|&c| c == 1));
    }

    #[test]
    fn counts_decrease_monotonically_with_prompt_length(
        row in prop::collection::vec(3u32..12, 1..16),
        prompt in 0usize..20
    ) {
        let (grid, _) = padded_grid(vec![row]);
        let with_prompt = generated_token_counts(&grid, prompt, FILLER_TOKEN)[0];
        let without_prompt = generated_token_counts(&grid, 0, FILLER_TOKEN)[0];
        prop_assert!(with_prompt <= without_prompt);
    }
}
