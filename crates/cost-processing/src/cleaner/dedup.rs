//! Order-preserving removal of exact duplicate rows.

use polars::prelude::*;

/// Remove exact duplicate rows, keeping the first occurrence and the
/// original row order. Returns the filtered frame and the number removed.
///
/// Rows are compared across every column with polars' grouping equality:
/// nulls match nulls, `NaN` matches `NaN` and `-0.0` matches `0.0`.
pub fn remove_duplicates(df: &DataFrame) -> PolarsResult<(DataFrame, usize)> {
    let before = df.height();
    let deduped = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let removed = before - deduped.height();
    Ok((deduped, removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn costs(df: &DataFrame) -> Vec<Option<f64>> {
        df.column("cost")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn frame() -> DataFrame {
        df!(
            "service" => [Some("a"), Some("b"), Some("a"), None, None],
            "cost" => [1.0, 2.0, 1.0, 3.0, 3.0]
        )
        .unwrap()
    }

    #[test]
    fn test_remove_duplicates_preserves_order() {
        let (df, removed) = remove_duplicates(&frame()).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(df.height(), 3);
        assert_eq!(costs(&df), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_no_duplicates_is_unchanged() {
        let df = df!("service" => ["a", "b"], "cost" => [1.0, 2.0]).unwrap();
        let (out, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 0);
        assert!(out.equals_missing(&df));
    }

    #[test]
    fn test_null_is_distinct_from_text() {
        let df = df!("a" => [Some("~"), None]).unwrap();
        let (_, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_signed_zero_and_nan_rows_collapse() {
        let df = df!(
            "cat" => ["X", "X", "Y", "Y"],
            "cost" => [0.0, -0.0, f64::NAN, f64::NAN]
        )
        .unwrap();
        let (out, removed) = remove_duplicates(&df).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(out.height(), 2);
        let kept = costs(&out);
        assert_eq!(kept[0], Some(0.0));
        assert!(kept[1].is_some_and(f64::is_nan));
    }

    #[test]
    fn test_non_adjacent_duplicates_keep_first_position() {
        let df = df!(
            "service" => ["a", "b", "c", "a", "b"],
            "cost" => [1.5, 2.5, 3.5, 1.5, 2.5]
        )
        .unwrap();
        let (out, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(costs(&out), vec![Some(1.5), Some(2.5), Some(3.5)]);
    }
}
