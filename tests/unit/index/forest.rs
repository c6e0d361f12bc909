//! Tests for random projection forest construction and candidate search

#[cfg(test)]
mod tests {
    use anncollage::CollageError;
    use anncollage::index::forest::{IndexParams, ProjectionForest};
    use anncollage::io::configuration::{DEFAULT_LEAF_SIZE, DEFAULT_SEED, DEFAULT_TREE_COUNT};
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    fn random_vectors(rows: usize, dimension: usize, seed: u64) -> Array2<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, dimension), |_| rng.random::<f32>())
    }

    fn params(tree_count: usize, leaf_size: usize) -> IndexParams {
        IndexParams {
            tree_count,
            leaf_size,
            ..IndexParams::default()
        }
    }

    // Tests default parameters come from the configuration constants
    // Verified by hard-coding a different tree count
    #[test]
    fn test_default_params() {
        let defaults = IndexParams::default();

        assert_eq!(defaults.tree_count, DEFAULT_TREE_COUNT);
        assert_eq!(defaults.leaf_size, DEFAULT_LEAF_SIZE);
        assert_eq!(defaults.seed, DEFAULT_SEED);
        assert_eq!(defaults.search_k, None);
    }

    // Tests zero tree counts, leaf sizes and search breadths are rejected
    // Verified by skipping the leaf size check
    #[test]
    fn test_validate_params() {
        assert!(matches!(
            params(0, 4).validate(),
            Err(CollageError::InvalidParameter { .. })
        ));
        assert!(params(2, 0).validate().is_err());
        let zero_search = IndexParams {
            search_k: Some(0),
            ..IndexParams::default()
        };
        assert!(zero_search.validate().is_err());
        assert!(IndexParams::default().validate().is_ok());
    }

    // Tests search breadth scales with trees, k and leaf size
    // Verified by ignoring the leaf size factor
    #[test]
    fn test_search_breadth() {
        assert_eq!(params(5, 16).search_breadth(2), 160);

        let narrow = IndexParams {
            search_k: Some(3),
            ..IndexParams::default()
        };
        assert_eq!(narrow.search_breadth(1), 3);
        assert_eq!(narrow.search_breadth(10), 10);
    }

    // Tests one root per tree and a structurally valid arena
    // Verified by building a single tree regardless of the count
    #[test]
    fn test_build_structure() {
        let vectors = random_vectors(300, 6, 1);

        let Ok(forest) = ProjectionForest::build(&vectors, &params(4, 8)) else {
            unreachable!("valid parameters must build");
        };

        assert_eq!(forest.tree_count(), 4);
        assert!(forest.node_count() > 4);
        assert!(forest.validate(300, 6).is_ok());
        assert!(forest.validate(299, 6).is_err());
    }

    // Tests the same seed reproduces the same forest
    // Verified by seeding from entropy
    #[test]
    fn test_build_deterministic() {
        let vectors = random_vectors(200, 4, 2);

        let first = ProjectionForest::build(&vectors, &params(3, 5)).ok();
        let second = ProjectionForest::build(&vectors, &params(3, 5)).ok();

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    // Tests a breadth covering every row returns each row exactly once
    // Verified by removing candidate deduplication
    #[test]
    fn test_candidates_cover_all_rows() {
        let vectors = random_vectors(120, 5, 3);
        let Ok(forest) = ProjectionForest::build(&vectors, &params(3, 4)) else {
            unreachable!("valid parameters must build");
        };

        let mut found = forest.candidates(vectors.row(7), 120, 10_000);
        found.sort_unstable();

        assert_eq!(found, (0..120).collect::<Vec<_>>());
    }

    // Tests the query row's own leaf is harvested first
    // Verified by giving far branches the parent priority
    #[test]
    fn test_candidates_start_with_own_leaf() {
        let vectors = random_vectors(500, 8, 4);
        let Ok(forest) = ProjectionForest::build(&vectors, &params(2, 6)) else {
            unreachable!("valid parameters must build");
        };

        for row in [0, 99, 250, 499] {
            let found = forest.candidates(vectors.row(row), 500, 1);
            assert!(found.contains(&row), "row {row} missing from its own leaf");
        }
    }

    // Tests identical vectors still split into bounded leaves
    // Verified by refusing to halve nodes without a separating plane
    #[test]
    fn test_identical_vectors() {
        let vectors = Array2::from_elem((64, 3), 0.5_f32);

        let Ok(forest) = ProjectionForest::build(&vectors, &params(2, 4)) else {
            unreachable!("identical vectors must still build");
        };

        assert!(forest.validate(64, 3).is_ok());
        assert_eq!(forest.candidates(vectors.row(0), 64, 64).len(), 64);
    }

    fn decoded(forest: &serde_json::Value) -> ProjectionForest {
        let Ok(forest) = serde_json::from_value(forest.clone()) else {
            unreachable!("literal forest must decode");
        };
        forest
    }

    // Tests splits pointing at themselves or an ancestor are rejected
    // Verified by checking child indices only against the arena length
    #[test]
    fn test_validate_rejects_cycles() {
        let self_loop = decoded(&json!({
            "nodes": [{ "Split": { "normal": [], "offset": 0.0, "left": 0, "right": 0 } }],
            "roots": [0]
        }));
        let back_edge = decoded(&json!({
            "nodes": [
                { "Split": { "normal": [], "offset": 0.0, "left": 1, "right": 2 } },
                { "Leaf": { "items": [0] } },
                { "Split": { "normal": [], "offset": 0.0, "left": 0, "right": 1 } }
            ],
            "roots": [0]
        }));

        assert!(self_loop.validate(1, 3).is_err());
        assert!(back_edge.validate(1, 3).is_err());
    }

    // Tests trees sharing a node are rejected
    // Verified by resetting the visited set for every root
    #[test]
    fn test_validate_rejects_shared_nodes() {
        let shared = decoded(&json!({
            "nodes": [{ "Leaf": { "items": [0] } }],
            "roots": [0, 0]
        }));
        let disjoint = decoded(&json!({
            "nodes": [{ "Leaf": { "items": [0] } }, { "Leaf": { "items": [0] } }],
            "roots": [0, 1]
        }));

        assert!(shared.validate(1, 3).is_err());
        assert!(disjoint.validate(1, 3).is_ok());
    }
}
