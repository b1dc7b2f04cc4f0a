//! Longest-common-ancestor inference over remote paths.
//!
//! Order expansion derives output directories by generalizing all source
//! paths to their deepest shared directory. Paths on different remotes
//! never share an ancestor, and a path whose parent is the remote root
//! never generalizes (root-adjacent files would otherwise collapse the
//! whole remote into one output directory).

use super::remote::{RemotePath, join_remote_path};

/// Generalizes a set of remote paths to their common ancestor directory.
///
/// Returns `None` when the set is empty, when any pair diverges before a
/// shared directory, or when generalization would escape the remote root.
/// The returned path is directory-shaped (trailing slash).
#[must_use]
pub fn generalize_paths(paths: &[String]) -> Option<String> {
    let present: Vec<&str> = paths
        .iter()
        .map(String::as_str)
        .filter(|path| !path.is_empty())
        .collect();
    let first = present.first()?;

    let first_parsed = RemotePath::parse(first);
    if parent_of(&first_parsed.path) == "/" {
        return None;
    }

    if present.len() == 1 {
        let parent = parent_of(&first_parsed.path);
        return Some(join_remote_path(
            &remote_root(first_parsed.remote.as_deref()),
            &[parent.as_str(), "/"],
        ));
    }

    present
        .iter()
        .skip(1)
        .try_fold((*first).to_owned(), |prev, cur| common_path(&prev, cur))
}

/// Returns the deepest directory shared by two remote paths.
///
/// Walks the second path's parent chain until a parent is a prefix of the
/// first path, giving up at the remote root.
#[must_use]
pub fn common_path(path_a: &str, path_b: &str) -> Option<String> {
    if path_a.is_empty() || path_b.is_empty() {
        return None;
    }

    let parsed_a = RemotePath::parse(path_a);
    let parsed_b = RemotePath::parse(path_b);
    if parsed_a.remote != parsed_b.remote {
        return None;
    }

    let mut candidate = parsed_b.path.clone();
    let common = loop {
        let parent = parent_of(&candidate);
        if parent == "/" {
            return None;
        }
        if parsed_a.path.starts_with(&parent) {
            break parent;
        }
        candidate = parent;
    };

    Some(join_remote_path(
        &remote_root(parsed_a.remote.as_deref()),
        &[common.as_str(), "/"],
    ))
}

/// Returns the parent directory of an absolute path (`/` at the top).
fn parent_of(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_owned(),
        Some(index) => trimmed[..index].to_owned(),
    }
}

fn remote_root(remote: Option<&str>) -> String {
    match remote {
        Some(remote) => format!("{remote}:/"),
        None => "/".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{common_path, generalize_paths};
    use rstest::rstest;

    fn owned(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|path| (*path).to_owned()).collect()
    }

    #[test]
    fn generalize_of_nothing_is_none() {
        assert_eq!(generalize_paths(&[]), None);
        assert_eq!(generalize_paths(&[String::new()]), None);
    }

    #[test]
    fn generalize_of_one_path_is_its_parent() {
        let paths = owned(&["storage:/r/example/1.mov"]);
        assert_eq!(
            generalize_paths(&paths).as_deref(),
            Some("storage:/r/example/")
        );
    }

    #[test]
    fn generalize_of_three_similar_paths() {
        let paths = owned(&[
            "storage:/r/example/movies/first/1.mov",
            "storage:/r/example/movies/second/1.mov",
            "storage:/r/example/movies/1.mov",
        ]);
        assert_eq!(
            generalize_paths(&paths).as_deref(),
            Some("storage:/r/example/movies/")
        );
    }

    #[test]
    fn generalize_of_short_paths_stops_above_root() {
        let paths = owned(&["storage:/r/1.mov", "storage:/r/2.mov", "storage:/r/3.mov"]);
        assert_eq!(generalize_paths(&paths).as_deref(), Some("storage:/r/"));
    }

    #[test]
    fn root_adjacent_files_never_generalize() {
        let paths = owned(&["storage:/1.mov", "storage:/2.mov", "storage:/3.mov"]);
        assert_eq!(generalize_paths(&paths), None);
    }

    #[test]
    fn paths_on_different_remotes_never_generalize() {
        let paths = owned(&[
            "storage:/r/example/movies/first/1.mov",
            "cloud:/r/example/movies/second/1.mov",
        ]);
        assert_eq!(generalize_paths(&paths), None);
    }

    #[rstest]
    #[case(
        "storage:/r/example/movies/first/1.mov",
        "storage:/r/example/movies/second/1.mov",
        Some("storage:/r/example/movies/")
    )]
    #[case("storage:/r/1.mov", "storage:/r/2.mov", Some("storage:/r/"))]
    #[case("storage:/1.mov", "storage:/2.mov", None)]
    #[case(
        "storage:/r/example/movies/first/1.mov",
        "cloud:/r/example/movies/second/1.mov",
        None
    )]
    fn common_path_cases(
        #[case] path_a: &str,
        #[case] path_b: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(common_path(path_a, path_b).as_deref(), expected);
    }

    #[test]
    fn common_path_of_empty_inputs_is_none() {
        assert_eq!(common_path("", ""), None);
        assert_eq!(common_path("storage:/r/1.mov", ""), None);
    }
}
